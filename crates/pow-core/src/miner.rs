//! Proof-of-work nonce search.
//!
//! A [`MinerBackend`] searches a nonce range given the hash state of the
//! 76-byte header prefix and the reversed target. [`Miner`] prepares both
//! from a [`Block`] once per call and applies the result back to the header.
//! Backends are interchangeable; see [`crate::registry`].

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::block::Block;
use crate::difficulty::{hash_meets_reversed_target, reverse_target};
use crate::hash::hash_to_display_hex;
use crate::registry::{MinerError, MinerRegistry};
use crate::sha256::{RawDigest, Sha256};

/// Nonces tried between deadline and stop-flag checks.
pub const DEFAULT_CHECK_INTERVAL: u32 = 1 << 16;

/// Cooperative limits and shared counters for a search.
///
/// Checks happen every `check_interval` nonces, never inside a single hash.
#[derive(Debug, Clone)]
pub struct SearchControl {
    deadline: Option<Instant>,
    hash_counter: Option<Arc<AtomicU64>>,
    stop: Option<Arc<AtomicBool>>,
    check_interval: u32,
}

impl Default for SearchControl {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchControl {
    /// No deadline, no counter, default check interval.
    pub fn new() -> Self {
        SearchControl {
            deadline: None,
            hash_counter: None,
            stop: None,
            check_interval: DEFAULT_CHECK_INTERVAL,
        }
    }

    /// Give up at a fixed instant.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Give up after `budget` of wall-clock time from now.
    pub fn with_budget(self, budget: Duration) -> Self {
        self.with_deadline(Instant::now() + budget)
    }

    /// Add completed hashes to a shared counter at every check.
    pub fn with_hash_counter(mut self, counter: Arc<AtomicU64>) -> Self {
        self.hash_counter = Some(counter);
        self
    }

    /// Give up once `stop` is set.
    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = Some(stop);
        self
    }

    pub fn with_check_interval(mut self, interval: u32) -> Self {
        self.check_interval = interval.max(1);
        self
    }

    pub fn check_interval(&self) -> u32 {
        self.check_interval
    }

    /// Whether the search should end at the next check.
    pub fn should_stop(&self) -> bool {
        let stopped = self
            .stop
            .as_ref()
            .is_some_and(|stop| stop.load(Ordering::Relaxed));
        let expired = self.deadline.is_some_and(|deadline| Instant::now() >= deadline);
        stopped || expired
    }

    /// Publish completed hashes to the shared counter, if any.
    pub fn record(&self, hashes: u64) {
        if let Some(counter) = &self.hash_counter {
            counter.fetch_add(hashes, Ordering::Relaxed);
        }
    }
}

/// Outcome of a backend search over a nonce range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchResult {
    /// `hash` (raw byte order) meets the target.
    Found {
        nonce: u32,
        hash: RawDigest,
        hashes: u64,
    },
    /// Every nonce up to `u32::MAX` was tried.
    Exhausted { hashes: u64 },
    /// The deadline passed or a stop was requested; resume at `next_nonce`.
    Interrupted { next_nonce: u32, hashes: u64 },
}

/// A hashing backend.
pub trait MinerBackend: Send {
    /// Registry name of the backend.
    fn name(&self) -> &'static str;

    /// Search nonces from `nonce_start` upward for a header whose double
    /// hash meets `reversed_target`.
    ///
    /// `prefix` holds the hash state after the 76-byte header prefix and
    /// must not be modified.
    fn search(
        &mut self,
        prefix: &Sha256,
        reversed_target: &[u8; 32],
        nonce_start: u32,
        control: &SearchControl,
    ) -> SearchResult;
}

/// Result of mining a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MineOutcome {
    /// The header nonce now holds a solution.
    SolutionFound { nonce: u32, hash: RawDigest },
    /// No solution. With `exhausted` the whole nonce space was tried and
    /// another header field must change; otherwise the search was cut short
    /// and the header nonce holds the resume point.
    NoSolutionFound { exhausted: bool },
}

/// Drives a backend against a block.
pub struct Miner {
    backend: Box<dyn MinerBackend>,
}

impl Miner {
    pub fn new(backend: Box<dyn MinerBackend>) -> Self {
        Miner { backend }
    }

    /// Create a miner whose backend is looked up in the global registry.
    pub fn from_registry(name: &str) -> Result<Self, MinerError> {
        Ok(Miner::new(MinerRegistry::global()?.create_instance(name)?))
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Search for a nonce that makes the block header meet its target,
    /// starting at the header's current nonce.
    pub fn mine(&mut self, block: &mut Block, control: &SearchControl) -> MineOutcome {
        let prefix = block.header.prefix_state();
        let reversed_target = reverse_target(&block.header.target());
        let start = block.header.nonce;

        match self
            .backend
            .search(&prefix, &reversed_target, start, control)
        {
            SearchResult::Found {
                nonce,
                hash,
                hashes,
            } => {
                block.header.nonce = nonce;
                debug!(
                    backend = self.backend.name(),
                    nonce,
                    hashes,
                    hash = %hash_to_display_hex(&hash),
                    "solution found"
                );
                MineOutcome::SolutionFound { nonce, hash }
            }
            SearchResult::Exhausted { hashes } => {
                debug!(backend = self.backend.name(), hashes, "nonce space exhausted");
                MineOutcome::NoSolutionFound { exhausted: true }
            }
            SearchResult::Interrupted { next_nonce, hashes } => {
                block.header.nonce = next_nonce;
                debug!(backend = self.backend.name(), next_nonce, hashes, "search interrupted");
                MineOutcome::NoSolutionFound { exhausted: false }
            }
        }
    }
}

impl std::fmt::Debug for Miner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Miner")
            .field("backend", &self.backend.name())
            .finish()
    }
}

/// Single-threaded software backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct CpuMiner;

impl CpuMiner {
    pub const NAME: &'static str = "cpu";

    pub fn new() -> Self {
        CpuMiner
    }
}

impl MinerBackend for CpuMiner {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn search(
        &mut self,
        prefix: &Sha256,
        reversed_target: &[u8; 32],
        nonce_start: u32,
        control: &SearchControl,
    ) -> SearchResult {
        let mut nonce = nonce_start;
        let mut hashes = 0u64;
        let mut unreported = 0u32;

        loop {
            let mut state = prefix.clone();
            state.update(&nonce.to_le_bytes());
            let first = state.finalize().to_bytes();
            let hash = Sha256::hash(&first).to_bytes();
            hashes += 1;
            unreported += 1;

            if hash_meets_reversed_target(&hash, reversed_target) {
                control.record(unreported as u64);
                return SearchResult::Found {
                    nonce,
                    hash,
                    hashes,
                };
            }

            if nonce == u32::MAX {
                control.record(unreported as u64);
                return SearchResult::Exhausted { hashes };
            }
            nonce += 1;

            if unreported >= control.check_interval() {
                control.record(unreported as u64);
                unreported = 0;
                if control.should_stop() {
                    return SearchResult::Interrupted {
                        next_nonce: nonce,
                        hashes,
                    };
                }
            }
        }
    }
}
