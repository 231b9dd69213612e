//! The fetch, mine and submit cycle run by each worker thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use pow_core::difficulty::{bits_to_difficulty, format_difficulty};
use pow_core::{hash_to_display_hex, Block, MineOutcome, Miner, PubKeyHash, SearchControl};
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::error::{Result, WorkerError};
use crate::rpc::{SolutionSubmitter, SubmitOutcome, TemplateProvider};
use crate::stats::HashRate;

/// Workers beyond this count would share extranonce ranges.
pub const MAX_WORKERS: usize = 256;

const EXTRA_NONCE_WORKER_SHIFT: u32 = 24;
const EXTRA_NONCE_ROLL_MASK: u32 = (1 << EXTRA_NONCE_WORKER_SHIFT) - 1;

/// Extranonce for the `roll`th exhaustion of worker `id`'s nonce space.
///
/// The top byte is the worker id and the low 24 bits the roll count, so
/// `None` once either runs out of its field.
fn worker_extra_nonce(id: usize, roll: u32) -> Option<u32> {
    if id >= MAX_WORKERS || roll > EXTRA_NONCE_ROLL_MASK {
        return None;
    }
    Some(((id as u32) << EXTRA_NONCE_WORKER_SHIFT) | roll)
}

/// Per-worker limits, usually taken from [`Settings`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerConfig {
    pub search_budget: Duration,
    pub max_consecutive_failures: u32,
    pub retry_delay: Duration,
}

impl From<&Settings> for WorkerConfig {
    fn from(settings: &Settings) -> Self {
        WorkerConfig {
            search_budget: settings.search_budget(),
            max_consecutive_failures: settings.max_consecutive_failures,
            retry_delay: settings.retry_delay(),
        }
    }
}

/// Result of one mining cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A block was found and submitted.
    Submitted { hash: String, outcome: SubmitOutcome },
    /// The search budget ran out or a stop was requested.
    Expired,
}

/// Counters for a finished worker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerSummary {
    pub cycles: u64,
    pub accepted: u32,
    pub rejected: u32,
}

/// Mines blocks built from templates fetched from `node`.
pub struct Worker<N> {
    id: usize,
    node: N,
    miner: Miner,
    payout: PubKeyHash,
    config: WorkerConfig,
    hash_rate: HashRate,
    stop: Arc<AtomicBool>,
}

impl<N: TemplateProvider + SolutionSubmitter> Worker<N> {
    pub fn new(
        id: usize,
        node: N,
        miner: Miner,
        payout: PubKeyHash,
        config: WorkerConfig,
        hash_rate: HashRate,
        stop: Arc<AtomicBool>,
    ) -> Self {
        Worker {
            id,
            node,
            miner,
            payout,
            config,
            hash_rate,
            stop,
        }
    }

    /// Fetch a template, mine it and submit any solution.
    ///
    /// Worker `id` owns the extranonces `id << 24` through
    /// `id << 24 | 0xffffff`, so parallel workers search disjoint headers.
    /// When the nonce space runs out the extranonce is rolled within that
    /// range and the search continues on the same template until the budget
    /// expires or the range is used up.
    pub fn run_once(&mut self) -> Result<CycleOutcome> {
        let mut roll = 0u32;
        let extra_nonce = worker_extra_nonce(self.id, roll).ok_or_else(|| {
            WorkerError::Config(format!("worker id {} exceeds {} workers", self.id, MAX_WORKERS))
        })?;

        let template = self.node.block_template()?;
        let mut block = Block::from_template(&template, &self.payout)?;
        info!(
            worker = self.id,
            height = template.height,
            bits = %template.bits,
            difficulty = %format_difficulty(bits_to_difficulty(block.header.bits)),
            transactions = block.transactions().len(),
            "mining new template"
        );

        let control = SearchControl::new()
            .with_budget(self.config.search_budget)
            .with_hash_counter(self.hash_rate.counter())
            .with_stop_flag(Arc::clone(&self.stop));

        block.set_extra_nonce(extra_nonce)?;
        loop {
            match self.miner.mine(&mut block, &control) {
                MineOutcome::SolutionFound { hash, .. } => {
                    let hash = hash_to_display_hex(&hash);
                    info!(worker = self.id, height = template.height, %hash, "block found");

                    let outcome = self.submit(&block.to_hex())?;
                    match &outcome {
                        SubmitOutcome::Accepted => info!(worker = self.id, %hash, "block accepted"),
                        SubmitOutcome::Rejected(reason) => {
                            warn!(worker = self.id, %hash, %reason, "block rejected")
                        }
                    }
                    return Ok(CycleOutcome::Submitted { hash, outcome });
                }
                MineOutcome::NoSolutionFound { exhausted: true } => {
                    roll += 1;
                    let Some(extra_nonce) = worker_extra_nonce(self.id, roll) else {
                        debug!(worker = self.id, "extranonce range used up");
                        return Ok(CycleOutcome::Expired);
                    };
                    block.set_extra_nonce(extra_nonce)?;
                    debug!(worker = self.id, extra_nonce, "rolled extranonce");
                }
                MineOutcome::NoSolutionFound { exhausted: false } => {
                    debug!(worker = self.id, "search budget expired");
                    return Ok(CycleOutcome::Expired);
                }
            }
        }
    }

    /// Submit a solved block, retrying failed calls up to
    /// `max_consecutive_failures` times in total.
    fn submit(&self, block_hex: &str) -> Result<SubmitOutcome> {
        let mut attempt = 1u32;
        loop {
            match self.node.submit_block(block_hex) {
                Ok(outcome) => return Ok(outcome),
                Err(err) if attempt < self.config.max_consecutive_failures => {
                    warn!(worker = self.id, attempt, error = %err, "block submission failed");
                    attempt += 1;
                    thread::sleep(self.config.retry_delay);
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Run cycles until the stop flag is set.
    ///
    /// Fails with [`WorkerError::TooManyFailures`] once
    /// `max_consecutive_failures` cycles in a row have failed.
    pub fn run(&mut self) -> Result<WorkerSummary> {
        let mut summary = WorkerSummary::default();
        let mut failures = 0u32;

        while !self.stop.load(Ordering::Relaxed) {
            match self.run_once() {
                Ok(outcome) => {
                    failures = 0;
                    summary.cycles += 1;
                    match outcome {
                        CycleOutcome::Submitted {
                            outcome: SubmitOutcome::Accepted,
                            ..
                        } => summary.accepted += 1,
                        CycleOutcome::Submitted {
                            outcome: SubmitOutcome::Rejected(_),
                            ..
                        } => summary.rejected += 1,
                        CycleOutcome::Expired => {}
                    }
                }
                Err(err) => {
                    failures += 1;
                    warn!(worker = self.id, failures, error = %err, "mining cycle failed");
                    if failures >= self.config.max_consecutive_failures {
                        return Err(WorkerError::TooManyFailures(failures));
                    }
                    thread::sleep(self.config.retry_delay);
                }
            }
        }

        info!(
            worker = self.id,
            cycles = summary.cycles,
            accepted = summary.accepted,
            rejected = summary.rejected,
            "worker stopped"
        );
        Ok(summary)
    }
}
