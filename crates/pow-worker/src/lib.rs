//! Mining workers: fetch block templates from a node, mine them with a
//! `pow-core` backend and submit solutions.
//!
//! This crate provides:
//! - Settings loaded from JSON with defaults per network
//! - JSON-RPC envelopes over a caller-supplied transport
//! - The per-worker fetch, mine and submit loop
//! - A runner for several workers sharing one hash counter

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use pow_core::{Miner, MinerRegistry};
use tracing::info;

pub mod config;
pub mod error;
pub mod rpc;
pub mod stats;
pub mod worker;

pub use config::Settings;
pub use error::{Result, WorkerError};
pub use rpc::{RpcClient, SolutionSubmitter, SubmitOutcome, TemplateProvider, Transport};
pub use stats::{format_hash_rate, HashRate, MiningStats};
pub use worker::{CycleOutcome, Worker, WorkerConfig, WorkerSummary, MAX_WORKERS};

/// Granularity of the reporter's stop checks.
const REPORT_POLL: Duration = Duration::from_millis(50);

/// Outcome of [`run_workers`].
#[derive(Debug)]
pub struct RunSummary {
    /// One entry per worker, in worker order.
    pub workers: Vec<Result<WorkerSummary>>,
    pub stats: MiningStats,
}

/// Run `settings.workers` workers on scoped threads until `stop` is set or
/// every worker has given up.
///
/// `connect` builds the node connection for each worker id from the
/// settings, typically a [`RpcClient`] whose transport posts to
/// [`Settings::rpc_url`] with `rpc_user` and `rpc_password`. Backends come
/// from the installed global [`MinerRegistry`]; an unknown `miner_type` or a
/// bad payout address fails before any thread starts.
pub fn run_workers<N, F>(settings: &Settings, connect: F, stop: Arc<AtomicBool>) -> Result<RunSummary>
where
    N: TemplateProvider + SolutionSubmitter + Send,
    F: Fn(usize, &Settings) -> N,
{
    settings.validate()?;
    let payout = settings.payout()?;
    let registry = MinerRegistry::global()?;
    let miners = (0..settings.workers)
        .map(|_| registry.create_instance(&settings.miner_type).map(Miner::new))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    info!(
        workers = settings.workers,
        miner_type = %settings.miner_type,
        network = %settings.network,
        payout = %payout.display,
        "starting workers"
    );

    let hash_rate = HashRate::new();
    let config = WorkerConfig::from(settings);
    let finished = AtomicBool::new(false);

    let workers = thread::scope(|scope| {
        let handles: Vec<_> = miners
            .into_iter()
            .enumerate()
            .map(|(id, miner)| {
                let mut worker = Worker::new(
                    id,
                    connect(id, settings),
                    miner,
                    payout.pubkey_hash,
                    config,
                    hash_rate.clone(),
                    Arc::clone(&stop),
                );
                scope.spawn(move || worker.run())
            })
            .collect();

        scope.spawn(|| report(&hash_rate, settings.report_interval(), &finished, &stop));

        let results: Vec<_> = handles
            .into_iter()
            .enumerate()
            .map(|(id, handle)| handle.join().unwrap_or_else(|_| Err(WorkerError::Panicked(id))))
            .collect();
        finished.store(true, Ordering::Relaxed);
        results
    });

    let stats = hash_rate.snapshot();
    info!(
        total_hashes = stats.total_hashes,
        rate = %stats.format_hash_rate(),
        "workers finished"
    );
    Ok(RunSummary { workers, stats })
}

/// Log the shared hash rate every `interval` until the workers finish.
fn report(hash_rate: &HashRate, interval: Duration, finished: &AtomicBool, stop: &AtomicBool) {
    let mut last = Instant::now();
    while !finished.load(Ordering::Relaxed) && !stop.load(Ordering::Relaxed) {
        thread::sleep(REPORT_POLL);
        if !interval.is_zero() && last.elapsed() >= interval {
            let stats = hash_rate.snapshot();
            info!(
                total_hashes = stats.total_hashes,
                rate = %stats.format_hash_rate(),
                "hash rate"
            );
            last = Instant::now();
        }
    }
}
