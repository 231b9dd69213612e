//! Shared hash counting and rate reporting.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Hash counter shared by every worker. Reads are lock-free and may lag the
/// workers by up to one check interval.
#[derive(Debug, Clone)]
pub struct HashRate {
    total: Arc<AtomicU64>,
    started: Instant,
}

impl Default for HashRate {
    fn default() -> Self {
        Self::new()
    }
}

impl HashRate {
    pub fn new() -> Self {
        HashRate {
            total: Arc::new(AtomicU64::new(0)),
            started: Instant::now(),
        }
    }

    /// The counter handed to searches.
    pub fn counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.total)
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    /// Snapshot of the totals since creation.
    pub fn snapshot(&self) -> MiningStats {
        let mut stats = MiningStats {
            total_hashes: self.total(),
            elapsed: self.started.elapsed(),
            hash_rate: 0.0,
        };
        stats.update_hash_rate();
        stats
    }
}

/// Mining statistics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MiningStats {
    /// Total hashes computed.
    pub total_hashes: u64,
    /// Time covered by `total_hashes`.
    pub elapsed: Duration,
    /// Hashes per second.
    pub hash_rate: f64,
}

impl MiningStats {
    /// Update hash rate based on elapsed time.
    pub fn update_hash_rate(&mut self) {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.hash_rate = self.total_hashes as f64 / secs;
        }
    }

    /// Format hash rate for display.
    pub fn format_hash_rate(&self) -> String {
        format_hash_rate(self.hash_rate)
    }
}

/// Format a hash rate for display, e.g. "1.50 MH/s".
pub fn format_hash_rate(rate: f64) -> String {
    if rate >= 1_000_000_000.0 {
        format!("{:.2} GH/s", rate / 1_000_000_000.0)
    } else if rate >= 1_000_000.0 {
        format!("{:.2} MH/s", rate / 1_000_000.0)
    } else if rate >= 1_000.0 {
        format!("{:.2} KH/s", rate / 1_000.0)
    } else {
        format!("{:.2} H/s", rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_hash_rate() {
        assert_eq!(format_hash_rate(0.0), "0.00 H/s");
        assert_eq!(format_hash_rate(999.0), "999.00 H/s");
        assert_eq!(format_hash_rate(1_500.0), "1.50 KH/s");
        assert_eq!(format_hash_rate(2_250_000.0), "2.25 MH/s");
        assert_eq!(format_hash_rate(3_000_000_000.0), "3.00 GH/s");
    }

    #[test]
    fn test_update_hash_rate() {
        let mut stats = MiningStats {
            total_hashes: 5_000,
            elapsed: Duration::from_secs(2),
            hash_rate: 0.0,
        };
        stats.update_hash_rate();
        assert_eq!(stats.hash_rate, 2_500.0);
        assert_eq!(stats.format_hash_rate(), "2.50 KH/s");

        let mut idle = MiningStats::default();
        idle.update_hash_rate();
        assert_eq!(idle.hash_rate, 0.0);
    }

    #[test]
    fn test_shared_counter() {
        let rate = HashRate::new();
        let counter = rate.counter();
        counter.fetch_add(10, Ordering::Relaxed);
        rate.clone().counter().fetch_add(5, Ordering::Relaxed);
        assert_eq!(rate.total(), 15);
        assert_eq!(rate.snapshot().total_hashes, 15);
    }
}
