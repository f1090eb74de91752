//! Sampler counters
//!
//! Lock-free counters shared between the sampling thread and readers. The
//! same events are mirrored to the `metrics` facade for the exporter.

use std::sync::atomic::{AtomicU64, Ordering};

/// Sampler metrics
#[derive(Debug, Default)]
pub struct SamplerMetrics {
    /// Ticks executed
    pub ticks: AtomicU64,

    /// Successful reads pushed to a sample queue
    pub samples_recorded: AtomicU64,

    /// Failed reads (source returned nothing)
    pub read_failures: AtomicU64,

    /// Ticks that started after their deadline had already passed
    pub overruns: AtomicU64,

    /// Duration of the most recent tick (microseconds)
    pub last_tick_us: AtomicU64,
}

impl SamplerMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed tick
    pub fn record_tick(&self, recorded: u64, failed: u64, duration_us: u64) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
        self.samples_recorded.fetch_add(recorded, Ordering::Relaxed);
        self.read_failures.fetch_add(failed, Ordering::Relaxed);
        self.last_tick_us.store(duration_us, Ordering::Relaxed);
    }

    /// Record a missed deadline
    pub fn record_overrun(&self) {
        self.overruns.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            samples_recorded: self.samples_recorded.load(Ordering::Relaxed),
            read_failures: self.read_failures.load(Ordering::Relaxed),
            overruns: self.overruns.load(Ordering::Relaxed),
            last_tick_us: self.last_tick_us.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub ticks: u64,
    pub samples_recorded: u64,
    pub read_failures: u64,
    pub overruns: u64,
    pub last_tick_us: u64,
}

impl MetricsSnapshot {
    /// Fraction of reads that failed, 0.0 when nothing was read
    pub fn failure_rate(&self) -> f64 {
        let total = self.samples_recorded + self.read_failures;
        if total == 0 {
            0.0
        } else {
            self.read_failures as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_accumulates() {
        let metrics = SamplerMetrics::new();
        metrics.record_tick(9, 1, 40);
        metrics.record_tick(10, 0, 35);
        metrics.record_overrun();

        let snap = metrics.snapshot();
        assert_eq!(snap.ticks, 2);
        assert_eq!(snap.samples_recorded, 19);
        assert_eq!(snap.read_failures, 1);
        assert_eq!(snap.overruns, 1);
        assert_eq!(snap.last_tick_us, 35);
        assert!((snap.failure_rate() - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_failure_rate_empty() {
        assert_eq!(MetricsSnapshot::default().failure_rate(), 0.0);
    }
}
