#[cfg(feature = "metrics")]
use std::sync::atomic::{AtomicU64, Ordering};
#[cfg(feature = "metrics")]
use std::time::Instant;

/// Optional performance metrics for the job system.
#[cfg(feature = "metrics")]
#[derive(Debug)]
pub struct Metrics {
    /// Total jobs created.
    pub jobs_created: AtomicU64,
    /// Total jobs whose pending count hit zero and were enqueued.
    pub jobs_enqueued: AtomicU64,
    /// Total jobs executed to completion.
    pub jobs_executed: AtomicU64,
    /// Category signals raised on enqueue.
    pub signals_raised: AtomicU64,
    /// Time when metrics collection started.
    pub start_time: Instant,
}

#[cfg(feature = "metrics")]
impl Metrics {
    /// Creates a new metrics instance.
    pub fn new() -> Self {
        Self {
            jobs_created: AtomicU64::new(0),
            jobs_enqueued: AtomicU64::new(0),
            jobs_executed: AtomicU64::new(0),
            signals_raised: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Returns a snapshot of current metrics values.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            jobs_created: self.jobs_created.load(Ordering::Relaxed),
            jobs_enqueued: self.jobs_enqueued.load(Ordering::Relaxed),
            jobs_executed: self.jobs_executed.load(Ordering::Relaxed),
            signals_raised: self.signals_raised.load(Ordering::Relaxed),
            elapsed_seconds: self.start_time.elapsed().as_secs_f64(),
        }
    }
}

#[cfg(feature = "metrics")]
impl Default for Metrics {
    fn default() -> Self {
        Metrics::new()
    }
}

/// Snapshot of metrics at a point in time.
#[cfg(feature = "metrics")]
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub jobs_created: u64,
    pub jobs_enqueued: u64,
    pub jobs_executed: u64,
    pub signals_raised: u64,
    pub elapsed_seconds: f64,
}

#[cfg(feature = "metrics")]
impl MetricsSnapshot {
    /// Calculates jobs per second throughput.
    pub fn jobs_per_second(&self) -> f64 {
        if self.elapsed_seconds > 0.0 {
            self.jobs_executed as f64 / self.elapsed_seconds
        } else {
            0.0
        }
    }

    /// Jobs that have been enqueued but not yet executed.
    pub fn jobs_in_flight(&self) -> u64 {
        self.jobs_enqueued.saturating_sub(self.jobs_executed)
    }
}
