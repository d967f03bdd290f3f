// Run metrics module
//
// Counters for one front-end session, logged on shutdown

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Session metrics
///
/// Uses atomic operations so the batch processor can record from any task
/// without taking a lock.
#[derive(Debug)]
pub struct Metrics {
    /// Files whose processor run exited with status 0
    pub files_succeeded: AtomicUsize,

    /// Files that failed at any pipeline stage
    pub files_failed: AtomicUsize,

    /// Files whose configs were written without running the processor
    pub files_configs_only: AtomicUsize,

    /// Paths refused at enqueue time
    pub files_rejected: AtomicUsize,

    /// Total processor wall time in milliseconds
    pub total_processor_time_ms: AtomicU64,

    /// Number of processor runs timed
    pub processor_runs: AtomicU64,

    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            files_succeeded: AtomicUsize::new(0),
            files_failed: AtomicUsize::new(0),
            files_configs_only: AtomicUsize::new(0),
            files_rejected: AtomicUsize::new(0),
            total_processor_time_ms: AtomicU64::new(0),
            processor_runs: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_succeeded(&self) {
        self.files_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.files_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_configs_only(&self) {
        self.files_configs_only.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self, count: usize) {
        self.files_rejected.fetch_add(count, Ordering::Relaxed);
    }

    /// Record the wall time of one processor run
    pub fn record_processor_time(&self, duration: Duration) {
        self.total_processor_time_ms
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
        self.processor_runs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn files_succeeded(&self) -> usize {
        self.files_succeeded.load(Ordering::Relaxed)
    }

    pub fn files_failed(&self) -> usize {
        self.files_failed.load(Ordering::Relaxed)
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Average processor time per run in milliseconds
    pub fn avg_processor_time_ms(&self) -> f64 {
        let total = self.total_processor_time_ms.load(Ordering::Relaxed);
        let runs = self.processor_runs.load(Ordering::Relaxed);
        if runs > 0 {
            total as f64 / runs as f64
        } else {
            0.0
        }
    }

    /// Log metrics summary
    pub fn log_summary(&self) {
        tracing::info!("=== Session Summary ===");
        tracing::info!("Uptime: {:.2}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Files: {} succeeded, {} configs only, {} failed, {} rejected",
            self.files_succeeded(),
            self.files_configs_only.load(Ordering::Relaxed),
            self.files_failed(),
            self.files_rejected.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Processor time: {:.2}s (avg: {:.2}ms per run)",
            self.total_processor_time_ms.load(Ordering::Relaxed) as f64 / 1000.0,
            self.avg_processor_time_ms()
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
