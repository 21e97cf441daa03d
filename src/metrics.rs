// Operation metrics
//
// Lightweight counters for monitoring store activity

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Store operation metrics
///
/// Uses atomic operations for thread-safe tracking without locks. Counters
/// accumulate over the store's lifetime and can be logged periodically or on
/// shutdown.
#[derive(Debug)]
pub struct Metrics {
    /// Number of whole-section write operations
    pub section_writes: AtomicU64,

    /// Number of single-key write operations
    pub key_writes: AtomicU64,

    /// Number of default-template merges
    pub merges: AtomicU64,

    /// Number of successful mirror refreshes
    pub refreshes: AtomicU64,

    /// Number of refreshes that failed and left the mirror untouched
    pub refresh_failures: AtomicU64,

    /// Number of change events broadcast to subscribers
    pub change_broadcasts: AtomicU64,

    /// Number of broadcasts sent with no subscriber listening
    pub broadcasts_missed: AtomicU64,

    /// Store creation time
    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            section_writes: AtomicU64::new(0),
            key_writes: AtomicU64::new(0),
            merges: AtomicU64::new(0),
            refreshes: AtomicU64::new(0),
            refresh_failures: AtomicU64::new(0),
            change_broadcasts: AtomicU64::new(0),
            broadcasts_missed: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_section_write(&self) {
        self.section_writes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_key_write(&self) {
        self.key_writes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_merge(&self) {
        self.merges.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_refresh(&self) {
        self.refreshes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_refresh_failure(&self) {
        self.refresh_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_change_broadcast(&self) {
        self.change_broadcasts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_broadcast_missed(&self) {
        self.broadcasts_missed.fetch_add(1, Ordering::Relaxed);
    }

    /// Time since the store was created
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Log metrics summary
    pub fn log_summary(&self) {
        tracing::info!("=== Config Store Metrics Summary ===");
        tracing::info!("Uptime: {:.2}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Writes: {} section, {} key, {} merges",
            self.section_writes.load(Ordering::Relaxed),
            self.key_writes.load(Ordering::Relaxed),
            self.merges.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Refreshes: {} ok, {} failed",
            self.refreshes.load(Ordering::Relaxed),
            self.refresh_failures.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Broadcasts: {} sent, {} unheard",
            self.change_broadcasts.load(Ordering::Relaxed),
            self.broadcasts_missed.load(Ordering::Relaxed)
        );
    }

    /// Log periodic metrics (for long-running hosts)
    pub fn log_periodic(&self) {
        tracing::info!(
            "Metrics: {} writes, {} refreshes, {} broadcasts, uptime {:.0}s",
            self.section_writes.load(Ordering::Relaxed) + self.key_writes.load(Ordering::Relaxed),
            self.refreshes.load(Ordering::Relaxed),
            self.change_broadcasts.load(Ordering::Relaxed),
            self.uptime().as_secs_f64()
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
