//! Process-wide atomic counters for OIV observability.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single `tracing::info!`
//! event (e.g. on a reporting tick).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Relaxed atomic counters, no locking.
pub struct Metrics {
    measurements_recorded: AtomicU64,
    measurements_evicted: AtomicU64,
    divergences_emitted: AtomicU64,
    code_scans: AtomicU64,
    slop_tests: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            measurements_recorded: AtomicU64::new(0),
            measurements_evicted: AtomicU64::new(0),
            divergences_emitted: AtomicU64::new(0),
            code_scans: AtomicU64::new(0),
            slop_tests: AtomicU64::new(0),
        }
    }

    pub fn inc_measurements_recorded(&self) {
        self.measurements_recorded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_measurements_evicted(&self, n: u64) {
        self.measurements_evicted.fetch_add(n, Ordering::Relaxed);
    }

    pub fn inc_divergences_emitted(&self) {
        self.divergences_emitted.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "divergences_emitted", "counter incremented");
    }

    pub fn inc_code_scans(&self) {
        self.code_scans.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_slop_tests(&self) {
        self.slop_tests.fetch_add(1, Ordering::Relaxed);
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            measurements_recorded = self.measurements_recorded(),
            measurements_evicted = self.measurements_evicted(),
            divergences_emitted = self.divergences_emitted(),
            code_scans = self.code_scans(),
            slop_tests = self.slop_tests(),
        );
    }

    pub fn measurements_recorded(&self) -> u64 {
        self.measurements_recorded.load(Ordering::Relaxed)
    }

    pub fn measurements_evicted(&self) -> u64 {
        self.measurements_evicted.load(Ordering::Relaxed)
    }

    pub fn divergences_emitted(&self) -> u64 {
        self.divergences_emitted.load(Ordering::Relaxed)
    }

    pub fn code_scans(&self) -> u64 {
        self.code_scans.load(Ordering::Relaxed)
    }

    pub fn slop_tests(&self) -> u64 {
        self.slop_tests.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.measurements_recorded.store(0, Ordering::Relaxed);
        self.measurements_evicted.store(0, Ordering::Relaxed);
        self.divergences_emitted.store(0, Ordering::Relaxed);
        self.code_scans.store(0, Ordering::Relaxed);
        self.slop_tests.store(0, Ordering::Relaxed);
    }
}
