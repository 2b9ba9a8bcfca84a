//! Global atomic counters for span-evals observability.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. before process exit).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters, no allocations and no locking.
pub struct Metrics {
    runs_completed: AtomicU64,
    runs_failed: AtomicU64,
    annotations_delivered: AtomicU64,
    annotations_fallback: AtomicU64,
    annotations_dropped: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            runs_completed: AtomicU64::new(0),
            runs_failed: AtomicU64::new(0),
            annotations_delivered: AtomicU64::new(0),
            annotations_fallback: AtomicU64::new(0),
            annotations_dropped: AtomicU64::new(0),
        }
    }

    pub fn inc_runs_completed(&self) {
        self.runs_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_runs_failed(&self) {
        self.runs_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_annotations_delivered(&self) {
        self.annotations_delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_annotations_fallback(&self) {
        self.annotations_fallback.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_annotations_dropped(&self) {
        self.annotations_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            runs_completed = self.runs_completed(),
            runs_failed = self.runs_failed(),
            annotations_delivered = self.annotations_delivered(),
            annotations_fallback = self.annotations_fallback(),
            annotations_dropped = self.annotations_dropped(),
        );
    }

    pub fn runs_completed(&self) -> u64 {
        self.runs_completed.load(Ordering::Relaxed)
    }

    pub fn runs_failed(&self) -> u64 {
        self.runs_failed.load(Ordering::Relaxed)
    }

    pub fn annotations_delivered(&self) -> u64 {
        self.annotations_delivered.load(Ordering::Relaxed)
    }

    pub fn annotations_fallback(&self) -> u64 {
        self.annotations_fallback.load(Ordering::Relaxed)
    }

    pub fn annotations_dropped(&self) -> u64 {
        self.annotations_dropped.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        self.runs_completed.store(0, Ordering::Relaxed);
        self.runs_failed.store(0, Ordering::Relaxed);
        self.annotations_delivered.store(0, Ordering::Relaxed);
        self.annotations_fallback.store(0, Ordering::Relaxed);
        self.annotations_dropped.store(0, Ordering::Relaxed);
    }
}
