use std::sync::atomic::{AtomicU64, Ordering};

/// Pipeline-wide runtime counters.
///
/// All counters use `Relaxed` ordering — they are independent observations;
/// no cross-variable synchronisation is required.
///
/// Share via `Arc<Metrics>`; cloning the `Arc` is the intended usage.
#[derive(Default)]
pub struct Metrics {
    /// Completed pipeline runs that produced a transcript (possibly partial).
    pub runs_completed: AtomicU64,

    /// Runs that ended in a pipeline-level failure (structural error, total
    /// segment failure, or cancellation).
    pub runs_failed: AtomicU64,

    /// Segments handed to the remote endpoint since startup.
    pub segments_attempted: AtomicU64,

    /// Segments whose call returned usable text.
    pub segments_succeeded: AtomicU64,

    /// Segments whose call failed (remote error or empty result).
    pub segments_failed: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Convenience increment methods ──────────────────────────────────────────

    pub fn inc_runs_completed(&self) {
        self.runs_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_runs_failed(&self) {
        self.runs_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_segments_attempted(&self) {
        self.segments_attempted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_segments_succeeded(&self) {
        self.segments_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_segments_failed(&self) {
        self.segments_failed.fetch_add(1, Ordering::Relaxed);
    }

    // ── Snapshot ───────────────────────────────────────────────────────────────

    /// Point-in-time snapshot of all counters. Because reads are `Relaxed`,
    /// the snapshot is approximate but sufficient for observability.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            runs_completed:     self.runs_completed.load(Ordering::Relaxed),
            runs_failed:        self.runs_failed.load(Ordering::Relaxed),
            segments_attempted: self.segments_attempted.load(Ordering::Relaxed),
            segments_succeeded: self.segments_succeeded.load(Ordering::Relaxed),
            segments_failed:    self.segments_failed.load(Ordering::Relaxed),
        }
    }

    /// Log a summary of all counters via `tracing`.
    pub fn log_summary(&self) {
        let s = self.snapshot();
        tracing::info!(
            runs_completed     = s.runs_completed,
            runs_failed        = s.runs_failed,
            segments_attempted = s.segments_attempted,
            segments_succeeded = s.segments_succeeded,
            segments_failed    = s.segments_failed,
            "📊 metrics summary"
        );
    }
}

/// A point-in-time snapshot of [`Metrics`] counters.
#[derive(Debug, Clone, Copy)]
pub struct MetricsSnapshot {
    pub runs_completed:     u64,
    pub runs_failed:        u64,
    pub segments_attempted: u64,
    pub segments_succeeded: u64,
    pub segments_failed:    u64,
}
