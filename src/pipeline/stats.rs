use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters updated by the render thread. Read from any thread via
/// [`LoopStats::snapshot`].
#[derive(Debug, Default)]
pub struct LoopStats {
    /// Loop iterations, drawing or not.
    pub iterations: AtomicU64,
    /// Iterations that ran the composite pass.
    pub composites: AtomicU64,
    pub display_draws: AtomicU64,
    pub encoder_draws: AtomicU64,
    /// Encoder draws withheld by the frame-rate limiter.
    pub encoder_skipped: AtomicU64,
    pub photos_captured: AtomicU64,
    pub photos_superseded: AtomicU64,
    pub edits_applied: AtomicU64,
    /// Edits that were dequeued but could not be applied.
    pub edits_failed: AtomicU64,
}

impl LoopStats {
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> LoopStatsSnapshot {
        LoopStatsSnapshot {
            iterations: self.iterations.load(Ordering::Relaxed),
            composites: self.composites.load(Ordering::Relaxed),
            display_draws: self.display_draws.load(Ordering::Relaxed),
            encoder_draws: self.encoder_draws.load(Ordering::Relaxed),
            encoder_skipped: self.encoder_skipped.load(Ordering::Relaxed),
            photos_captured: self.photos_captured.load(Ordering::Relaxed),
            photos_superseded: self.photos_superseded.load(Ordering::Relaxed),
            edits_applied: self.edits_applied.load(Ordering::Relaxed),
            edits_failed: self.edits_failed.load(Ordering::Relaxed),
            ..LoopStatsSnapshot::default()
        }
    }
}

/// A point-in-time copy of loop statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStatsSnapshot {
    pub iterations: u64,
    pub composites: u64,
    pub display_draws: u64,
    pub encoder_draws: u64,
    pub encoder_skipped: u64,
    pub photos_captured: u64,
    pub photos_superseded: u64,
    pub edits_applied: u64,
    pub edits_failed: u64,
    /// Filter edit queue counters.
    pub edits_enqueued: u64,
    pub edits_dropped: u64,
    pub edits_rejected: u64,
}
