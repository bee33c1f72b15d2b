//! Encoder-path frame pacing

use std::time::{Duration, Instant};

/// Grid-aligned frame-rate gate.
///
/// Time since `epoch` is cut into slots of one interval; at most one draw is
/// accepted per slot. A stalled loop resumes on the current slot instead of
/// bursting to catch up.
#[derive(Debug, Clone)]
pub struct FpsLimiter {
    fps: u32,
    interval: Option<Duration>,
    epoch: Instant,
    next_due: Duration,
    iteration_start: Instant,
}

impl FpsLimiter {
    /// `fps == 0` disables limiting.
    pub fn new(fps: u32, now: Instant) -> Self {
        Self {
            fps,
            interval: interval_for(fps),
            epoch: now,
            next_due: Duration::ZERO,
            iteration_start: now,
        }
    }

    pub fn set_fps(&mut self, fps: u32, now: Instant) {
        *self = Self::new(fps, now);
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    pub fn is_limited(&self) -> bool {
        self.interval.is_some()
    }

    pub fn mark_iteration_start(&mut self, now: Instant) {
        self.iteration_start = now;
    }

    /// `true` when drawing at `now` would exceed the configured rate.
    pub fn should_skip(&mut self, now: Instant) -> bool {
        let Some(interval) = self.interval else {
            return false;
        };
        let elapsed = now.saturating_duration_since(self.epoch);
        if elapsed < self.next_due {
            return true;
        }

        let interval_ns = interval.as_nanos();
        let slot = elapsed.as_nanos() / interval_ns;
        self.next_due = Duration::from_nanos(((slot + 1) * interval_ns) as u64);
        false
    }

    /// Time left in this iteration's interval, zero when unlimited or late.
    pub fn remaining_sleep(&self, now: Instant) -> Duration {
        self.interval
            .map(|interval| interval.saturating_sub(now.saturating_duration_since(self.iteration_start)))
            .unwrap_or(Duration::ZERO)
    }
}

fn interval_for(fps: u32) -> Option<Duration> {
    (fps > 0).then(|| Duration::from_nanos(1_000_000_000 / fps as u64))
}
