//! Latest-wins frame slot shared between a producer and the render thread

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use tracing::trace;

use super::frame::Frame;

/// Invoked on the producer's thread every time a frame is published.
pub type FrameListener = Box<dyn Fn() + Send + Sync>;

/// Single-slot frame handoff.
///
/// Producers call [`FrameSource::publish`] from any thread; each publish
/// overwrites the previous frame whether or not it was consumed, then raises
/// the "frame available" notification through the attached listener.
#[derive(Default)]
pub struct FrameSource {
    latest: ArcSwapOption<Frame>,
    listener: ArcSwapOption<FrameListener>,
    sequence: AtomicU64,
    pending: AtomicBool,
    overwritten: AtomicU64,
}

impl FrameSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current frame and notify the listener.
    pub fn publish(&self, mut frame: Frame) -> u64 {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        Arc::make_mut(&mut frame.meta).sequence = sequence;
        self.latest.store(Some(Arc::new(frame)));

        if self.pending.swap(true, Ordering::AcqRel) {
            self.overwritten.fetch_add(1, Ordering::Relaxed);
            trace!(sequence, "frame overwritten before it was rendered");
        }

        if let Some(listener) = self.listener.load().as_ref() {
            listener();
        }
        sequence
    }

    /// Take the most recent frame for rendering.
    pub fn acquire_latest(&self) -> Option<Arc<Frame>> {
        self.pending.store(false, Ordering::Release);
        self.latest.load_full()
    }

    pub fn set_listener(&self, listener: Option<FrameListener>) {
        self.listener.store(listener.map(Arc::new));
    }

    /// Sequence number of the last published frame, 0 if none.
    pub fn last_sequence(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }

    /// Frames replaced in the slot before the render thread picked them up.
    pub fn overwritten(&self) -> u64 {
        self.overwritten.load(Ordering::Relaxed)
    }
}
