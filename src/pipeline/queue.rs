//! Lock-free FIFO of pending filter edits

use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam::queue::ArrayQueue;
use crossbeam::utils::CachePadded;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::filter::FilterEdit;
use crate::error::{CompositorError, CompositorResult};

/// What `enqueue` does when the queue is at capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Refuse the new edit with `FilterQueueFull`.
    #[default]
    Reject,
    /// Evict the oldest pending edit to make room.
    DropOldest,
}

/// Bounded MPSC edit queue. Any thread enqueues, the render thread drains
/// one edit per iteration.
pub struct FilterQueue {
    ring: ArrayQueue<FilterEdit>,
    policy: OverflowPolicy,

    /// Statistics
    stats: CachePadded<Stats>,
}

#[derive(Default)]
struct Stats {
    enqueued: AtomicUsize,
    dequeued: AtomicUsize,
    dropped: AtomicUsize,
    rejected: AtomicUsize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub enqueued: usize,
    pub dequeued: usize,
    pub dropped: usize,
    pub rejected: usize,
}

impl FilterQueue {
    pub fn new(capacity: usize, policy: OverflowPolicy) -> Self {
        Self {
            ring: ArrayQueue::new(capacity.max(1)),
            policy,
            stats: CachePadded::new(Stats::default()),
        }
    }

    /// Producer: never blocks.
    pub fn enqueue(&self, edit: FilterEdit) -> CompositorResult<()> {
        match self.policy {
            OverflowPolicy::Reject => {
                if let Err(edit) = self.ring.push(edit) {
                    self.stats.rejected.fetch_add(1, Ordering::Relaxed);
                    warn!(action = ?edit.action(), "filter queue full, edit rejected");
                    return Err(CompositorError::FilterQueueFull(self.ring.capacity()));
                }
            }
            OverflowPolicy::DropOldest => {
                if let Some(evicted) = self.ring.force_push(edit) {
                    self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                    warn!(action = ?evicted.action(), "filter queue full, oldest edit dropped");
                }
            }
        }
        self.stats.enqueued.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Consumer: oldest pending edit, if any.
    pub fn dequeue_one(&self) -> Option<FilterEdit> {
        let edit = self.ring.pop()?;
        self.stats.dequeued.fetch_add(1, Ordering::Relaxed);
        Some(edit)
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    #[cfg(test)]
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            enqueued: self.stats.enqueued.load(Ordering::Relaxed),
            dequeued: self.stats.dequeued.load(Ordering::Relaxed),
            dropped: self.stats.dropped.load(Ordering::Relaxed),
            rejected: self.stats.rejected.load(Ordering::Relaxed),
        }
    }
}
