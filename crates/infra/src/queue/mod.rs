//! Command queue: ordered hand-off from producers to the single worker loop.
//!
//! The queue is a pure transport. It knows nothing about job state; callers
//! create the job record before enqueueing and the worker updates it after
//! dequeueing.

pub mod memory;

use std::num::NonZeroUsize;

use async_trait::async_trait;
use jobline_core::Command;
use tokio_util::sync::CancellationToken;

pub use memory::InMemoryCommandQueue;

/// Queue capacity and backpressure policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueueCapacity {
    /// No limit. Enqueue always succeeds.
    #[default]
    Unbounded,
    /// At most `n` queued commands; enqueue beyond that is rejected with
    /// [`QueueError::Full`].
    Bounded(NonZeroUsize),
}

impl QueueCapacity {
    /// `0` means unbounded.
    pub fn from_limit(limit: usize) -> Self {
        match NonZeroUsize::new(limit) {
            Some(n) => QueueCapacity::Bounded(n),
            None => QueueCapacity::Unbounded,
        }
    }
}

/// Queue error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    /// Bounded queue is at capacity; the command was not accepted.
    #[error("command queue is full (capacity {capacity})")]
    Full { capacity: usize },
    /// The shutdown signal fired while waiting; nothing was consumed.
    #[error("dequeue cancelled by shutdown")]
    Cancelled,
    /// Every producer handle is gone and the queue is drained.
    #[error("command queue closed")]
    Closed,
}

/// FIFO command queue with many producers and one consumer.
#[async_trait]
pub trait CommandQueue: Send + Sync {
    /// Append to the tail. Never blocks.
    fn enqueue(&self, command: Command) -> Result<(), QueueError>;

    /// Remove and return the head, waiting while the queue is empty.
    ///
    /// Returns [`QueueError::Cancelled`] without consuming anything once
    /// `shutdown` is cancelled, including when it already was on entry.
    async fn dequeue(&self, shutdown: &CancellationToken) -> Result<Command, QueueError>;

    /// Number of commands waiting.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
