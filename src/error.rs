use thiserror::Error;

use crate::display::TargetKind;

#[derive(Debug, Error)]
pub enum CompositorError {
    #[error("render loop is already running")]
    AlreadyRunning,

    #[error("no display surface attached")]
    NoDisplaySurface,

    #[error("render thread failed to initialize: {0}")]
    InitFailed(String),

    #[error("failed to spawn render thread: {0}")]
    ThreadSpawn(#[source] std::io::Error),

    #[error("render thread terminated unexpectedly")]
    RenderThreadDead,

    #[error("{0} target has no surface attached")]
    TargetDetached(TargetKind),

    /// Failure reported by a surface backend (context creation, draw, swap, readback).
    #[error("surface context error: {0}")]
    Context(String),

    #[error("filter index {index} out of range for a chain of {len}")]
    FilterIndexOutOfRange { index: usize, len: usize },

    #[error("limit of filters ({0}) exceeded")]
    FilterLimitExceeded(usize),

    #[error("filter is not part of the chain")]
    FilterNotFound,

    #[error("filter edit queue is full ({0} pending edits)")]
    FilterQueueFull(usize),

    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    #[error("invalid configuration: {0}")]
    Config(#[from] config::ConfigError),
}

impl CompositorError {
    pub fn context(message: impl Into<String>) -> Self {
        Self::Context(message.into())
    }
}

pub type CompositorResult<T> = Result<T, CompositorError>;
