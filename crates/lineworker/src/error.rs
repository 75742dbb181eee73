//! Error types for line-driven work queues.
//!
//! This module defines the central `Error` enum, which captures every
//! condition that can end a run or reject a call.
//!
//! ## Error Cases
//! - `Source`: The byte source reported a terminal failure.
//! - `InvalidArgument`: A call-time argument was rejected.
//! - `InvalidConfig`: A [`crate::LineWorkerConfig`] failed validation.
//! - `SafetyLimitExceeded`: The fill loop's iteration guard tripped.
//! - `Worker`: A task reported failure (or panicked).
//! - `ChannelError`: A source sender found its receiving half gone.
//! - `Interrupted`: The run was stopped through its shutdown token.

use std::sync::Arc;

pub type Result<T> = core::result::Result<T, Error>;

/// Boxed error returned by worker futures.
pub type BoxError = Box<dyn core::error::Error + Send + Sync>;

/// Shared form of a worker failure, cheap to clone into events and results.
pub type WorkerError = Arc<dyn core::error::Error + Send + Sync>;

/// Unified error type for line buffers, task queues and orchestrators.
#[derive(Clone, thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The byte source failed. No further lines are pulled.
    #[error("Source error: {0}")]
    Source(Arc<std::io::Error>),

    /// A call-time argument was invalid. No state was changed.
    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    /// The configuration was rejected at construction.
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// A single fill pass iterated more than `limit` times.
    #[error("Hit safety limit of {limit} iterations; aborting")]
    SafetyLimitExceeded { limit: usize },

    /// A task failed and the run was configured to halt on worker errors.
    #[error("Worker error: {0}")]
    Worker(WorkerError),

    /// Internal channel send failure.
    #[error("Channel error: {context}")]
    ChannelError { context: String },

    /// The run's shutdown token was cancelled before the source drained.
    #[error("Run interrupted by shutdown")]
    Interrupted,
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Source(Arc::new(err))
    }
}
