//! Structured errors for the worker runtime.

use offcache_core::Error;

use crate::handler::WorkerState;

/// Errors surfaced to the host as `error` replies.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    /// A lifecycle event arrived in the wrong state (e.g. activate before install).
    #[error("INVALID_STATE: expected {expected}, got {actual}")]
    InvalidState { expected: &'static str, actual: WorkerState },

    /// A transport line could not be decoded.
    #[error("INVALID_EVENT: {0}")]
    InvalidEvent(String),

    /// Transport I/O failed.
    #[error("TRANSPORT_ERROR: {0}")]
    Transport(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] Error),
}

impl WorkerError {
    pub fn code(&self) -> i32 {
        match self {
            WorkerError::InvalidState { .. } => -32014,
            WorkerError::InvalidEvent(_) => -32700,
            WorkerError::Transport(_) => -32603,
            WorkerError::Core(e) => e.code(),
        }
    }
}
