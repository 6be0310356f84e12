use crate::types::Orientation;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LaeError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("Orientation mismatch: {0}")]
    OrientationMismatch(String),

    #[error("Index {index} out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Illegal state: {0}")]
    IllegalState(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    // Scheduling errors
    #[error("Worker {0} already holds a pending task")]
    WorkerBusy(usize),

    #[error("Worker {0} is shutting down")]
    WorkerShutdown(usize),

    #[error("Submission cancelled while waiting for an idle worker")]
    Cancelled,

    #[error("Task panicked: {0}")]
    TaskPanicked(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LaeError {
    pub(crate) fn orientation(expected: Orientation, found: Orientation) -> Self {
        LaeError::OrientationMismatch(format!("expected {expected}, found {found}"))
    }
}

pub type LaeResult<T> = Result<T, LaeError>;
