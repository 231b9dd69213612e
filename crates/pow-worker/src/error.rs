//! Worker error type.

use pow_core::{AddressError, MinerError, TemplateError};
use thiserror::Error;

/// Errors from talking to the node or running workers.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Core(#[from] pow_core::Error),

    #[error("invalid settings: {0}")]
    Config(String),

    #[error("gave up after {0} consecutive failures")]
    TooManyFailures(u32),

    #[error("worker {0} panicked")]
    Panicked(usize),
}

impl From<TemplateError> for WorkerError {
    fn from(err: TemplateError) -> Self {
        WorkerError::Core(err.into())
    }
}

impl From<AddressError> for WorkerError {
    fn from(err: AddressError) -> Self {
        WorkerError::Core(err.into())
    }
}

impl From<MinerError> for WorkerError {
    fn from(err: MinerError) -> Self {
        WorkerError::Core(err.into())
    }
}

pub type Result<T> = std::result::Result<T, WorkerError>;
