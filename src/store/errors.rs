//! Store error types

use thiserror::Error;

/// Errors that can occur while talking to the key-value store
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    /// Failed to connect, or the connection is broken
    #[error("Store connection error: {0}")]
    Connection(String),

    /// A single command failed (protocol error, wrong type, ...)
    #[error("Store command error: {0}")]
    Command(String),

    /// Store operation timed out
    #[error("Store operation timed out: {0}")]
    Timeout(String),
}

impl StoreError {
    /// Whether this error means the store as a whole is unusable
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
