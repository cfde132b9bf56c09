//! Queue Error Types
//!
//! Defines the signal returned by blocking queue operations.

use thiserror::Error;

/// Result type for blocking queue operations
pub type QueueResult<T> = Result<T, QueueError>;

/// Errors that can occur during blocking queue operations
///
/// `Cancelled` is a shutdown signal, not a fault: a consumer receiving it
/// should leave its work loop.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    /// Queue has been cancelled and holds no further elements for waiters
    #[error("queue has been cancelled")]
    Cancelled,
}

impl QueueError {
    /// Whether this error is the cancellation signal
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
