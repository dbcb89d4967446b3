//! Error types for sigcalc.

use crate::dispatch::OperationTag;
use thiserror::Error;

/// Main error type for sigcalc.
#[derive(Error, Debug)]
#[allow(dead_code)]
pub enum SigcalcError {
    #[error("Setup failed: {0}")]
    Setup(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Errors surfaced by a single dispatch cycle.
///
/// Both variants are recoverable at the supervisor level: the request loop
/// reports them and continues with the next request.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchError {
    /// The worker process no longer exists (or was already shut down), so
    /// the wake notification could not be delivered.
    #[error("no live worker for '{0}'")]
    WorkerUnavailable(OperationTag),

    /// The worker's outbound channel closed before a full result frame
    /// arrived.
    #[error("worker for '{0}' crashed mid-request")]
    WorkerCrashed(OperationTag),
}

/// Result type alias for sigcalc operations.
pub type Result<T> = std::result::Result<T, SigcalcError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_unavailable_message() {
        let err = DispatchError::WorkerUnavailable(OperationTag::Add);
        let msg = err.to_string();
        assert!(msg.contains("add"));
        assert!(msg.contains("no live worker"));
    }

    #[test]
    fn test_worker_crashed_message() {
        let err = DispatchError::WorkerCrashed(OperationTag::Multiply);
        let msg = err.to_string();
        assert!(msg.contains("multiply"));
        assert!(msg.contains("crashed"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe gone");
        let err: SigcalcError = io_err.into();
        assert!(err.to_string().contains("pipe gone"));
    }

    #[test]
    fn test_dispatch_error_passthrough() {
        let err: SigcalcError = DispatchError::WorkerCrashed(OperationTag::Subtract).into();
        assert!(err.to_string().contains("subtract"));
    }
}
