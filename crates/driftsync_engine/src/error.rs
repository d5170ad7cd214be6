//! Error types for the sync engine.

use driftsync_protocol::Method;
use thiserror::Error;

/// Result type for remote data service calls.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Errors reported by a [`crate::RemoteDataService`] implementation.
#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    /// The server rejected the write because a unique key already exists.
    ///
    /// This is the one error class that routes to the conflict ledger
    /// instead of the retry path.
    #[error("uniqueness violation on {target}")]
    UniquenessViolation {
        /// Target table.
        target: String,
    },

    /// Network or transport error.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the call can be retried.
        retryable: bool,
    },

    /// The server rejected the request (validation, rate limiting, ...).
    #[error("remote rejected request: {0}")]
    Rejected(String),

    /// The transport layer's request timeout elapsed.
    #[error("request timed out")]
    Timeout,
}

impl RemoteError {
    /// Creates a uniqueness violation for `target`.
    pub fn uniqueness_violation(target: impl Into<String>) -> Self {
        Self::UniquenessViolation {
            target: target.into(),
        }
    }

    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if the failed call may succeed on a later attempt.
    ///
    /// A uniqueness violation never is: it routes to the conflict ledger.
    /// Everything else stays on the failure/retry path; rate-limit and
    /// validation errors do not get their own path.
    pub fn is_retryable(&self) -> bool {
        match self {
            RemoteError::UniquenessViolation { .. } => false,
            RemoteError::Transport { retryable, .. } => *retryable,
            RemoteError::Rejected(_) => true,
            RemoteError::Timeout => true,
        }
    }
}

/// Errors that can occur while classifying or persisting operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A remote data service call failed.
    #[error("remote operation failed: {0}")]
    Remote(#[from] RemoteError),

    /// An update or delete operation carries no entity key in its payload.
    #[error("operation {operation_id} has no entity key for {method:?}")]
    MissingEntityKey {
        /// The operation id.
        operation_id: String,
        /// The method that required a key.
        method: Method,
    },

    /// The server reported a uniqueness violation but the follow-up lookup
    /// found no record. Treated as transient: the violation will be
    /// re-detected on the next pass if it is real.
    #[error("conflict lookup for operation {operation_id} returned no record")]
    ConflictRecordMissing {
        /// The operation id.
        operation_id: String,
    },

    /// Durable store read or write error.
    #[error("persistence error: {0}")]
    Store(#[from] driftsync_store::StoreError),
}

impl SyncError {
    /// Returns true if a later pass may succeed for the same operation.
    ///
    /// A pass whose failures are all permanent does not arm the automatic
    /// retry schedule; the operations stay queued for the next external
    /// trigger.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Remote(e) => e.is_retryable(),
            SyncError::MissingEntityKey { .. } => false,
            SyncError::ConflictRecordMissing { .. } => true,
            SyncError::Store(_) => true,
        }
    }
}
