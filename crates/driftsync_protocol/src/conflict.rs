//! Conflict records.

use crate::operation::Operation;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A server-side uniqueness conflict awaiting caller resolution.
///
/// While a conflict exists its operation lives only here, never in the
/// active queue, so it cannot double-apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    /// The original operation that failed.
    pub operation: Operation,
    /// The authoritative record the server held at conflict time.
    pub server_data: Value,
}

impl Conflict {
    /// Creates a conflict record.
    pub fn new(operation: Operation, server_data: Value) -> Self {
        Self {
            operation,
            server_data,
        }
    }

    /// The id of the conflicted operation.
    pub fn operation_id(&self) -> &str {
        &self.operation.id
    }

    /// Serialized size estimate in bytes.
    pub fn approx_bytes(&self) -> usize {
        serde_json::to_string(self).map(|s| s.len()).unwrap_or(0)
    }
}

/// Caller-directed resolution of a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictResolution {
    /// Retry the local operation: it is re-admitted into the active queue
    /// with its id preserved.
    KeepLocal,
    /// Accept the server's record: the local operation is discarded.
    KeepServer,
}
