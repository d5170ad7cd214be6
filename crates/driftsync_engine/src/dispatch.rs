//! Maps operations to remote data service calls.

use crate::error::{RemoteError, SyncError};
use crate::remote::RemoteDataService;
use driftsync_protocol::{Method, Operation};
use serde_json::Value;

/// Classified result of processing one operation.
#[derive(Debug)]
pub enum Outcome {
    /// The operation was applied; carries the remote's response data.
    Success(Value),
    /// The remote reported a uniqueness violation; carries the server's
    /// authoritative record for the conflicted key.
    Conflict(Value),
    /// The operation could not be applied and stays queued.
    Failure(SyncError),
}

/// Processes one operation against the remote service.
///
/// The entity kind selects the target table (exhaustively, via the closed
/// [`driftsync_protocol::EntityKind`] enum) and the method selects the
/// call. A uniqueness violation is translated into [`Outcome::Conflict`]
/// carrying the current server record rather than surfaced as a generic
/// failure.
pub fn process<R: RemoteDataService + ?Sized>(remote: &R, op: &Operation) -> Outcome {
    let target = op.target();

    let result = match op.method {
        Method::Insert => remote.insert(target, &op.payload),
        Method::Upsert => remote.upsert(target, &op.payload),
        Method::Update => match op.entity_key() {
            Some(key) => remote.update(target, &key, &op.payload),
            None => return missing_key(op),
        },
        Method::Delete => match op.entity_key() {
            Some(key) => remote.delete(target, &key),
            None => return missing_key(op),
        },
    };

    match result {
        Ok(data) => Outcome::Success(data),
        Err(RemoteError::UniquenessViolation { .. }) => fetch_conflict_record(remote, op),
        Err(e) => Outcome::Failure(e.into()),
    }
}

/// Fetches the server's record for a conflicted operation.
///
/// Without a key, or when the lookup fails or finds nothing, the outcome
/// degrades to a retryable failure: a real violation will be re-detected
/// on the next pass, and a conflict record without server data would be
/// unresolvable for the caller.
fn fetch_conflict_record<R: RemoteDataService + ?Sized>(remote: &R, op: &Operation) -> Outcome {
    let Some(key) = op.entity_key() else {
        return missing_key(op);
    };

    match remote.fetch(op.target(), &key) {
        Ok(Some(server_data)) => Outcome::Conflict(server_data),
        Ok(None) => Outcome::Failure(SyncError::ConflictRecordMissing {
            operation_id: op.id.clone(),
        }),
        Err(e) => Outcome::Failure(e.into()),
    }
}

fn missing_key(op: &Operation) -> Outcome {
    Outcome::Failure(SyncError::MissingEntityKey {
        operation_id: op.id.clone(),
        method: op.method,
    })
}
