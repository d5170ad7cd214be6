//! Remote data service abstraction.

use crate::error::{RemoteError, RemoteResult};
use driftsync_protocol::Payload;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};

/// A record-oriented remote backend.
///
/// This trait abstracts the backend, allowing different implementations
/// (HTTP API client, in-process fake, mock for testing). Implementations
/// own their request timeout: the engine never cancels an in-flight call,
/// it relies on the transport resolving to an error eventually.
///
/// A uniqueness violation must be reported as
/// [`RemoteError::UniquenessViolation`], distinguishable from other
/// errors, so the engine can route it to the conflict ledger.
pub trait RemoteDataService: Send + Sync {
    /// Creates a record in `target`.
    fn insert(&self, target: &str, payload: &Payload) -> RemoteResult<Value>;

    /// Updates the record identified by `key` in `target`.
    fn update(&self, target: &str, key: &str, payload: &Payload) -> RemoteResult<Value>;

    /// Deletes the record identified by `key` in `target`.
    fn delete(&self, target: &str, key: &str) -> RemoteResult<Value>;

    /// Creates or updates a record in `target`.
    fn upsert(&self, target: &str, payload: &Payload) -> RemoteResult<Value>;

    /// Looks up the record identified by `key` in `target`. Used to fetch
    /// the authoritative record when a uniqueness violation is reported.
    fn fetch(&self, target: &str, key: &str) -> RemoteResult<Option<Value>>;
}

impl<R: RemoteDataService + ?Sized> RemoteDataService for std::sync::Arc<R> {
    fn insert(&self, target: &str, payload: &Payload) -> RemoteResult<Value> {
        (**self).insert(target, payload)
    }

    fn update(&self, target: &str, key: &str, payload: &Payload) -> RemoteResult<Value> {
        (**self).update(target, key, payload)
    }

    fn delete(&self, target: &str, key: &str) -> RemoteResult<Value> {
        (**self).delete(target, key)
    }

    fn upsert(&self, target: &str, payload: &Payload) -> RemoteResult<Value> {
        (**self).upsert(target, payload)
    }

    fn fetch(&self, target: &str, key: &str) -> RemoteResult<Option<Value>> {
        (**self).fetch(target, key)
    }
}

/// One call observed by [`MockRemote`], in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// Call name: `insert`, `update`, `delete`, `upsert` or `fetch`.
    pub call: &'static str,
    /// Target table.
    pub target: String,
    /// Entity key for keyed calls.
    pub key: Option<String>,
}

/// A mock remote service for testing.
///
/// Mutation calls consume scripted responses in FIFO order; when the
/// script is empty they succeed, echoing the payload. Every call is
/// recorded so tests can assert ordering.
#[derive(Debug, Default)]
pub struct MockRemote {
    script: Mutex<VecDeque<RemoteResult<Value>>>,
    server_records: Mutex<HashMap<(String, String), Value>>,
    fetch_fails: Mutex<bool>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockRemote {
    /// Creates a mock that succeeds on every call.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the next mutation call's result.
    pub fn push_response(&self, response: RemoteResult<Value>) {
        self.script.lock().push_back(response);
    }

    /// Scripts the next mutation call to report a uniqueness violation.
    pub fn push_conflict(&self, target: impl Into<String>) {
        self.push_response(Err(RemoteError::uniqueness_violation(target)));
    }

    /// Scripts the next mutation call to fail.
    pub fn push_failure(&self, error: RemoteError) {
        self.push_response(Err(error));
    }

    /// Sets the authoritative record returned by `fetch`.
    pub fn set_server_record(
        &self,
        target: impl Into<String>,
        key: impl Into<String>,
        record: Value,
    ) {
        self.server_records
            .lock()
            .insert((target.into(), key.into()), record);
    }

    /// Makes subsequent `fetch` calls fail with a transport error.
    pub fn set_fetch_fails(&self, fails: bool) {
        *self.fetch_fails.lock() = fails;
    }

    /// Returns every observed call in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Returns the number of observed calls.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Forgets observed calls.
    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    fn record(&self, call: &'static str, target: &str, key: Option<&str>) {
        self.calls.lock().push(RecordedCall {
            call,
            target: target.to_string(),
            key: key.map(|k| k.to_string()),
        });
    }

    fn mutate(&self, default: Value) -> RemoteResult<Value> {
        match self.script.lock().pop_front() {
            Some(scripted) => scripted,
            None => Ok(default),
        }
    }
}

impl RemoteDataService for MockRemote {
    fn insert(&self, target: &str, payload: &Payload) -> RemoteResult<Value> {
        self.record("insert", target, None);
        self.mutate(Value::Object(payload.clone()))
    }

    fn update(&self, target: &str, key: &str, payload: &Payload) -> RemoteResult<Value> {
        self.record("update", target, Some(key));
        self.mutate(Value::Object(payload.clone()))
    }

    fn delete(&self, target: &str, key: &str) -> RemoteResult<Value> {
        self.record("delete", target, Some(key));
        self.mutate(Value::Null)
    }

    fn upsert(&self, target: &str, payload: &Payload) -> RemoteResult<Value> {
        self.record("upsert", target, None);
        self.mutate(Value::Object(payload.clone()))
    }

    fn fetch(&self, target: &str, key: &str) -> RemoteResult<Option<Value>> {
        self.record("fetch", target, Some(key));
        if *self.fetch_fails.lock() {
            return Err(RemoteError::transport_retryable("fetch unavailable"));
        }
        Ok(self
            .server_records
            .lock()
            .get(&(target.to_string(), key.to_string()))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload() -> Payload {
        let mut p = Payload::new();
        p.insert("id".into(), json!("e1"));
        p
    }

    #[test]
    fn default_calls_succeed_and_echo() {
        let remote = MockRemote::new();
        let data = remote.insert("tasks", &payload()).unwrap();
        assert_eq!(data["id"], "e1");
        assert_eq!(remote.delete("tasks", "e1").unwrap(), Value::Null);
    }

    #[test]
    fn scripted_responses_consumed_in_order() {
        let remote = MockRemote::new();
        remote.push_failure(RemoteError::Timeout);
        remote.push_conflict("tasks");

        assert!(matches!(
            remote.upsert("tasks", &payload()),
            Err(RemoteError::Timeout)
        ));
        assert!(matches!(
            remote.upsert("tasks", &payload()),
            Err(RemoteError::UniquenessViolation { .. })
        ));
        // Script exhausted: back to default success.
        assert!(remote.upsert("tasks", &payload()).is_ok());
    }

    #[test]
    fn fetch_returns_server_record() {
        let remote = MockRemote::new();
        assert_eq!(remote.fetch("notes", "n1").unwrap(), None);

        remote.set_server_record("notes", "n1", json!({"id": "n1"}));
        assert_eq!(
            remote.fetch("notes", "n1").unwrap(),
            Some(json!({"id": "n1"}))
        );

        remote.set_fetch_fails(true);
        assert!(remote.fetch("notes", "n1").is_err());
    }

    #[test]
    fn calls_are_recorded_in_order() {
        let remote = MockRemote::new();
        remote.insert("tasks", &payload()).unwrap();
        remote.update("notes", "n1", &payload()).unwrap();

        let calls = remote.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].call, "insert");
        assert_eq!(calls[0].target, "tasks");
        assert_eq!(calls[1].call, "update");
        assert_eq!(calls[1].key.as_deref(), Some("n1"));
    }
}
