//! Persistence glue between in-memory state and the durable store.
//!
//! Four logical keys, each namespaced: the pending-operation queue, the
//! last-sync timestamp, the conflict list, and an opaque offline-data blob
//! counted only for storage diagnostics.
//!
//! Store failures here are logged and degrade to empty defaults or dropped
//! writes. A corrupt or unavailable store must never crash the engine; the
//! in-memory state stays authoritative until a later write succeeds.

use chrono::{DateTime, Utc};
use driftsync_protocol::{ConflictLedger, OperationQueue};
use driftsync_store::QueueStore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

/// Logical store keys.
pub(crate) mod keys {
    /// Serialized operation queue.
    pub const PENDING_OPERATIONS: &str = "pending_operations";
    /// Timestamp of the last fully-successful pass.
    pub const LAST_SYNC_TIME: &str = "last_sync_time";
    /// Opaque cached-data blob, used only for size accounting.
    pub const OFFLINE_DATA: &str = "offline_data";
    /// Serialized conflict ledger.
    pub const CONFLICTS: &str = "conflicts";
}

/// Namespaced, failure-tolerant access to the durable store.
#[derive(Debug)]
pub(crate) struct Persistence<S: QueueStore> {
    store: S,
    namespace: String,
}

impl<S: QueueStore> Persistence<S> {
    pub fn new(store: S, namespace: impl Into<String>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn key(&self, key: &str) -> String {
        format!("{}.{}", self.namespace, key)
    }

    fn save_json<T: Serialize>(&self, key: &str, value: &T) {
        let text = match serde_json::to_string(value) {
            Ok(text) => text,
            Err(e) => {
                warn!("failed to serialize {}: {}", key, e);
                return;
            }
        };
        if let Err(e) = self.store.set(&self.key(key), &text) {
            warn!("failed to persist {}: {}", key, e);
        }
    }

    fn load_json<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        match self.store.get(&self.key(key)) {
            Ok(Some(text)) => match serde_json::from_str(&text) {
                Ok(value) => value,
                Err(e) => {
                    warn!("stored {} is corrupt, using default: {}", key, e);
                    T::default()
                }
            },
            Ok(None) => T::default(),
            Err(e) => {
                warn!("failed to read {}, using default: {}", key, e);
                T::default()
            }
        }
    }

    pub fn save_queue(&self, queue: &OperationQueue) {
        self.save_json(keys::PENDING_OPERATIONS, queue);
    }

    pub fn load_queue(&self) -> OperationQueue {
        self.load_json(keys::PENDING_OPERATIONS)
    }

    pub fn save_conflicts(&self, ledger: &ConflictLedger) {
        self.save_json(keys::CONFLICTS, ledger);
    }

    pub fn load_conflicts(&self) -> ConflictLedger {
        self.load_json(keys::CONFLICTS)
    }

    pub fn save_last_sync(&self, time: DateTime<Utc>) {
        if let Err(e) = self
            .store
            .set(&self.key(keys::LAST_SYNC_TIME), &time.to_rfc3339())
        {
            warn!("failed to persist last sync time: {}", e);
        }
    }

    pub fn load_last_sync(&self) -> Option<DateTime<Utc>> {
        match self.store.get(&self.key(keys::LAST_SYNC_TIME)) {
            Ok(Some(text)) => match text.parse::<DateTime<Utc>>() {
                Ok(time) => Some(time),
                Err(e) => {
                    warn!("stored last sync time is corrupt, ignoring: {}", e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!("failed to read last sync time: {}", e);
                None
            }
        }
    }

    /// Size of the opaque offline-data blob, in bytes.
    pub fn offline_data_bytes(&self) -> usize {
        match self.store.get(&self.key(keys::OFFLINE_DATA)) {
            Ok(Some(blob)) => blob.len(),
            Ok(None) => 0,
            Err(e) => {
                warn!("failed to read offline data blob: {}", e);
                0
            }
        }
    }
}
