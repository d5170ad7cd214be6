//! Queued operations.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field mapping carried by an operation.
pub type Payload = serde_json::Map<String, Value>;

/// The entity kind an operation targets.
///
/// This is a closed set: an unsupported kind cannot be constructed, so
/// dispatch over operations is exhaustive by the type system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// A focus/work session record.
    Session,
    /// User settings.
    Settings,
    /// Aggregated usage statistics.
    Stats,
    /// A task item.
    Task,
    /// A note.
    Note,
}

impl EntityKind {
    /// Returns the logical table name this kind maps to on the remote side.
    pub fn target(&self) -> &'static str {
        match self {
            EntityKind::Session => "sessions",
            EntityKind::Settings => "settings",
            EntityKind::Stats => "stats",
            EntityKind::Task => "tasks",
            EntityKind::Note => "notes",
        }
    }
}

/// How an operation is applied against the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// Create a new record.
    Insert,
    /// Update an existing record by key.
    Update,
    /// Delete a record by key.
    Delete,
    /// Insert-or-update.
    #[default]
    Upsert,
}

/// A single queued local mutation awaiting remote application.
///
/// # Fields
///
/// - `id`: unique, assigned at enqueue time, never reused
/// - `timestamp`: creation time (ISO-8601 on the wire)
/// - `kind`: selects the dispatch handler and target table
/// - `method`: defaults to [`Method::Upsert`] when absent
/// - `payload`: the entity's field mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// Unique operation id.
    pub id: String,
    /// Creation time.
    pub timestamp: DateTime<Utc>,
    /// Entity kind.
    pub kind: EntityKind,
    /// Remote application method.
    #[serde(default)]
    pub method: Method,
    /// Entity fields.
    pub payload: Payload,
}

impl Operation {
    /// Materializes a draft into an operation, assigning a fresh id and
    /// timestamp.
    pub fn from_draft(draft: OperationDraft) -> Self {
        let timestamp = Utc::now();
        Self {
            id: generate_id(timestamp),
            timestamp,
            kind: draft.kind,
            method: draft.method,
            payload: draft.payload,
        }
    }

    /// Returns the logical table name for this operation.
    pub fn target(&self) -> &'static str {
        self.kind.target()
    }

    /// Returns the identifying key of the entity, taken from the payload's
    /// `"id"` field. String and integer keys are both accepted.
    pub fn entity_key(&self) -> Option<String> {
        match self.payload.get("id") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Serialized size estimate in bytes, used for storage-budget
    /// diagnostics.
    pub fn approx_bytes(&self) -> usize {
        serde_json::to_string(self).map(|s| s.len()).unwrap_or(0)
    }
}

/// An operation as submitted by the caller, before an id and timestamp are
/// assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationDraft {
    /// Entity kind.
    pub kind: EntityKind,
    /// Remote application method.
    pub method: Method,
    /// Entity fields.
    pub payload: Payload,
}

impl OperationDraft {
    /// Creates a draft with the default method (upsert).
    pub fn new(kind: EntityKind, payload: Payload) -> Self {
        Self {
            kind,
            method: Method::default(),
            payload,
        }
    }

    /// Creates an insert draft.
    pub fn insert(kind: EntityKind, payload: Payload) -> Self {
        Self::new(kind, payload).with_method(Method::Insert)
    }

    /// Creates an update draft.
    pub fn update(kind: EntityKind, payload: Payload) -> Self {
        Self::new(kind, payload).with_method(Method::Update)
    }

    /// Creates a delete draft.
    pub fn delete(kind: EntityKind, payload: Payload) -> Self {
        Self::new(kind, payload).with_method(Method::Delete)
    }

    /// Sets the method.
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }
}

/// Generates an operation id: creation time in unix milliseconds plus a
/// random hex suffix. Ids sort roughly by creation time, which makes queue
/// dumps readable.
fn generate_id(timestamp: DateTime<Utc>) -> String {
    let suffix: u32 = rand::thread_rng().gen();
    format!("{}-{:08x}", timestamp.timestamp_millis(), suffix)
}
