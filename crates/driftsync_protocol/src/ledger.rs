//! Ledger of open conflicts.

use crate::conflict::{Conflict, ConflictResolution};
use crate::operation::Operation;
use serde::{Deserialize, Serialize};

/// Result of resolving a conflict.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolveOutcome {
    /// The local operation should be re-admitted into the active queue.
    Readmit(Operation),
    /// The local operation was discarded in favor of the server record.
    Discarded,
    /// No conflict with that operation id exists; resolving is a no-op.
    NotFound,
}

/// Holds operations that failed with a server-side uniqueness conflict,
/// paired with the server's record, until the caller resolves them.
///
/// Conflicts never expire on their own; they persist across restarts until
/// explicitly resolved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConflictLedger {
    entries: Vec<Conflict>,
}

impl ConflictLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a conflict.
    ///
    /// Recording a conflict for an operation id already present is a
    /// no-op, so repeated classification of the same operation cannot
    /// duplicate entries.
    pub fn record(&mut self, conflict: Conflict) {
        if self.get(conflict.operation_id()).is_some() {
            return;
        }
        self.entries.push(conflict);
    }

    /// Resolves the conflict for `operation_id` according to `resolution`
    /// and removes it from the ledger.
    pub fn resolve(&mut self, operation_id: &str, resolution: ConflictResolution) -> ResolveOutcome {
        let Some(index) = self
            .entries
            .iter()
            .position(|c| c.operation_id() == operation_id)
        else {
            return ResolveOutcome::NotFound;
        };

        let conflict = self.entries.remove(index);
        match resolution {
            ConflictResolution::KeepLocal => ResolveOutcome::Readmit(conflict.operation),
            ConflictResolution::KeepServer => ResolveOutcome::Discarded,
        }
    }

    /// Looks up an open conflict by operation id.
    pub fn get(&self, operation_id: &str) -> Option<&Conflict> {
        self.entries
            .iter()
            .find(|c| c.operation_id() == operation_id)
    }

    /// Iterates over open conflicts in recording order.
    pub fn iter(&self) -> impl Iterator<Item = &Conflict> {
        self.entries.iter()
    }

    /// Returns the number of open conflicts.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no conflicts are open.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialized size estimate of the ledger contents in bytes.
    pub fn approx_bytes(&self) -> usize {
        self.entries.iter().map(|c| c.approx_bytes()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::{EntityKind, OperationDraft, Payload};
    use serde_json::json;

    fn make_conflict(id: &str) -> Conflict {
        let mut op = Operation::from_draft(OperationDraft::new(EntityKind::Note, Payload::new()));
        op.id = id.to_string();
        Conflict::new(op, json!({"id": id, "body": "server"}))
    }

    #[test]
    fn record_is_idempotent() {
        let mut ledger = ConflictLedger::new();
        ledger.record(make_conflict("a"));
        ledger.record(make_conflict("a"));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn keep_local_readmits_operation() {
        let mut ledger = ConflictLedger::new();
        ledger.record(make_conflict("a"));

        match ledger.resolve("a", ConflictResolution::KeepLocal) {
            ResolveOutcome::Readmit(op) => assert_eq!(op.id, "a"),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert!(ledger.is_empty());
    }

    #[test]
    fn keep_server_discards_operation() {
        let mut ledger = ConflictLedger::new();
        ledger.record(make_conflict("a"));

        assert_eq!(
            ledger.resolve("a", ConflictResolution::KeepServer),
            ResolveOutcome::Discarded
        );
        assert!(ledger.is_empty());
    }

    #[test]
    fn resolve_unknown_id_is_noop() {
        let mut ledger = ConflictLedger::new();
        ledger.record(make_conflict("a"));

        assert_eq!(
            ledger.resolve("missing", ConflictResolution::KeepServer),
            ResolveOutcome::NotFound
        );
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn ledger_roundtrip() {
        let mut ledger = ConflictLedger::new();
        ledger.record(make_conflict("a"));
        ledger.record(make_conflict("b"));

        let text = serde_json::to_string(&ledger).unwrap();
        let back: ConflictLedger = serde_json::from_str(&text).unwrap();
        assert_eq!(back, ledger);
    }
}
