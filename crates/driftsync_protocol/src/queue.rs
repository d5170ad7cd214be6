//! FIFO queue of pending operations.

use crate::operation::Operation;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

/// An ordered queue of pending operations.
///
/// # Invariants
///
/// - Queue order is insertion order (FIFO); operations for the same entity
///   are never reordered relative to each other
/// - Operation ids are unique within the queue
/// - Removal is by id set, so a finishing batch drops only the entries
///   that were classified, leaving failures in position for the next pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationQueue {
    entries: VecDeque<Operation>,
}

impl OperationQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an operation at the tail.
    ///
    /// Appending an id already present is ignored, which makes
    /// re-admission after conflict resolution idempotent.
    pub fn push(&mut self, operation: Operation) {
        if self.contains(&operation.id) {
            return;
        }
        self.entries.push_back(operation);
    }

    /// Removes every operation whose id is in `ids`.
    ///
    /// Returns the number of entries removed. Relative order of the
    /// remainder is preserved.
    pub fn remove_ids(&mut self, ids: &HashSet<String>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|op| !ids.contains(&op.id));
        before - self.entries.len()
    }

    /// Returns true if an operation with the given id is queued.
    pub fn contains(&self, id: &str) -> bool {
        self.entries.iter().any(|op| op.id == id)
    }

    /// Clones the current contents in order.
    ///
    /// A sync pass works against a snapshot so that concurrent enqueues
    /// append after it and ride the next pass.
    pub fn snapshot(&self) -> Vec<Operation> {
        self.entries.iter().cloned().collect()
    }

    /// Iterates over queued operations in order.
    pub fn iter(&self) -> impl Iterator<Item = &Operation> {
        self.entries.iter()
    }

    /// Returns the number of queued operations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Serialized size estimate of the queue contents in bytes.
    pub fn approx_bytes(&self) -> usize {
        self.entries.iter().map(|op| op.approx_bytes()).sum()
    }
}

impl FromIterator<Operation> for OperationQueue {
    fn from_iter<I: IntoIterator<Item = Operation>>(iter: I) -> Self {
        let mut queue = Self::new();
        for op in iter {
            queue.push(op);
        }
        queue
    }
}
