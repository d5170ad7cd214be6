//! Store trait definition.

use crate::error::StoreResult;

/// A durable string-keyed store for engine state.
///
/// Backends are **opaque string stores**. The engine owns all value
/// interpretation - backends do not understand operations, conflicts, or
/// timestamps.
///
/// # Invariants
///
/// - `get` returns exactly the value previously passed to `set` for that
///   key, or `None` if the key was never set or was removed
/// - After `set` returns successfully the value is durable
/// - Keys carry a caller-supplied namespace prefix so that independent
///   engines can share one store
/// - Backends must be `Send + Sync` for concurrent access
///
/// # Implementors
///
/// - [`super::MemoryStore`] - for testing
/// - [`super::FileStore`] - for persistent storage
pub trait QueueStore: Send + Sync {
    /// Reads the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage cannot be read.
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the write cannot be made durable.
    fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Removes the value stored under `key`, if any.
    ///
    /// Removing an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the removal cannot be made durable.
    fn remove(&self, key: &str) -> StoreResult<()>;
}

impl<S: QueueStore + ?Sized> QueueStore for std::sync::Arc<S> {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        (**self).remove(key)
    }
}
