//! # driftsync Store
//!
//! Durable key-value persistence for the driftsync engine.
//!
//! This crate provides:
//! - [`QueueStore`] - the namespaced get/set/remove contract the engine
//!   persists through
//! - [`MemoryStore`] - for tests and ephemeral engines
//! - [`FileStore`] - file-backed persistence with atomic replace-on-write
//!
//! The store is the single source of truth on restart: the engine writes
//! through on every mutation and hydrates from it at startup. A corrupt or
//! missing store must never be fatal, so backends report errors and the
//! engine degrades to empty defaults.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::QueueStore;
pub use error::{StoreError, StoreResult};
pub use file::FileStore;
pub use memory::MemoryStore;
