//! # driftsync Engine
//!
//! Offline-first operation synchronization engine.
//!
//! This crate provides:
//! - [`SyncEngine`] - durable operation queue, single-flight sync passes,
//!   retry with backoff, conflict surfacing
//! - [`ConnectivityMonitor`] - online/offline state and transitions
//! - [`RemoteDataService`] - the record-oriented backend abstraction,
//!   plus [`MockRemote`] for testing
//! - A single scheduler task that coalesces every sync trigger
//!   (debounced enqueue, periodic tick, reconnect, backoff retry)
//!
//! ## Architecture
//!
//! Local mutations are enqueued as [`driftsync_protocol::Operation`]s and
//! persisted on every mutation. When connectivity is available the engine
//! drains a snapshot of the queue against the remote service strictly in
//! FIFO order, one operation at a time. A uniqueness conflict moves its
//! operation from the queue into a ledger (with the server's record) the
//! moment it is detected; successful entries are removed at the end of
//! the pass, and failures keep their position for the next pass.
//!
//! ## Key Invariants
//!
//! - At most one sync pass is in flight at any time
//! - Operations are applied in enqueue order; a failed operation keeps
//!   its queue position for the next pass
//! - An operation id classified Success or Conflict is never reprocessed
//! - Every operation is in exactly one of {queue, ledger} until resolved
//! - The durable store is written on every mutation, never only at
//!   shutdown; a corrupt store hydrates as empty instead of crashing

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod connectivity;
mod dispatch;
mod engine;
mod error;
mod persist;
mod remote;
mod state;

pub use config::SyncConfig;
pub use connectivity::ConnectivityMonitor;
pub use dispatch::Outcome;
pub use engine::{StorageUsage, SyncEngine};
pub use error::{RemoteError, RemoteResult, SyncError};
pub use remote::{MockRemote, RecordedCall, RemoteDataService};
pub use state::{PassReport, PassSummary, SkipReason, SyncState, SyncStatus};
