//! # driftsync Protocol
//!
//! Pure data types for the driftsync offline-first operation
//! synchronization engine.
//!
//! This crate provides:
//! - [`Operation`] for queued local mutations
//! - [`OperationQueue`] for FIFO ordering with id-based removal
//! - [`Conflict`] and [`ConflictLedger`] for server-side uniqueness
//!   conflicts awaiting caller resolution
//!
//! This is a pure types crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod conflict;
mod ledger;
mod operation;
mod queue;

pub use conflict::{Conflict, ConflictResolution};
pub use ledger::{ConflictLedger, ResolveOutcome};
pub use operation::{EntityKind, Method, Operation, OperationDraft, Payload};
pub use queue::OperationQueue;
