//! Domain model for the contacts store.
//!
//! # Responsibility
//! - Define the canonical contact record shared by store, service and FFI.
//!
//! # Invariants
//! - Every contact is identified by a caller-assigned `ContactId`.
//! - Deletion is a hard delete; there are no tombstones.

pub mod contact;
