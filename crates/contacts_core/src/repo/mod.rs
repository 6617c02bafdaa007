//! Repository façade over the storage engine.
//!
//! # Responsibility
//! - Give the service layer one stable entry point for contact operations.
//! - Keep store construction out of service and FFI code.
//!
//! # Invariants
//! - The repository adds no business rules; every call delegates unchanged.

pub mod contact_repo;
