//! Core domain logic for the contacts screen.
//! This crate owns persistence, the live contact list and session dispatch.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod store;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::contact::{Contact, ContactId};
pub use repo::contact_repo::ContactRepository;
pub use service::contact_service::{ContactService, PendingWrite, ServiceError, ServiceResult};
pub use service::permission::{Permission, PermissionGate, StaticPermissionGate};
pub use store::{
    ContactSnapshot, ContactStore, ContactsSubscription, SqliteContactStore, StoreError,
    StoreResult, WriteOutcome,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
