//! Session-level services for presentation hosts.
//!
//! # Responsibility
//! - Move contact writes off the caller's thread.
//! - Re-expose the live contact list to hosts.
//! - Refuse to exist until the contacts permission is granted.

pub mod contact_service;
pub mod permission;
