//! Runtime permission gate checked before a contact session activates.

use log::{info, warn};

/// Platform permission required by the contacts screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    ReadContacts,
}

/// Platform string passed to the host's permission prompt.
pub const PERMISSION_READ_CONTACTS: &str = "android.permission.READ_CONTACTS";

impl Permission {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ReadContacts => PERMISSION_READ_CONTACTS,
        }
    }

    /// User-facing short description.
    pub fn description(self) -> &'static str {
        match self {
            Self::ReadContacts => "Allow reading contacts stored on this device.",
        }
    }
}

/// Host-side permission check and prompt.
pub trait PermissionGate {
    /// Returns whether `permission` is already granted, without prompting.
    fn is_granted(&self, permission: Permission) -> bool;
    /// Prompts the user and returns the grant result.
    fn request(&mut self, permission: Permission) -> bool;
}

/// Gate for hosts that resolved the prompt before calling into core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticPermissionGate {
    granted: bool,
}

impl StaticPermissionGate {
    pub fn granted() -> Self {
        Self { granted: true }
    }

    pub fn denied() -> Self {
        Self { granted: false }
    }

    pub fn from_host_result(granted: bool) -> Self {
        Self { granted }
    }
}

impl PermissionGate for StaticPermissionGate {
    fn is_granted(&self, _permission: Permission) -> bool {
        self.granted
    }

    fn request(&mut self, _permission: Permission) -> bool {
        self.granted
    }
}

/// Checks `permission`, prompting at most once when it is not yet granted.
pub fn ensure_granted<G: PermissionGate + ?Sized>(gate: &mut G, permission: Permission) -> bool {
    if gate.is_granted(permission) {
        return true;
    }

    info!(
        "event=permission_request module=service status=start permission={}",
        permission.as_str()
    );
    let granted = gate.request(permission);
    if granted {
        info!(
            "event=permission_request module=service status=ok permission={}",
            permission.as_str()
        );
    } else {
        warn!(
            "event=permission_request module=service status=denied permission={}",
            permission.as_str()
        );
    }
    granted
}
