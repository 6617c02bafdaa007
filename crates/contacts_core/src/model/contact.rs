//! Contact domain model.
//!
//! # Responsibility
//! - Define the single persisted entity and its wire shape.
//!
//! # Invariants
//! - `id` is assigned by the caller and never generated by the store.
//! - Field values are not validated; the store accepts what callers send.

use serde::{Deserialize, Serialize};

/// Caller-assigned primary key of a contact row.
pub type ContactId = i64;

/// Canonical contact record.
///
/// Serialized with camelCase keys to match the persisted column names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: ContactId,
    /// Default sort key of every list view.
    pub name: String,
    pub phone_number: String,
    /// Opaque reference (usually a content URI). `None` means no image.
    pub image_reference: Option<String>,
}

impl Contact {
    /// Creates a contact without an image reference.
    pub fn new(id: ContactId, name: impl Into<String>, phone_number: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            phone_number: phone_number.into(),
            image_reference: None,
        }
    }

    /// Returns the same contact with `image_reference` set.
    pub fn with_image(mut self, image_reference: impl Into<String>) -> Self {
        self.image_reference = Some(image_reference.into());
        self
    }

    pub fn has_image(&self) -> bool {
        self.image_reference.is_some()
    }
}
