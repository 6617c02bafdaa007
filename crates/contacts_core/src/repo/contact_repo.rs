//! Contact repository.

use crate::model::contact::{Contact, ContactId};
use crate::store::{ContactStore, ContactsSubscription, StoreResult, WriteOutcome};
use std::sync::Arc;

/// Domain-facing handle to one contact store.
///
/// Cloning shares the same store; the service clones it into each worker task.
pub struct ContactRepository<S: ContactStore> {
    store: Arc<S>,
}

impl<S: ContactStore> Clone for ContactRepository<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: ContactStore> ContactRepository<S> {
    pub fn new(store: S) -> Self {
        Self::from_shared(Arc::new(store))
    }

    /// Wraps a store already shared with other owners.
    pub fn from_shared(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn insert(&self, contact: &Contact) -> StoreResult<WriteOutcome> {
        self.store.insert(contact)
    }

    pub fn update(&self, contact: &Contact) -> StoreResult<WriteOutcome> {
        self.store.update(contact)
    }

    pub fn delete(&self, contact: &Contact) -> StoreResult<WriteOutcome> {
        self.store.delete(contact)
    }

    pub fn delete_by_id(&self, id: ContactId) -> StoreResult<WriteOutcome> {
        self.store.delete_by_id(id)
    }

    pub fn get(&self, id: ContactId) -> StoreResult<Option<Contact>> {
        self.store.get(id)
    }

    pub fn list(&self) -> StoreResult<Vec<Contact>> {
        self.store.query_all()
    }

    /// Live ordered contact list.
    pub fn all_contacts(&self) -> ContactsSubscription {
        self.store.subscribe()
    }
}
