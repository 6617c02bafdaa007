//! Immutable ordered snapshots and the subscription handle that delivers them.

use crate::model::contact::{Contact, ContactId};
use std::sync::Arc;
use tokio::sync::watch;

/// Full contact set at one committed version, ordered by `name ASC, id ASC`.
///
/// Cloning is cheap; rows are shared behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactSnapshot {
    version: u64,
    contacts: Arc<[Contact]>,
}

impl ContactSnapshot {
    pub(crate) fn new(version: u64, contacts: Vec<Contact>) -> Self {
        Self {
            version,
            contacts: contacts.into(),
        }
    }

    /// `0` for the rows loaded when the store opened, then +1 per applied write.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    pub fn get(&self, id: ContactId) -> Option<&Contact> {
        self.contacts.iter().find(|contact| contact.id == id)
    }

    pub fn names(&self) -> Vec<&str> {
        self.contacts
            .iter()
            .map(|contact| contact.name.as_str())
            .collect()
    }
}

/// Push-based view of the live ordered contact list.
///
/// Latest-value semantics: a subscriber that falls behind skips straight to
/// the newest snapshot.
#[derive(Debug, Clone)]
pub struct ContactsSubscription {
    rx: watch::Receiver<ContactSnapshot>,
}

impl ContactsSubscription {
    pub(crate) fn new(rx: watch::Receiver<ContactSnapshot>) -> Self {
        Self { rx }
    }

    /// Returns the newest published snapshot without waiting.
    pub fn current(&self) -> ContactSnapshot {
        self.rx.borrow().clone()
    }

    /// Waits for a snapshot newer than the last one returned by `changed`.
    ///
    /// Returns `None` once the owning store has been dropped.
    pub async fn changed(&mut self) -> Option<ContactSnapshot> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Waits until the published version reaches at least `version`.
    pub async fn wait_for_version(&mut self, version: u64) -> Option<ContactSnapshot> {
        let snapshot = self
            .rx
            .wait_for(|snapshot| snapshot.version >= version)
            .await
            .ok()?;
        Some(snapshot.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::{ContactSnapshot, ContactsSubscription};
    use crate::model::contact::Contact;
    use tokio::sync::watch;

    #[test]
    fn snapshot_lookup_by_id() {
        let snapshot = ContactSnapshot::new(
            3,
            vec![Contact::new(2, "Ann", "555-2000"), Contact::new(1, "Bob", "555-1000")],
        );
        assert_eq!(snapshot.version(), 3);
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.get(1).map(|c| c.name.as_str()), Some("Bob"));
        assert!(snapshot.get(9).is_none());
        assert_eq!(snapshot.names(), vec!["Ann", "Bob"]);
    }

    #[tokio::test]
    async fn changed_returns_none_after_sender_drop() {
        let (tx, rx) = watch::channel(ContactSnapshot::new(0, Vec::new()));
        let mut subscription = ContactsSubscription::new(rx);
        drop(tx);
        assert!(subscription.changed().await.is_none());
    }

    #[tokio::test]
    async fn changed_skips_to_latest_snapshot() {
        let (tx, rx) = watch::channel(ContactSnapshot::new(0, Vec::new()));
        let mut subscription = ContactsSubscription::new(rx);
        tx.send_replace(ContactSnapshot::new(1, vec![Contact::new(1, "A", "1")]));
        tx.send_replace(ContactSnapshot::new(2, Vec::new()));

        let latest = subscription.changed().await.expect("sender alive");
        assert_eq!(latest.version(), 2);
        assert!(latest.is_empty());
    }
}
