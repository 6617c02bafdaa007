//! Storage engine for contact rows.
//!
//! # Responsibility
//! - Define the `ContactStore` contract consumed by the repository façade.
//! - Provide the SQLite implementation and its live ordered snapshot feed.
//!
//! # Invariants
//! - Insert is insert-if-absent; update/delete of a missing id is a no-op.
//! - Every applied mutation publishes exactly one new snapshot, after commit.
//! - A failed mutation publishes nothing and leaves the feed usable.

use crate::db::DbError;
use crate::model::contact::{Contact, ContactId};
use std::error::Error;
use std::fmt::{Display, Formatter};

mod snapshot;
mod sqlite_store;

pub use snapshot::{ContactSnapshot, ContactsSubscription};
pub use sqlite_store::SqliteContactStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Storage engine error.
#[derive(Debug)]
pub enum StoreError {
    /// Underlying SQLite read/write failure.
    Db(DbError),
    /// Connection was not migrated to the schema this binary expects.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// A writer panicked while holding the connection lock.
    LockPoisoned,
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match expected {expected_version}; open it through db::open_db"
            ),
            Self::MissingRequiredTable(table) => write!(f, "required table is missing: {table}"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "required column is missing: {table}.{column}")
            }
            Self::LockPoisoned => write!(f, "contact store connection lock is poisoned"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Result of a mutation that completed without error.
///
/// `Unchanged` covers the silent no-op paths: duplicate insert, and
/// update/delete of an id that is not stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Applied,
    Unchanged,
}

impl WriteOutcome {
    pub fn is_applied(self) -> bool {
        matches!(self, Self::Applied)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::Unchanged => "unchanged",
        }
    }
}

/// Storage engine contract for the contacts table.
///
/// Calls block on SQLite I/O and must not run on a UI thread.
pub trait ContactStore: Send + Sync {
    /// Adds `contact` unless a row with the same id exists.
    fn insert(&self, contact: &Contact) -> StoreResult<WriteOutcome>;
    /// Replaces every field of the row keyed by `contact.id`.
    fn update(&self, contact: &Contact) -> StoreResult<WriteOutcome>;
    /// Removes the row keyed by `contact.id`; other fields are ignored.
    fn delete(&self, contact: &Contact) -> StoreResult<WriteOutcome> {
        self.delete_by_id(contact.id)
    }
    fn delete_by_id(&self, id: ContactId) -> StoreResult<WriteOutcome>;
    fn get(&self, id: ContactId) -> StoreResult<Option<Contact>>;
    /// One-shot read of all rows ordered by `name ASC, id ASC`.
    fn query_all(&self) -> StoreResult<Vec<Contact>>;
    /// Live ordered feed, starting at the most recent snapshot.
    fn subscribe(&self) -> ContactsSubscription;
}
