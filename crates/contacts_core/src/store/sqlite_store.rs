//! SQLite-backed contact store.
//!
//! # Responsibility
//! - Own the single connection of a session and serialize writes through it.
//! - Re-read the ordered set inside each write transaction and publish it.
//!
//! # Invariants
//! - Snapshots are published while the connection lock is held, so published
//!   versions follow commit order.
//! - Rows are never logged; only ids, op names and outcomes.

use super::snapshot::{ContactSnapshot, ContactsSubscription};
use super::{ContactStore, StoreError, StoreResult, WriteOutcome};
use crate::db::migrations::{current_version, latest_version};
use crate::db::{open_db, open_db_in_memory};
use crate::model::contact::{Contact, ContactId};
use log::{error, info};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;
use tokio::sync::watch;

const CONTACTS_TABLE: &str = "contacts";
const REQUIRED_COLUMNS: &[&str] = &["id", "name", "phoneNumber", "imageReference"];

const CONTACT_SELECT_SQL: &str = "SELECT
    id,
    name,
    phoneNumber,
    imageReference
FROM contacts";

/// SQLite implementation of [`ContactStore`].
pub struct SqliteContactStore {
    conn: Mutex<Connection>,
    snapshots: watch::Sender<ContactSnapshot>,
}

impl SqliteContactStore {
    /// Wraps a migrated connection and loads the initial snapshot (version 0).
    ///
    /// # Errors
    /// - `UninitializedConnection` when `PRAGMA user_version` is not current.
    /// - `MissingRequiredTable` / `MissingRequiredColumn` when the schema
    ///   does not have the expected shape.
    pub fn try_new(conn: Connection) -> StoreResult<Self> {
        ensure_schema(&conn)?;
        let contacts = select_all(&conn)?;
        info!(
            "event=store_open module=store status=ok rows={}",
            contacts.len()
        );
        let (snapshots, _) = watch::channel(ContactSnapshot::new(0, contacts));
        Ok(Self {
            conn: Mutex::new(conn),
            snapshots,
        })
    }

    /// Opens (or creates) a database file and wraps it.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::try_new(open_db(path)?)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::try_new(open_db_in_memory()?)
    }

    /// Version of the most recently published snapshot.
    pub fn version(&self) -> u64 {
        self.snapshots.borrow().version()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    fn write(
        &self,
        op: &'static str,
        contact_id: ContactId,
        statement: impl FnOnce(&Transaction<'_>) -> rusqlite::Result<usize>,
    ) -> StoreResult<WriteOutcome> {
        let started_at = Instant::now();
        match self.write_and_publish(statement) {
            Ok(outcome) => {
                info!(
                    "event=contact_write module=store op={op} status=ok outcome={} contact_id={contact_id} duration_ms={}",
                    outcome.as_str(),
                    started_at.elapsed().as_millis()
                );
                Ok(outcome)
            }
            Err(err) => {
                error!(
                    "event=contact_write module=store op={op} status=error contact_id={contact_id} duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    fn write_and_publish(
        &self,
        statement: impl FnOnce(&Transaction<'_>) -> rusqlite::Result<usize>,
    ) -> StoreResult<WriteOutcome> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if statement(&tx)? == 0 {
            return Ok(WriteOutcome::Unchanged);
        }

        let contacts = select_all(&tx)?;
        tx.commit()?;

        let version = self.snapshots.borrow().version() + 1;
        self.snapshots
            .send_replace(ContactSnapshot::new(version, contacts));
        Ok(WriteOutcome::Applied)
    }
}

impl ContactStore for SqliteContactStore {
    fn insert(&self, contact: &Contact) -> StoreResult<WriteOutcome> {
        self.write("insert", contact.id, |tx| {
            tx.execute(
                "INSERT OR IGNORE INTO contacts (
                    id,
                    name,
                    phoneNumber,
                    imageReference
                ) VALUES (?1, ?2, ?3, ?4);",
                params![
                    contact.id,
                    contact.name.as_str(),
                    contact.phone_number.as_str(),
                    contact.image_reference.as_deref(),
                ],
            )
        })
    }

    fn update(&self, contact: &Contact) -> StoreResult<WriteOutcome> {
        self.write("update", contact.id, |tx| {
            tx.execute(
                "UPDATE contacts
                 SET
                    name = ?1,
                    phoneNumber = ?2,
                    imageReference = ?3
                 WHERE id = ?4;",
                params![
                    contact.name.as_str(),
                    contact.phone_number.as_str(),
                    contact.image_reference.as_deref(),
                    contact.id,
                ],
            )
        })
    }

    fn delete_by_id(&self, id: ContactId) -> StoreResult<WriteOutcome> {
        self.write("delete", id, |tx| {
            tx.execute("DELETE FROM contacts WHERE id = ?1;", [id])
        })
    }

    fn get(&self, id: ContactId) -> StoreResult<Option<Contact>> {
        let conn = self.lock()?;
        let contact = conn
            .query_row(
                &format!("{CONTACT_SELECT_SQL} WHERE id = ?1;"),
                [id],
                parse_contact_row,
            )
            .optional()?;
        Ok(contact)
    }

    fn query_all(&self) -> StoreResult<Vec<Contact>> {
        let conn = self.lock()?;
        select_all(&conn)
    }

    fn subscribe(&self) -> ContactsSubscription {
        ContactsSubscription::new(self.snapshots.subscribe())
    }
}

fn select_all(conn: &Connection) -> StoreResult<Vec<Contact>> {
    let mut stmt = conn.prepare(&format!("{CONTACT_SELECT_SQL} ORDER BY name ASC, id ASC;"))?;
    let contacts = stmt
        .query_map([], parse_contact_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(contacts)
}

fn parse_contact_row(row: &Row<'_>) -> rusqlite::Result<Contact> {
    Ok(Contact {
        id: row.get("id")?,
        name: row.get("name")?,
        phone_number: row.get("phoneNumber")?,
        image_reference: row.get("imageReference")?,
    })
}

fn ensure_schema(conn: &Connection) -> StoreResult<()> {
    let expected_version = latest_version();
    let actual_version = current_version(conn)?;
    if actual_version != expected_version {
        return Err(StoreError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1);")?;
    let columns = stmt
        .query_map([CONTACTS_TABLE], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    if columns.is_empty() {
        return Err(StoreError::MissingRequiredTable(CONTACTS_TABLE));
    }

    for &column in REQUIRED_COLUMNS {
        if !columns.iter().any(|name| name == column) {
            return Err(StoreError::MissingRequiredColumn {
                table: CONTACTS_TABLE,
                column,
            });
        }
    }

    Ok(())
}
