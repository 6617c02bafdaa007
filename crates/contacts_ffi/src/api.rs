//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Own the single contact session of the app process.
//! - Expose session start/end, contact writes and the live list to Dart.
//!
//! # Invariants
//! - Exported functions must not panic across the FFI boundary.
//! - Writes are fire-and-forget; Dart observes them through `contacts_list`
//!   or `contacts_wait_for_change`.
//! - No contact call succeeds before `contacts_session_start(true)`.

use contacts_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    Contact, ContactRepository, ContactService, ContactSnapshot, ContactsSubscription,
    SqliteContactStore, StaticPermissionGate,
};
use log::{info, warn};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use std::time::Duration;
use tokio::runtime::{Builder, Runtime};

const CONTACTS_DB_FILE_NAME: &str = "contacts.sqlite3";
const CONTACTS_DB_PATH_ENV: &str = "CONTACTS_DB_PATH";
const WAIT_TIMEOUT_MAX_MS: u32 = 30_000;

static CONTACTS_DB_PATH: OnceLock<PathBuf> = OnceLock::new();
static SESSION: OnceLock<Mutex<Option<ContactSession>>> = OnceLock::new();

struct ContactSession {
    service: ContactService<SqliteContactStore>,
    // Shared with in-flight `contacts_wait_for_change` callers.
    runtime: Arc<Runtime>,
}

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir`.
/// - Returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// One contact row as seen by Dart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactItem {
    pub id: i64,
    pub name: String,
    pub phone_number: String,
    pub image_reference: Option<String>,
}

/// Live list envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactListResponse {
    /// Whether a session was active and the list could be read.
    pub ok: bool,
    /// Snapshot version; grows by one per applied write.
    pub version: u64,
    /// Items sorted by name ascending.
    pub items: Vec<ContactItem>,
    pub message: String,
}

impl ContactListResponse {
    fn from_snapshot(snapshot: &ContactSnapshot) -> Self {
        Self {
            ok: true,
            version: snapshot.version(),
            items: snapshot.contacts().iter().map(to_contact_item).collect(),
            message: format!("{} contact(s).", snapshot.len()),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            version: 0,
            items: Vec::new(),
            message: message.into(),
        }
    }
}

/// Dispatch envelope for write calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactActionResponse {
    /// Whether the write was queued. The write itself may still be a no-op.
    pub ok: bool,
    pub contact_id: Option<i64>,
    pub message: String,
}

impl ContactActionResponse {
    fn queued(message: impl Into<String>, contact_id: i64) -> Self {
        Self {
            ok: true,
            contact_id: Some(contact_id),
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            contact_id: None,
            message: message.into(),
        }
    }
}

/// Starts the contact session after the host resolved the permission prompt.
///
/// # FFI contract
/// - `permission_granted = false` ends the flow: no session is created and
///   every contact call keeps failing until a granted start.
/// - Idempotent while a session is active.
/// - Returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn contacts_session_start(permission_granted: bool) -> String {
    let mut slot = match lock_session() {
        Ok(slot) => slot,
        Err(err) => return err,
    };
    if slot.is_some() {
        return String::new();
    }

    match start_session(permission_granted) {
        Ok(session) => {
            *slot = Some(session);
            info!("event=session_start module=ffi status=ok");
            String::new()
        }
        Err(err) => {
            warn!("event=session_start module=ffi status=error error={err}");
            err
        }
    }
}

/// Ends the active session, waiting for queued writes to finish.
///
/// # FFI contract
/// - Blocks until every write queued before this call has been applied.
/// - Returns whether a session was active.
#[flutter_rust_bridge::frb(sync)]
pub fn contacts_session_end() -> bool {
    let session = match lock_session() {
        Ok(mut slot) => slot.take(),
        Err(_) => None,
    };
    let Some(ContactSession { service, runtime }) = session else {
        return false;
    };

    match runtime.block_on(service.shutdown()) {
        Ok(()) => info!("event=session_end module=ffi status=ok"),
        Err(err) => warn!("event=session_end module=ffi status=error error={err}"),
    }
    true
}

/// Queues an insert. An existing id is left untouched.
#[flutter_rust_bridge::frb(sync)]
pub fn contacts_insert(
    id: i64,
    name: String,
    phone_number: String,
    image_reference: Option<String>,
) -> ContactActionResponse {
    let contact = to_contact(id, name, phone_number, image_reference);
    with_session(|service| service.insert(contact).detach())
        .map(|()| ContactActionResponse::queued("Insert queued.", id))
        .unwrap_or_else(|err| ContactActionResponse::failure(format!("contacts_insert failed: {err}")))
}

/// Queues a full-record update keyed by `id`. A missing id is a no-op.
#[flutter_rust_bridge::frb(sync)]
pub fn contacts_update(
    id: i64,
    name: String,
    phone_number: String,
    image_reference: Option<String>,
) -> ContactActionResponse {
    let contact = to_contact(id, name, phone_number, image_reference);
    with_session(|service| service.update(contact).detach())
        .map(|()| ContactActionResponse::queued("Update queued.", id))
        .unwrap_or_else(|err| ContactActionResponse::failure(format!("contacts_update failed: {err}")))
}

/// Queues a delete keyed by `id`. A missing id is a no-op.
#[flutter_rust_bridge::frb(sync)]
pub fn contacts_delete(id: i64) -> ContactActionResponse {
    with_session(|service| service.delete_by_id(id).detach())
        .map(|()| ContactActionResponse::queued("Delete queued.", id))
        .unwrap_or_else(|err| ContactActionResponse::failure(format!("contacts_delete failed: {err}")))
}

/// Returns the latest published contact list.
#[flutter_rust_bridge::frb(sync)]
pub fn contacts_list() -> ContactListResponse {
    match with_session(|service| service.all_contacts().current()) {
        Ok(snapshot) => ContactListResponse::from_snapshot(&snapshot),
        Err(err) => ContactListResponse::failure(format!("contacts_list failed: {err}")),
    }
}

/// Blocks until a list newer than `after_version` is published.
///
/// # FFI contract
/// - Must be called from a background isolate; it blocks the calling thread.
/// - `timeout_ms` is clamped to 30s. On timeout the current list is returned
///   with an unchanged version.
#[flutter_rust_bridge::frb(sync)]
pub fn contacts_wait_for_change(after_version: u64, timeout_ms: u32) -> ContactListResponse {
    let (mut subscription, runtime) = match with_session_parts() {
        Ok(parts) => parts,
        Err(err) => {
            return ContactListResponse::failure(format!("contacts_wait_for_change failed: {err}"))
        }
    };

    let timeout = Duration::from_millis(u64::from(timeout_ms.min(WAIT_TIMEOUT_MAX_MS)));
    let waited = runtime.block_on(async {
        tokio::time::timeout(timeout, subscription.wait_for_version(after_version.saturating_add(1))).await
    });

    match waited {
        Ok(Some(snapshot)) => ContactListResponse::from_snapshot(&snapshot),
        Ok(None) => ContactListResponse::failure("contacts_wait_for_change failed: session ended"),
        Err(_) => ContactListResponse::from_snapshot(&subscription.current()),
    }
}

fn start_session(permission_granted: bool) -> Result<ContactSession, String> {
    let runtime = Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("contacts-worker")
        .enable_all()
        .build()
        .map_err(|err| format!("worker runtime start failed: {err}"))?;

    let db_path = resolve_contacts_db_path();
    let store =
        SqliteContactStore::open(&db_path).map_err(|err| format!("contacts DB open failed: {err}"))?;
    let service = ContactService::activate(
        ContactRepository::new(store),
        runtime.handle().clone(),
        &mut StaticPermissionGate::from_host_result(permission_granted),
    )
    .map_err(|err| err.to_string())?;

    Ok(ContactSession {
        service,
        runtime: Arc::new(runtime),
    })
}

fn lock_session() -> Result<MutexGuard<'static, Option<ContactSession>>, String> {
    SESSION
        .get_or_init(|| Mutex::new(None))
        .lock()
        .map_err(|_| "contact session lock poisoned".to_string())
}

fn with_session<T>(
    f: impl FnOnce(&ContactService<SqliteContactStore>) -> T,
) -> Result<T, String> {
    let slot = lock_session()?;
    let session = slot
        .as_ref()
        .ok_or_else(|| "no active contact session".to_string())?;
    Ok(f(&session.service))
}

fn with_session_parts() -> Result<(ContactsSubscription, Arc<Runtime>), String> {
    let slot = lock_session()?;
    let session = slot
        .as_ref()
        .ok_or_else(|| "no active contact session".to_string())?;
    Ok((
        session.service.all_contacts(),
        Arc::clone(&session.runtime),
    ))
}

fn resolve_contacts_db_path() -> PathBuf {
    CONTACTS_DB_PATH
        .get_or_init(|| {
            if let Ok(raw) = std::env::var(CONTACTS_DB_PATH_ENV) {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
            std::env::temp_dir().join(CONTACTS_DB_FILE_NAME)
        })
        .clone()
}

fn to_contact(
    id: i64,
    name: String,
    phone_number: String,
    image_reference: Option<String>,
) -> Contact {
    Contact {
        id,
        name,
        phone_number,
        image_reference,
    }
}

fn to_contact_item(contact: &Contact) -> ContactItem {
    ContactItem {
        id: contact.id,
        name: contact.name.clone(),
        phone_number: contact.phone_number.clone(),
        image_reference: contact.image_reference.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        contacts_delete, contacts_insert, contacts_list, contacts_session_end,
        contacts_session_start, contacts_update, contacts_wait_for_change, core_version,
        init_logging, ping,
    };
    use std::sync::Mutex;
    use std::time::{SystemTime, UNIX_EPOCH};

    // The session slot is process-wide; serialize tests that touch it.
    static SESSION_TEST_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_empty_log_dir() {
        let error = init_logging("info".to_string(), String::new());
        assert!(!error.is_empty());
    }

    #[test]
    fn init_logging_rejects_unsupported_level() {
        let error = init_logging("verbose".to_string(), "tmp/logs".to_string());
        assert!(!error.is_empty());
    }

    #[test]
    fn denied_permission_never_starts_a_session() {
        let _guard = SESSION_TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        contacts_session_end();

        let error = contacts_session_start(false);
        assert!(error.contains("permission denied"), "{error}");

        let listed = contacts_list();
        assert!(!listed.ok);
        let inserted = contacts_insert(1, "Bob".into(), "555".into(), None);
        assert!(!inserted.ok);
        assert!(inserted.message.contains("no active contact session"));
        assert!(!contacts_session_end());
    }

    #[test]
    fn session_round_trip_insert_update_delete() {
        let _guard = SESSION_TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        assert_eq!(contacts_session_start(true), "");
        assert_eq!(contacts_session_start(true), "", "start must be idempotent");

        let id = unique_id();
        let before = contacts_list();
        assert!(before.ok, "{}", before.message);

        let inserted = contacts_insert(
            id,
            format!("ffi-{id}"),
            "555-1000".into(),
            Some("content://photo".into()),
        );
        assert!(inserted.ok, "{}", inserted.message);
        assert_eq!(inserted.contact_id, Some(id));
        let after_insert = contacts_wait_for_change(before.version, 5_000);
        let item = after_insert
            .items
            .iter()
            .find(|item| item.id == id)
            .expect("inserted contact should be listed");
        assert_eq!(item.image_reference.as_deref(), Some("content://photo"));

        let updated = contacts_update(id, format!("ffi-{id}-renamed"), "555-1111".into(), None);
        assert!(updated.ok, "{}", updated.message);
        let after_update = contacts_wait_for_change(after_insert.version, 5_000);
        let item = after_update
            .items
            .iter()
            .find(|item| item.id == id)
            .expect("updated contact should be listed");
        assert_eq!(item.phone_number, "555-1111");
        assert_eq!(item.image_reference, None);

        assert!(contacts_delete(id).ok);
        let after_delete = contacts_wait_for_change(after_update.version, 5_000);
        assert!(after_delete.items.iter().all(|item| item.id != id));

        assert!(contacts_session_end());
    }

    #[test]
    fn session_end_applies_queued_writes_in_order() {
        let _guard = SESSION_TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        assert_eq!(contacts_session_start(true), "");

        let first = unique_id();
        let ids: Vec<i64> = (first..first + 100).collect();
        for &id in &ids {
            assert!(contacts_insert(id, format!("ffi-{id}"), "1".into(), None).ok);
            assert!(contacts_update(id, format!("ffi-{id}"), "2".into(), None).ok);
        }
        assert!(contacts_session_end());

        assert_eq!(contacts_session_start(true), "");
        let listed = contacts_list();
        for &id in &ids {
            let item = listed
                .items
                .iter()
                .find(|item| item.id == id)
                .expect("queued insert should be applied before session end");
            assert_eq!(item.phone_number, "2");
        }
        for &id in &ids {
            contacts_delete(id);
        }
        assert!(contacts_session_end());
    }

    #[test]
    fn wait_for_change_times_out_with_current_list() {
        let _guard = SESSION_TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        assert_eq!(contacts_session_start(true), "");

        let current = contacts_list();
        let waited = contacts_wait_for_change(current.version, 20);
        assert!(waited.ok);
        assert_eq!(waited.version, current.version);

        assert!(contacts_session_end());
    }

    fn unique_id() -> i64 {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time went backwards")
            .as_nanos();
        // Leaves headroom for callers that allocate consecutive ids.
        (nanos % (i64::MAX as u128 / 2)) as i64
    }
}
