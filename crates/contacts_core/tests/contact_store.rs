use contacts_core::db::open_db;
use contacts_core::{Contact, ContactStore, SqliteContactStore, StoreError, WriteOutcome};

fn bob() -> Contact {
    Contact::new(1, "Bob", "555-1000")
}

fn ann() -> Contact {
    Contact::new(2, "Ann", "555-2000")
}

#[test]
fn insert_then_query_all_orders_by_name() {
    let store = SqliteContactStore::open_in_memory().unwrap();

    assert_eq!(store.insert(&bob()).unwrap(), WriteOutcome::Applied);
    assert_eq!(store.insert(&ann()).unwrap(), WriteOutcome::Applied);

    assert_eq!(store.query_all().unwrap(), vec![ann(), bob()]);
}

#[test]
fn insert_with_existing_id_keeps_original_row() {
    let store = SqliteContactStore::open_in_memory().unwrap();
    store.insert(&bob()).unwrap();

    let impostor = Contact::new(1, "Mallory", "555-6666").with_image("content://x");
    assert_eq!(store.insert(&impostor).unwrap(), WriteOutcome::Unchanged);

    assert_eq!(store.get(1).unwrap(), Some(bob()));
    assert_eq!(store.query_all().unwrap().len(), 1);
}

#[test]
fn update_replaces_all_fields() {
    let store = SqliteContactStore::open_in_memory().unwrap();
    store.insert(&bob().with_image("content://old")).unwrap();

    let bobby = Contact::new(1, "Bobby", "555-1111");
    assert_eq!(store.update(&bobby).unwrap(), WriteOutcome::Applied);

    assert_eq!(store.get(1).unwrap(), Some(bobby));
}

#[test]
fn update_of_missing_id_creates_nothing() {
    let store = SqliteContactStore::open_in_memory().unwrap();
    store.insert(&ann()).unwrap();

    assert_eq!(store.update(&bob()).unwrap(), WriteOutcome::Unchanged);

    assert_eq!(store.query_all().unwrap(), vec![ann()]);
    assert!(store.get(1).unwrap().is_none());
}

#[test]
fn delete_of_missing_id_is_a_no_op() {
    let store = SqliteContactStore::open_in_memory().unwrap();
    store.insert(&ann()).unwrap();

    assert_eq!(store.delete(&bob()).unwrap(), WriteOutcome::Unchanged);
    assert_eq!(store.query_all().unwrap(), vec![ann()]);
}

#[test]
fn delete_is_idempotent() {
    let store = SqliteContactStore::open_in_memory().unwrap();
    store.insert(&bob()).unwrap();
    store.insert(&ann()).unwrap();

    assert_eq!(store.delete(&bob()).unwrap(), WriteOutcome::Applied);
    let after_first = store.query_all().unwrap();
    assert_eq!(store.delete(&bob()).unwrap(), WriteOutcome::Unchanged);
    let after_second = store.query_all().unwrap();

    assert_eq!(after_first, vec![ann()]);
    assert_eq!(after_first, after_second);
}

#[test]
fn delete_matches_on_id_only() {
    let store = SqliteContactStore::open_in_memory().unwrap();
    store.insert(&bob()).unwrap();

    let stale = Contact::new(1, "Old name", "000");
    assert_eq!(store.delete(&stale).unwrap(), WriteOutcome::Applied);
    assert!(store.query_all().unwrap().is_empty());
}

#[test]
fn scenario_insert_update_delete() {
    let store = SqliteContactStore::open_in_memory().unwrap();
    store.insert(&bob()).unwrap();
    store.insert(&ann()).unwrap();
    assert_eq!(names(&store), vec!["Ann", "Bob"]);

    store.update(&Contact::new(1, "Bobby", "555-1111")).unwrap();
    assert_eq!(names(&store), vec!["Ann", "Bobby"]);

    store.delete_by_id(2).unwrap();
    assert_eq!(names(&store), vec!["Bobby"]);
}

#[test]
fn ordering_is_case_sensitive_with_id_tiebreak() {
    let store = SqliteContactStore::open_in_memory().unwrap();
    store.insert(&Contact::new(3, "bob", "1")).unwrap();
    store.insert(&Contact::new(2, "Bob", "2")).unwrap();
    store.insert(&Contact::new(1, "Bob", "3")).unwrap();
    store.insert(&Contact::new(4, "Ann", "4")).unwrap();

    let ids: Vec<_> = store.query_all().unwrap().iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![4, 1, 2, 3]);
}

#[test]
fn applied_writes_publish_new_snapshot_versions() {
    let store = SqliteContactStore::open_in_memory().unwrap();
    let subscription = store.subscribe();
    assert_eq!(subscription.current().version(), 0);
    assert!(subscription.current().is_empty());

    store.insert(&bob()).unwrap();
    store.insert(&ann()).unwrap();
    let snapshot = subscription.current();
    assert_eq!(snapshot.version(), 2);
    assert_eq!(snapshot.contacts(), &[ann(), bob()]);
}

#[test]
fn no_op_writes_do_not_publish() {
    let store = SqliteContactStore::open_in_memory().unwrap();
    store.insert(&bob()).unwrap();
    let subscription = store.subscribe();

    store.insert(&bob()).unwrap();
    store.update(&ann()).unwrap();
    store.delete(&ann()).unwrap();

    assert_eq!(subscription.current().version(), 1);
    assert_eq!(store.version(), 1);
}

#[test]
fn storage_failure_propagates_and_keeps_last_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("contacts.db");
    let store = SqliteContactStore::open(&path).unwrap();
    store.insert(&bob()).unwrap();
    let subscription = store.subscribe();

    let side = open_db(&path).unwrap();
    side.execute_batch(
        "CREATE TRIGGER fail_writes BEFORE INSERT ON contacts
         BEGIN
             SELECT RAISE(ABORT, 'simulated disk failure');
         END;",
    )
    .unwrap();

    let err = store.insert(&ann()).unwrap_err();
    assert!(matches!(err, StoreError::Db(_)));
    assert!(err.to_string().contains("simulated disk failure"));
    assert_eq!(subscription.current().version(), 1);
    assert_eq!(subscription.current().contacts(), &[bob()]);

    side.execute_batch("DROP TRIGGER fail_writes;").unwrap();

    assert_eq!(store.insert(&ann()).unwrap(), WriteOutcome::Applied);
    assert_eq!(subscription.current().version(), 2);
    assert_eq!(subscription.current().names(), vec!["Ann", "Bob"]);
}

#[test]
fn rows_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("contacts.db");
    {
        let store = SqliteContactStore::open(&path).unwrap();
        store
            .insert(&bob().with_image("content://contacts/1/photo"))
            .unwrap();
    }

    let store = SqliteContactStore::open(&path).unwrap();
    let loaded = store.get(1).unwrap().unwrap();
    assert_eq!(
        loaded.image_reference.as_deref(),
        Some("content://contacts/1/photo")
    );
    assert_eq!(store.subscribe().current().len(), 1);
}

fn names(store: &SqliteContactStore) -> Vec<String> {
    store
        .query_all()
        .unwrap()
        .into_iter()
        .map(|contact| contact.name)
        .collect()
}
