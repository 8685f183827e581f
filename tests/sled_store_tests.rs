#![cfg(feature = "sled")]
mod common;

use common::*;
use netabase_orm::prelude::*;

fn open(path: &std::path::Path) -> SledStore {
    let config = StoreConfig::builder().path(path).flush_every_ms(None).build();
    SledStore::open(&config).unwrap()
}

#[test]
fn test_sled_store_creation() {
    let temp_dir = tempfile::tempdir().unwrap();
    let store = open(temp_dir.path());
    assert!(store.is_empty());

    let temporary = SledStore::temporary().unwrap();
    assert_eq!(temporary.len(), 0);
}

#[test]
fn test_generated_keys_survive_restart() {
    init_logging();
    let temp_dir = tempfile::tempdir().unwrap();
    let counters = counter_bucket();

    {
        let mut store = open(temp_dir.path());
        assert_eq!(counters.put(&mut store, &[], counter("alice", 1)).unwrap(), 1u64.to_be_bytes().to_vec());
        assert_eq!(counters.put(&mut store, &[], counter("bob", 2)).unwrap(), 2u64.to_be_bytes().to_vec());
        store.flush().unwrap();
    }

    let mut store = open(temp_dir.path());
    let key = counters.put(&mut store, &[], counter("carol", 3)).unwrap();
    assert_eq!(key, 3u64.to_be_bytes().to_vec());

    let mut loaded = Counter::default();
    counters.one(&store, &1u64.to_be_bytes(), &mut loaded).unwrap();
    assert_eq!(loaded, counter("alice", 1));

    let mut found: Vec<Counter> = Vec::new();
    counters.by_index(&store, "owner", b"bob", &mut found).unwrap();
    assert_eq!(found, vec![counter("bob", 2)]);
}

#[test]
fn test_duplicate_leaves_sled_untouched() {
    let store_dir = tempfile::tempdir().unwrap();
    let mut store = open(store_dir.path());
    let accounts = ModelBucket::<Counter>::builder("acct")
        .with_index(
            "owner",
            Indexer::single(|c: &Counter| Ok(Some(c.owner.clone().into_bytes()))),
            true,
        )
        .build()
        .unwrap();

    accounts.put(&mut store, b"one", counter("alice", 1)).unwrap();
    let entries = store.len();

    let err = accounts.put(&mut store, b"two", counter("alice", 2)).unwrap_err();
    assert!(err.is_duplicate());
    assert_eq!(store.len(), entries);
    assert!(accounts.has(&store, b"two").is_err());
}

#[test]
fn test_iter_all_on_sled() {
    let mut store = SledStore::temporary().unwrap();
    let counters = counter_bucket();
    for owner in ["b", "a", "c"] {
        counters.put(&mut store, owner.as_bytes(), counter(owner, 0)).unwrap();
    }

    let mut it = iter_all("cnt");
    let mut dest = Counter::default();
    let mut keys = Vec::new();
    while let Ok(key) = it.next(&store, &mut dest) {
        keys.push(key);
    }
    assert_eq!(keys, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);
}

#[test]
fn test_migration_state_on_sled() {
    let registry = registry(2);
    let mut store = SledStore::temporary().unwrap();
    genesis(&mut store, &registry, &ADMIN).unwrap();

    UpgradeSchemaHandler::new(registry.clone())
        .deliver(&mut store, &ADMIN, &UpgradeSchemaMsg::new("notes", 2))
        .unwrap();
    assert_eq!(registry.current_version(&store, "notes").unwrap(), 2);

    let notes = note_bucket(registry);
    notes.put(&mut store, &[], note(2, "ann", "hi")).unwrap();
}
