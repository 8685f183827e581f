mod common;

use std::sync::Arc;

use common::*;
use netabase_orm::prelude::*;

#[test]
fn test_put_with_generated_keys() {
    init_logging();
    let counters = counter_bucket();
    let mut db = MemoryStore::new();

    let first = counters.put(&mut db, &[], counter("alice", 1)).unwrap();
    let second = counters.put(&mut db, &[], counter("bob", 2)).unwrap();
    assert_eq!(first, hex_key(1));
    assert_eq!(second, hex_key(2));

    let mut loaded = Counter::default();
    counters.one(&db, &first, &mut loaded).unwrap();
    assert_eq!(loaded, counter("alice", 1));

    // raw layout
    assert!(db.has(b"cnt:\x00\x00\x00\x00\x00\x00\x00\x01").unwrap());
    assert_eq!(Sequence::new("cnt", "id").curr_val(&db).unwrap(), 2);
}

fn hex_key(n: u64) -> Vec<u8> {
    n.to_be_bytes().to_vec()
}

#[test]
fn test_put_with_explicit_key_overwrites() {
    let counters = counter_bucket();
    let mut db = MemoryStore::new();

    let key = counters.put(&mut db, b"mine", counter("alice", 1)).unwrap();
    assert_eq!(key, b"mine".to_vec());
    counters.put(&mut db, b"mine", counter("alice", 5)).unwrap();

    let mut loaded = Counter::default();
    counters.one(&db, b"mine", &mut loaded).unwrap();
    assert_eq!(loaded.count, 5);
    // explicit keys do not touch the sequence
    assert_eq!(counters.id_sequence().curr_val(&db).unwrap(), 0);
}

#[test]
fn test_invalid_model_is_not_stored() {
    let counters = counter_bucket();
    let mut db = MemoryStore::new();

    let err = counters.put(&mut db, b"k", counter("", 1)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationFailed);
    assert!(db.is_empty());
}

#[test]
fn test_one_missing_key() {
    let counters = counter_bucket();
    let db = MemoryStore::new();
    let mut dest = counter("untouched", 7);

    let err = counters.one(&db, b"missing", &mut dest).unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(dest, counter("untouched", 7));
}

#[test]
fn test_one_with_undecodable_stored_value() {
    // the destination type is fixed by the bucket, so a mismatch can only
    // show up as bytes the model cannot decode
    let counters = counter_bucket();
    let mut db = MemoryStore::new();
    db.set(b"cnt:k", &[0xFB]).unwrap();

    let mut dest = counter("untouched", 1);
    let err = counters.one(&db, b"k", &mut dest).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Encoding);
    assert_eq!(dest, counter("untouched", 1));
}

#[test]
fn test_by_index_returns_exact_matches() {
    let counters = counter_bucket();
    let mut db = MemoryStore::new();
    counters.put(&mut db, b"c", counter("alice", 3)).unwrap();
    counters.put(&mut db, b"a", counter("alice", 1)).unwrap();
    counters.put(&mut db, b"b", counter("bob", 2)).unwrap();

    let mut found: Vec<Counter> = Vec::new();
    let keys = counters.by_index(&db, "owner", b"alice", &mut found).unwrap();
    assert_eq!(keys, vec![b"a".to_vec(), b"c".to_vec()]);
    assert_eq!(found, vec![counter("alice", 1), counter("alice", 3)]);

    let mut none: Vec<Arc<Counter>> = Vec::new();
    let keys = counters.by_index(&db, "owner", b"carol", &mut none).unwrap();
    assert!(keys.is_empty());
    assert!(none.is_empty());
}

#[test]
fn test_by_index_unknown_index() {
    let counters = counter_bucket();
    let db = MemoryStore::new();
    let mut found: Vec<Counter> = Vec::new();
    let err = counters.by_index(&db, "colour", b"red", &mut found).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidIndex);
    assert!(counters.index("colour").is_err());
}

#[test]
fn test_update_moves_index_entry() {
    let counters = counter_bucket();
    let mut db = MemoryStore::new();
    counters.put(&mut db, b"k", counter("alice", 1)).unwrap();
    counters.put(&mut db, b"k", counter("bob", 1)).unwrap();

    let owner = counters.index("owner").unwrap();
    assert!(owner.primary_keys(&db, b"alice").unwrap().is_empty());
    assert_eq!(owner.primary_keys(&db, b"bob").unwrap(), vec![b"k".to_vec()]);
}

#[test]
fn test_delete_removes_row_and_references() {
    let counters = counter_bucket();
    let mut db = MemoryStore::new();
    let key = counters.put(&mut db, &[], counter("alice", 1)).unwrap();
    counters.put(&mut db, &[], counter("alice", 2)).unwrap();

    counters.delete(&mut db, &key).unwrap();

    let mut dest = Counter::default();
    assert!(counters.one(&db, &key, &mut dest).unwrap_err().is_not_found());
    assert!(counters.has(&db, &key).unwrap_err().is_not_found());

    let mut found: Vec<Counter> = Vec::new();
    let keys = counters.by_index(&db, "owner", b"alice", &mut found).unwrap();
    assert_eq!(keys, vec![hex_key(2)]);

    let err = counters.delete(&mut db, &key).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_unique_index_rejects_second_owner() {
    let accounts = ModelBucket::<Counter>::builder("acct")
        .with_index(
            "owner",
            Indexer::single(|c: &Counter| Ok(Some(c.owner.clone().into_bytes()))),
            true,
        )
        .build()
        .unwrap();
    let mut db = MemoryStore::new();
    accounts.put(&mut db, b"one", counter("alice", 1)).unwrap();
    let before = db.clone();

    let err = accounts.put(&mut db, b"two", counter("alice", 2)).unwrap_err();
    assert!(err.is_duplicate());
    assert_eq!(db, before);

    // the holder itself can be rewritten
    accounts.put(&mut db, b"one", counter("alice", 9)).unwrap();
    let mut found: Vec<Counter> = Vec::new();
    accounts.by_index(&db, "owner", b"alice", &mut found).unwrap();
    assert_eq!(found, vec![counter("alice", 9)]);
}

#[test]
fn test_unique_violation_on_generated_key_burns_the_id() {
    let accounts = ModelBucket::<Counter>::builder("acct")
        .with_index(
            "owner",
            Indexer::single(|c: &Counter| Ok(Some(c.owner.clone().into_bytes()))),
            true,
        )
        .build()
        .unwrap();
    let mut db = MemoryStore::new();
    accounts.put(&mut db, &[], counter("alice", 1)).unwrap();
    assert!(accounts.put(&mut db, &[], counter("alice", 2)).is_err());

    let key = accounts.put(&mut db, &[], counter("bob", 3)).unwrap();
    assert_eq!(key, hex_key(3));
}

#[test]
fn test_multi_key_native_index() {
    let tags = ModelBucket::<Counter>::builder("tagged")
        .with_native_index(
            "letters",
            Indexer::multi(|c: &Counter| {
                Ok(c.owner.bytes().map(|b| vec![b]).collect())
            }),
        )
        .build()
        .unwrap();
    let mut db = MemoryStore::new();
    tags.put(&mut db, b"2", counter("ab", 0)).unwrap();
    tags.put(&mut db, b"1", counter("ba", 0)).unwrap();
    tags.put(&mut db, b"3", counter("c", 0)).unwrap();

    let letters = tags.index("letters").unwrap();
    assert_eq!(letters.kind(), IndexKind::Native);
    assert!(!letters.is_unique());

    let streamed: Vec<Vec<u8>> = letters
        .keys_iter(&db, b"a")
        .unwrap()
        .collect::<NetabaseResult<_>>()
        .unwrap();
    assert_eq!(streamed, vec![b"1".to_vec(), b"2".to_vec()]);

    let mut found: Vec<Box<Counter>> = Vec::new();
    let keys = tags.by_index(&db, "letters", b"c", &mut found).unwrap();
    assert_eq!(keys, vec![b"3".to_vec()]);
    assert_eq!(found[0].owner, "c");
}

#[test]
fn test_query_router_exposes_bucket_and_indexes() {
    let counters = counter_bucket();
    let mut db = MemoryStore::new();
    counters.put(&mut db, b"a1", counter("alice", 1)).unwrap();
    counters.put(&mut db, b"a2", counter("alice", 2)).unwrap();
    counters.put(&mut db, b"b1", counter("bob", 3)).unwrap();

    let mut router = QueryRouter::new();
    counters.register("counters", &mut router).unwrap();
    assert!(counters.register("counters", &mut router).is_err());

    let rows = router.query(&db, "counters", QueryMode::Key, b"b1").unwrap();
    assert_eq!(rows.len(), 1);
    let mut decoded = Counter::default();
    decoded.unmarshal(&rows[0].1).unwrap();
    assert_eq!(decoded, counter("bob", 3));

    let rows = router.query(&db, "counters", QueryMode::Prefix, b"a").unwrap();
    let keys: Vec<Vec<u8>> = rows.into_iter().map(|(k, _)| k).collect();
    assert_eq!(keys, vec![b"a1".to_vec(), b"a2".to_vec()]);

    let rows = router.query(&db, "counters/owner", QueryMode::Key, b"alice").unwrap();
    assert_eq!(rows.len(), 2);
    assert!(router.query(&db, "counters/owner", QueryMode::Prefix, b"a").is_err());
}

#[test]
fn test_untyped_bucket_round_trip() {
    let bucket = Bucket::new("cnt", ModelFactory::of::<Counter>()).unwrap();
    let mut db = MemoryStore::new();
    bucket
        .save(&mut db, &Object::from_model(b"k".to_vec(), counter("alice", 4)))
        .unwrap();

    let obj = bucket.get(&db, b"k").unwrap().unwrap();
    assert_eq!(obj.key(), b"k");
    assert_eq!(obj.into_model::<Counter>().unwrap(), counter("alice", 4));
    assert!(bucket.get(&db, b"other").unwrap().is_none());

    let typed = ModelBucket::<Counter>::from_bucket(bucket).unwrap();
    typed.has(&db, b"k").unwrap();
}
