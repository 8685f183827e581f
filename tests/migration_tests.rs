mod common;

use common::*;
use netabase_orm::migration::{SCHEMA_BUCKET, load_configuration};
use netabase_orm::prelude::*;

#[test]
fn test_genesis_initialises_registered_packages() {
    init_logging();
    let registry = registry(3);
    let mut db = genesis_store(&registry);

    assert_eq!(registry.current_version(&db, "notes").unwrap(), 1);
    assert_eq!(registry.current_version(&db, "migration").unwrap(), 1);
    assert!(registry.current_version(&db, "ghosts").unwrap_err().is_not_found());
    assert_eq!(load_configuration(&db).unwrap().admin, ADMIN.to_vec());

    // running it again keeps existing versions
    let handler = UpgradeSchemaHandler::new(registry.clone());
    handler
        .deliver(&mut db, &ADMIN, &UpgradeSchemaMsg::new("notes", 2))
        .unwrap();
    genesis(&mut db, &registry, &ADMIN).unwrap();
    assert_eq!(registry.current_version(&db, "notes").unwrap(), 2);
}

#[test]
fn test_genesis_rejects_malformed_admin() {
    let registry = registry(1);
    let mut db = MemoryStore::new();
    let err = genesis(&mut db, &registry, &[1, 2, 3]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationFailed);
    assert!(db.is_empty());
}

#[test]
fn test_genesis_keeps_the_first_administrator() {
    let registry = registry(2);
    let mut db = genesis_store(&registry);
    let before = db.clone();

    let err = genesis(&mut db, &registry, &MALLORY).unwrap_err();
    assert!(err.is_duplicate());
    assert_eq!(db, before);
    assert_eq!(load_configuration(&db).unwrap().admin, ADMIN.to_vec());

    let handler = UpgradeSchemaHandler::new(registry.clone());
    let err = handler
        .deliver(&mut db, &MALLORY, &UpgradeSchemaMsg::new("notes", 2))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidUpgrade);
    assert_eq!(registry.current_version(&db, "notes").unwrap(), 1);
}

#[test]
fn test_schema_too_new_leaves_destination_untouched() {
    let registry = registry(3);
    let mut db = genesis_store(&registry);
    raw_note_bucket()
        .put(&mut db, b"n1", note(2, "ann", "written by newer code"))
        .unwrap();

    let notes = note_bucket(registry.clone());
    let mut dest = note(1, "keep", "me");
    let err = notes.one(&db, b"n1", &mut dest).unwrap_err();
    match err {
        NetabaseError::SchemaTooNew {
            package,
            found,
            supported,
        } => {
            assert_eq!(package, "notes");
            assert_eq!(found, 2);
            assert_eq!(supported, 1);
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(dest, note(1, "keep", "me"));

    let mut found: Vec<Note> = vec![note(1, "already", "here")];
    let err = notes.by_index(&db, "author", b"ann", &mut found).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SchemaTooNew);
    assert_eq!(found.len(), 1);
}

#[test]
fn test_put_refuses_models_ahead_of_the_chain() {
    let registry = registry(2);
    let mut db = genesis_store(&registry);
    let notes = note_bucket(registry.clone());

    let before = db.clone();
    let err = notes.put(&mut db, &[], note(2, "ann", "too early")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SchemaTooNew);
    assert_eq!(db, before);

    notes.put(&mut db, &[], note(1, "ann", "fine")).unwrap();
}

#[test]
fn test_guarded_bucket_needs_genesis() {
    let notes = note_bucket(registry(1));
    let mut db = MemoryStore::new();
    let err = notes.put(&mut db, b"n1", note(1, "ann", "hi")).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_upgrade_rules() {
    let registry = registry(3);
    let mut db = genesis_store(&registry);
    let handler = UpgradeSchemaHandler::new(registry.clone());

    // skipping a version
    let err = handler
        .check(&db, &ADMIN, &UpgradeSchemaMsg::new("notes", 3))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidUpgrade);

    // wrong signer
    let err = handler
        .check(&db, &MALLORY, &UpgradeSchemaMsg::new("notes", 2))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidUpgrade);

    // re-applying the current version
    let err = handler
        .check(&db, &ADMIN, &UpgradeSchemaMsg::new("notes", 1))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidUpgrade);

    // unknown package
    let err = handler
        .check(&db, &ADMIN, &UpgradeSchemaMsg::new("ghosts", 1))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidUpgrade);

    // malformed message
    let mut bad = UpgradeSchemaMsg::new("notes", 2);
    bad.metadata = None;
    let err = handler.check(&db, &ADMIN, &bad).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationFailed);

    let before = db.clone();
    handler
        .check(&db, &ADMIN, &UpgradeSchemaMsg::new("notes", 2))
        .unwrap();
    assert_eq!(db, before);

    let schema = handler
        .deliver(&mut db, &ADMIN, &UpgradeSchemaMsg::new("notes", 2))
        .unwrap();
    assert_eq!(schema.version, 2);
    assert_eq!(registry.current_version(&db, "notes").unwrap(), 2);

    handler
        .deliver(&mut db, &ADMIN, &UpgradeSchemaMsg::new("notes", 3))
        .unwrap();

    // beyond what this node can migrate
    let err = handler
        .deliver(&mut db, &ADMIN, &UpgradeSchemaMsg::new("notes", 4))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidUpgrade);
    assert_eq!(registry.current_version(&db, "notes").unwrap(), 3);

    let history = registry.schema_bucket().history(&db, "notes").unwrap();
    assert_eq!(history.iter().map(|s| s.version).collect::<Vec<_>>(), vec![1, 2, 3]);
}

#[test]
fn test_upgrade_unlocks_newer_data() {
    let registry = registry(2);
    let mut db = genesis_store(&registry);
    raw_note_bucket()
        .put(&mut db, b"n1", note(2, "ann", "v2 data"))
        .unwrap();

    let notes = note_bucket(registry.clone());
    let mut dest = Note::default();
    assert!(notes.one(&db, b"n1", &mut dest).is_err());

    UpgradeSchemaHandler::new(registry.clone())
        .deliver(&mut db, &ADMIN, &UpgradeSchemaMsg::new("notes", 2))
        .unwrap();
    notes.one(&db, b"n1", &mut dest).unwrap();
    assert_eq!(dest.text, "v2 data");
}

#[test]
fn test_explicit_migration_applies_every_step() {
    let registry = registry(3);
    let mut db = genesis_store(&registry);
    let notes = note_bucket(registry.clone());
    notes.put(&mut db, b"n1", note(1, "ann", "hello")).unwrap();

    let handler = UpgradeSchemaHandler::new(registry.clone());
    handler
        .deliver(&mut db, &ADMIN, &UpgradeSchemaMsg::new("notes", 2))
        .unwrap();
    handler
        .deliver(&mut db, &ADMIN, &UpgradeSchemaMsg::new("notes", 3))
        .unwrap();

    // stored data is not rewritten by reads
    let mut loaded = Note::default();
    notes.one(&db, b"n1", &mut loaded).unwrap();
    assert_eq!(loaded, note(1, "ann", "hello"));

    let version = registry.migrate(&db, &mut loaded).unwrap();
    assert_eq!(version, 3);
    assert_eq!(loaded, note(3, "@ann", "HELLO"));

    // migrating again is a no-op
    registry.migrate(&db, &mut loaded).unwrap();
    assert_eq!(loaded, note(3, "@ann", "HELLO"));

    notes.put(&mut db, b"n1", loaded).unwrap();
    let mut found: Vec<Note> = Vec::new();
    notes.by_index(&db, "author", b"@ann", &mut found).unwrap();
    assert_eq!(found.len(), 1);
}

#[test]
fn test_missing_migration_step() {
    let registry = registry(2);
    let mut db = genesis_store(&registry);
    let schemas = registry.schema_bucket();
    schemas.save(&mut db, Schema::new("notes", 2)).unwrap();
    schemas.save(&mut db, Schema::new("notes", 3)).unwrap();

    let mut old = note(1, "ann", "hello");
    let err = registry.migrate(&db, &mut old).unwrap_err();
    match err {
        NetabaseError::MissingMigration { package, version } => {
            assert_eq!(package, "notes");
            assert_eq!(version, 3);
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(old, note(1, "ann", "hello"));

    let mut future = note(4, "ann", "hello");
    assert_eq!(
        registry.migrate(&db, &mut future).unwrap_err().kind(),
        ErrorKind::SchemaTooNew
    );

    let mut bare = note(1, "ann", "hello");
    bare.metadata = None;
    assert!(registry.migrate(&db, &mut bare).is_err());
}

#[test]
fn test_registration_errors() {
    let mut builder = MigrationRegistry::builder();
    builder.register::<Note>(1, no_modification).unwrap();
    let err = builder.register::<Note>(1, no_modification).err().unwrap();
    assert_eq!(err.kind(), ErrorKind::Registration);
    let err = builder.register::<Note>(3, mention).err().unwrap();
    assert_eq!(err.kind(), ErrorKind::Registration);

    let mut fresh = RegistryBuilder::new();
    assert!(fresh.register::<Note>(2, shout).is_err());
}

#[test]
fn test_schema_rows_live_in_their_own_bucket() {
    let registry = registry(1);
    let db = genesis_store(&registry);
    let mut schemas = Vec::new();
    let mut dest = Schema::default();
    let mut it = iter_all(SCHEMA_BUCKET);
    while let Ok(_key) = it.next(&db, &mut dest) {
        schemas.push(dest.pkg.clone());
    }
    schemas.sort();
    assert_eq!(schemas, vec!["migration".to_string(), "notes".to_string()]);
}
