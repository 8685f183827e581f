// Common test models and helpers
#![allow(dead_code)]

use std::sync::Arc;

use netabase_orm::migration::validate_metadata;
use netabase_orm::prelude::*;

/// Address of the migration administrator used by the tests
pub const ADMIN: [u8; 20] = [0xAA; 20];

/// Some other account
pub const MALLORY: [u8; 20] = [0x66; 20];

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Unversioned model encoded with bincode
#[derive(Debug, Clone, Default, PartialEq, Eq, Encode, Decode)]
pub struct Counter {
    pub owner: String,
    pub count: u64,
}

impl Model for Counter {
    fn marshal(&self) -> NetabaseResult<Vec<u8>> {
        codec::encode(self)
    }

    fn unmarshal(&mut self, bytes: &[u8]) -> NetabaseResult<()> {
        *self = codec::decode(bytes)?;
        Ok(())
    }

    fn validate(&self) -> NetabaseResult<()> {
        if self.owner.is_empty() {
            return Err(NetabaseError::Input("owner is required".into()));
        }
        Ok(())
    }
}

pub fn counter(owner: &str, count: u64) -> Counter {
    Counter {
        owner: owner.to_string(),
        count,
    }
}

/// Counters indexed by owner (compact, non-unique)
pub fn counter_bucket() -> ModelBucket<Counter> {
    ModelBucket::builder("cnt")
        .with_index(
            "owner",
            Indexer::single(|c: &Counter| Ok(Some(c.owner.clone().into_bytes()))),
            false,
        )
        .build()
        .unwrap()
}

/// Versioned model with a protobuf encoding
#[derive(Clone, PartialEq, prost::Message)]
pub struct Note {
    #[prost(message, optional, tag = "1")]
    pub metadata: Option<Metadata>,
    #[prost(string, tag = "2")]
    pub author: String,
    #[prost(string, tag = "3")]
    pub text: String,
}

impl Model for Note {
    fn marshal(&self) -> NetabaseResult<Vec<u8>> {
        Ok(prost::Message::encode_to_vec(self))
    }

    fn unmarshal(&mut self, bytes: &[u8]) -> NetabaseResult<()> {
        *self = <Note as prost::Message>::decode(bytes)?;
        Ok(())
    }

    fn validate(&self) -> NetabaseResult<()> {
        validate_metadata(self.metadata.as_ref())?;
        if self.author.is_empty() {
            return Err(NetabaseError::Input("author is required".into()));
        }
        Ok(())
    }
}

impl Migratable for Note {
    const PACKAGE: &'static str = "notes";

    fn metadata(&self) -> Option<&Metadata> {
        self.metadata.as_ref()
    }

    fn metadata_mut(&mut self) -> &mut Metadata {
        self.metadata.get_or_insert_with(Metadata::default)
    }
}

pub fn note(schema: u32, author: &str, text: &str) -> Note {
    Note {
        metadata: Some(Metadata::new(schema)),
        author: author.to_string(),
        text: text.to_string(),
    }
}

/// v2 of the notes package stores the text upper-cased
pub fn shout(note: &mut Note) -> NetabaseResult<()> {
    note.text = note.text.to_uppercase();
    Ok(())
}

/// v3 prefixes the author with `@`
pub fn mention(note: &mut Note) -> NetabaseResult<()> {
    note.author = format!("@{}", note.author);
    Ok(())
}

/// Registry knowing the notes package up to `max` (at most 3)
pub fn registry(max: u32) -> Arc<MigrationRegistry> {
    let steps: [Migrator<Note>; 3] = [no_modification::<Note>, shout, mention];
    let mut builder = MigrationRegistry::builder();
    for (i, step) in steps.into_iter().take(max as usize).enumerate() {
        builder.register::<Note>(i as u32 + 1, step).unwrap();
    }
    Arc::new(builder.build().unwrap())
}

/// Notes bucket with schema enforcement and a native author index
pub fn note_bucket(registry: Arc<MigrationRegistry>) -> ModelBucket<Note> {
    ModelBucket::builder("note")
        .with_native_index(
            "author",
            Indexer::single(|n: &Note| Ok(Some(n.author.clone().into_bytes()))),
        )
        .with_migration(registry)
        .build()
        .unwrap()
}

/// Same namespace without schema checks, used to plant data written by
/// other code versions
pub fn raw_note_bucket() -> ModelBucket<Note> {
    ModelBucket::builder("note")
        .with_native_index(
            "author",
            Indexer::single(|n: &Note| Ok(Some(n.author.clone().into_bytes()))),
        )
        .build()
        .unwrap()
}

/// A memory store with migration genesis applied
pub fn genesis_store(registry: &MigrationRegistry) -> MemoryStore {
    let mut db = MemoryStore::new();
    genesis(&mut db, registry, &ADMIN).unwrap();
    db
}
