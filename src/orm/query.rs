//! Read-only query routing.
//!
//! A [`QueryRouter`] maps paths to handlers that answer raw `(key, value)`
//! lookups against a store. Buckets register themselves with
//! [`Bucket::register`](super::Bucket::register); applications may add their
//! own handlers.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

use strum::{AsRefStr, Display, EnumString};

use super::bucket::Bucket;
use crate::error::{NetabaseError, NetabaseResult};
use crate::traits::store::{KvPair, ReadOnlyKvStore, prefix_end};

/// How the query data is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, AsRefStr, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum QueryMode {
    /// Exact key match.
    #[default]
    Key,
    /// Every key starting with the data.
    Prefix,
}

impl QueryMode {
    /// Parse a mode name, defaulting to [`QueryMode::Key`] when empty.
    pub fn parse(mode: &str) -> NetabaseResult<Self> {
        if mode.is_empty() {
            return Ok(QueryMode::Key);
        }
        QueryMode::from_str(mode)
            .map_err(|_| NetabaseError::Input(format!("unknown query mode {mode:?}")))
    }
}

/// Answers queries for one path.
pub trait QueryHandler: Send + Sync {
    fn query(
        &self,
        db: &dyn ReadOnlyKvStore,
        mode: QueryMode,
        data: &[u8],
    ) -> NetabaseResult<Vec<KvPair>>;
}

/// Path to handler table.
#[derive(Default, Clone)]
pub struct QueryRouter {
    handlers: BTreeMap<String, Arc<dyn QueryHandler>>,
}

impl QueryRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `handler` to `path`. Each path can be bound only once.
    pub fn register<H: QueryHandler + 'static>(
        &mut self,
        path: &str,
        handler: H,
    ) -> NetabaseResult<()> {
        if self.handlers.contains_key(path) {
            return Err(NetabaseError::Duplicate(format!("query path {path}")));
        }
        self.handlers.insert(path.to_string(), Arc::new(handler));
        Ok(())
    }

    pub fn handler(&self, path: &str) -> Option<Arc<dyn QueryHandler>> {
        self.handlers.get(path).cloned()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    pub fn query(
        &self,
        db: &dyn ReadOnlyKvStore,
        path: &str,
        mode: QueryMode,
        data: &[u8],
    ) -> NetabaseResult<Vec<KvPair>> {
        let handler = self
            .handlers
            .get(path)
            .ok_or_else(|| NetabaseError::NotFound(format!("query path {path}")))?;
        handler.query(db, mode, data)
    }
}

impl std::fmt::Debug for QueryRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.handlers.keys()).finish()
    }
}

/// Primary key lookups on a bucket namespace. Returned keys have the bucket
/// prefix stripped.
#[derive(Debug, Clone)]
pub struct BucketQuery {
    prefix: Vec<u8>,
}

impl BucketQuery {
    pub fn new(prefix: Vec<u8>) -> Self {
        Self { prefix }
    }

    fn db_key(&self, data: &[u8]) -> Vec<u8> {
        let mut key = self.prefix.clone();
        key.extend_from_slice(data);
        key
    }
}

impl QueryHandler for BucketQuery {
    fn query(
        &self,
        db: &dyn ReadOnlyKvStore,
        mode: QueryMode,
        data: &[u8],
    ) -> NetabaseResult<Vec<KvPair>> {
        let start = self.db_key(data);
        match mode {
            QueryMode::Key => Ok(db
                .get(&start)?
                .map(|value| vec![(data.to_vec(), value)])
                .unwrap_or_default()),
            QueryMode::Prefix => {
                let end = prefix_end(&start);
                let skip = self.prefix.len();
                db.iterator(&start, end.as_deref())?
                    .map(|kv| kv.map(|(key, value)| (key[skip..].to_vec(), value)))
                    .collect()
            }
        }
    }
}

/// Secondary index lookups. Answers with the primary keys and raw values of
/// every model indexed under the query data.
#[derive(Debug, Clone)]
pub struct IndexQuery {
    bucket: Bucket,
    index: String,
}

impl IndexQuery {
    pub fn new(bucket: Bucket, index: &str) -> Self {
        Self {
            bucket,
            index: index.to_string(),
        }
    }
}

impl QueryHandler for IndexQuery {
    fn query(
        &self,
        db: &dyn ReadOnlyKvStore,
        mode: QueryMode,
        data: &[u8],
    ) -> NetabaseResult<Vec<KvPair>> {
        if mode != QueryMode::Key {
            return Err(NetabaseError::Input(format!(
                "index {} only supports key queries",
                self.index
            )));
        }
        let index = self.bucket.index(&self.index)?;
        let mut found = Vec::new();
        for primary in index.keys_iter(db, data)? {
            let primary = primary?;
            if let Some(value) = db.get(&self.bucket.db_key(&primary))? {
                found.push((primary, value));
            }
        }
        Ok(found)
    }
}
