//! The document store the fuse layer runs on top of.
//!
//! [`Store`] is the only seam between the facade and a concrete backend. The
//! crate ships [`InMemoryStore`]; remote backends implement the same trait.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::fuse::api::CompiledQuery;
use crate::fuse::error::FuseResult;
use crate::fuse::model::DocumentKey;

mod in_memory;

pub use in_memory::InMemoryStore;

/// Field map of a stored document.
pub type FieldMap = Map<String, Value>;

/// A document as the store returns it: its id plus its fields.
///
/// The id is the document key, not part of `fields`.
#[derive(Clone, Debug, PartialEq)]
pub struct RawDocument {
    pub id: String,
    pub fields: FieldMap,
}

impl RawDocument {
    pub fn new(id: impl Into<String>, fields: FieldMap) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }
}

/// Where a read may be served from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Source {
    /// Only the local cache; never contacts the server.
    CacheOnly,
    /// Only the server; fails when it cannot be reached.
    ServerOnly,
    /// The server, falling back to the cache when it cannot be reached.
    #[default]
    ServerOrCache,
}

#[derive(Clone, Debug, PartialEq)]
pub enum WriteOperation {
    Set {
        key: DocumentKey,
        fields: FieldMap,
        merge: bool,
    },
    Update {
        key: DocumentKey,
        fields: FieldMap,
    },
    Delete {
        key: DocumentKey,
    },
}

pub type DocumentListener = Arc<dyn Fn(FuseResult<Option<RawDocument>>) + Send + Sync + 'static>;
pub type QueryListener = Arc<dyn Fn(FuseResult<Vec<RawDocument>>) + Send + Sync + 'static>;

/// A live store listener.
///
/// `remove` must be idempotent and callable from any thread. Once it returns
/// the listener may receive at most one more, already in-flight, callback.
pub trait ListenerRegistration: Send + Sync {
    fn remove(&self);
}

/// Get/set/update/delete/query/listen primitives over collections of documents.
///
/// Implementations own all concurrency safety and retry behaviour; callers
/// add no locking of their own.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Reads one document; `Ok(None)` when it does not exist.
    async fn get_document(
        &self,
        key: &DocumentKey,
        source: Source,
    ) -> FuseResult<Option<RawDocument>>;

    /// Replaces the document, or merges `fields` into it when `merge` is set.
    async fn set_document(&self, key: &DocumentKey, fields: FieldMap, merge: bool)
        -> FuseResult<()>;

    /// Overwrites the given top-level fields of an existing document.
    ///
    /// Fails with `fuse/not-found` when the document does not exist.
    async fn update_document(&self, key: &DocumentKey, fields: FieldMap) -> FuseResult<()>;

    /// Deletes the document. Deleting a missing document succeeds.
    async fn delete_document(&self, key: &DocumentKey) -> FuseResult<()>;

    async fn run_query(&self, query: &CompiledQuery, source: Source)
        -> FuseResult<Vec<RawDocument>>;

    /// Applies every write or none of them.
    async fn commit(&self, writes: Vec<WriteOperation>) -> FuseResult<()>;

    /// Registers a listener that receives the current document immediately
    /// and again after every change.
    fn listen_document(
        &self,
        key: &DocumentKey,
        listener: DocumentListener,
    ) -> FuseResult<Box<dyn ListenerRegistration>>;

    /// Registers a listener that receives the current result set immediately
    /// and again after every change to the queried collection.
    fn listen_query(
        &self,
        query: &CompiledQuery,
        listener: QueryListener,
    ) -> FuseResult<Box<dyn ListenerRegistration>>;
}
