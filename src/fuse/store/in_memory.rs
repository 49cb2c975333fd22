use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, LazyLock, Mutex, MutexGuard};

use async_channel::{unbounded, Receiver, Sender};
use async_trait::async_trait;

use crate::fuse::api::CompiledQuery;
use crate::fuse::error::{not_found, unavailable, FuseResult};
use crate::fuse::model::DocumentKey;
use crate::fuse::query_evaluator::apply_query_to_documents;
use crate::logger::Logger;
use crate::platform::runtime::spawn_detached;

use super::{
    DocumentListener, FieldMap, ListenerRegistration, QueryListener, RawDocument, Source, Store,
    WriteOperation,
};

static LOGGER: LazyLock<Logger> = LazyLock::new(|| Logger::new("@firefuse/in_memory_store"));

/// Process-local [`Store`] that keeps documents in memory.
///
/// Queries are evaluated locally and listeners are fed from a background
/// task, so callbacks never run on the thread that performed the write.
/// [`set_offline`](Self::set_offline) simulates an unreachable server for
/// source-policy handling.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<StoreInner>,
}

#[derive(Default)]
struct StoreInner {
    documents: Mutex<BTreeMap<DocumentKey, FieldMap>>,
    listeners: Mutex<BTreeMap<u64, Listener>>,
    next_listener_id: AtomicU64,
    offline: AtomicBool,
}

enum Listener {
    Document {
        key: DocumentKey,
        sender: Sender<Option<RawDocument>>,
    },
    Query {
        query: CompiledQuery,
        sender: Sender<Vec<RawDocument>>,
    },
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While offline, server-only reads fail with `fuse/unavailable` and
    /// server-or-cache reads are answered from local data.
    pub fn set_offline(&self, offline: bool) {
        self.inner.offline.store(offline, Ordering::SeqCst);
    }

    pub fn is_offline(&self) -> bool {
        self.inner.offline.load(Ordering::SeqCst)
    }

    /// Number of listeners that have not been removed.
    pub fn active_listener_count(&self) -> usize {
        self.inner.lock_listeners().len()
    }

    /// Returns the stored fields of a document, bypassing source policies.
    pub fn raw_fields(&self, key: &DocumentKey) -> Option<FieldMap> {
        self.inner.lock_documents().get(key).cloned()
    }

    fn check_source(&self, source: Source) -> FuseResult<()> {
        if source == Source::ServerOnly && self.is_offline() {
            return Err(unavailable("The in-memory store is offline"));
        }
        Ok(())
    }

    fn write(&self, writes: Vec<WriteOperation>) -> FuseResult<()> {
        let changed: Vec<DocumentKey> = writes.iter().map(write_key).cloned().collect();
        {
            let mut documents = self.inner.lock_documents();
            let mut staged = documents.clone();
            for write in writes {
                apply_write(&mut staged, write)?;
            }
            *documents = staged;
        }
        self.inner.notify(&changed);
        Ok(())
    }

    fn register<S, F>(
        &self,
        snapshot: impl FnOnce(&StoreInner) -> S,
        listener: impl FnOnce(Sender<S>) -> Listener,
        deliver: F,
    ) -> Box<dyn ListenerRegistration>
    where
        S: Send + 'static,
        F: Fn(S) + Send + Sync + 'static,
    {
        let id = self.inner.next_listener_id.fetch_add(1, Ordering::SeqCst);
        let active = Arc::new(AtomicBool::new(true));
        let (sender, receiver) = unbounded();

        {
            // Holding the listener map while taking the initial snapshot keeps
            // a concurrent write from slipping between snapshot and insert.
            let mut listeners = self.inner.lock_listeners();
            let _ = sender.try_send(snapshot(&self.inner));
            listeners.insert(id, listener(sender));
        }
        drain_into(receiver, Arc::clone(&active), deliver);

        LOGGER.debug(format!("registered listener {id}"));
        Box::new(InMemoryRegistration {
            store: Arc::clone(&self.inner),
            id,
            active,
        })
    }
}

impl StoreInner {
    fn lock_documents(&self) -> MutexGuard<'_, BTreeMap<DocumentKey, FieldMap>> {
        self.documents.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_listeners(&self) -> MutexGuard<'_, BTreeMap<u64, Listener>> {
        self.listeners.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn document(&self, key: &DocumentKey) -> Option<RawDocument> {
        self.lock_documents()
            .get(key)
            .map(|fields| RawDocument::new(key.id(), fields.clone()))
    }

    fn query(&self, query: &CompiledQuery) -> Vec<RawDocument> {
        let candidates = self
            .lock_documents()
            .iter()
            .filter(|(key, _)| &key.collection_path() == query.collection_path())
            .map(|(key, fields)| RawDocument::new(key.id(), fields.clone()))
            .collect();
        apply_query_to_documents(candidates, query)
    }

    fn notify(&self, changed: &[DocumentKey]) {
        let listeners = self.lock_listeners();
        for listener in listeners.values() {
            match listener {
                Listener::Document { key, sender } if changed.contains(key) => {
                    let _ = sender.try_send(self.document(key));
                }
                Listener::Query { query, sender }
                    if changed
                        .iter()
                        .any(|key| &key.collection_path() == query.collection_path()) =>
                {
                    let _ = sender.try_send(self.query(query));
                }
                _ => {}
            }
        }
    }

    fn remove_listener(&self, id: u64) {
        if self.lock_listeners().remove(&id).is_some() {
            LOGGER.debug(format!("removed listener {id}"));
        }
    }
}

fn apply_write(documents: &mut BTreeMap<DocumentKey, FieldMap>, write: WriteOperation) -> FuseResult<()> {
    match write {
        WriteOperation::Set { key, fields, merge } => {
            if merge {
                let existing = documents.entry(key).or_default();
                existing.extend(fields);
            } else {
                documents.insert(key, fields);
            }
        }
        WriteOperation::Update { key, fields } => {
            let existing = documents.get_mut(&key).ok_or_else(|| {
                not_found(format!("Document {} does not exist", key.path()))
            })?;
            existing.extend(fields);
        }
        WriteOperation::Delete { key } => {
            documents.remove(&key);
        }
    }
    Ok(())
}

fn write_key(write: &WriteOperation) -> &DocumentKey {
    match write {
        WriteOperation::Set { key, .. }
        | WriteOperation::Update { key, .. }
        | WriteOperation::Delete { key } => key,
    }
}

fn drain_into<S, F>(receiver: Receiver<S>, active: Arc<AtomicBool>, deliver: F)
where
    S: Send + 'static,
    F: Fn(S) + Send + Sync + 'static,
{
    spawn_detached(async move {
        while let Ok(snapshot) = receiver.recv().await {
            if !active.load(Ordering::SeqCst) {
                break;
            }
            deliver(snapshot);
        }
    });
}

struct InMemoryRegistration {
    store: Arc<StoreInner>,
    id: u64,
    active: Arc<AtomicBool>,
}

impl ListenerRegistration for InMemoryRegistration {
    fn remove(&self) {
        self.active.store(false, Ordering::SeqCst);
        self.store.remove_listener(self.id);
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn get_document(
        &self,
        key: &DocumentKey,
        source: Source,
    ) -> FuseResult<Option<RawDocument>> {
        self.check_source(source)?;
        Ok(self.inner.document(key))
    }

    async fn set_document(&self, key: &DocumentKey, fields: FieldMap, merge: bool) -> FuseResult<()> {
        self.write(vec![WriteOperation::Set {
            key: key.clone(),
            fields,
            merge,
        }])
    }

    async fn update_document(&self, key: &DocumentKey, fields: FieldMap) -> FuseResult<()> {
        self.write(vec![WriteOperation::Update {
            key: key.clone(),
            fields,
        }])
    }

    async fn delete_document(&self, key: &DocumentKey) -> FuseResult<()> {
        self.write(vec![WriteOperation::Delete { key: key.clone() }])
    }

    async fn run_query(&self, query: &CompiledQuery, source: Source) -> FuseResult<Vec<RawDocument>> {
        self.check_source(source)?;
        Ok(self.inner.query(query))
    }

    async fn commit(&self, writes: Vec<WriteOperation>) -> FuseResult<()> {
        self.write(writes)
    }

    fn listen_document(
        &self,
        key: &DocumentKey,
        listener: DocumentListener,
    ) -> FuseResult<Box<dyn ListenerRegistration>> {
        let target = key.clone();
        let key = key.clone();
        Ok(self.register(
            move |inner| inner.document(&target),
            move |sender| Listener::Document { key, sender },
            move |snapshot| listener(Ok(snapshot)),
        ))
    }

    fn listen_query(
        &self,
        query: &CompiledQuery,
        listener: QueryListener,
    ) -> FuseResult<Box<dyn ListenerRegistration>> {
        let target = query.clone();
        let query = query.clone();
        Ok(self.register(
            move |inner| inner.query(&target),
            move |sender| Listener::Query { query, sender },
            move |snapshot| listener(Ok(snapshot)),
        ))
    }
}
