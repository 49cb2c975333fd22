use std::sync::{Arc, LazyLock};

use futures::stream::{FuturesUnordered, StreamExt};

use crate::fuse::constants::DOCUMENT_ID_FIELD;
use crate::fuse::error::FuseResult;
use crate::fuse::settings::FuseSettings;
use crate::fuse::store::{
    DocumentListener, FieldMap, InMemoryStore, QueryListener, RawDocument, Source, Store, WriteOperation,
};
use crate::logger::Logger;

use super::binding::BindingHandle;
use super::codec::{DocumentCodec, EncodeMode};
use super::constraint::Constraint;
use super::query::CompiledQuery;
use super::record::Fusable;
use super::reference::CollectionReference;

static LOGGER: LazyLock<Logger> = LazyLock::new(|| Logger::new("@firefuse/server"));

/// Typed get/set/update/delete/bind operations over a [`Store`].
///
/// Every record type lives in the collection named by its `TYPE_ID`, nested
/// under [`FuseSettings::root_path`]. Several servers may share one store.
#[derive(Clone)]
pub struct FuseServer {
    store: Arc<dyn Store>,
    settings: FuseSettings,
    codec: DocumentCodec,
}

impl FuseServer {
    /// Creates a server backed by the supplied store implementation.
    pub fn new(store: Arc<dyn Store>, settings: FuseSettings) -> Self {
        let codec = DocumentCodec::new(settings.decode_policy);
        Self {
            store,
            settings,
            codec,
        }
    }

    /// Returns a server that keeps documents in memory only.
    ///
    /// Useful for tests or demos where no remote backend is available.
    pub fn with_in_memory(settings: FuseSettings) -> Self {
        Self::new(Arc::new(InMemoryStore::new()), settings)
    }

    pub fn settings(&self) -> &FuseSettings {
        &self.settings
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn codec(&self) -> DocumentCodec {
        self.codec
    }

    /// The collection holding records of type `T`.
    pub fn collection<T: Fusable>(&self) -> CollectionReference {
        CollectionReference::new(self.settings.root_path().child([T::TYPE_ID]))
    }

    /// Compiles `constraints` against the collection of `T`.
    pub fn query<T: Fusable>(&self, constraints: &[Constraint]) -> CompiledQuery {
        self.collection::<T>().query(constraints)
    }

    /// Fetches the record with the given id.
    ///
    /// An empty id resolves to `Ok(None)` without touching the store. A
    /// document that fails to decode is reported through the codec and
    /// treated as absent; use [`try_get_one`](Self::try_get_one) to observe
    /// the failure instead.
    pub async fn get_one<T: Fusable>(&self, id: &str, source: Source) -> FuseResult<Option<T>> {
        Ok(self
            .fetch::<T>(id, source)
            .await?
            .and_then(|raw| self.codec.decode_or_drop(&raw)))
    }

    /// Like [`get_one`](Self::get_one) but returns `fuse/decode-failed`
    /// when the stored document does not decode into `T`.
    pub async fn try_get_one<T: Fusable>(&self, id: &str, source: Source) -> FuseResult<Option<T>> {
        self.fetch::<T>(id, source)
            .await?
            .map(|raw| self.codec.decode::<T>(&raw))
            .transpose()
    }

    async fn fetch<T: Fusable>(&self, id: &str, source: Source) -> FuseResult<Option<RawDocument>> {
        if id.is_empty() {
            return Ok(None);
        }
        let document = self.collection::<T>().doc(id)?;
        self.store.get_document(document.key(), source).await
    }

    /// Fetches every record in `ids` concurrently.
    ///
    /// Empty ids are skipped. Records come back in the order their reads
    /// completed; missing or undecodable documents are omitted. The call
    /// waits for every read, then fails with the first store error if any
    /// read failed.
    pub async fn get_many<T, S>(&self, ids: &[S], source: Source) -> FuseResult<Vec<T>>
    where
        T: Fusable,
        S: AsRef<str>,
    {
        let collection = self.collection::<T>();
        let mut reads: FuturesUnordered<_> = ids
            .iter()
            .map(AsRef::as_ref)
            .filter(|id| !id.is_empty())
            .map(|id| {
                let document = collection.doc(id);
                async move {
                    let document = document?;
                    self.store.get_document(document.key(), source).await
                }
            })
            .collect();

        let mut records = Vec::with_capacity(reads.len());
        let mut first_error = None;
        while let Some(result) = reads.next().await {
            match result {
                Ok(Some(raw)) => records.extend(self.codec.decode_or_drop::<T>(&raw)),
                Ok(None) => {}
                Err(err) => {
                    first_error.get_or_insert(err);
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(records),
        }
    }

    /// Runs the query described by `constraints`. An empty list returns the
    /// whole collection.
    pub async fn get_by_query<T: Fusable>(&self, constraints: &[Constraint], source: Source) -> FuseResult<Vec<T>> {
        let query = self.query::<T>(constraints);
        let documents = self.store.run_query(&query, source).await?;
        Ok(self.codec.decode_all(&documents))
    }

    /// Subscribes to a single record.
    ///
    /// `callback` receives the current value right away and again after
    /// every change. An empty id yields an unbound handle and no callbacks.
    pub fn bind_one<T, F>(&self, id: &str, callback: F) -> FuseResult<BindingHandle>
    where
        T: Fusable,
        F: Fn(FuseResult<Option<T>>) + Send + Sync + 'static,
    {
        if id.is_empty() {
            LOGGER.debug(format!("bind_one on {} skipped: empty id", T::TYPE_ID));
            return Ok(BindingHandle::unbound());
        }
        let document = self.collection::<T>().doc(id)?;
        let codec = self.codec;
        let listener: DocumentListener = Arc::new(move |result: FuseResult<Option<RawDocument>>| {
            callback(result.map(|raw| raw.and_then(|raw| codec.decode_or_drop(&raw))));
        });
        let registration = self.store.listen_document(document.key(), listener)?;
        Ok(BindingHandle::active(registration))
    }

    /// Subscribes to the result set of `constraints`.
    pub fn bind_query<T, F>(&self, constraints: &[Constraint], callback: F) -> FuseResult<BindingHandle>
    where
        T: Fusable,
        F: Fn(FuseResult<Vec<T>>) + Send + Sync + 'static,
    {
        let query = self.query::<T>(constraints);
        let codec = self.codec;
        let listener: QueryListener = Arc::new(move |result: FuseResult<Vec<RawDocument>>| {
            callback(result.map(|documents| codec.decode_all(&documents)));
        });
        let registration = self.store.listen_query(&query, listener)?;
        Ok(BindingHandle::active(registration))
    }

    /// Subscribes to every record of type `T`.
    pub fn bind_collection<T, F>(&self, callback: F) -> FuseResult<BindingHandle>
    where
        T: Fusable,
        F: Fn(FuseResult<Vec<T>>) + Send + Sync + 'static,
    {
        self.bind_query(&[], callback)
    }

    /// Subscribes to the records whose ids are listed.
    ///
    /// Only the first ten non-empty ids take part in the query. With no
    /// usable id the handle is unbound and `callback` never runs.
    pub fn bind_ids<T, F, S>(&self, ids: &[S], callback: F) -> FuseResult<BindingHandle>
    where
        T: Fusable,
        F: Fn(FuseResult<Vec<T>>) + Send + Sync + 'static,
        S: AsRef<str>,
    {
        let ids: Vec<&str> = ids.iter().map(AsRef::as_ref).filter(|id| !id.is_empty()).collect();
        if ids.is_empty() {
            LOGGER.debug(format!("bind_ids on {} skipped: no ids", T::TYPE_ID));
            return Ok(BindingHandle::unbound());
        }
        let constraint = Constraint::contained_in(DOCUMENT_ID_FIELD, ids);
        self.bind_query(&[constraint], callback)
    }

    /// Writes `record` to `collection(T::TYPE_ID)/record.id()`.
    ///
    /// The id becomes the document key and is never part of the payload.
    /// With `merge` set, fields missing from the record are left untouched.
    ///
    /// # Errors
    /// `fuse/invalid-argument` when the record has no id.
    pub async fn set<T: Fusable>(&self, record: &T, merge: bool) -> FuseResult<()> {
        let raw = self.codec.to_raw_document(record)?;
        let document = self.collection::<T>().doc(&raw.id)?;
        self.store.set_document(document.key(), raw.fields, merge).await
    }

    /// Replaces every record in one atomic commit. Records without an id are
    /// skipped.
    pub async fn set_many<T: Fusable>(&self, records: &[T]) -> FuseResult<()> {
        let collection = self.collection::<T>();
        let mut writes = Vec::with_capacity(records.len());
        for record in records {
            if record.id().is_empty() {
                LOGGER.debug(format!("set_many on {} skipped a record without id", T::TYPE_ID));
                continue;
            }
            let raw = self.codec.to_raw_document(record)?;
            let document = collection.doc(&raw.id)?;
            writes.push(WriteOperation::Set {
                key: document.key().clone(),
                fields: raw.fields,
                merge: false,
            });
        }
        if writes.is_empty() {
            return Ok(());
        }
        self.store.commit(writes).await
    }

    /// Writes part of `record` to its existing document.
    ///
    /// With `fields`, only payload entries whose top-level key is listed are
    /// sent; otherwise the whole record minus its id. Fails with
    /// `fuse/not-found` when the document does not exist.
    pub async fn update<T: Fusable>(&self, record: &T, fields: Option<&[&str]>) -> FuseResult<()> {
        let document = self.collection::<T>().doc(record.id())?;
        let payload = self.codec.encode(record, EncodeMode::Merge)?;
        let payload = match fields {
            Some(fields) => payload
                .into_iter()
                .filter(|(key, _)| fields.contains(&key.as_str()))
                .collect::<FieldMap>(),
            None => payload,
        };
        self.store.update_document(document.key(), payload).await
    }

    /// Deletes the record with the given id. An empty id succeeds without
    /// touching the store.
    pub async fn delete<T: Fusable>(&self, id: &str) -> FuseResult<()> {
        if id.is_empty() {
            return Ok(());
        }
        let document = self.collection::<T>().doc(id)?;
        self.store.delete_document(document.key()).await
    }
}
