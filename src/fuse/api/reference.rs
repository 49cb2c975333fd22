use std::fmt::{Display, Formatter};

use crate::fuse::error::FuseResult;
use crate::fuse::model::{DocumentKey, ResourcePath};

use super::constraint::Constraint;
use super::query::{compile, CompiledQuery};

/// A named group of documents, addressed by a record type's `TYPE_ID`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CollectionReference {
    path: ResourcePath,
}

impl CollectionReference {
    pub(crate) fn new(path: ResourcePath) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &ResourcePath {
        &self.path
    }

    /// The collection name (last path segment).
    pub fn id(&self) -> &str {
        self.path.last_segment().unwrap_or_default()
    }

    /// Returns a reference to the document identified by `document_id`.
    ///
    /// # Errors
    /// `fuse/invalid-argument` when the id is empty or contains `/`.
    pub fn doc(&self, document_id: &str) -> FuseResult<DocumentReference> {
        let key = DocumentKey::new(&self.path, document_id)?;
        Ok(DocumentReference { key })
    }

    /// Compiles `constraints` into a query over this collection.
    pub fn query(&self, constraints: &[Constraint]) -> CompiledQuery {
        compile(self, constraints)
    }
}

impl Display for CollectionReference {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "CollectionReference({})", self.path)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentReference {
    key: DocumentKey,
}

impl DocumentReference {
    pub fn id(&self) -> &str {
        self.key.id()
    }

    pub fn key(&self) -> &DocumentKey {
        &self.key
    }

    pub fn parent(&self) -> CollectionReference {
        CollectionReference::new(self.key.collection_path())
    }
}

impl Display for DocumentReference {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "DocumentReference({})", self.key.path())
    }
}
