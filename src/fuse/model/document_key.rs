use crate::fuse::error::{invalid_argument, FuseResult};
use crate::fuse::model::ResourcePath;

/// Full path of one document: a collection path plus a document id.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentKey {
    path: ResourcePath,
}

impl DocumentKey {
    pub fn new(collection: &ResourcePath, id: &str) -> FuseResult<Self> {
        if id.is_empty() {
            return Err(invalid_argument("Document id cannot be empty"));
        }
        if id.contains('/') {
            return Err(invalid_argument("Document id cannot contain '/'"));
        }
        Ok(Self {
            path: collection.child([id]),
        })
    }

    pub fn from_string(path: &str) -> FuseResult<Self> {
        let path = ResourcePath::from_string(path)?;
        if path.len() < 2 || path.len() % 2 != 0 {
            return Err(invalid_argument(
                "Document keys must point to a document (even number of segments)",
            ));
        }
        Ok(Self { path })
    }

    pub fn collection_path(&self) -> ResourcePath {
        self.path.without_last()
    }

    pub fn path(&self) -> &ResourcePath {
        &self.path
    }

    pub fn id(&self) -> &str {
        self.path.last_segment().unwrap_or_default()
    }
}
