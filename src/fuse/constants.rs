/// Field name that addresses the document identifier instead of a payload field.
pub const DOCUMENT_ID_FIELD: &str = "id";

/// Largest value list the store accepts for an `in` filter.
pub const MAX_IN_CLAUSE_SIZE: usize = 10;

/// Store-native name of the document identity field.
pub(crate) const DOCUMENT_NAME_FIELD: &str = "__name__";

pub(crate) const DEVELOPMENT_ROOT_COLLECTION: &str = "devel";
pub(crate) const RELEASE_ROOT_COLLECTION: &str = "releases";
pub(crate) const DEFAULT_SCHEMA_VERSION: &str = "0.0.1";

pub(crate) const AUTO_ID_LENGTH: usize = 20;
