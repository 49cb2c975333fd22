//! Typed persistence over a document store.
//!
//! Records implementing [`Fusable`] are read, written and observed through a
//! [`FuseServer`], which compiles [`Constraint`] lists into store queries and
//! decodes the returned documents.

pub mod api;
mod constants;
pub mod error;
pub mod model;
mod query_evaluator;
pub mod settings;
pub mod store;

pub use api::{
    compile, generate_id, BindingHandle, BindingState, CollectionReference, CompiledQuery, Constraint,
    DocumentCodec, DocumentReference, EncodeMode, Fusable, FuseServer, Relation,
};
pub use constants::{DOCUMENT_ID_FIELD, MAX_IN_CLAUSE_SIZE};
pub use error::{FuseError, FuseErrorCode, FuseResult};
pub use settings::{DecodePolicy, Environment, FuseSettings};
pub use store::{InMemoryStore, RawDocument, Source, Store};
