mod binding;
mod codec;
mod constraint;
pub(crate) mod query;
mod record;
mod reference;
mod server;

pub use binding::{BindingHandle, BindingState};
pub use codec::{DocumentCodec, EncodeMode};
pub use constraint::{Constraint, Relation};
pub use query::{compile, CompiledQuery, FieldFilter, FilterOperator, OrderBy, OrderDirection};
pub use record::{generate_id, Fusable};
pub use reference::{CollectionReference, DocumentReference};
pub use server::FuseServer;
