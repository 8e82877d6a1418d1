//! reactdb core - schema catalog, query translation and in-memory storage.
//!
//! This crate compiles declarative table schemas into runtime metadata, plans
//! reads against it, and stores rows in a non-durable store that broadcasts
//! every committed change.

pub mod catalog;
pub mod error;
pub mod query;
pub mod storage;
pub mod util;
pub mod value;

pub use catalog::{
    AssociationKind, Cardinality, Catalog, FieldSpec, LinkRelation, RdbType, SchemaDefinition,
    SchemaRegistry, SelectMetaData, VirtualFieldDescriptor, VirtualFieldSpec,
};
pub use error::{Error, MutationError, QueryError, Result, SchemaError};
pub use query::{FieldSelector, OrderDirection, OrderSpec, Predicate, PrimaryValue, Query};
pub use storage::{ChangeEvent, MemoryStore, WriteBatch};
pub use value::{row_from_json, Row, Value};
