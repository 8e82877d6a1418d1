//! Schema catalog for reactdb.
//!
//! Schemas are declared as [`SchemaDefinition`]s, collected in a
//! [`SchemaRegistry`] and compiled into an immutable [`Catalog`] holding one
//! [`SelectMetaData`] per table.

mod association;
mod catalog;
mod field;
mod metadata;
mod registry;
mod schema;
mod types;

pub use association::{
    AssociationResolver, JoinCondition, LinkRelation, VirtualFieldDescriptor, LINK_KEY, LINK_LEFT,
    LINK_RIGHT,
};
pub use catalog::Catalog;
pub use field::{FieldSpec, JoinPredicateBuilder, VirtualFieldSpec};
pub use metadata::{shadow_key, PrimaryKeysMap, SelectMetaData, HIDDEN_PREFIX};
pub use registry::{SchemaRegistry, DEFAULT_CATALOG_NAME};
pub use schema::SchemaDefinition;
pub use types::{AssociationKind, Cardinality, RdbType};
