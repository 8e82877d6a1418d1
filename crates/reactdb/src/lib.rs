//! reactdb - a reactive in-memory database.
//!
//! Tables are declared up front in a [`SchemaRegistry`] and compiled into a
//! [`Database`]. Reads return a [`Selector`], which can be materialized once
//! or observed as a stream of snapshots that re-emits after every commit that
//! changes its result. Writes cascade through virtual fields so nested rows
//! land in their own tables within a single commit.

pub mod cascade;
pub mod config;
pub mod database;
pub mod error;
pub mod mutation;
pub mod pubsub;
pub mod selector;

pub use config::DatabaseConfig;
pub use database::{Database, DatabaseInfo};
pub use error::{BuildError, ConfigError, Error, MutationError, QueryError, Result, SchemaError};
pub use mutation::{MutationExecutor, MutationResult, Target};
pub use selector::{Selector, Snapshot, SnapshotStream};

pub use reactdb_core::catalog::{
    AssociationKind, FieldSpec, RdbType, SchemaDefinition, SchemaRegistry, VirtualFieldSpec,
};
pub use reactdb_core::query::{FieldSelector, OrderDirection, OrderSpec, Predicate, Query};
pub use reactdb_core::{row_from_json, Row, Value};
