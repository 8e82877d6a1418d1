//! Schema registry.

use super::catalog::Catalog;
use super::schema::SchemaDefinition;
use crate::error::SchemaError;

/// Default catalog name.
pub const DEFAULT_CATALOG_NAME: &str = "reactdb";

/// Collects schema definitions until they are compiled as a batch.
///
/// Registration never fails; every check runs in [`SchemaRegistry::compile`].
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: Vec<SchemaDefinition>,
}

impl SchemaRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a schema.
    pub fn register(&mut self, schema: SchemaDefinition) -> &mut Self {
        tracing::trace!(table = %schema.table, "schema registered");
        self.schemas.push(schema);
        self
    }

    /// Register a schema, builder style.
    pub fn with_schema(mut self, schema: SchemaDefinition) -> Self {
        self.register(schema);
        self
    }

    /// Number of registered schemas.
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// Check if nothing has been registered.
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Registered schemas, in registration order.
    pub fn schemas(&self) -> &[SchemaDefinition] {
        &self.schemas
    }

    /// Compile into a catalog with the default name.
    pub fn compile(self) -> Result<Catalog, SchemaError> {
        Catalog::compile(DEFAULT_CATALOG_NAME, self)
    }

    /// Compile into a catalog with the given name.
    pub fn compile_named(self, name: impl Into<String>) -> Result<Catalog, SchemaError> {
        Catalog::compile(name, self)
    }

    pub(crate) fn into_schemas(self) -> Vec<SchemaDefinition> {
        self.schemas
    }
}
