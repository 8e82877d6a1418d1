//! Declared table schemas, before compilation.

use super::field::{FieldSpec, VirtualFieldSpec};

/// A declared table schema.
///
/// Nothing is validated here; the registry checks every definition as a batch
/// when it is compiled.
#[derive(Debug, Clone)]
pub struct SchemaDefinition {
    /// Table name (unique within a registry).
    pub table: String,
    /// Name of the primary-key field.
    pub primary_key: String,
    /// Concrete field declarations, in declaration order.
    pub fields: Vec<FieldSpec>,
    /// Virtual field declarations.
    pub virtuals: Vec<VirtualFieldSpec>,
}

impl SchemaDefinition {
    /// Create a new schema definition.
    pub fn new(table: impl Into<String>, primary_key: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            primary_key: primary_key.into(),
            fields: Vec::new(),
            virtuals: Vec::new(),
        }
    }

    /// Add a concrete field.
    pub fn with_field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    /// Add multiple concrete fields.
    pub fn with_fields(mut self, fields: impl IntoIterator<Item = FieldSpec>) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Add a virtual field.
    pub fn with_virtual(mut self, field: VirtualFieldSpec) -> Self {
        self.virtuals.push(field);
        self
    }

    /// Get a concrete field by name.
    pub fn get_field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Get a virtual field by name.
    pub fn get_virtual(&self, name: &str) -> Option<&VirtualFieldSpec> {
        self.virtuals.iter().find(|f| f.name == name)
    }

    /// Every declared name: concrete fields, virtual fields, then the primary
    /// key when it is not already a concrete field.
    pub fn declared_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .fields
            .iter()
            .map(|f| f.name.as_str())
            .chain(self.virtuals.iter().map(|v| v.name.as_str()))
            .collect();
        if self.get_field(&self.primary_key).is_none() {
            names.push(&self.primary_key);
        }
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::RdbType;

    #[test]
    fn test_schema_builder() {
        let task = SchemaDefinition::new("Task", "_id")
            .with_field(FieldSpec::typed("_id", RdbType::String))
            .with_field(FieldSpec::typed("content", RdbType::String))
            .with_virtual(VirtualFieldSpec::one_to_one("project", "Project"));

        assert_eq!(task.table, "Task");
        assert_eq!(task.fields.len(), 2);
        assert!(task.get_field("content").is_some());
        assert!(task.get_virtual("project").is_some());
        assert!(task.get_field("project").is_none());
        assert_eq!(task.declared_names(), vec!["_id", "content", "project"]);
    }

    #[test]
    fn test_declared_names_include_undeclared_primary_key() {
        let schema = SchemaDefinition::new("Tag", "_id")
            .with_field(FieldSpec::typed("name", RdbType::String));

        assert_eq!(schema.declared_names(), vec!["name", "_id"]);
    }
}
