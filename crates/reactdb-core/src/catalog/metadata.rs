//! Compiled per-table metadata.

use std::collections::{BTreeMap, HashMap};

use super::association::VirtualFieldDescriptor;
use super::types::RdbType;

/// Prefix of the shadow key holding a hidden field's raw value.
pub const HIDDEN_PREFIX: &str = "__hidden__";

/// Shadow key for a hidden field.
pub fn shadow_key(field: &str) -> String {
    format!("{}{}", HIDDEN_PREFIX, field)
}

/// Table name to primary-key field name.
pub type PrimaryKeysMap = HashMap<String, String>;

/// Compiled view of one table, used to translate every operation against it.
#[derive(Debug, Clone)]
pub struct SelectMetaData {
    /// Table name.
    pub table: String,
    /// Primary-key field.
    pub primary_key: String,
    /// Concrete fields and their row types.
    pub fields: BTreeMap<String, RdbType>,
    /// Virtual fields and their descriptors.
    pub virtual_meta: BTreeMap<String, VirtualFieldDescriptor>,
}

impl SelectMetaData {
    /// Check if `name` is a concrete field.
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Check if `name` is a virtual field.
    pub fn has_virtual(&self, name: &str) -> bool {
        self.virtual_meta.contains_key(name)
    }

    /// Row type of a concrete field.
    pub fn field_type(&self, name: &str) -> Option<RdbType> {
        self.fields.get(name).copied()
    }

    /// Descriptor of a virtual field.
    pub fn virtual_field(&self, name: &str) -> Option<&VirtualFieldDescriptor> {
        self.virtual_meta.get(name)
    }

    /// Check if a concrete field is hidden.
    pub fn is_hidden(&self, name: &str) -> bool {
        self.field_type(name).is_some_and(|ty| ty.is_hidden())
    }

    /// Concrete field names.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Hidden field names.
    pub fn hidden_fields(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|(_, ty)| ty.is_hidden())
            .map(|(name, _)| name.as_str())
    }
}
