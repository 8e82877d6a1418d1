//! Field declarations for schemas.

use super::types::{AssociationKind, RdbType};
use crate::query::Predicate;
use crate::value::Value;

/// Builds the condition over a target table from the owning row's key value.
pub type JoinPredicateBuilder = fn(&Value) -> Predicate;

/// A concrete (stored) field declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    /// Field name.
    pub name: String,
    /// Declared type tag, validated at compile time.
    pub type_tag: String,
}

impl FieldSpec {
    /// Declare a field with a raw type tag.
    pub fn new(name: impl Into<String>, type_tag: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_tag: type_tag.into(),
        }
    }

    /// Declare a field with a known row type.
    pub fn typed(name: impl Into<String>, ty: RdbType) -> Self {
        Self::new(name, ty.tag())
    }
}

/// A virtual (association) field declaration.
#[derive(Debug, Clone)]
pub struct VirtualFieldSpec {
    /// Field name on the owning table.
    pub name: String,
    /// Declared association kind tag, validated at compile time.
    pub kind_tag: String,
    /// Table holding the associated rows.
    pub target: String,
    /// Owning-row field whose value feeds the join. Defaults to the primary key.
    pub local_key: Option<String>,
    /// Condition over the target table.
    pub join: Option<JoinPredicateBuilder>,
}

impl VirtualFieldSpec {
    /// Declare a virtual field with a raw association tag.
    pub fn new(
        name: impl Into<String>,
        kind_tag: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind_tag: kind_tag.into(),
            target: target.into(),
            local_key: None,
            join: None,
        }
    }

    /// Declare a one-to-one association.
    pub fn one_to_one(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(name, AssociationKind::OneToOne.tag(), target)
    }

    /// Declare a one-to-many association.
    pub fn one_to_many(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(name, AssociationKind::OneToMany.tag(), target)
    }

    /// Declare a many-to-many association.
    pub fn many_to_many(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(name, AssociationKind::ManyToMany.tag(), target)
    }

    /// Use another owning-row field as the join key.
    pub fn with_local_key(mut self, field: impl Into<String>) -> Self {
        self.local_key = Some(field.into());
        self
    }

    /// Set the join predicate builder.
    pub fn with_join(mut self, join: JoinPredicateBuilder) -> Self {
        self.join = Some(join);
        self
    }
}
