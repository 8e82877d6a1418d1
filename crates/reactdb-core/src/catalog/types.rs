//! Core type definitions for the catalog.

use std::fmt;
use std::str::FromStr;

/// Row types a concrete field may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RdbType {
    /// Raw bytes.
    ArrayBuffer,
    /// Raw bytes.
    Blob,
    /// Boolean value.
    Boolean,
    /// Point in time. Stored converted, presented raw.
    DateTime,
    /// Integer number.
    Integer,
    /// Floating point number.
    Number,
    /// Arbitrary object.
    Object,
    /// UTF-8 string.
    String,
    /// Array of literal values.
    LiteralArray,
}

impl RdbType {
    /// All members of the domain.
    pub const ALL: [RdbType; 9] = [
        RdbType::ArrayBuffer,
        RdbType::Blob,
        RdbType::Boolean,
        RdbType::DateTime,
        RdbType::Integer,
        RdbType::Number,
        RdbType::Object,
        RdbType::String,
        RdbType::LiteralArray,
    ];

    /// Canonical declaration tag.
    pub fn tag(&self) -> &'static str {
        match self {
            RdbType::ArrayBuffer => "arrayBuffer",
            RdbType::Blob => "blob",
            RdbType::Boolean => "boolean",
            RdbType::DateTime => "dateTime",
            RdbType::Integer => "integer",
            RdbType::Number => "number",
            RdbType::Object => "object",
            RdbType::String => "string",
            RdbType::LiteralArray => "literalArray",
        }
    }

    /// Whether fields of this type keep their raw value under a shadow key.
    pub fn is_hidden(&self) -> bool {
        matches!(self, RdbType::DateTime)
    }
}

impl fmt::Display for RdbType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for RdbType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RdbType::ALL
            .into_iter()
            .find(|ty| ty.tag().eq_ignore_ascii_case(s))
            .ok_or(())
    }
}

/// Kind of a declared association.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssociationKind {
    /// At most one related row.
    OneToOne,
    /// Any number of related rows referencing the owner.
    OneToMany,
    /// Any number of related rows, linked through a derived relation.
    ManyToMany,
}

impl AssociationKind {
    /// Canonical declaration tag.
    pub fn tag(&self) -> &'static str {
        match self {
            AssociationKind::OneToOne => "oneToOne",
            AssociationKind::OneToMany => "oneToMany",
            AssociationKind::ManyToMany => "manyToMany",
        }
    }

    /// Cardinality of the association's projection.
    pub fn cardinality(&self) -> Cardinality {
        match self {
            AssociationKind::OneToOne => Cardinality::Single,
            AssociationKind::OneToMany | AssociationKind::ManyToMany => Cardinality::Many,
        }
    }
}

impl fmt::Display for AssociationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for AssociationKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            AssociationKind::OneToOne,
            AssociationKind::OneToMany,
            AssociationKind::ManyToMany,
        ]
        .into_iter()
        .find(|kind| kind.tag().eq_ignore_ascii_case(s))
        .ok_or(())
    }
}

/// How many related rows a virtual field projects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    /// Projected as an object (or null).
    Single,
    /// Projected as an array.
    Many,
}
