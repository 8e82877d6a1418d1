//! Association resolution.
//!
//! Virtual fields are compiled into [`VirtualFieldDescriptor`]s, one variant per
//! association kind. Many-to-many associations additionally derive a
//! [`LinkRelation`] that the store keeps alongside the declared tables.

use std::cmp::Ordering;

use super::field::{JoinPredicateBuilder, VirtualFieldSpec};
use super::types::{AssociationKind, Cardinality};
use crate::query::Predicate;
use crate::value::{Row, Value};

/// Column of a link row holding the key of the lexically smaller table.
pub const LINK_LEFT: &str = "left";
/// Column of a link row holding the key of the lexically larger table.
pub const LINK_RIGHT: &str = "right";
/// Synthetic primary key of a link row.
pub const LINK_KEY: &str = "_link";

/// How the target rows of a one-to-x association are selected.
#[derive(Debug, Clone, Copy)]
pub enum JoinCondition {
    /// Declared predicate builder.
    Builder(JoinPredicateBuilder),
    /// Target primary key equals the owner's key.
    TargetKey,
}

/// Implicit relation joining the two sides of a many-to-many association.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRelation {
    /// Relation name, `<A>@<B>` with table names sorted.
    pub name: String,
    /// Table whose keys live in the `left` column.
    pub left_table: String,
    /// Table whose keys live in the `right` column.
    pub right_table: String,
}

impl LinkRelation {
    /// Derive the link relation for an owner and target table.
    pub fn between(owner: &str, target: &str) -> Self {
        let (left, right) = match owner.cmp(target) {
            Ordering::Greater => (target, owner),
            _ => (owner, target),
        };
        Self {
            name: format!("{}@{}", left, right),
            left_table: left.to_string(),
            right_table: right.to_string(),
        }
    }

    /// Columns `(owner, target)` as seen from `owner`.
    ///
    /// For a self-association the owner is always on the left.
    pub fn columns_for(&self, owner: &str) -> (&'static str, &'static str) {
        if owner == self.left_table {
            (LINK_LEFT, LINK_RIGHT)
        } else {
            (LINK_RIGHT, LINK_LEFT)
        }
    }

    /// Build the link row joining `owner_key` (on `owner`) with `target_key`.
    pub fn link_row(&self, owner: &str, owner_key: &Value, target_key: &Value) -> Row {
        let (owner_col, target_col) = self.columns_for(owner);
        let mut row = Row::new();
        row.insert(owner_col.to_string(), owner_key.clone());
        row.insert(target_col.to_string(), target_key.clone());
        let key = format!(
            "{}|{}",
            row.get(LINK_LEFT).map(Value::index_key).unwrap_or_default(),
            row.get(LINK_RIGHT).map(Value::index_key).unwrap_or_default()
        );
        row.insert(LINK_KEY.to_string(), Value::String(key));
        row
    }

    /// Predicate selecting the link rows owned by `owner_key`.
    pub fn owned_by(&self, owner: &str, owner_key: &Value) -> Predicate {
        let (owner_col, _) = self.columns_for(owner);
        Predicate::eq(owner_col, owner_key.clone())
    }
}

/// Compiled form of a virtual field.
#[derive(Debug, Clone)]
pub enum VirtualFieldDescriptor {
    /// At most one target row.
    OneToOne {
        target: String,
        local_key: String,
        join: JoinCondition,
    },
    /// Any number of target rows selected by the join.
    OneToMany {
        target: String,
        local_key: String,
        join: JoinCondition,
    },
    /// Target rows linked through a [`LinkRelation`].
    ManyToMany {
        target: String,
        local_key: String,
        link: LinkRelation,
    },
}

impl VirtualFieldDescriptor {
    /// Association kind of this descriptor.
    pub fn kind(&self) -> AssociationKind {
        match self {
            VirtualFieldDescriptor::OneToOne { .. } => AssociationKind::OneToOne,
            VirtualFieldDescriptor::OneToMany { .. } => AssociationKind::OneToMany,
            VirtualFieldDescriptor::ManyToMany { .. } => AssociationKind::ManyToMany,
        }
    }

    /// Projection cardinality.
    pub fn cardinality(&self) -> Cardinality {
        self.kind().cardinality()
    }

    /// Table holding the associated rows.
    pub fn target(&self) -> &str {
        match self {
            VirtualFieldDescriptor::OneToOne { target, .. }
            | VirtualFieldDescriptor::OneToMany { target, .. }
            | VirtualFieldDescriptor::ManyToMany { target, .. } => target,
        }
    }

    /// Owning-row field whose value feeds the predicate.
    pub fn local_key(&self) -> &str {
        match self {
            VirtualFieldDescriptor::OneToOne { local_key, .. }
            | VirtualFieldDescriptor::OneToMany { local_key, .. }
            | VirtualFieldDescriptor::ManyToMany { local_key, .. } => local_key,
        }
    }

    /// The link relation, for many-to-many associations.
    pub fn link(&self) -> Option<&LinkRelation> {
        match self {
            VirtualFieldDescriptor::ManyToMany { link, .. } => Some(link),
            _ => None,
        }
    }

    /// Condition over the target table for the owner's key value.
    ///
    /// `target_pk` is the target table's primary key and `linked` the target
    /// keys found in the link relation. The latter is ignored for one-to-x
    /// associations.
    pub fn predicate(&self, key: &Value, target_pk: &str, linked: Vec<Value>) -> Predicate {
        match self {
            VirtualFieldDescriptor::OneToOne { join, .. }
            | VirtualFieldDescriptor::OneToMany { join, .. } => match join {
                JoinCondition::Builder(build) => build(key),
                JoinCondition::TargetKey => Predicate::eq(target_pk, key.clone()),
            },
            VirtualFieldDescriptor::ManyToMany { .. } => Predicate::is_in(target_pk, linked),
        }
    }
}

/// Resolves declared virtual fields into descriptors.
pub struct AssociationResolver;

impl AssociationResolver {
    /// Resolve one virtual field of `owner` (whose primary key is `owner_pk`).
    ///
    /// The kind is assumed to be valid; the registry checks it first.
    pub fn resolve(
        owner: &str,
        owner_pk: &str,
        kind: AssociationKind,
        spec: &VirtualFieldSpec,
    ) -> VirtualFieldDescriptor {
        let target = spec.target.clone();
        let local_key = spec
            .local_key
            .clone()
            .unwrap_or_else(|| owner_pk.to_string());
        let join = spec
            .join
            .map(JoinCondition::Builder)
            .unwrap_or(JoinCondition::TargetKey);

        match kind {
            AssociationKind::OneToOne => VirtualFieldDescriptor::OneToOne {
                target,
                local_key,
                join,
            },
            AssociationKind::OneToMany => VirtualFieldDescriptor::OneToMany {
                target,
                local_key,
                join,
            },
            AssociationKind::ManyToMany => VirtualFieldDescriptor::ManyToMany {
                link: LinkRelation::between(owner, &spec.target),
                target,
                local_key,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_relation_is_sorted() {
        let a = LinkRelation::between("Task", "Tag");
        let b = LinkRelation::between("Tag", "Task");
        assert_eq!(a, b);
        assert_eq!(a.name, "Tag@Task");
        assert_eq!(a.columns_for("Tag"), (LINK_LEFT, LINK_RIGHT));
        assert_eq!(a.columns_for("Task"), (LINK_RIGHT, LINK_LEFT));
    }

    #[test]
    fn test_self_link_puts_owner_left() {
        let link = LinkRelation::between("Task", "Task");
        assert_eq!(link.name, "Task@Task");
        assert_eq!(link.columns_for("Task"), (LINK_LEFT, LINK_RIGHT));

        let row = link.link_row("Task", &Value::from("t1"), &Value::from("t2"));
        assert_eq!(row.get(LINK_LEFT), Some(&Value::from("t1")));
        assert_eq!(row.get(LINK_RIGHT), Some(&Value::from("t2")));
        assert!(row.contains_key(LINK_KEY));
    }

    #[test]
    fn test_link_row_key_is_side_independent() {
        let link = LinkRelation::between("Task", "Tag");
        let from_task = link.link_row("Task", &Value::from("t1"), &Value::from("g1"));
        let from_tag = link.link_row("Tag", &Value::from("g1"), &Value::from("t1"));
        assert_eq!(from_task, from_tag);
    }

    #[test]
    fn test_resolve_defaults() {
        let spec = VirtualFieldSpec::one_to_many("subtasks", "Subtask");
        let desc =
            AssociationResolver::resolve("Task", "_id", AssociationKind::OneToMany, &spec);

        assert_eq!(desc.cardinality(), Cardinality::Many);
        assert_eq!(desc.target(), "Subtask");
        assert_eq!(desc.local_key(), "_id");
        assert_eq!(
            desc.predicate(&Value::from("t1"), "_id", Vec::new()),
            Predicate::eq("_id", "t1")
        );
    }

    #[test]
    fn test_resolve_with_builder() {
        let spec = VirtualFieldSpec::one_to_many("subtasks", "Subtask")
            .with_join(|key| Predicate::eq("taskId", key.clone()));
        let desc =
            AssociationResolver::resolve("Task", "_id", AssociationKind::OneToMany, &spec);

        assert_eq!(
            desc.predicate(&Value::from("t1"), "_id", Vec::new()),
            Predicate::eq("taskId", "t1")
        );
    }

    #[test]
    fn test_resolve_many_to_many() {
        let spec = VirtualFieldSpec::many_to_many("tags", "Tag");
        let desc =
            AssociationResolver::resolve("Task", "_id", AssociationKind::ManyToMany, &spec);

        assert_eq!(desc.kind(), AssociationKind::ManyToMany);
        assert_eq!(desc.link().map(|l| l.name.as_str()), Some("Tag@Task"));
        let linked = vec![Value::from("g1"), Value::from("g2")];
        assert_eq!(
            desc.predicate(&Value::from("t1"), "_id", linked.clone()),
            Predicate::is_in("_id", linked)
        );
    }
}
