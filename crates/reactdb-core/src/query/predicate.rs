//! Predicate expressions evaluated by the store against a table's rows.

use std::collections::HashSet;

use crate::value::Value;

/// A condition over the fields of a single table.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Field equals value.
    Eq { field: String, value: Value },
    /// Field not equals value.
    Ne { field: String, value: Value },
    /// Field less than value.
    Lt { field: String, value: Value },
    /// Field less than or equal to value.
    Le { field: String, value: Value },
    /// Field greater than value.
    Gt { field: String, value: Value },
    /// Field greater than or equal to value.
    Ge { field: String, value: Value },
    /// Field is in a set of values.
    In { field: String, values: Vec<Value> },
    /// Field is not in a set of values.
    NotIn { field: String, values: Vec<Value> },
    /// Field is null or missing.
    IsNull { field: String },
    /// Field is present and not null.
    IsNotNull { field: String },
    /// Field matches a LIKE pattern.
    Like { field: String, pattern: String },
    /// Field does not match a LIKE pattern.
    NotLike { field: String, pattern: String },
    /// All conditions must hold.
    And(Vec<Predicate>),
    /// At least one condition must hold.
    Or(Vec<Predicate>),
    /// Negation.
    Not(Box<Predicate>),
}

impl Predicate {
    /// Create an equality predicate.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a not-equal predicate.
    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Ne {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a less-than predicate.
    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Lt {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a less-than-or-equal predicate.
    pub fn le(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Le {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a greater-than predicate.
    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Gt {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a greater-than-or-equal predicate.
    pub fn ge(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Ge {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create an IN predicate.
    pub fn is_in(field: impl Into<String>, values: Vec<Value>) -> Self {
        Predicate::In {
            field: field.into(),
            values,
        }
    }

    /// Create a NOT IN predicate.
    pub fn not_in(field: impl Into<String>, values: Vec<Value>) -> Self {
        Predicate::NotIn {
            field: field.into(),
            values,
        }
    }

    /// Create an IS NULL predicate.
    pub fn is_null(field: impl Into<String>) -> Self {
        Predicate::IsNull {
            field: field.into(),
        }
    }

    /// Create an IS NOT NULL predicate.
    pub fn is_not_null(field: impl Into<String>) -> Self {
        Predicate::IsNotNull {
            field: field.into(),
        }
    }

    /// Create a LIKE predicate.
    pub fn like(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Predicate::Like {
            field: field.into(),
            pattern: pattern.into(),
        }
    }

    /// Combine with another predicate, flattening nested conjunctions.
    pub fn and(self, other: Predicate) -> Self {
        match (self, other) {
            (Predicate::And(mut left), Predicate::And(right)) => {
                left.extend(right);
                Predicate::And(left)
            }
            (Predicate::And(mut left), other) => {
                left.push(other);
                Predicate::And(left)
            }
            (this, Predicate::And(mut right)) => {
                right.insert(0, this);
                Predicate::And(right)
            }
            (this, other) => Predicate::And(vec![this, other]),
        }
    }

    /// Combine with another predicate as a disjunction.
    pub fn or(self, other: Predicate) -> Self {
        match self {
            Predicate::Or(mut items) => {
                items.push(other);
                Predicate::Or(items)
            }
            this => Predicate::Or(vec![this, other]),
        }
    }

    /// Negate this predicate.
    pub fn negate(self) -> Self {
        Predicate::Not(Box::new(self))
    }

    /// All field names referenced by this predicate.
    pub fn fields(&self) -> HashSet<String> {
        let mut fields = HashSet::new();
        self.collect_fields(&mut fields);
        fields
    }

    fn collect_fields(&self, fields: &mut HashSet<String>) {
        match self {
            Predicate::Eq { field, .. }
            | Predicate::Ne { field, .. }
            | Predicate::Lt { field, .. }
            | Predicate::Le { field, .. }
            | Predicate::Gt { field, .. }
            | Predicate::Ge { field, .. }
            | Predicate::In { field, .. }
            | Predicate::NotIn { field, .. }
            | Predicate::IsNull { field }
            | Predicate::IsNotNull { field }
            | Predicate::Like { field, .. }
            | Predicate::NotLike { field, .. } => {
                fields.insert(field.clone());
            }
            Predicate::And(items) | Predicate::Or(items) => {
                for item in items {
                    item.collect_fields(fields);
                }
            }
            Predicate::Not(inner) => inner.collect_fields(fields),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_and_flattens() {
        let p = Predicate::eq("a", 1)
            .and(Predicate::eq("b", 2))
            .and(Predicate::eq("c", 3));
        match p {
            Predicate::And(items) => assert_eq!(items.len(), 3),
            other => panic!("expected And, got {:?}", other),
        }
    }

    #[test]
    fn test_fields_walks_nested_expressions() {
        let p = Predicate::eq("a", 1)
            .or(Predicate::is_null("b"))
            .and(Predicate::like("c", "x%").negate());
        let fields = p.fields();
        assert_eq!(fields.len(), 3);
        assert!(fields.contains("a"));
        assert!(fields.contains("b"));
        assert!(fields.contains("c"));
    }
}
