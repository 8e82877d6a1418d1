//! Read options accepted by `get`.

use super::predicate::Predicate;
use crate::value::Value;

/// One entry of a projection.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldSelector {
    /// A field by name. Naming a virtual field projects its default shape.
    Field(String),
    /// A virtual field with an explicit nested projection.
    Association(String, Vec<FieldSelector>),
}

impl FieldSelector {
    /// Select a field by name.
    pub fn field(name: impl Into<String>) -> Self {
        FieldSelector::Field(name.into())
    }

    /// Select a virtual field with a nested projection.
    pub fn association<I, S>(name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<FieldSelector>,
    {
        FieldSelector::Association(name.into(), fields.into_iter().map(Into::into).collect())
    }

    /// Name of the selected field.
    pub fn name(&self) -> &str {
        match self {
            FieldSelector::Field(name) | FieldSelector::Association(name, _) => name,
        }
    }
}

impl From<&str> for FieldSelector {
    fn from(name: &str) -> Self {
        FieldSelector::Field(name.to_string())
    }
}

impl From<String> for FieldSelector {
    fn from(name: String) -> Self {
        FieldSelector::Field(name)
    }
}

/// Primary-key restriction.
#[derive(Debug, Clone, PartialEq)]
pub enum PrimaryValue {
    /// A single key.
    One(Value),
    /// Any of several keys.
    Many(Vec<Value>),
}

impl PrimaryValue {
    /// Predicate over the primary-key field.
    pub fn to_predicate(&self, primary_key: &str) -> Predicate {
        match self {
            PrimaryValue::One(key) => Predicate::eq(primary_key, key.clone()),
            PrimaryValue::Many(keys) => Predicate::is_in(primary_key, keys.clone()),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderDirection {
    /// Ascending order.
    #[default]
    Asc,
    /// Descending order.
    Desc,
}

/// A sort key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSpec {
    /// Field to sort by.
    pub field: String,
    /// Sort direction.
    pub direction: OrderDirection,
}

impl OrderSpec {
    /// Ascending sort on `field`.
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: OrderDirection::Asc,
        }
    }

    /// Descending sort on `field`.
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: OrderDirection::Desc,
        }
    }
}

/// Options of a read.
///
/// Filtering (`primary_value` and `filter`) runs first, then ordering, then
/// `skip` and `limit`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    /// Projection. `None` selects every concrete and virtual field.
    pub fields: Option<Vec<FieldSelector>>,
    /// Primary-key restriction.
    pub primary_value: Option<PrimaryValue>,
    /// Row predicate.
    pub filter: Option<Predicate>,
    /// Sort keys, most significant first.
    pub order_by: Vec<OrderSpec>,
    /// Maximum number of rows.
    pub limit: Option<usize>,
    /// Number of leading rows to drop.
    pub skip: Option<usize>,
}

impl Query {
    /// Create an unrestricted query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the projection.
    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<FieldSelector>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Restrict to a single primary key.
    pub fn primary(mut self, key: impl Into<Value>) -> Self {
        self.primary_value = Some(PrimaryValue::One(key.into()));
        self
    }

    /// Restrict to a set of primary keys.
    pub fn primaries<I, V>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.primary_value = Some(PrimaryValue::Many(keys.into_iter().map(Into::into).collect()));
        self
    }

    /// Set the row predicate.
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filter = Some(predicate);
        self
    }

    /// Append a sort key.
    pub fn order_by(mut self, order: OrderSpec) -> Self {
        self.order_by.push(order);
        self
    }

    /// Set the row limit.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the number of rows to skip.
    pub fn skip(mut self, skip: usize) -> Self {
        self.skip = Some(skip);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_builder() {
        let query = Query::new()
            .select(vec![
                FieldSelector::field("content"),
                FieldSelector::association("project", ["name"]),
            ])
            .primaries(["t1", "t2"])
            .order_by(OrderSpec::desc("created"))
            .skip(1)
            .limit(2);

        let fields = query.fields.as_ref().unwrap();
        assert_eq!(fields[1].name(), "project");
        assert_eq!(
            query.primary_value.as_ref().unwrap().to_predicate("_id"),
            Predicate::is_in("_id", vec![Value::from("t1"), Value::from("t2")])
        );
        assert_eq!(query.order_by[0].direction, OrderDirection::Desc);
        assert_eq!((query.skip, query.limit), (Some(1), Some(2)));
    }
}
