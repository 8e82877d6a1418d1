//! Query executor for running planned reads.
//!
//! The executor takes a query plan and runs it against the store, returning
//! fully materialized rows with associations nested in place.

use std::cmp::Ordering;

use crate::catalog::{shadow_key, Cardinality};
use crate::error::Error;
use crate::storage::MemoryStore;
use crate::value::{Row, Value};

use super::filter::FilterEvaluator;
use super::options::{OrderDirection, OrderSpec};
use super::planner::{AssociationPlan, Projection, QueryPlan};

/// Query executor that runs plans against the store.
pub struct QueryExecutor<'a> {
    store: &'a MemoryStore,
}

impl<'a> QueryExecutor<'a> {
    /// Create a new executor over a store.
    pub fn new(store: &'a MemoryStore) -> Self {
        Self { store }
    }

    /// Execute a plan and return its snapshot.
    pub fn execute(&self, plan: &QueryPlan) -> Result<Vec<Row>, Error> {
        let mut rows = self.store.scan(plan.table(), plan.filter.as_ref())?;

        if !plan.order_by.is_empty() {
            rows.sort_by(|a, b| compare_rows(a, b, &plan.order_by));
        }

        rows.into_iter()
            .skip(plan.skip)
            .take(plan.limit.unwrap_or(usize::MAX))
            .map(|row| self.materialize(&plan.projection, &row))
            .collect()
    }

    /// Present one stored row in the shape of `projection`.
    fn materialize(&self, projection: &Projection, row: &Row) -> Result<Row, Error> {
        let mut out = Row::new();

        for field in &projection.fields {
            let value = if projection.hidden.contains(field) {
                row.get(&shadow_key(field)).or_else(|| row.get(field))
            } else {
                row.get(field)
            };
            out.insert(field.clone(), value.cloned().unwrap_or(Value::Null));
        }

        for association in &projection.associations {
            let value = self.materialize_association(&projection.table, association, row)?;
            out.insert(association.name.clone(), value);
        }

        Ok(out)
    }

    fn materialize_association(
        &self,
        owner: &str,
        association: &AssociationPlan,
        row: &Row,
    ) -> Result<Value, Error> {
        let descriptor = &association.descriptor;
        let key = match row.get(descriptor.local_key()) {
            Some(key) if !key.is_null() => key,
            _ => return Ok(empty(descriptor.cardinality())),
        };

        let linked = match descriptor.link() {
            Some(link) => {
                let (_, target_col) = link.columns_for(owner);
                self.store
                    .scan(&link.name, Some(&link.owned_by(owner, key)))?
                    .into_iter()
                    .filter_map(|mut link_row| link_row.remove(target_col))
                    .collect()
            }
            None => Vec::new(),
        };

        let predicate = descriptor.predicate(key, &association.target_pk, linked);
        let targets = self
            .store
            .scan(&association.projection.table, Some(&predicate))?;

        match descriptor.cardinality() {
            Cardinality::Single => match targets.first() {
                Some(target) => Ok(Value::Object(
                    self.materialize(&association.projection, target)?,
                )),
                None => Ok(Value::Null),
            },
            Cardinality::Many => targets
                .iter()
                .map(|target| {
                    self.materialize(&association.projection, target)
                        .map(Value::Object)
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
        }
    }
}

fn empty(cardinality: Cardinality) -> Value {
    match cardinality {
        Cardinality::Single => Value::Null,
        Cardinality::Many => Value::Array(Vec::new()),
    }
}

fn compare_rows(a: &Row, b: &Row, order_by: &[OrderSpec]) -> Ordering {
    for spec in order_by {
        let ord = FilterEvaluator::sort_order(a.get(&spec.field), b.get(&spec.field));
        let ord = match spec.direction {
            OrderDirection::Asc => ord,
            OrderDirection::Desc => ord.reverse(),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{
        Catalog, FieldSpec, RdbType, SchemaDefinition, SchemaRegistry, VirtualFieldSpec,
    };
    use crate::query::{FieldSelector, Predicate, Query, QueryPlanner};
    use crate::storage::WriteBatch;

    fn catalog() -> Catalog {
        SchemaRegistry::new()
            .with_schema(
                SchemaDefinition::new("Task", "_id")
                    .with_field(FieldSpec::typed("_id", RdbType::String))
                    .with_field(FieldSpec::typed("content", RdbType::String))
                    .with_field(FieldSpec::typed("_projectId", RdbType::String))
                    .with_field(FieldSpec::typed("rank", RdbType::Integer))
                    .with_virtual(
                        VirtualFieldSpec::one_to_one("project", "Project")
                            .with_local_key("_projectId"),
                    )
                    .with_virtual(VirtualFieldSpec::many_to_many("tags", "Tag")),
            )
            .with_schema(
                SchemaDefinition::new("Project", "_id")
                    .with_field(FieldSpec::typed("_id", RdbType::String))
                    .with_field(FieldSpec::typed("name", RdbType::String)),
            )
            .with_schema(
                SchemaDefinition::new("Tag", "_id")
                    .with_field(FieldSpec::typed("_id", RdbType::String))
                    .with_field(FieldSpec::typed("label", RdbType::String)),
            )
            .compile()
            .unwrap()
    }

    fn row(pairs: &[(&str, Value)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn seeded(catalog: &Catalog) -> MemoryStore {
        let store = MemoryStore::with_layout(16, catalog.store_layout()).unwrap();
        let link = catalog.link_relations().next().unwrap().clone();

        let mut batch = WriteBatch::new();
        batch.insert(
            "Project",
            row(&[("_id", "p1".into()), ("name", "alpha".into())]),
        );
        for (id, rank, project) in [("t1", 3i64, Some("p1")), ("t2", 1, None), ("t3", 2, Some("p1"))]
        {
            batch.insert(
                "Task",
                row(&[
                    ("_id", id.into()),
                    ("content", format!("task {}", id).into()),
                    ("_projectId", project.into()),
                    ("rank", rank.into()),
                ]),
            );
        }
        for (id, label) in [("g1", "red"), ("g2", "blue")] {
            batch.insert("Tag", row(&[("_id", id.into()), ("label", label.into())]));
        }
        batch.insert(&link.name, link.link_row("Task", &"t1".into(), &"g1".into()));
        batch.insert(&link.name, link.link_row("Tag", &"g2".into(), &"t1".into()));
        store.commit(batch).unwrap();
        store
    }

    fn run(catalog: &Catalog, store: &MemoryStore, query: Query) -> Vec<Row> {
        let plan = QueryPlanner::new(catalog).plan("Task", &query).unwrap();
        QueryExecutor::new(store).execute(&plan).unwrap()
    }

    #[test]
    fn test_projection_only_returns_selected_fields() {
        let catalog = catalog();
        let store = seeded(&catalog);

        let rows = run(&catalog, &store, Query::new().select(["content"]));
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], row(&[("content", "task t1".into())]));
    }

    #[test]
    fn test_single_association() {
        let catalog = catalog();
        let store = seeded(&catalog);

        let rows = run(
            &catalog,
            &store,
            Query::new().select(vec![
                FieldSelector::field("_id"),
                FieldSelector::association("project", ["name"]),
            ]),
        );

        assert_eq!(
            rows[0]["project"],
            Value::Object(row(&[("name", "alpha".into())]))
        );
        assert_eq!(rows[1]["project"], Value::Null);
    }

    #[test]
    fn test_many_to_many_association() {
        let catalog = catalog();
        let store = seeded(&catalog);

        let rows = run(
            &catalog,
            &store,
            Query::new().primary("t1").select(["_id", "tags"]),
        );

        let tags = rows[0]["tags"].as_array().unwrap();
        let labels: Vec<_> = tags
            .iter()
            .map(|t| t.as_object().unwrap()["label"].clone())
            .collect();
        assert_eq!(labels, vec![Value::from("red"), Value::from("blue")]);

        let rows = run(
            &catalog,
            &store,
            Query::new().primary("t2").select(["_id", "tags"]),
        );
        assert_eq!(rows[0]["tags"], Value::Array(Vec::new()));
    }

    #[test]
    fn test_order_skip_limit() {
        let catalog = catalog();
        let store = seeded(&catalog);

        let rows = run(
            &catalog,
            &store,
            Query::new()
                .select(["_id"])
                .order_by(OrderSpec::asc("rank"))
                .skip(1)
                .limit(1),
        );
        assert_eq!(rows, vec![row(&[("_id", "t3".into())])]);

        let rows = run(
            &catalog,
            &store,
            Query::new()
                .select(["_id"])
                .filter(Predicate::is_not_null("_projectId"))
                .order_by(OrderSpec::desc("rank")),
        );
        let ids: Vec<_> = rows.iter().map(|r| r["_id"].clone()).collect();
        assert_eq!(ids, vec![Value::from("t1"), Value::from("t3")]);
    }
}
