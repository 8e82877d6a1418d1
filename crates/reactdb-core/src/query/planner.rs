//! Query planner for transforming read options into execution plans.
//!
//! The planner resolves the projection against the catalog, validates it, and
//! collects every relation the result depends on.

use std::collections::BTreeSet;

use super::options::{FieldSelector, OrderSpec, Query};
use super::predicate::Predicate;
use crate::catalog::{Catalog, SelectMetaData, VirtualFieldDescriptor};
use crate::error::QueryError;

/// Resolved shape of the rows of one table.
#[derive(Debug, Clone)]
pub struct Projection {
    /// Table the rows come from.
    pub table: String,
    /// Concrete fields to present.
    pub fields: Vec<String>,
    /// Hidden fields among `fields`, presented raw.
    pub hidden: BTreeSet<String>,
    /// Associations to materialize.
    pub associations: Vec<AssociationPlan>,
}

/// Plan for materializing one virtual field.
#[derive(Debug, Clone)]
pub struct AssociationPlan {
    /// Virtual field name.
    pub name: String,
    /// Resolved descriptor.
    pub descriptor: VirtualFieldDescriptor,
    /// Primary key of the target table.
    pub target_pk: String,
    /// Shape of the target rows.
    pub projection: Projection,
}

/// An execution plan for a read.
#[derive(Debug, Clone)]
pub struct QueryPlan {
    /// Root projection.
    pub projection: Projection,
    /// Combined primary-key and row predicate.
    pub filter: Option<Predicate>,
    /// Sort keys.
    pub order_by: Vec<OrderSpec>,
    /// Rows to skip after ordering.
    pub skip: usize,
    /// Maximum rows after skipping.
    pub limit: Option<usize>,
    /// Relations whose changes can alter the result.
    pub dependencies: BTreeSet<String>,
}

impl QueryPlan {
    /// Root table.
    pub fn table(&self) -> &str {
        &self.projection.table
    }
}

/// Builds [`QueryPlan`]s against a compiled catalog.
pub struct QueryPlanner<'a> {
    catalog: &'a Catalog,
}

impl<'a> QueryPlanner<'a> {
    /// Create a planner.
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    /// Plan a read of `table`.
    pub fn plan(&self, table: &str, query: &Query) -> Result<QueryPlan, QueryError> {
        let meta = self.catalog.require(table)?;

        let projection = match &query.fields {
            Some(selectors) => self.plan_projection(meta, selectors)?,
            None => self.default_projection(meta),
        };

        let filter = match (&query.primary_value, &query.filter) {
            (Some(pv), Some(p)) => Some(pv.to_predicate(&meta.primary_key).and(p.clone())),
            (Some(pv), None) => Some(pv.to_predicate(&meta.primary_key)),
            (None, p) => p.clone(),
        };

        let mut dependencies = BTreeSet::new();
        collect_dependencies(&projection, &mut dependencies);

        Ok(QueryPlan {
            projection,
            filter,
            order_by: query.order_by.clone(),
            skip: query.skip.unwrap_or(0),
            limit: query.limit,
            dependencies,
        })
    }

    /// Every concrete field plus every virtual field, one level deep.
    fn default_projection(&self, meta: &SelectMetaData) -> Projection {
        let associations = meta
            .virtual_meta
            .iter()
            .filter_map(|(name, descriptor)| {
                let target = self.catalog.table(descriptor.target())?;
                Some(AssociationPlan {
                    name: name.clone(),
                    descriptor: descriptor.clone(),
                    target_pk: target.primary_key.clone(),
                    projection: concrete_projection(target),
                })
            })
            .collect();

        Projection {
            associations,
            ..concrete_projection(meta)
        }
    }

    fn plan_projection(
        &self,
        meta: &SelectMetaData,
        selectors: &[FieldSelector],
    ) -> Result<Projection, QueryError> {
        let mut fields: Vec<String> = Vec::new();
        let mut associations: Vec<AssociationPlan> = Vec::new();

        for selector in selectors {
            let name = selector.name();
            if meta.has_field(name) {
                if !fields.iter().any(|f| f == name) {
                    fields.push(name.to_string());
                }
                continue;
            }
            let Some(descriptor) = meta.virtual_field(name) else {
                tracing::trace!(table = %meta.table, field = name, "unknown field dropped");
                continue;
            };
            if associations.iter().any(|a| a.name == name) {
                continue;
            }
            let Some(target) = self.catalog.table(descriptor.target()) else {
                continue;
            };
            let projection = match selector {
                FieldSelector::Association(_, nested) => self.plan_projection(target, nested)?,
                FieldSelector::Field(_) => concrete_projection(target),
            };
            associations.push(AssociationPlan {
                name: name.to_string(),
                descriptor: descriptor.clone(),
                target_pk: target.primary_key.clone(),
                projection,
            });
        }

        if fields.is_empty() {
            return Err(QueryError::InvalidFieldDescriptor {
                table: meta.table.clone(),
            });
        }

        let hidden = fields
            .iter()
            .filter(|f| meta.is_hidden(f))
            .cloned()
            .collect();

        Ok(Projection {
            table: meta.table.clone(),
            fields,
            hidden,
            associations,
        })
    }
}

/// The table's concrete fields, no associations.
fn concrete_projection(meta: &SelectMetaData) -> Projection {
    Projection {
        table: meta.table.clone(),
        fields: meta.field_names().map(str::to_string).collect(),
        hidden: meta.hidden_fields().map(str::to_string).collect(),
        associations: Vec::new(),
    }
}

fn collect_dependencies(projection: &Projection, out: &mut BTreeSet<String>) {
    out.insert(projection.table.clone());
    for association in &projection.associations {
        if let Some(link) = association.descriptor.link() {
            out.insert(link.name.clone());
        }
        collect_dependencies(&association.projection, out);
    }
}
