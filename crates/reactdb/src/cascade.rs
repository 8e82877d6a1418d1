//! Cascading insert through virtual fields.
//!
//! An inserted row may carry nested rows under its virtual fields. Each nested
//! row is inserted into the association's target table, recursively, and
//! many-to-many associations also get a link row. Every write lands in a single
//! [`WriteBatch`] so the whole insert commits at once.

use std::collections::HashSet;

use reactdb_core::catalog::{shadow_key, Cardinality, Catalog, SelectMetaData};
use reactdb_core::storage::{MemoryStore, WriteBatch};
use reactdb_core::{MutationError, Row, Value};

use crate::error::Error;

/// Expected shape of a hidden field's raw value.
const DATE_EXPECTED: &str = "a date, an RFC 3339 string or epoch milliseconds";

/// Collects the writes of one insert call.
pub struct InsertCascade<'a> {
    catalog: &'a Catalog,
    store: &'a MemoryStore,
    max_depth: usize,
    batch: WriteBatch,
    /// `(table, key)` pairs already handled by this call.
    visited: HashSet<(String, String)>,
}

impl<'a> InsertCascade<'a> {
    /// Create a cascade bounded to `max_depth` levels of nesting.
    pub fn new(catalog: &'a Catalog, store: &'a MemoryStore, max_depth: usize) -> Self {
        Self {
            catalog,
            store,
            max_depth,
            batch: WriteBatch::new(),
            visited: HashSet::new(),
        }
    }

    /// Queue `payload` for insertion into `table`, returning its echo.
    ///
    /// The echo holds the stored concrete fields, plus the shadow key of every
    /// hidden field.
    pub fn insert_row(&mut self, table: &str, payload: Row) -> Result<Row, Error> {
        self.visit(table, payload, 0)
    }

    /// Finish the cascade, returning the queued writes.
    pub fn into_batch(self) -> WriteBatch {
        self.batch
    }

    fn visit(&mut self, table: &str, payload: Row, depth: usize) -> Result<Row, Error> {
        if depth > self.max_depth {
            return Err(MutationError::CascadeDepthExceeded {
                depth: self.max_depth,
            }
            .into());
        }

        let catalog = self.catalog;
        let meta = catalog.require(table)?;
        let key = match payload.get(&meta.primary_key) {
            Some(key) if !key.is_null() => key.clone(),
            _ => {
                return Err(MutationError::MissingPrimaryKey {
                    field: meta.primary_key.clone(),
                    table: table.to_string(),
                }
                .into())
            }
        };

        let mut stored = Row::new();
        let mut nested = Vec::new();
        for (name, value) in payload {
            if meta.has_field(&name) {
                store_field(meta, &mut stored, name, value)?;
            } else if meta.has_virtual(&name) {
                nested.push((name, value));
            }
        }

        if !self.visited.insert((table.to_string(), key.index_key())) {
            return Ok(stored);
        }

        if self.store.contains(table, &key)? {
            tracing::trace!(table, key = %key, "row exists, insert skipped");
        } else {
            self.batch.insert(table, stored.clone());
        }

        for (name, value) in nested {
            self.visit_association(meta, &key, &name, value, depth)?;
        }

        Ok(stored)
    }

    fn visit_association(
        &mut self,
        meta: &SelectMetaData,
        owner_key: &Value,
        name: &str,
        value: Value,
        depth: usize,
    ) -> Result<(), Error> {
        let Some(descriptor) = meta.virtual_field(name) else {
            return Ok(());
        };
        let target = descriptor.target().to_string();
        let link = descriptor.link().cloned();

        let rows = match (descriptor.cardinality(), value) {
            (_, Value::Null) => Vec::new(),
            (_, Value::Object(row)) => vec![row],
            (Cardinality::Many, Value::Array(items)) => items
                .into_iter()
                .map(|item| match item {
                    Value::Object(row) => Ok(row),
                    other => Err(invalid_payload(&target, &other)),
                })
                .collect::<Result<Vec<_>, _>>()?,
            (_, other) => return Err(invalid_payload(&target, &other)),
        };

        for row in rows {
            let echo = self.visit(&target, row, depth + 1)?;
            if let Some(link) = &link {
                let target_pk = self
                    .catalog
                    .primary_key(&target)
                    .and_then(|pk| echo.get(pk));
                if let Some(target_key) = target_pk {
                    self.batch.insert(
                        link.name.clone(),
                        link.link_row(&meta.table, owner_key, target_key),
                    );
                }
            }
        }

        Ok(())
    }
}

/// Write one concrete field into `row`, converting hidden fields.
pub(crate) fn store_field(
    meta: &SelectMetaData,
    row: &mut Row,
    name: String,
    value: Value,
) -> Result<(), Error> {
    if !meta.is_hidden(&name) {
        row.insert(name, value);
        return Ok(());
    }

    let converted = if value.is_null() {
        Value::Null
    } else {
        value
            .to_date()
            .map(Value::Date)
            .ok_or_else(|| MutationError::InvalidValue {
                field: name.clone(),
                table: meta.table.clone(),
                expected: DATE_EXPECTED,
            })?
    };
    row.insert(shadow_key(&name), value);
    row.insert(name, converted);
    Ok(())
}

fn invalid_payload(table: &str, value: &Value) -> Error {
    MutationError::InvalidPayload {
        table: table.to_string(),
        found: value.type_tag(),
    }
    .into()
}
