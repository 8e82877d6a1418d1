//! Mutation executor for handling write operations.

use std::collections::BTreeSet;

use reactdb_core::catalog::{Catalog, LINK_KEY, LINK_LEFT, LINK_RIGHT};
use reactdb_core::storage::{MemoryStore, WriteBatch};
use reactdb_core::{MutationError, Predicate, Row, Value};

use crate::cascade::{store_field, InsertCascade};
use crate::error::Error;

/// Rows addressed by an update or delete.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    /// A single primary key.
    Key(Value),
    /// Any of several primary keys.
    Keys(Vec<Value>),
    /// Rows matching a predicate.
    Where(Predicate),
    /// Every row of the table.
    All,
}

impl Target {
    /// Predicate over the table, or `None` for every row.
    pub fn to_predicate(&self, primary_key: &str) -> Option<Predicate> {
        match self {
            Target::Key(key) => Some(Predicate::eq(primary_key, key.clone())),
            Target::Keys(keys) => Some(Predicate::is_in(primary_key, keys.clone())),
            Target::Where(predicate) => Some(predicate.clone()),
            Target::All => None,
        }
    }
}

impl From<Predicate> for Target {
    fn from(predicate: Predicate) -> Self {
        Target::Where(predicate)
    }
}

impl From<Value> for Target {
    fn from(key: Value) -> Self {
        Target::Key(key)
    }
}

impl From<&str> for Target {
    fn from(key: &str) -> Self {
        Target::Key(Value::from(key))
    }
}

impl From<String> for Target {
    fn from(key: String) -> Self {
        Target::Key(Value::from(key))
    }
}

impl From<Vec<Value>> for Target {
    fn from(keys: Vec<Value>) -> Self {
        Target::Keys(keys)
    }
}

/// Outcome of an update or delete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MutationResult {
    /// Number of rows matched by the target.
    pub affected: usize,
}

impl MutationResult {
    /// Result affecting `n` rows.
    pub fn affected(n: usize) -> Self {
        Self { affected: n }
    }
}

/// Executes write operations against the store.
pub struct MutationExecutor<'a> {
    catalog: &'a Catalog,
    store: &'a MemoryStore,
    max_cascade_depth: usize,
}

impl<'a> MutationExecutor<'a> {
    /// Create a new mutation executor.
    pub fn new(catalog: &'a Catalog, store: &'a MemoryStore, max_cascade_depth: usize) -> Self {
        Self {
            catalog,
            store,
            max_cascade_depth,
        }
    }

    /// Insert a row, or an array of rows, with everything nested under their
    /// virtual fields. Returns one echo per top-level row.
    pub fn insert(&self, table: &str, payload: Value) -> Result<Vec<Row>, Error> {
        self.catalog.require(table)?;

        let rows = match payload {
            Value::Object(row) => vec![row],
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::Object(row) => Ok(row),
                    other => Err(invalid_payload(table, &other)),
                })
                .collect::<Result<Vec<_>, _>>()?,
            other => return Err(invalid_payload(table, &other)),
        };

        let mut cascade = InsertCascade::new(self.catalog, self.store, self.max_cascade_depth);
        let echoes = rows
            .into_iter()
            .map(|row| cascade.insert_row(table, row))
            .collect::<Result<Vec<_>, _>>()?;

        let batch = cascade.into_batch();
        let queued = batch.len();
        let receipt = self.store.commit(batch)?;

        tracing::debug!(
            table,
            rows = echoes.len(),
            queued,
            written = receipt.changed,
            "rows inserted"
        );

        Ok(echoes)
    }

    /// Apply `patch` to every row addressed by `target`.
    ///
    /// Virtual and unknown keys are ignored. A patch naming the primary key is
    /// rejected before anything is written.
    pub fn update(&self, table: &str, target: &Target, patch: Row) -> Result<MutationResult, Error> {
        let meta = self.catalog.require(table)?;

        if patch.contains_key(&meta.primary_key) {
            return Err(MutationError::UnmodifiablePrimaryKey {
                field: meta.primary_key.clone(),
                table: table.to_string(),
            }
            .into());
        }

        let mut fields = Row::new();
        for (name, value) in patch {
            if meta.has_field(&name) {
                store_field(meta, &mut fields, name, value)?;
            }
        }
        if fields.is_empty() {
            tracing::debug!(table, "empty patch, nothing updated");
            return Ok(MutationResult::default());
        }

        let rows = self
            .store
            .scan(table, target.to_predicate(&meta.primary_key).as_ref())?;

        let mut batch = WriteBatch::new();
        for row in &rows {
            if let Some(key) = row.get(&meta.primary_key) {
                batch.patch(table, key.clone(), fields.clone());
            }
        }
        let receipt = self.store.commit(batch)?;

        tracing::debug!(
            table,
            affected = rows.len(),
            changed = receipt.changed,
            "rows updated"
        );

        Ok(MutationResult::affected(rows.len()))
    }

    /// Remove every row addressed by `target`, with the link rows naming it.
    pub fn delete(&self, table: &str, target: &Target) -> Result<MutationResult, Error> {
        let meta = self.catalog.require(table)?;

        let keys: Vec<Value> = self
            .store
            .scan(table, target.to_predicate(&meta.primary_key).as_ref())?
            .into_iter()
            .filter_map(|mut row| row.remove(&meta.primary_key))
            .collect();

        let mut batch = WriteBatch::new();
        for key in &keys {
            batch.delete(table, key.clone());
        }
        self.unlink(table, &keys, &mut batch)?;
        let receipt = self.store.commit(batch)?;

        tracing::debug!(
            table,
            affected = keys.len(),
            removed = receipt.changed,
            "rows deleted"
        );

        Ok(MutationResult::affected(keys.len()))
    }

    /// Queue removal of the link rows naming any of `keys` on `table`'s side.
    fn unlink(&self, table: &str, keys: &[Value], batch: &mut WriteBatch) -> Result<(), Error> {
        if keys.is_empty() {
            return Ok(());
        }

        for link in self.catalog.link_relations() {
            let mut columns = Vec::new();
            if link.left_table == table {
                columns.push(LINK_LEFT);
            }
            if link.right_table == table {
                columns.push(LINK_RIGHT);
            }
            if columns.is_empty() {
                continue;
            }

            let predicate = columns
                .into_iter()
                .map(|column| Predicate::is_in(column, keys.to_vec()))
                .reduce(Predicate::or);
            let link_keys: BTreeSet<String> = self
                .store
                .scan(&link.name, predicate.as_ref())?
                .into_iter()
                .filter_map(|row| match row.get(LINK_KEY) {
                    Some(Value::String(key)) => Some(key.clone()),
                    _ => None,
                })
                .collect();

            for key in link_keys {
                batch.delete(link.name.clone(), Value::String(key));
            }
        }

        Ok(())
    }
}

fn invalid_payload(table: &str, value: &Value) -> Error {
    MutationError::InvalidPayload {
        table: table.to_string(),
        found: value.type_tag(),
    }
    .into()
}
