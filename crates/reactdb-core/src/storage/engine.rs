//! In-memory relational store.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use tokio::sync::broadcast;

use super::changelog::{ChangeEvent, ChangeFeed};
use super::transaction::{WriteBatch, WriteOp};
use crate::error::{Error, Result};
use crate::query::{FilterEvaluator, Predicate};
use crate::value::{Row, Value};

/// Default capacity of the change broadcast.
pub const DEFAULT_CHANGE_BUFFER: usize = 1024;

/// Rows of one relation, in insertion order.
#[derive(Debug, Default)]
struct Table {
    primary_key: String,
    next_slot: u64,
    /// Primary-key index key to slot.
    slots: HashMap<String, u64>,
    rows: BTreeMap<u64, Row>,
}

impl Table {
    fn new(primary_key: String) -> Self {
        Self {
            primary_key,
            ..Default::default()
        }
    }

    fn get(&self, key: &Value) -> Option<&Row> {
        self.slots
            .get(&key.index_key())
            .and_then(|slot| self.rows.get(slot))
    }

    /// Returns `false` if the key already exists.
    fn insert(&mut self, key: String, row: Row) -> bool {
        if self.slots.contains_key(&key) {
            return false;
        }
        let slot = self.next_slot;
        self.next_slot += 1;
        self.slots.insert(key, slot);
        self.rows.insert(slot, row);
        true
    }

    /// Returns `true` if any field changed.
    fn patch(&mut self, key: &Value, fields: Row) -> bool {
        let Some(row) = self
            .slots
            .get(&key.index_key())
            .and_then(|slot| self.rows.get_mut(slot))
        else {
            return false;
        };
        let mut changed = false;
        for (name, value) in fields {
            if row.get(&name) != Some(&value) {
                row.insert(name, value);
                changed = true;
            }
        }
        changed
    }

    fn remove(&mut self, key: &Value) -> bool {
        match self.slots.remove(&key.index_key()) {
            Some(slot) => self.rows.remove(&slot).is_some(),
            None => false,
        }
    }
}

/// Outcome of a commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitReceipt {
    /// Sequence number of the published event, if anything changed.
    pub sequence: Option<u64>,
    /// Number of operations that changed a row.
    pub changed: usize,
    /// Tables with at least one changed row.
    pub tables: BTreeSet<String>,
}

/// Non-durable relational store with table-keyed change notification.
///
/// Reads take a shared lock. A commit applies its whole batch under the
/// exclusive lock and publishes one event before releasing it, so events are
/// observed in commit order.
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Table>>,
    feed: ChangeFeed,
    closed: AtomicBool,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new(change_buffer: usize) -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            feed: ChangeFeed::new(change_buffer),
            closed: AtomicBool::new(false),
        }
    }

    /// Create a store holding the given `(relation, primary key)` layout.
    pub fn with_layout(
        change_buffer: usize,
        layout: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Self> {
        let store = Self::new(change_buffer);
        for (name, primary_key) in layout {
            store.create_table(name, primary_key)?;
        }
        Ok(store)
    }

    /// Create a relation.
    pub fn create_table(
        &self,
        name: impl Into<String>,
        primary_key: impl Into<String>,
    ) -> Result<()> {
        self.ensure_open()?;
        let name = name.into();
        let mut tables = self.tables.write();
        if tables.contains_key(&name) {
            return Err(Error::Store(format!("relation `{}` already exists", name)));
        }
        tracing::trace!(relation = %name, "relation created");
        tables.insert(name, Table::new(primary_key.into()));
        Ok(())
    }

    /// Check if a relation exists.
    pub fn has_table(&self, name: &str) -> bool {
        self.tables.read().contains_key(name)
    }

    /// Number of rows in a relation.
    pub fn len(&self, table: &str) -> Result<usize> {
        self.ensure_open()?;
        let tables = self.tables.read();
        Ok(Self::table(&tables, table)?.rows.len())
    }

    /// Look up a row by primary key.
    pub fn find(&self, table: &str, key: &Value) -> Result<Option<Row>> {
        self.ensure_open()?;
        let tables = self.tables.read();
        Ok(Self::table(&tables, table)?.get(key).cloned())
    }

    /// Check if a primary key exists.
    pub fn contains(&self, table: &str, key: &Value) -> Result<bool> {
        self.ensure_open()?;
        let tables = self.tables.read();
        Ok(Self::table(&tables, table)?.get(key).is_some())
    }

    /// All rows matching `predicate`, in insertion order.
    pub fn scan(&self, table: &str, predicate: Option<&Predicate>) -> Result<Vec<Row>> {
        self.ensure_open()?;
        let tables = self.tables.read();
        let rows = Self::table(&tables, table)?
            .rows
            .values()
            .filter(|row| predicate.map_or(true, |p| FilterEvaluator::evaluate(p, row)))
            .cloned()
            .collect();
        Ok(rows)
    }

    /// Apply a batch of writes atomically.
    ///
    /// Every relation is checked before anything is applied. Operations that
    /// change nothing (an insert of an existing key, a patch or delete of a
    /// missing row) are skipped. One event is published if any row changed.
    pub fn commit(&self, batch: WriteBatch) -> Result<CommitReceipt> {
        self.ensure_open()?;
        let mut tables = self.tables.write();

        for op in batch.ops() {
            let table = Self::table(&tables, op.table())?;
            if let WriteOp::Insert { table: name, row } = op {
                if !row.contains_key(&table.primary_key) {
                    return Err(Error::Store(format!(
                        "row for `{}` has no `{}`",
                        name, table.primary_key
                    )));
                }
            }
        }

        let mut receipt = CommitReceipt::default();
        for op in batch.into_ops() {
            let Some(table) = tables.get_mut(op.table()) else {
                continue;
            };
            let (name, changed) = match op {
                WriteOp::Insert { table: name, row } => {
                    let key = row
                        .get(&table.primary_key)
                        .map(Value::index_key)
                        .unwrap_or_default();
                    (name, table.insert(key, row))
                }
                WriteOp::Patch {
                    table: name,
                    key,
                    fields,
                } => (name, table.patch(&key, fields)),
                WriteOp::Delete { table: name, key } => (name, table.remove(&key)),
            };
            if changed {
                receipt.changed += 1;
                receipt.tables.insert(name);
            }
        }

        if !receipt.tables.is_empty() {
            receipt.sequence = Some(self.feed.publish(receipt.tables.clone()));
        }
        drop(tables);

        Ok(receipt)
    }

    /// Subscribe to change events.
    pub fn subscribe(&self) -> Result<broadcast::Receiver<ChangeEvent>> {
        self.ensure_open()?;
        Ok(self.feed.subscribe())
    }

    /// Number of live change subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.feed.receiver_count()
    }

    /// Close the store. Returns `false` if it was already closed.
    pub fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.tables.write().clear();
        self.feed.close();
        true
    }

    /// Check if the store has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(Error::Disposed)
        } else {
            Ok(())
        }
    }

    fn table<'a>(tables: &'a HashMap<String, Table>, name: &str) -> Result<&'a Table> {
        tables
            .get(name)
            .ok_or_else(|| Error::Store(format!("relation `{}` does not exist", name)))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_CHANGE_BUFFER)
    }
}
