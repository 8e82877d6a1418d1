//! Write batches applied atomically by the store.

use crate::value::{Row, Value};

/// A pending write.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Insert a row unless its primary key already exists.
    Insert {
        /// Table name.
        table: String,
        /// Row data, including the primary key.
        row: Row,
    },
    /// Merge fields into an existing row.
    Patch {
        /// Table name.
        table: String,
        /// Primary-key value of the row.
        key: Value,
        /// Fields to overwrite.
        fields: Row,
    },
    /// Remove a row.
    Delete {
        /// Table name.
        table: String,
        /// Primary-key value of the row.
        key: Value,
    },
}

impl WriteOp {
    /// Table this operation writes to.
    pub fn table(&self) -> &str {
        match self {
            WriteOp::Insert { table, .. }
            | WriteOp::Patch { table, .. }
            | WriteOp::Delete { table, .. } => table,
        }
    }
}

/// An ordered set of writes committed as one unit.
///
/// Operations are collected and applied under a single store lock on commit,
/// which publishes at most one change event.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    /// Create an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an insert-if-absent.
    pub fn insert(&mut self, table: impl Into<String>, row: Row) -> &mut Self {
        self.ops.push(WriteOp::Insert {
            table: table.into(),
            row,
        });
        self
    }

    /// Queue a patch.
    pub fn patch(&mut self, table: impl Into<String>, key: Value, fields: Row) -> &mut Self {
        self.ops.push(WriteOp::Patch {
            table: table.into(),
            key,
            fields,
        });
        self
    }

    /// Queue a delete.
    pub fn delete(&mut self, table: impl Into<String>, key: Value) -> &mut Self {
        self.ops.push(WriteOp::Delete {
            table: table.into(),
            key,
        });
        self
    }

    /// Number of queued operations.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Check if the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Queued operations, in order.
    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub(crate) fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_keeps_order() {
        let mut batch = WriteBatch::new();
        batch
            .insert("Task", Row::new())
            .patch("Task", Value::from("t1"), Row::new())
            .delete("Project", Value::from("p1"));

        assert_eq!(batch.len(), 3);
        let tables: Vec<_> = batch.ops().iter().map(WriteOp::table).collect();
        assert_eq!(tables, vec!["Task", "Task", "Project"]);
    }
}
