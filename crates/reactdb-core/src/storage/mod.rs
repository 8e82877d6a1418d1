//! Storage layer for reactdb.
//!
//! This module provides a non-durable in-memory store with batched commits and
//! a broadcast of committed table changes.

mod changelog;
mod engine;
mod transaction;

pub use changelog::{ChangeEvent, ChangeFeed};
pub use engine::{CommitReceipt, MemoryStore, DEFAULT_CHANGE_BUFFER};
pub use transaction::{WriteBatch, WriteOp};
