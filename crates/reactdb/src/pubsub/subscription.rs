//! Subscription tracking.

use std::collections::BTreeSet;
use std::time::Instant;

/// A live `changes()` stream, as seen by the registry.
#[derive(Debug, Clone)]
pub struct SubscriptionEntry {
    /// Unique subscription ID.
    pub id: u64,
    /// Root table being watched.
    pub table: String,
    /// Every relation whose commits can change the snapshot.
    pub dependencies: BTreeSet<String>,
    /// Hash of the selector's query, for correlating log lines.
    pub fingerprint: u32,
    /// When the subscription was created.
    pub created_at: Instant,
    /// Number of snapshots emitted.
    pub emissions: u64,
}

impl SubscriptionEntry {
    /// Create a new subscription entry.
    pub fn new(
        id: u64,
        table: impl Into<String>,
        dependencies: BTreeSet<String>,
        fingerprint: u32,
    ) -> Self {
        Self {
            id,
            table: table.into(),
            dependencies,
            fingerprint,
            created_at: Instant::now(),
            emissions: 0,
        }
    }

    /// Get the age of this subscription.
    pub fn age(&self) -> std::time::Duration {
        self.created_at.elapsed()
    }

    /// Increment the emission counter.
    pub fn record_emission(&mut self) {
        self.emissions += 1;
    }
}
