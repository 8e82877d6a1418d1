//! Registry of live selector subscriptions.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use super::subscription::SubscriptionEntry;

/// Tracks every live `changes()` stream of a database.
///
/// Entries are added when a stream takes its first snapshot and removed when
/// the stream is dropped, through [`SubscriptionGuard`].
pub struct SubscriptionRegistry {
    /// Active subscriptions keyed by subscription ID.
    subscriptions: DashMap<u64, SubscriptionEntry>,
    /// Index of subscriptions by dependency table.
    table_index: DashMap<String, Vec<u64>>,
    /// Next subscription ID.
    next_subscription_id: AtomicU64,
}

impl SubscriptionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            subscriptions: DashMap::new(),
            table_index: DashMap::new(),
            next_subscription_id: AtomicU64::new(1),
        }
    }

    /// Register a subscription. It is removed when the guard drops.
    pub fn subscribe(
        self: &Arc<Self>,
        table: &str,
        dependencies: BTreeSet<String>,
        fingerprint: u32,
    ) -> SubscriptionGuard {
        let subscription_id = self.next_subscription_id.fetch_add(1, Ordering::SeqCst);

        for dependency in &dependencies {
            self.table_index
                .entry(dependency.clone())
                .or_default()
                .push(subscription_id);
        }
        self.subscriptions.insert(
            subscription_id,
            SubscriptionEntry::new(subscription_id, table, dependencies, fingerprint),
        );

        tracing::debug!(subscription_id, table, fingerprint, "subscription opened");

        SubscriptionGuard {
            registry: Arc::clone(self),
            id: subscription_id,
        }
    }

    /// Remove a subscription. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, subscription_id: u64) -> bool {
        let Some((_, entry)) = self.subscriptions.remove(&subscription_id) else {
            return false;
        };

        for dependency in &entry.dependencies {
            let now_empty = match self.table_index.get_mut(dependency) {
                Some(mut ids) => {
                    ids.retain(|&id| id != subscription_id);
                    ids.is_empty()
                }
                None => false,
            };
            if now_empty {
                self.table_index.remove_if(dependency, |_, ids| ids.is_empty());
            }
        }

        tracing::debug!(
            subscription_id,
            table = %entry.table,
            emissions = entry.emissions,
            age_ms = entry.age().as_millis() as u64,
            "subscription closed"
        );
        true
    }

    /// Count an emitted snapshot.
    pub fn record_emission(&self, subscription_id: u64) {
        if let Some(mut entry) = self.subscriptions.get_mut(&subscription_id) {
            entry.record_emission();
        }
    }

    /// Get the number of active subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Get subscriptions depending on a table.
    pub fn subscriptions_for_table(&self, table: &str) -> Vec<u64> {
        self.table_index
            .get(table)
            .map(|ids| ids.clone())
            .unwrap_or_default()
    }
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Removes its subscription from the registry when dropped.
pub struct SubscriptionGuard {
    registry: Arc<SubscriptionRegistry>,
    id: u64,
}

impl SubscriptionGuard {
    /// Subscription ID.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Count an emitted snapshot.
    pub fn record_emission(&self) {
        self.registry.record_emission(self.id);
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.registry.unsubscribe(self.id);
    }
}
