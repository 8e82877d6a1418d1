//! Change notification for committed writes.
//!
//! Every commit that changes at least one row publishes a single
//! [`ChangeEvent::Commit`] naming the tables it touched. Closing the store
//! publishes [`ChangeEvent::Closed`].

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::broadcast;

/// An event published to store subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    /// A batch of writes was applied.
    Commit {
        /// Monotonic commit sequence number.
        sequence: u64,
        /// Tables with at least one changed row.
        tables: BTreeSet<String>,
    },
    /// The store was closed; no further events follow.
    Closed,
}

impl ChangeEvent {
    /// Check if this event touches any of the given tables.
    pub fn touches<'a>(&self, tables: impl IntoIterator<Item = &'a String>) -> bool {
        match self {
            ChangeEvent::Commit { tables: touched, .. } => {
                tables.into_iter().any(|t| touched.contains(t))
            }
            ChangeEvent::Closed => false,
        }
    }
}

/// Sequenced broadcast of change events.
pub struct ChangeFeed {
    next_seq: AtomicU64,
    sender: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    /// Create a feed whose subscribers buffer up to `capacity` events.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            next_seq: AtomicU64::new(1),
            sender,
        }
    }

    /// Subscribe to future events.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }

    /// Number of live receivers.
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Publish a commit, returning its sequence number.
    pub fn publish(&self, tables: BTreeSet<String>) -> u64 {
        let sequence = self.next_seq.fetch_add(1, Ordering::SeqCst);
        tracing::trace!(sequence, tables = ?tables, "commit published");
        // No receivers is not an error: nobody is observing.
        let _ = self.sender.send(ChangeEvent::Commit { sequence, tables });
        sequence
    }

    /// Publish the close event.
    pub fn close(&self) {
        let _ = self.sender.send(ChangeEvent::Closed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_publish_is_sequenced() {
        let feed = ChangeFeed::new(8);
        let mut rx = feed.subscribe();

        let first = feed.publish(tables(&["Task"]));
        let second = feed.publish(tables(&["Project", "Task"]));
        assert!(second > first);

        assert_eq!(
            rx.try_recv().unwrap(),
            ChangeEvent::Commit {
                sequence: first,
                tables: tables(&["Task"])
            }
        );
        assert!(matches!(rx.try_recv().unwrap(), ChangeEvent::Commit { sequence, .. } if sequence == second));
    }

    #[test]
    fn test_publish_without_receivers() {
        let feed = ChangeFeed::new(1);
        assert_eq!(feed.receiver_count(), 0);
        feed.publish(tables(&["Task"]));
        feed.close();
    }

    #[test]
    fn test_touches() {
        let event = ChangeEvent::Commit {
            sequence: 1,
            tables: tables(&["Task"]),
        };
        let deps = vec!["Project".to_string(), "Task".to_string()];
        assert!(event.touches(&deps));
        assert!(!event.touches(&vec!["Tag".to_string()]));
        assert!(!ChangeEvent::Closed.touches(&deps));
    }
}
