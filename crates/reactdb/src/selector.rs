//! Live query results.
//!
//! A [`Selector`] pairs a read with the store's change broadcast. `values()`
//! materializes it once; `changes()` yields the current snapshot and then a
//! new one after every commit that alters it. `map` transforms every snapshot
//! on both paths.

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;

use futures::stream::{self, Stream, StreamExt};
use tokio::sync::broadcast::{self, error::RecvError};

use reactdb_core::query::{Query, QueryPlan};
use reactdb_core::storage::ChangeEvent;
use reactdb_core::util::hash;
use reactdb_core::Row;

use crate::database::DatabaseInner;
use crate::error::{Error, Result};
use crate::pubsub::SubscriptionGuard;

/// Full result of a read at one point in time.
pub type Snapshot = Vec<Row>;

/// Stream of snapshots in commit order.
pub type SnapshotStream = Pin<Box<dyn Stream<Item = Result<Snapshot>> + Send>>;

type Transform = Arc<dyn Fn(Snapshot) -> Snapshot + Send + Sync>;

/// A read that can be materialized once or observed over time.
///
/// Selectors are cheap to clone. Combining selectors concatenates their
/// snapshots in order.
#[derive(Clone)]
pub struct Selector {
    inputs: Vec<Input>,
    transform: Option<Transform>,
}

#[derive(Clone)]
enum Input {
    Source(Source),
    /// A mapped selector, kept whole so its transform applies to its own part.
    Mapped(Selector),
}

impl Selector {
    pub(crate) fn new(db: Arc<DatabaseInner>, table: impl Into<String>, query: Query) -> Self {
        Self {
            inputs: vec![Input::Source(Source::new(db, table.into(), query))],
            transform: None,
        }
    }

    /// Materialize the current snapshot.
    ///
    /// Can be awaited any number of times; each call reads the store afresh.
    pub async fn values(&self) -> Result<Snapshot> {
        self.snapshot()
    }

    fn snapshot(&self) -> Result<Snapshot> {
        let mut rows = Vec::new();
        for input in &self.inputs {
            match input {
                Input::Source(source) => rows.extend(source.snapshot()?),
                Input::Mapped(selector) => rows.extend(selector.snapshot()?),
            }
        }
        Ok(self.apply(rows))
    }

    fn apply(&self, rows: Snapshot) -> Snapshot {
        match &self.transform {
            Some(transform) => transform(rows),
            None => rows,
        }
    }

    /// Observe the result over time.
    ///
    /// The stream starts with the current snapshot and yields another each
    /// time a commit touching one of the read's tables changes the result.
    /// It ends after yielding an error, including [`Error::Disposed`] when the
    /// database is disposed. Dropping the stream unsubscribes.
    pub fn changes(&self) -> SnapshotStream {
        let mut streams: Vec<SnapshotStream> = self
            .inputs
            .iter()
            .map(|input| match input {
                Input::Source(source) => source.clone().changes(),
                Input::Mapped(selector) => selector.changes(),
            })
            .collect();
        let merged = match streams.len() {
            1 => streams.remove(0),
            _ => combine_latest(streams),
        };
        match self.transform.clone() {
            Some(transform) => merged
                .map(move |item| item.map(|rows| transform(rows)))
                .boxed(),
            None => merged,
        }
    }

    /// Combine this selector with others.
    pub fn combine(self, others: impl IntoIterator<Item = Selector>) -> Self {
        let mut inputs = self.into_inputs();
        for other in others {
            inputs.extend(other.into_inputs());
        }
        Self {
            inputs,
            transform: None,
        }
    }

    /// Same as [`Selector::combine`].
    pub fn concat(self, others: impl IntoIterator<Item = Selector>) -> Self {
        self.combine(others)
    }

    /// Transform every snapshot, from `values()` and from `changes()`.
    ///
    /// Mapping twice applies both transforms in order. A mapped selector
    /// combined with others keeps its transform for its own rows only.
    pub fn map<F>(self, f: F) -> Self
    where
        F: Fn(Snapshot) -> Snapshot + Send + Sync + 'static,
    {
        let transform: Transform = match self.transform {
            Some(previous) => Arc::new(move |rows| f(previous(rows))),
            None => Arc::new(f),
        };
        Self {
            inputs: self.inputs,
            transform: Some(transform),
        }
    }

    /// Root tables of the combined reads, in order.
    pub fn tables(&self) -> Vec<&str> {
        self.inputs
            .iter()
            .flat_map(|input| match input {
                Input::Source(source) => vec![source.table.as_str()],
                Input::Mapped(selector) => selector.tables(),
            })
            .collect()
    }

    fn into_inputs(self) -> Vec<Input> {
        match self.transform {
            Some(_) => vec![Input::Mapped(self)],
            None => self.inputs,
        }
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for input in &self.inputs {
            match input {
                Input::Source(source) => list.entry(&(source.table.as_str(), source.fingerprint)),
                Input::Mapped(selector) => list.entry(selector),
            };
        }
        list.finish()
    }
}

/// One read against one table.
#[derive(Clone)]
struct Source {
    db: Arc<DatabaseInner>,
    table: String,
    query: Query,
    fingerprint: u32,
}

impl Source {
    fn new(db: Arc<DatabaseInner>, table: String, query: Query) -> Self {
        let fingerprint = hash(&format!("{}:{:?}", table, query));
        Self {
            db,
            table,
            query,
            fingerprint,
        }
    }

    fn snapshot(&self) -> Result<Snapshot> {
        let plan = self.db.plan(&self.table, &self.query)?;
        self.db.execute(&plan)
    }

    fn changes(self) -> SnapshotStream {
        stream::unfold(ChangeState::Pending(self), |state| async move {
            match state {
                ChangeState::Pending(source) => match LiveQuery::open(source) {
                    Ok(live) => {
                        let snapshot = live.emit();
                        Some((Ok(snapshot), ChangeState::Live(Box::new(live))))
                    }
                    Err(err) => Some((Err(err), ChangeState::Done)),
                },
                ChangeState::Live(mut live) => match live.next_change().await {
                    Ok(snapshot) => Some((Ok(snapshot), ChangeState::Live(live))),
                    Err(err) => {
                        tracing::debug!(
                            fingerprint = live.source.fingerprint,
                            error = %err,
                            "change stream ended"
                        );
                        Some((Err(err), ChangeState::Done))
                    }
                },
                ChangeState::Done => None,
            }
        })
        .boxed()
    }
}

enum ChangeState {
    Pending(Source),
    Live(Box<LiveQuery>),
    Done,
}

/// An open change subscription for one read.
struct LiveQuery {
    source: Source,
    receiver: broadcast::Receiver<ChangeEvent>,
    plan: QueryPlan,
    last: Snapshot,
    guard: SubscriptionGuard,
}

impl LiveQuery {
    /// Subscribe, then take the first snapshot, so no commit in between is
    /// missed.
    fn open(source: Source) -> Result<Self> {
        let receiver = source.db.subscribe()?;
        let plan = source.db.plan(&source.table, &source.query)?;
        let last = source.db.execute(&plan)?;
        let guard = source.db.subscriptions.subscribe(
            &source.table,
            plan.dependencies.clone(),
            source.fingerprint,
        );
        Ok(Self {
            source,
            receiver,
            plan,
            last,
            guard,
        })
    }

    fn emit(&self) -> Snapshot {
        self.guard.record_emission();
        tracing::trace!(
            subscription_id = self.guard.id(),
            fingerprint = self.source.fingerprint,
            rows = self.last.len(),
            "snapshot emitted"
        );
        self.last.clone()
    }

    async fn next_change(&mut self) -> Result<Snapshot> {
        loop {
            let refresh = match self.receiver.recv().await {
                Ok(event @ ChangeEvent::Commit { .. }) => event.touches(&self.plan.dependencies),
                Ok(ChangeEvent::Closed) | Err(RecvError::Closed) => return Err(Error::Disposed),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(
                        subscription_id = self.guard.id(),
                        skipped,
                        "change stream lagged, re-reading"
                    );
                    true
                }
            };
            if !refresh {
                continue;
            }

            let snapshot = self.source.db.execute(&self.plan)?;
            if snapshot != self.last {
                self.last = snapshot;
                return Ok(self.emit());
            }
        }
    }
}

/// Emit the concatenation of every input's latest snapshot whenever any input
/// emits, once each has emitted at least once.
fn combine_latest(inputs: Vec<SnapshotStream>) -> SnapshotStream {
    let latest: Vec<Option<Snapshot>> = vec![None; inputs.len()];
    let merged = stream::select_all(
        inputs
            .into_iter()
            .enumerate()
            .map(|(index, input)| input.map(move |item| (index, item)).boxed()),
    );

    stream::unfold(Some((merged, latest)), |state| async move {
        let (mut merged, mut latest) = state?;
        loop {
            match merged.next().await? {
                (_, Err(err)) => return Some((Err(err), None)),
                (index, Ok(snapshot)) => {
                    latest[index] = Some(snapshot);
                    if latest.iter().all(Option::is_some) {
                        let rows = latest.iter().flatten().flatten().cloned().collect();
                        return Some((Ok(rows), Some((merged, latest))));
                    }
                }
            }
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use reactdb_core::Value;

    fn snapshot(ids: &[&str]) -> Snapshot {
        ids.iter()
            .map(|id| {
                let mut row = Row::new();
                row.insert("_id".into(), Value::from(*id));
                row
            })
            .collect()
    }

    #[tokio::test]
    async fn test_combine_latest_waits_for_every_input() {
        let left: SnapshotStream = stream::iter(vec![
            Ok(snapshot(&["a"])),
            Ok(snapshot(&["a", "b"])),
        ])
        .boxed();
        let right: SnapshotStream = stream::iter(vec![Ok(snapshot(&["x"]))]).boxed();

        let emitted: Vec<_> = combine_latest(vec![left, right]).collect().await;
        let last = emitted.last().unwrap().as_ref().unwrap();
        assert_eq!(last, &snapshot(&["a", "b", "x"]));
        assert!(emitted.iter().all(|e| e.as_ref().unwrap().len() >= 2));
    }

    #[tokio::test]
    async fn test_combine_latest_ends_on_error() {
        let left: SnapshotStream = stream::iter(vec![Ok(snapshot(&["a"]))]).boxed();
        let right: SnapshotStream =
            stream::iter(vec![Err(Error::Disposed), Ok(snapshot(&["x"]))]).boxed();

        let emitted: Vec<_> = combine_latest(vec![left, right]).collect().await;
        assert_eq!(emitted.last(), Some(&Err(Error::Disposed)));
        assert!(emitted.len() <= 2);
    }
}
