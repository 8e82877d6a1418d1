//! Database handle combining the catalog, the store and live subscriptions.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::info;

use reactdb_core::catalog::{Catalog, SchemaRegistry};
use reactdb_core::query::{Query, QueryExecutor, QueryPlan, QueryPlanner};
use reactdb_core::storage::{ChangeEvent, MemoryStore};
use reactdb_core::{Row, Value};

use crate::config::DatabaseConfig;
use crate::error::{BuildError, Error, Result, SchemaError};
use crate::mutation::{MutationExecutor, MutationResult, Target};
use crate::pubsub::SubscriptionRegistry;
use crate::selector::Selector;

/// State shared by a database handle and every selector it creates.
pub(crate) struct DatabaseInner {
    catalog: Catalog,
    store: MemoryStore,
    config: DatabaseConfig,
    disposed: AtomicBool,
    pub(crate) subscriptions: Arc<SubscriptionRegistry>,
}

impl DatabaseInner {
    fn ensure_live(&self) -> Result<()> {
        if self.disposed.load(Ordering::SeqCst) {
            return Err(Error::Disposed);
        }
        Ok(())
    }

    pub(crate) fn subscribe(&self) -> Result<broadcast::Receiver<ChangeEvent>> {
        self.ensure_live()?;
        self.store.subscribe()
    }

    pub(crate) fn plan(&self, table: &str, query: &Query) -> Result<QueryPlan> {
        self.ensure_live()?;
        Ok(QueryPlanner::new(&self.catalog).plan(table, query)?)
    }

    pub(crate) fn execute(&self, plan: &QueryPlan) -> Result<Vec<Row>> {
        self.ensure_live()?;
        QueryExecutor::new(&self.store).execute(plan)
    }

    /// Report how many live streams watch `table` after a write to it.
    fn observe_commit(&self, table: &str, operation: &'static str) {
        tracing::trace!(
            table,
            operation,
            subscribers = self.subscriptions.subscriptions_for_table(table).len(),
            "mutation committed"
        );
    }

    fn mutations(&self) -> Result<MutationExecutor<'_>> {
        self.ensure_live()?;
        Ok(MutationExecutor::new(
            &self.catalog,
            &self.store,
            self.config.max_cascade_depth,
        ))
    }
}

/// Summary reported once a database is ready.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatabaseInfo {
    /// Catalog name.
    pub name: String,
    /// Declared tables, in registration order.
    pub tables: Vec<String>,
}

/// A reactive in-memory database.
///
/// Cloning yields another handle to the same database. Independent databases
/// built from the same registry share nothing.
#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
}

impl Database {
    /// Build a database with the default configuration.
    pub fn new(registry: SchemaRegistry) -> Result<Self, SchemaError> {
        Self::build(registry, DatabaseConfig::default())
    }

    /// Validate `config`, then build as [`Database::new`] does.
    pub fn with_config(
        registry: SchemaRegistry,
        config: DatabaseConfig,
    ) -> Result<Self, BuildError> {
        config.validate()?;
        Ok(Self::build(registry, config)?)
    }

    /// Compile `registry` and create one relation per table and link.
    fn build(registry: SchemaRegistry, config: DatabaseConfig) -> Result<Self, SchemaError> {
        let catalog = registry.compile_named(config.name.clone())?;

        let store = MemoryStore::new(config.change_buffer);
        for (relation, primary_key) in catalog.store_layout() {
            store
                .create_table(relation.clone(), primary_key)
                .map_err(|_| SchemaError::DuplicateTable(relation))?;
        }

        info!(
            name = %config.name,
            tables = catalog.table_names().count(),
            links = catalog.link_relations().count(),
            "database opened"
        );

        Ok(Self {
            inner: Arc::new(DatabaseInner {
                catalog,
                store,
                config,
                disposed: AtomicBool::new(false),
                subscriptions: Arc::new(SubscriptionRegistry::new()),
            }),
        })
    }

    /// Build a read against `table`.
    ///
    /// Nothing is validated until the selector is consumed; an unknown table
    /// or an invalid projection surfaces from `values()` or `changes()`.
    pub fn get(&self, table: &str, query: Query) -> Selector {
        Selector::new(Arc::clone(&self.inner), table, query)
    }

    /// Insert a row or an array of rows, cascading through virtual fields.
    ///
    /// Rows whose primary key already exists are left untouched. Returns one
    /// echo per top-level row.
    pub async fn insert(&self, table: &str, payload: impl Into<Value>) -> Result<Vec<Row>> {
        let echoes = self.inner.mutations()?.insert(table, payload.into())?;
        self.inner.observe_commit(table, "insert");
        Ok(echoes)
    }

    /// Patch every row addressed by `target`.
    pub async fn update(
        &self,
        table: &str,
        target: impl Into<Target>,
        patch: Row,
    ) -> Result<MutationResult> {
        let result = self
            .inner
            .mutations()?
            .update(table, &target.into(), patch)?;
        self.inner.observe_commit(table, "update");
        Ok(result)
    }

    /// Delete every row addressed by `target`.
    pub async fn delete(&self, table: &str, target: impl Into<Target>) -> Result<MutationResult> {
        let result = self.inner.mutations()?.delete(table, &target.into())?;
        self.inner.observe_commit(table, "delete");
        Ok(result)
    }

    /// Resolve once the database can serve operations.
    pub async fn ready(&self) -> Result<DatabaseInfo> {
        self.inner.ensure_live()?;
        Ok(DatabaseInfo {
            name: self.inner.catalog.name().to_string(),
            tables: self
                .inner
                .catalog
                .table_names()
                .map(str::to_string)
                .collect(),
        })
    }

    /// Release the store and end every live stream.
    ///
    /// Every later operation fails with [`Error::Disposed`]. Calling this
    /// more than once is a no-op.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.store.close();
        info!(
            name = %self.inner.config.name,
            subscriptions = self.inner.subscriptions.subscription_count(),
            "database disposed"
        );
    }

    /// Whether `dispose()` has been called.
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Number of open change streams.
    pub fn subscription_count(&self) -> usize {
        self.inner.subscriptions.subscription_count()
    }

    /// Number of open change streams whose result depends on `table`.
    pub fn table_subscription_count(&self, table: &str) -> usize {
        self.inner.subscriptions.subscriptions_for_table(table).len()
    }

    /// Compiled schema metadata. Not readable once disposed.
    pub fn catalog(&self) -> Result<&Catalog> {
        self.inner.ensure_live()?;
        Ok(&self.inner.catalog)
    }

    /// Configuration the database was built with.
    pub fn config(&self) -> &DatabaseConfig {
        &self.inner.config
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("name", &self.inner.config.name)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
