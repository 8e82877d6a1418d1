//! Query layer for reactdb.
//!
//! Read options are planned against the compiled catalog into a
//! [`QueryPlan`], which the [`QueryExecutor`] runs against the store.

mod executor;
mod filter;
mod options;
mod planner;
mod predicate;

pub use executor::QueryExecutor;
pub use filter::FilterEvaluator;
pub use options::{FieldSelector, OrderDirection, OrderSpec, PrimaryValue, Query};
pub use planner::{AssociationPlan, Projection, QueryPlan, QueryPlanner};
pub use predicate::Predicate;
