//! Facade error types.
//!
//! Operation errors are the core taxonomy, re-exported unchanged. The facade
//! adds configuration errors and the error of building a database from a
//! validated configuration.

use thiserror::Error;

pub use reactdb_core::error::{Error, MutationError, QueryError, Result, SchemaError};

/// Errors raised while loading a [`DatabaseConfig`](crate::DatabaseConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The document is not valid JSON for the config shape.
    #[error("invalid config document: {0}")]
    Parse(#[from] serde_json::Error),

    /// A setting is out of range.
    #[error("invalid setting `{setting}`: {reason}")]
    Invalid {
        setting: &'static str,
        reason: &'static str,
    },
}

/// Errors raised by [`Database::with_config`](crate::Database::with_config).
#[derive(Debug, Error)]
pub enum BuildError {
    /// The configuration failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The schema registry failed to compile.
    #[error(transparent)]
    Schema(#[from] SchemaError),
}
