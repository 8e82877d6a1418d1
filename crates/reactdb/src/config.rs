//! Database configuration.

use serde::Deserialize;

use crate::error::ConfigError;
use reactdb_core::catalog::DEFAULT_CATALOG_NAME;
use reactdb_core::storage::DEFAULT_CHANGE_BUFFER;

/// Default bound on nested insert depth.
pub const DEFAULT_MAX_CASCADE_DEPTH: usize = 32;

/// Database configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Catalog name, reported by `ready()` and in diagnostics.
    pub name: String,

    /// Capacity of the change broadcast. A subscriber further behind than
    /// this re-materializes on its next event.
    pub change_buffer: usize,

    /// Maximum nesting of a cascading insert.
    pub max_cascade_depth: usize,
}

impl DatabaseConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self {
            name: DEFAULT_CATALOG_NAME.to_string(),
            change_buffer: DEFAULT_CHANGE_BUFFER,
            max_cascade_depth: DEFAULT_MAX_CASCADE_DEPTH,
        }
    }

    /// Parse a JSON config document. Missing settings keep their defaults.
    pub fn from_json(document: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(document)?;
        config.validate()?;
        Ok(config)
    }

    /// Set the catalog name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the change broadcast capacity.
    pub fn with_change_buffer(mut self, capacity: usize) -> Self {
        self.change_buffer = capacity.max(1);
        self
    }

    /// Set the cascading insert depth bound.
    pub fn with_max_cascade_depth(mut self, depth: usize) -> Self {
        self.max_cascade_depth = depth;
        self
    }

    /// Check that every setting is in range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.change_buffer == 0 {
            return Err(ConfigError::Invalid {
                setting: "change_buffer",
                reason: "must be at least 1",
            });
        }
        if self.name.is_empty() {
            return Err(ConfigError::Invalid {
                setting: "name",
                reason: "must not be empty",
            });
        }
        Ok(())
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DatabaseConfig::default();
        assert_eq!(config.name, "reactdb");
        assert_eq!(config.change_buffer, 1024);
        assert_eq!(config.max_cascade_depth, 32);
    }

    #[test]
    fn test_builders() {
        let config = DatabaseConfig::new()
            .with_name("tasks")
            .with_change_buffer(0)
            .with_max_cascade_depth(4);

        assert_eq!(config.name, "tasks");
        assert_eq!(config.change_buffer, 1);
        assert_eq!(config.max_cascade_depth, 4);
    }

    #[test]
    fn test_from_json_keeps_defaults() {
        let config = DatabaseConfig::from_json(r#"{ "name": "fixtures" }"#).unwrap();
        assert_eq!(config.name, "fixtures");
        assert_eq!(config.change_buffer, DEFAULT_CHANGE_BUFFER);
    }

    #[test]
    fn test_from_json_rejects_bad_documents() {
        assert!(matches!(
            DatabaseConfig::from_json("{ not json"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            DatabaseConfig::from_json(r#"{ "change_buffer": 0 }"#),
            Err(ConfigError::Invalid { setting: "change_buffer", .. })
        ));
    }
}
