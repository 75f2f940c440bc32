//! Store configuration.
//!
//! Mirrors the adapter construction parameters (`store`, `database`,
//! `table`) as a TOML-loadable struct:
//!
//! ```toml
//! backend = "redb"
//! path = "/var/lib/authz/policy.redb"
//! database = "authz"
//! table = "casbin_rule"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Backend and naming configuration for a policy store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Backend type: "memory" or "redb".
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Path to the store file (required for "redb").
    #[serde(default)]
    pub path: Option<String>,

    /// Target database name.
    #[serde(default = "default_database")]
    pub database: String,

    /// Target table name.
    #[serde(default = "default_table")]
    pub table: String,
}

fn default_backend() -> String {
    "memory".to_string()
}

fn default_database() -> String {
    "casbin".to_string()
}

fn default_table() -> String {
    "casbin_rule".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: None,
            database: default_database(),
            table: default_table(),
        }
    }
}

impl StoreConfig {
    /// Parse and validate a configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| Error::config(format!("Failed to parse store config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("Failed to read {}: {e}", path.display())))?;
        let config = Self::from_toml_str(&content)?;
        log::debug!(
            "Loaded store config from {} (backend={})",
            path.display(),
            config.backend
        );
        Ok(config)
    }

    /// Check names are present and the backend has what it needs.
    pub fn validate(&self) -> Result<()> {
        if self.database.is_empty() {
            return Err(Error::config("database name must not be empty"));
        }
        if self.table.is_empty() {
            return Err(Error::config("table name must not be empty"));
        }
        match self.backend.as_str() {
            "memory" => Ok(()),
            "redb" if self.path.as_deref().is_some_and(|p| !p.is_empty()) => Ok(()),
            "redb" => Err(Error::config("redb backend requires a path")),
            other => Err(Error::config(format!("unknown backend '{other}'"))),
        }
    }

    /// Qualified `database.table` name used in logs and error context.
    pub fn qualified_table(&self) -> String {
        format!("{}.{}", self.database, self.table)
    }
}

// ============================================================================
// Tests
// ============================================================================
