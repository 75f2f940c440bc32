//! Backing-store implementations for Rampart policy rules.
//!
//! # Features
//!
//! - `storage-redb`: Enable the embedded redb store (on by default)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     rampart-storage                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  PolicyStore trait                                          │
//! │  ├── MemoryStore (process-local, tests and embedding)       │
//! │  └── RedbStore (embedded on-disk document store)            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  open_store (config-driven backend selection)               │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use rampart_core::StoreConfig;
//! use rampart_storage::open_store;
//!
//! let config = StoreConfig::load("store.toml")?;
//! let store = open_store(&config)?;
//! store.ensure_database(&config.database).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod memory;
pub mod traits;

#[cfg(feature = "storage-redb")]
pub mod redb_store;

use std::sync::Arc;

use rampart_core::{Error, Result, StoreConfig};

pub use memory::MemoryStore;
pub use traits::{PolicyStore, RecordStream};

#[cfg(feature = "storage-redb")]
pub use redb_store::RedbStore;

/// Create a policy store based on configuration.
///
/// Selection logic:
/// 1. `"memory"` → `MemoryStore`
/// 2. `"redb"` with the `storage-redb` feature → `RedbStore` at `config.path`
///
/// # Errors
///
/// Returns a configuration error for an unknown or unavailable backend, or
/// a store error if the backend cannot be opened.
pub fn open_store(config: &StoreConfig) -> Result<Arc<dyn PolicyStore>> {
    config.validate()?;
    match config.backend.as_str() {
        "memory" => Ok(Arc::new(MemoryStore::new())),
        #[cfg(feature = "storage-redb")]
        "redb" => {
            let path = config
                .path
                .as_deref()
                .ok_or_else(|| Error::config("redb backend requires a path"))?;
            Ok(Arc::new(RedbStore::open(path)?))
        }
        other => Err(Error::config(format!(
            "backend '{other}' is not available in this build"
        ))),
    }
}
