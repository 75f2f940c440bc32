//! In-memory policy store.

use std::collections::HashMap;

use async_trait::async_trait;
use futures::StreamExt;
use rampart_core::{Error, PolicyRecord, RecordFilter, Result};
use tokio::sync::RwLock;

use crate::traits::{PolicyStore, RecordStream};

#[derive(Default)]
struct MemoryState {
    databases: HashMap<String, HashMap<String, Vec<PolicyRecord>>>,
    next_id: u64,
}

impl MemoryState {
    fn table(&self, database: &str, table: &str) -> Result<&Vec<PolicyRecord>> {
        self.databases
            .get(database)
            .ok_or_else(|| Error::DatabaseNotFound {
                database: database.to_string(),
            })?
            .get(table)
            .ok_or_else(|| table_not_found(database, table))
    }

    fn table_mut(&mut self, database: &str, table: &str) -> Result<&mut Vec<PolicyRecord>> {
        self.databases
            .get_mut(database)
            .ok_or_else(|| Error::DatabaseNotFound {
                database: database.to_string(),
            })?
            .get_mut(table)
            .ok_or_else(|| table_not_found(database, table))
    }
}

fn table_not_found(database: &str, table: &str) -> Error {
    Error::TableNotFound {
        database: database.to_string(),
        table: table.to_string(),
    }
}

/// Process-local policy store.
///
/// Rows live in per-table vectors, so scans return them in insertion order.
/// Ids come from a single counter shared by all tables. Scans stream a
/// snapshot taken under the read lock; the lock is not held while the
/// caller consumes the stream.
pub struct MemoryStore {
    state: RwLock<Option<MemoryState>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(Some(MemoryState::default())),
        }
    }

    /// Number of rows currently in `database.table`.
    pub async fn row_count(&self, database: &str, table: &str) -> Result<usize> {
        let guard = self.state.read().await;
        let state = guard.as_ref().ok_or(Error::Closed)?;
        Ok(state.table(database, table)?.len())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PolicyStore for MemoryStore {
    async fn ensure_database(&self, database: &str) -> Result<()> {
        let mut guard = self.state.write().await;
        let state = guard.as_mut().ok_or(Error::Closed)?;
        if !state.databases.contains_key(database) {
            log::debug!("Creating database '{database}'");
            state.databases.insert(database.to_string(), HashMap::new());
        }
        Ok(())
    }

    async fn ensure_table(&self, database: &str, table: &str) -> Result<()> {
        let mut guard = self.state.write().await;
        let state = guard.as_mut().ok_or(Error::Closed)?;
        let tables = state
            .databases
            .get_mut(database)
            .ok_or_else(|| Error::DatabaseNotFound {
                database: database.to_string(),
            })?;
        if !tables.contains_key(table) {
            log::debug!("Creating table '{database}.{table}'");
            tables.insert(table.to_string(), Vec::new());
        }
        Ok(())
    }

    async fn scan(&self, database: &str, table: &str) -> Result<RecordStream> {
        let guard = self.state.read().await;
        let state = guard.as_ref().ok_or(Error::Closed)?;
        let rows = state.table(database, table)?.clone();
        Ok(futures::stream::iter(rows.into_iter().map(Ok)).boxed())
    }

    async fn delete_all(&self, database: &str, table: &str) -> Result<usize> {
        let mut guard = self.state.write().await;
        let state = guard.as_mut().ok_or(Error::Closed)?;
        let rows = state.table_mut(database, table)?;
        let removed = rows.len();
        rows.clear();
        Ok(removed)
    }

    async fn insert(
        &self,
        database: &str,
        table: &str,
        records: Vec<PolicyRecord>,
    ) -> Result<usize> {
        let mut guard = self.state.write().await;
        let state = guard.as_mut().ok_or(Error::Closed)?;
        // Validate the target before consuming any ids.
        state.table(database, table)?;

        let first_id = state.next_id;
        let count = records.len();
        state.next_id += count as u64;

        let rows = state.table_mut(database, table)?;
        rows.extend(
            records
                .into_iter()
                .zip(first_id..)
                .map(|(record, id)| record.with_id(id.to_string())),
        );
        Ok(count)
    }

    async fn delete_matching(
        &self,
        database: &str,
        table: &str,
        filter: &RecordFilter,
    ) -> Result<usize> {
        let mut guard = self.state.write().await;
        let state = guard.as_mut().ok_or(Error::Closed)?;
        let rows = state.table_mut(database, table)?;
        let before = rows.len();
        rows.retain(|row| !filter.matches(row));
        Ok(before - rows.len())
    }

    async fn close(&self) -> Result<()> {
        self.state.write().await.take();
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

// ============================================================================
// Tests
// ============================================================================
