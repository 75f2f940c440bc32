//! Backing-store trait.
//!
//! [`PolicyStore`] is the capability the policy adapter consumes: a
//! document store organized as databases holding tables of
//! [`PolicyRecord`] rows.
//!
//! # Contract
//!
//! - `ensure_*` calls are idempotent create-if-absent operations.
//! - `scan` yields rows in insertion order. Whatever cursor or read
//!   transaction backs the stream is released when the stream is dropped,
//!   whether it was drained, abandoned after an error, or never polled.
//! - Write operations report how many rows they touched.
//! - Calls against a missing table fail with
//!   [`Error::TableNotFound`](rampart_core::Error::TableNotFound).

use async_trait::async_trait;
use futures::stream::BoxStream;
use rampart_core::{PolicyRecord, RecordFilter, Result};

/// Stream of rows produced by [`PolicyStore::scan`].
pub type RecordStream = BoxStream<'static, Result<PolicyRecord>>;

/// Abstract policy store.
///
/// Implementations:
/// - `MemoryStore`: process-local maps, for tests and embedding
/// - `RedbStore`: embedded on-disk store (requires `storage-redb` feature)
#[async_trait]
pub trait PolicyStore: Send + Sync {
    /// Create the database if it does not already exist.
    async fn ensure_database(&self, database: &str) -> Result<()>;

    /// Create the table if it does not already exist.
    ///
    /// Fails with `DatabaseNotFound` if the database has not been created.
    async fn ensure_table(&self, database: &str, table: &str) -> Result<()>;

    /// Stream every row of the table in insertion order.
    async fn scan(&self, database: &str, table: &str) -> Result<RecordStream>;

    /// Delete every row of the table, returning the number removed.
    async fn delete_all(&self, database: &str, table: &str) -> Result<usize>;

    /// Insert rows in one batch, assigning ids. Returns the number inserted.
    async fn insert(&self, database: &str, table: &str, records: Vec<PolicyRecord>)
    -> Result<usize>;

    /// Delete every row satisfying `filter`, returning the number removed.
    async fn delete_matching(
        &self,
        database: &str,
        table: &str,
        filter: &RecordFilter,
    ) -> Result<usize>;

    /// Release the store's resources.
    ///
    /// After a successful close every other call fails with
    /// [`Error::Closed`](rampart_core::Error::Closed). A failed close leaves
    /// the store open.
    async fn close(&self) -> Result<()> {
        Ok(())
    }

    /// Get the backend name for diagnostics.
    fn name(&self) -> &str;
}
