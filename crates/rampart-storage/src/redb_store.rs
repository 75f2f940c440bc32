//! Embedded on-disk policy store backed by redb.
//!
//! # Layout
//!
//! One redb file holds any number of logical databases:
//!
//! | redb table | key | value |
//! |------------|-----|-------|
//! | `rampart_databases` | database name | `()` |
//! | `rampart_tables` | `"{database}/{table}"` | next row sequence |
//! | `"{database}/{table}"` | row sequence (`u64`) | JSON-encoded [`PolicyRecord`] |
//!
//! Row keys increase monotonically, so iteration order is insertion order.
//! The row sequence doubles as the record id.
//!
//! All redb work runs on the blocking thread pool. Scans are produced by a
//! blocking task that owns the read transaction and feeds a bounded channel;
//! when the consumer drops the stream the task's next send fails, it returns,
//! and the transaction is released.
//!
//! A read transaction keeps the file locked, so [`PolicyStore::close`] refuses
//! to close while any scan stream is still held, and otherwise waits for every
//! scan task to finish before releasing the database.

use std::path::Path;
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use futures::StreamExt;
use rampart_core::{Error, PolicyRecord, RecordFilter, Result};
use redb::{
    Database, ReadOnlyTable, ReadTransaction, ReadableDatabase, ReadableTable, TableDefinition,
};
use tokio::sync::{Mutex, RwLock, mpsc};
use tokio::task::JoinHandle;

use crate::traits::{PolicyStore, RecordStream};

const DATABASES: TableDefinition<&str, ()> = TableDefinition::new("rampart_databases");
const TABLES: TableDefinition<&str, u64> = TableDefinition::new("rampart_tables");

/// Rows buffered between the scan task and its consumer.
const SCAN_BUFFER: usize = 64;

fn storage_error<E>(e: E) -> Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    Error::store_with_source(format!("redb: {e}"), e)
}

fn table_key(database: &str, table: &str) -> String {
    format!("{database}/{table}")
}

fn table_not_found(database: &str, table: &str) -> Error {
    Error::TableNotFound {
        database: database.to_string(),
        table: table.to_string(),
    }
}

/// Open the row table for a scan, checking the catalog first.
fn open_rows(
    txn: &ReadTransaction,
    database: &str,
    table: &str,
) -> Result<ReadOnlyTable<u64, &'static [u8]>> {
    let key = table_key(database, table);
    let tables = txn.open_table(TABLES).map_err(storage_error)?;
    if tables.get(key.as_str()).map_err(storage_error)?.is_none() {
        return Err(table_not_found(database, table));
    }
    let def: TableDefinition<u64, &[u8]> = TableDefinition::new(&key);
    txn.open_table(def).map_err(storage_error)
}

/// Blocking task behind a scan stream.
///
/// The stream owns the only strong reference to `lease`; the lease dies when
/// the stream is dropped or exhausted. A task that already finished has
/// released its read transaction even if its stream still holds buffered rows.
struct ScanTask {
    lease: Weak<()>,
    task: JoinHandle<()>,
}

impl ScanTask {
    fn holds_file(&self) -> bool {
        self.lease.strong_count() > 0 && !self.task.is_finished()
    }
}

/// redb-backed policy store.
pub struct RedbStore {
    db: RwLock<Option<Arc<Database>>>,
    scans: Mutex<Vec<ScanTask>>,
}

impl RedbStore {
    /// Open (or create) the store file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    Error::store_with_source(format!("Failed to create {}", parent.display()), e)
                })?;
            }
        }

        let db = Database::create(path).map_err(storage_error)?;

        // Catalog tables must exist before any read transaction opens them.
        let txn = db.begin_write().map_err(storage_error)?;
        txn.open_table(DATABASES).map_err(storage_error)?;
        txn.open_table(TABLES).map_err(storage_error)?;
        txn.commit().map_err(storage_error)?;

        log::info!("Opened redb policy store at {}", path.display());
        Ok(Self {
            db: RwLock::new(Some(Arc::new(db))),
            scans: Mutex::new(Vec::new()),
        })
    }

    /// Run blocking redb work against the open database.
    ///
    /// The read guard is held until the work finishes, so `close` waits for
    /// in-flight calls.
    async fn with_db<T, F>(&self, work: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> Result<T> + Send + 'static,
    {
        let guard = self.db.read().await;
        let db = guard.clone().ok_or(Error::Closed)?;
        let result = tokio::task::spawn_blocking(move || work(&db))
            .await
            .map_err(|e| Error::store_with_source("redb task failed", e))?;
        drop(guard);
        result
    }

    /// Number of live scan streams whose task still holds a read transaction.
    pub async fn open_scans(&self) -> usize {
        self.scans
            .lock()
            .await
            .iter()
            .filter(|scan| scan.holds_file())
            .count()
    }
}

#[async_trait]
impl PolicyStore for RedbStore {
    async fn ensure_database(&self, database: &str) -> Result<()> {
        let database = database.to_string();
        self.with_db(move |db| {
            let txn = db.begin_write().map_err(storage_error)?;
            {
                let mut databases = txn.open_table(DATABASES).map_err(storage_error)?;
                let exists = databases
                    .get(database.as_str())
                    .map_err(storage_error)?
                    .is_some();
                if !exists {
                    log::debug!("Creating database '{database}'");
                    databases
                        .insert(database.as_str(), ())
                        .map_err(storage_error)?;
                }
            }
            txn.commit().map_err(storage_error)
        })
        .await
    }

    async fn ensure_table(&self, database: &str, table: &str) -> Result<()> {
        let (database, table) = (database.to_string(), table.to_string());
        self.with_db(move |db| {
            let key = table_key(&database, &table);
            let txn = db.begin_write().map_err(storage_error)?;
            {
                let databases = txn.open_table(DATABASES).map_err(storage_error)?;
                if databases
                    .get(database.as_str())
                    .map_err(storage_error)?
                    .is_none()
                {
                    return Err(Error::DatabaseNotFound { database });
                }

                let mut tables = txn.open_table(TABLES).map_err(storage_error)?;
                let exists = tables.get(key.as_str()).map_err(storage_error)?.is_some();
                if !exists {
                    log::debug!("Creating table '{database}.{table}'");
                    tables.insert(key.as_str(), 0u64).map_err(storage_error)?;
                    let rows: TableDefinition<u64, &[u8]> = TableDefinition::new(&key);
                    txn.open_table(rows).map_err(storage_error)?;
                }
            }
            txn.commit().map_err(storage_error)
        })
        .await
    }

    async fn scan(&self, database: &str, table: &str) -> Result<RecordStream> {
        let guard = self.db.read().await;
        let db = guard.clone().ok_or(Error::Closed)?;
        let (database, table) = (database.to_string(), table.to_string());
        let (tx, rx) = mpsc::channel::<Result<PolicyRecord>>(SCAN_BUFFER);
        let (ready_tx, ready_rx) = tokio::sync::oneshot::channel::<Result<()>>();

        let task = tokio::task::spawn_blocking(move || {
            let txn = match db.begin_read() {
                Ok(txn) => txn,
                Err(e) => {
                    let _ = ready_tx.send(Err(storage_error(e)));
                    return;
                }
            };
            let rows = match open_rows(&txn, &database, &table) {
                Ok(rows) => rows,
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };
            let iter = match rows.iter() {
                Ok(iter) => iter,
                Err(e) => {
                    let _ = ready_tx.send(Err(storage_error(e)));
                    return;
                }
            };
            let _ = ready_tx.send(Ok(()));

            for entry in iter {
                let item = entry.map_err(storage_error).and_then(|(_, value)| {
                    serde_json::from_slice::<PolicyRecord>(value.value()).map_err(Error::from)
                });
                let failed = item.is_err();
                if tx.blocking_send(item).is_err() || failed {
                    break;
                }
            }
        });

        let lease = Arc::new(());
        {
            let mut scans = self.scans.lock().await;
            scans.retain(|scan| !scan.task.is_finished());
            scans.push(ScanTask {
                lease: Arc::downgrade(&lease),
                task,
            });
        }
        drop(guard);

        ready_rx
            .await
            .map_err(|e| Error::store_with_source("redb scan task failed", e))??;

        let stream = futures::stream::unfold((rx, lease), |(mut rx, lease)| async move {
            rx.recv().await.map(|item| (item, (rx, lease)))
        });
        Ok(stream.boxed())
    }

    async fn delete_all(&self, database: &str, table: &str) -> Result<usize> {
        let (database, table) = (database.to_string(), table.to_string());
        self.with_db(move |db| {
            let key = table_key(&database, &table);
            let txn = db.begin_write().map_err(storage_error)?;
            let removed = {
                let tables = txn.open_table(TABLES).map_err(storage_error)?;
                if tables.get(key.as_str()).map_err(storage_error)?.is_none() {
                    return Err(table_not_found(&database, &table));
                }

                let def: TableDefinition<u64, &[u8]> = TableDefinition::new(&key);
                let mut rows = txn.open_table(def).map_err(storage_error)?;
                let ids = rows
                    .iter()
                    .map_err(storage_error)?
                    .map(|entry| entry.map(|(k, _)| k.value()).map_err(storage_error))
                    .collect::<Result<Vec<u64>>>()?;
                for id in &ids {
                    rows.remove(*id).map_err(storage_error)?;
                }
                ids.len()
            };
            txn.commit().map_err(storage_error)?;
            Ok(removed)
        })
        .await
    }

    async fn insert(
        &self,
        database: &str,
        table: &str,
        records: Vec<PolicyRecord>,
    ) -> Result<usize> {
        let (database, table) = (database.to_string(), table.to_string());
        self.with_db(move |db| {
            let key = table_key(&database, &table);
            let txn = db.begin_write().map_err(storage_error)?;
            let count = records.len();
            {
                let mut tables = txn.open_table(TABLES).map_err(storage_error)?;
                let mut next = tables
                    .get(key.as_str())
                    .map_err(storage_error)?
                    .map(|seq| seq.value())
                    .ok_or_else(|| table_not_found(&database, &table))?;

                let def: TableDefinition<u64, &[u8]> = TableDefinition::new(&key);
                let mut rows = txn.open_table(def).map_err(storage_error)?;
                for record in records {
                    let record = record.with_id(next.to_string());
                    let bytes = serde_json::to_vec(&record)?;
                    rows.insert(next, bytes.as_slice()).map_err(storage_error)?;
                    next += 1;
                }
                tables.insert(key.as_str(), next).map_err(storage_error)?;
            }
            txn.commit().map_err(storage_error)?;
            Ok(count)
        })
        .await
    }

    async fn delete_matching(
        &self,
        database: &str,
        table: &str,
        filter: &RecordFilter,
    ) -> Result<usize> {
        let (database, table, filter) = (database.to_string(), table.to_string(), filter.clone());
        self.with_db(move |db| {
            let key = table_key(&database, &table);
            let txn = db.begin_write().map_err(storage_error)?;
            let removed = {
                let tables = txn.open_table(TABLES).map_err(storage_error)?;
                if tables.get(key.as_str()).map_err(storage_error)?.is_none() {
                    return Err(table_not_found(&database, &table));
                }

                let def: TableDefinition<u64, &[u8]> = TableDefinition::new(&key);
                let mut rows = txn.open_table(def).map_err(storage_error)?;
                let mut matched = Vec::new();
                for entry in rows.iter().map_err(storage_error)? {
                    let (k, v) = entry.map_err(storage_error)?;
                    let record: PolicyRecord = serde_json::from_slice(v.value())?;
                    if filter.matches(&record) {
                        matched.push(k.value());
                    }
                }
                for id in &matched {
                    rows.remove(*id).map_err(storage_error)?;
                }
                matched.len()
            };
            txn.commit().map_err(storage_error)?;
            Ok(removed)
        })
        .await
    }

    async fn close(&self) -> Result<()> {
        let mut slot = self.db.write().await;
        let Some(db) = slot.take() else {
            return Ok(());
        };

        let mut scans = self.scans.lock().await;
        let open = scans.iter().filter(|scan| scan.holds_file()).count();
        if open > 0 {
            *slot = Some(db);
            return Err(Error::store(format!(
                "Cannot close redb store: {open} scan stream(s) still open"
            )));
        }

        // Abandoned scans stop at their next send; wait for them to release
        // their read transactions.
        let mut failure = None;
        for scan in scans.drain(..) {
            if let Err(e) = scan.task.await {
                failure.get_or_insert(Error::store_with_source("redb scan task failed", e));
            }
        }

        match Arc::try_unwrap(db) {
            Ok(db) => drop(db),
            Err(db) => {
                *slot = Some(db);
                return Err(Error::store("Cannot close redb store: handle still in use"));
            }
        }
        if let Some(e) = failure {
            return Err(e);
        }
        log::info!("Closed redb policy store");
        Ok(())
    }

    fn name(&self) -> &str {
        "redb"
    }
}

// ============================================================================
// Tests
// ============================================================================
