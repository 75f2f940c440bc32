//! Common test utilities and adapter scenarios shared by every backend.

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use rampart_acl::{Adapter, PolicyAdapter, PolicyModel};
use rampart_core::{Error, PolicyRecord, RecordFilter, Result};
use rampart_storage::{MemoryStore, PolicyStore, RecordStream};

pub const DATABASE: &str = "casbin";
pub const TABLE: &str = "casbin_rule";

/// Build an owned rule from string literals.
pub fn tokens(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

/// Adapter over a fresh in-memory store.
pub async fn memory_adapter() -> PolicyAdapter {
    PolicyAdapter::new(Arc::new(MemoryStore::new()), DATABASE, TABLE)
        .await
        .unwrap()
}

/// Model with two permission types and two grouping types.
pub fn sample_model() -> PolicyModel {
    let mut model = PolicyModel::new();
    model.add_rule("p", "p", tokens(&["alice", "data1", "read"]));
    model.add_rule("p", "p", tokens(&["bob", "data2", "write"]));
    model.add_rule("p", "p2", tokens(&["admin", "domain1", "data1", "read", "allow"]));
    model.add_rule("g", "g", tokens(&["alice", "admin"]));
    model.add_rule("g", "g2", tokens(&["data1", "data_group"]));
    model
}

/// Every row currently stored in the adapter's table.
pub async fn stored_rows(adapter: &PolicyAdapter) -> Vec<PolicyRecord> {
    adapter
        .store()
        .scan(adapter.database(), adapter.table())
        .await
        .unwrap()
        .try_collect()
        .await
        .unwrap()
}

async fn load(adapter: &PolicyAdapter) -> PolicyModel {
    let mut model = PolicyModel::new();
    adapter.load_policy(&mut model).await.unwrap();
    model
}

// ============================================================================
// Scenarios
// ============================================================================

pub async fn assert_save_load_round_trip(adapter: &PolicyAdapter) {
    let original = sample_model();
    adapter.save_policy(&original).await.unwrap();

    let loaded = load(adapter).await;
    assert_eq!(loaded, original);
    assert_eq!(stored_rows(adapter).await.len(), 5);
}

pub async fn assert_add_rule_truncates(adapter: &PolicyAdapter) {
    let rule = tokens(&["a", "b", "c", "d", "e", "f", "g"]);
    adapter.add_policy("p", "p", &rule).await.unwrap();

    let rows = stored_rows(adapter).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].fields, ["a", "b", "c", "d", "e"]);

    let loaded = load(adapter).await;
    assert_eq!(loaded.rules("p", "p"), &[tokens(&["a", "b", "c", "d", "e"])]);
}

pub async fn assert_blank_rows_skipped(adapter: &PolicyAdapter) {
    adapter
        .store()
        .insert(
            adapter.database(),
            adapter.table(),
            vec![
                PolicyRecord::default(),
                PolicyRecord::from_rule("p", &["alice", "data1", "read"]),
                PolicyRecord::from_rule("", &["orphan"]),
            ],
        )
        .await
        .unwrap();

    let loaded = load(adapter).await;
    assert_eq!(loaded.rule_count(), 1);
    assert_eq!(loaded.sections().collect::<Vec<_>>(), vec!["p"]);
}

pub async fn assert_remove_rule_exact(adapter: &PolicyAdapter) {
    adapter.add_policy("p", "p", &tokens(&["a", "b"])).await.unwrap();

    adapter
        .remove_policy("p", "p", &tokens(&["a", "c"]))
        .await
        .unwrap();
    assert_eq!(stored_rows(adapter).await.len(), 1);

    adapter
        .remove_policy("p", "p", &tokens(&["a"]))
        .await
        .unwrap();
    assert_eq!(stored_rows(adapter).await.len(), 1);

    adapter
        .remove_policy("p", "p", &tokens(&["a", "b"]))
        .await
        .unwrap();
    assert!(stored_rows(adapter).await.is_empty());
}

pub async fn assert_remove_rule_deletes_duplicates(adapter: &PolicyAdapter) {
    let rule = tokens(&["alice", "data1", "read"]);
    adapter.add_policy("p", "p", &rule).await.unwrap();
    adapter.add_policy("p", "p", &rule).await.unwrap();
    adapter.add_policy("p", "p2", &rule).await.unwrap();

    adapter.remove_policy("p", "p", &rule).await.unwrap();
    let rows = stored_rows(adapter).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].ptype, "p2");
}

pub async fn assert_filtered_windowing(adapter: &PolicyAdapter) {
    adapter
        .add_policies(
            "p",
            "p",
            &[
                tokens(&["a", "b", "c"]),
                tokens(&["x", "b", "y"]),
                tokens(&["a", "z", "c"]),
            ],
        )
        .await
        .unwrap();
    adapter
        .add_policy("p", "p2", &tokens(&["a", "b", "c"]))
        .await
        .unwrap();

    adapter
        .remove_filtered_policy("p", "p", 1, &tokens(&["b"]))
        .await
        .unwrap();

    let rows = stored_rows(adapter).await;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].tokens(), vec!["a", "z", "c"]);
    assert_eq!(rows[1].ptype, "p2");
}

pub async fn assert_filtered_by_subject(adapter: &PolicyAdapter) {
    adapter
        .add_policies(
            "g",
            "g",
            &[tokens(&["alice", "admin"]), tokens(&["alice", "editor"]), tokens(&["bob", "admin"])],
        )
        .await
        .unwrap();

    adapter
        .remove_filtered_policy("g", "g", 0, &tokens(&["alice"]))
        .await
        .unwrap();

    let loaded = load(adapter).await;
    assert_eq!(loaded.rules("g", "g"), &[tokens(&["bob", "admin"])]);
}

pub async fn assert_save_clears_prior_content(adapter: &PolicyAdapter) {
    adapter.save_policy(&sample_model()).await.unwrap();
    assert_eq!(stored_rows(adapter).await.len(), 5);

    adapter.save_policy(&PolicyModel::new()).await.unwrap();
    assert!(stored_rows(adapter).await.is_empty());
}

pub async fn assert_save_skips_other_sections(adapter: &PolicyAdapter) {
    let mut model = sample_model();
    model.add_rule("r", "r", tokens(&["sub", "obj", "act"]));
    adapter.save_policy(&model).await.unwrap();

    let loaded = load(adapter).await;
    assert!(loaded.get("r", "r").is_none());
    assert_eq!(loaded, sample_model());
}

pub async fn assert_batch_remove(adapter: &PolicyAdapter) {
    adapter.save_policy(&sample_model()).await.unwrap();
    adapter
        .remove_policies(
            "p",
            "p",
            &[tokens(&["alice", "data1", "read"]), tokens(&["bob", "data2", "write"])],
        )
        .await
        .unwrap();

    let loaded = load(adapter).await;
    assert!(loaded.rules("p", "p").is_empty());
    assert_eq!(loaded.rule_count(), 3);
}

// ============================================================================
// Failing store
// ============================================================================

/// Store whose scans fail after yielding `fail_after` rows.
pub struct FailingStore {
    inner: MemoryStore,
    fail_after: usize,
}

impl FailingStore {
    pub fn new(fail_after: usize) -> Self {
        Self {
            inner: MemoryStore::new(),
            fail_after,
        }
    }
}

#[async_trait]
impl PolicyStore for FailingStore {
    async fn ensure_database(&self, database: &str) -> Result<()> {
        self.inner.ensure_database(database).await
    }

    async fn ensure_table(&self, database: &str, table: &str) -> Result<()> {
        self.inner.ensure_table(database, table).await
    }

    async fn scan(&self, database: &str, table: &str) -> Result<RecordStream> {
        let rows = self.inner.scan(database, table).await?;
        let failure = futures::stream::once(async { Err(Error::store("cursor lost")) });
        Ok(rows.take(self.fail_after).chain(failure).boxed())
    }

    async fn delete_all(&self, database: &str, table: &str) -> Result<usize> {
        self.inner.delete_all(database, table).await
    }

    async fn insert(
        &self,
        database: &str,
        table: &str,
        records: Vec<PolicyRecord>,
    ) -> Result<usize> {
        self.inner.insert(database, table, records).await
    }

    async fn delete_matching(
        &self,
        database: &str,
        table: &str,
        filter: &RecordFilter,
    ) -> Result<usize> {
        self.inner.delete_matching(database, table, filter).await
    }

    fn name(&self) -> &str {
        "failing"
    }
}
