//! Policy adapter: moves rules between a [`PolicyModel`] and a
//! [`PolicyStore`] table.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use rampart_acl::{Adapter, PolicyAdapter, PolicyModel};
//! use rampart_storage::MemoryStore;
//!
//! let adapter = PolicyAdapter::new(Arc::new(MemoryStore::new()), "casbin", "casbin_rule").await?;
//! adapter.add_policy("p", "p", &["alice".into(), "data1".into(), "read".into()]).await?;
//!
//! let mut model = PolicyModel::new();
//! adapter.load_policy(&mut model).await?;
//! adapter.close().await?;
//! ```
//!
//! # Failure semantics
//!
//! - `load_policy` appends rows as they stream in. If the scan fails part way,
//!   rows already appended stay in the model; treat the model as
//!   indeterminate after an error.
//! - `save_policy` deletes every row and then inserts the new set. The two
//!   steps are not atomic: a failed insert leaves the table empty, and the
//!   caller should retry from its in-memory model.

use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use rampart_core::{PolicyRecord, RecordFilter, Result, StoreConfig};
use rampart_storage::{PolicyStore, open_store};

use crate::model::PolicyModel;

/// Sections written by [`Adapter::save_policy`]. Other sections are skipped.
pub const SAVED_SECTIONS: [&str; 2] = ["p", "g"];

/// Persistence contract expected by the host policy engine.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Append every stored rule to `model`.
    async fn load_policy(&self, model: &mut PolicyModel) -> Result<()>;

    /// Replace the stored rules with the `p` and `g` sections of `model`.
    async fn save_policy(&self, model: &PolicyModel) -> Result<()>;

    /// Store one rule. No duplicate check is made.
    async fn add_policy(&self, section: &str, ptype: &str, rule: &[String]) -> Result<()>;

    /// Store several rules of one policy type in a single batch.
    async fn add_policies(&self, section: &str, ptype: &str, rules: &[Vec<String>])
    -> Result<()>;

    /// Delete every stored row exactly equal to the rule.
    async fn remove_policy(&self, section: &str, ptype: &str, rule: &[String]) -> Result<()>;

    /// Delete every stored row exactly equal to any of the rules.
    async fn remove_policies(
        &self,
        section: &str,
        ptype: &str,
        rules: &[Vec<String>],
    ) -> Result<()>;

    /// Delete rows whose fields starting at `field_index` match
    /// `field_values`; other fields and empty values match anything.
    ///
    /// `field_index` is unsigned, so the window cannot start before the
    /// first field.
    async fn remove_filtered_policy(
        &self,
        section: &str,
        ptype: &str,
        field_index: usize,
        field_values: &[String],
    ) -> Result<()>;
}

/// [`Adapter`] backed by one table of a [`PolicyStore`].
///
/// Holds only the store handle and the target names; no policy state is
/// cached. The store may be shared by several adapters, in which case it
/// stays open until the last of them is closed.
pub struct PolicyAdapter {
    store: Arc<dyn PolicyStore>,
    database: String,
    table: String,
}

impl PolicyAdapter {
    /// Attach to `database.table`, creating either if absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Init`](rampart_core::Error::Init) if the database or
    /// table cannot be created.
    pub async fn new(
        store: Arc<dyn PolicyStore>,
        database: impl Into<String>,
        table: impl Into<String>,
    ) -> Result<Self> {
        let adapter = Self {
            store,
            database: database.into(),
            table: table.into(),
        };
        adapter
            .ensure_exists()
            .await
            .map_err(|e| e.into_init(&adapter.database, &adapter.table))?;
        log::info!(
            "Policy adapter ready on {} ({} store)",
            adapter.qualified_table(),
            adapter.store.name()
        );
        Ok(adapter)
    }

    /// Open the configured store and attach to its database and table.
    pub async fn from_config(config: &StoreConfig) -> Result<Self> {
        let store = open_store(config)?;
        Self::new(store, config.database.clone(), config.table.clone()).await
    }

    /// Target database name.
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Target table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Point the adapter at another database. Takes effect on the next call.
    pub fn set_database(&mut self, database: impl Into<String>) {
        self.database = database.into();
    }

    /// Point the adapter at another table. Takes effect on the next call.
    pub fn set_table(&mut self, table: impl Into<String>) {
        self.table = table.into();
    }

    /// The underlying store handle, for sharing with other adapters.
    pub fn store(&self) -> &Arc<dyn PolicyStore> {
        &self.store
    }

    /// Close the adapter.
    ///
    /// If this adapter holds the last handle to the store, the store is
    /// closed and any error it reports is returned. A store still shared
    /// with other adapters is left open.
    pub async fn close(mut self) -> Result<()> {
        let qualified = self.qualified_table();
        if Arc::get_mut(&mut self.store).is_none() {
            log::debug!("Detached from {qualified}; store still shared");
            return Ok(());
        }
        self.store
            .close()
            .await
            .map_err(|e| e.in_operation("close", qualified.as_str()))?;
        log::info!("Closed policy adapter on {qualified}");
        Ok(())
    }

    fn qualified_table(&self) -> String {
        format!("{}.{}", self.database, self.table)
    }

    async fn ensure_exists(&self) -> Result<()> {
        self.store.ensure_database(&self.database).await?;
        self.store.ensure_table(&self.database, &self.table).await
    }

    async fn load_rows(&self, model: &mut PolicyModel) -> Result<usize> {
        self.ensure_exists().await?;

        let mut rows = self.store.scan(&self.database, &self.table).await?;
        let mut loaded = 0;
        while let Some(row) = rows.next().await {
            if load_policy_line(&row?, model) {
                loaded += 1;
            }
        }
        Ok(loaded)
    }

    async fn save_rows(&self, model: &PolicyModel) -> Result<usize> {
        self.ensure_exists().await?;

        for section in model.sections() {
            if !SAVED_SECTIONS.contains(&section) {
                log::warn!("Section '{section}' is not persisted by save_policy");
            }
        }

        let records: Vec<PolicyRecord> = SAVED_SECTIONS
            .iter()
            .flat_map(|&section| model.section(section))
            .flat_map(|(ptype, assertion)| {
                assertion
                    .policy
                    .iter()
                    .map(move |rule| PolicyRecord::from_rule(ptype, rule))
            })
            .collect();

        let removed = self.store.delete_all(&self.database, &self.table).await?;
        log::debug!("Cleared {removed} row(s) from {}", self.qualified_table());

        if records.is_empty() {
            return Ok(0);
        }
        self.store
            .insert(&self.database, &self.table, records)
            .await
    }

    async fn delete_where(&self, filter: &RecordFilter) -> Result<usize> {
        self.store
            .delete_matching(&self.database, &self.table, filter)
            .await
    }
}

/// Append one stored row to the model. Returns `false` for blank rows.
fn load_policy_line(record: &PolicyRecord, model: &mut PolicyModel) -> bool {
    let Some(section) = record.section() else {
        return false;
    };
    model.add_rule(section, &record.ptype, record.tokens());
    true
}

#[async_trait]
impl Adapter for PolicyAdapter {
    async fn load_policy(&self, model: &mut PolicyModel) -> Result<()> {
        let loaded = self
            .load_rows(model)
            .await
            .map_err(|e| e.in_operation("load_policy", self.qualified_table()))?;
        log::info!("Loaded {loaded} rule(s) from {}", self.qualified_table());
        Ok(())
    }

    async fn save_policy(&self, model: &PolicyModel) -> Result<()> {
        let saved = self
            .save_rows(model)
            .await
            .map_err(|e| e.in_operation("save_policy", self.qualified_table()))?;
        log::info!("Saved {saved} rule(s) to {}", self.qualified_table());
        Ok(())
    }

    async fn add_policy(&self, _section: &str, ptype: &str, rule: &[String]) -> Result<()> {
        let record = PolicyRecord::from_rule(ptype, rule);
        self.store
            .insert(&self.database, &self.table, vec![record])
            .await
            .map_err(|e| e.in_operation("add_policy", self.qualified_table()))?;
        log::debug!("Added '{ptype}' rule to {}", self.qualified_table());
        Ok(())
    }

    async fn add_policies(
        &self,
        _section: &str,
        ptype: &str,
        rules: &[Vec<String>],
    ) -> Result<()> {
        if rules.is_empty() {
            return Ok(());
        }
        let records = rules
            .iter()
            .map(|rule| PolicyRecord::from_rule(ptype, rule))
            .collect();
        let added = self
            .store
            .insert(&self.database, &self.table, records)
            .await
            .map_err(|e| e.in_operation("add_policies", self.qualified_table()))?;
        log::debug!("Added {added} '{ptype}' rule(s) to {}", self.qualified_table());
        Ok(())
    }

    async fn remove_policy(&self, _section: &str, ptype: &str, rule: &[String]) -> Result<()> {
        let filter = RecordFilter::exact(&PolicyRecord::from_rule(ptype, rule));
        let removed = self
            .delete_where(&filter)
            .await
            .map_err(|e| e.in_operation("remove_policy", self.qualified_table()))?;
        log::debug!("Removed {removed} '{ptype}' row(s) from {}", self.qualified_table());
        Ok(())
    }

    async fn remove_policies(
        &self,
        _section: &str,
        ptype: &str,
        rules: &[Vec<String>],
    ) -> Result<()> {
        let mut removed = 0;
        for rule in rules {
            let filter = RecordFilter::exact(&PolicyRecord::from_rule(ptype, rule));
            removed += self
                .delete_where(&filter)
                .await
                .map_err(|e| e.in_operation("remove_policies", self.qualified_table()))?;
        }
        log::debug!("Removed {removed} '{ptype}' row(s) from {}", self.qualified_table());
        Ok(())
    }

    async fn remove_filtered_policy(
        &self,
        _section: &str,
        ptype: &str,
        field_index: usize,
        field_values: &[String],
    ) -> Result<()> {
        let filter = RecordFilter::windowed(ptype, field_index, field_values);
        let removed = self
            .delete_where(&filter)
            .await
            .map_err(|e| e.in_operation("remove_filtered_policy", self.qualified_table()))?;
        log::debug!(
            "Removed {removed} '{ptype}' row(s) matching field{}.. from {}",
            field_index.saturating_add(1),
            self.qualified_table()
        );
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
