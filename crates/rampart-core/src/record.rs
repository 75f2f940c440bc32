//! Policy records: the persisted row shape for a single rule.
//!
//! A record carries a policy type (`p`, `p2`, `g`, `g2`, ...) and up to
//! [`MAX_FIELDS`] positional string values. The row schema is fixed-width;
//! unused trailing fields are stored as empty strings.
//!
//! # Wire shape
//!
//! ```json
//! {"id": "17", "type": "p", "field1": "alice", "field2": "data1",
//!  "field3": "read", "field4": "", "field5": ""}
//! ```
//!
//! `id` is assigned by the store and omitted on insert.

use serde::{Deserialize, Serialize};

/// Number of positional fields a record can hold.
pub const MAX_FIELDS: usize = 5;

/// One persisted policy rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RecordRow", into = "RecordRow")]
pub struct PolicyRecord {
    /// Store-assigned identifier; `None` until inserted.
    pub id: Option<String>,

    /// Policy type key. The first character names the section.
    pub ptype: String,

    /// Positional rule values, `field1..field5`.
    pub fields: [String; MAX_FIELDS],
}

impl PolicyRecord {
    /// Build a record from a policy type and an ordered rule.
    ///
    /// Position 0 maps to `field1` through position 4 to `field5`. Tokens past
    /// [`MAX_FIELDS`] are dropped.
    pub fn from_rule<S: AsRef<str>>(ptype: &str, rule: &[S]) -> Self {
        if rule.len() > MAX_FIELDS {
            log::debug!(
                "Truncating '{ptype}' rule: {} token(s) beyond field{MAX_FIELDS} dropped",
                rule.len() - MAX_FIELDS
            );
        }

        let mut fields: [String; MAX_FIELDS] = Default::default();
        for (slot, token) in fields.iter_mut().zip(rule) {
            *slot = token.as_ref().to_string();
        }

        Self {
            id: None,
            ptype: ptype.to_string(),
            fields,
        }
    }

    /// Non-empty fields in order, as loaded into a policy model.
    pub fn tokens(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|f| !f.is_empty())
            .cloned()
            .collect()
    }

    /// Section key derived from the policy type.
    ///
    /// By convention the section is the first character of the type
    /// (`"p2"` lives in section `"p"`). Returns `None` for a blank type.
    pub fn section(&self) -> Option<&str> {
        let first = self.ptype.chars().next()?;
        Some(&self.ptype[..first.len_utf8()])
    }

    /// Whether this is a blank sentinel row that must never be loaded.
    pub fn is_blank(&self) -> bool {
        self.ptype.is_empty()
    }

    /// Copy of this record with the given store identifier.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Flat serialized form of [`PolicyRecord`].
#[derive(Serialize, Deserialize)]
struct RecordRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(rename = "type", default)]
    ptype: String,
    #[serde(default)]
    field1: String,
    #[serde(default)]
    field2: String,
    #[serde(default)]
    field3: String,
    #[serde(default)]
    field4: String,
    #[serde(default)]
    field5: String,
}

impl From<RecordRow> for PolicyRecord {
    fn from(row: RecordRow) -> Self {
        Self {
            id: row.id,
            ptype: row.ptype,
            fields: [row.field1, row.field2, row.field3, row.field4, row.field5],
        }
    }
}

impl From<PolicyRecord> for RecordRow {
    fn from(record: PolicyRecord) -> Self {
        let [field1, field2, field3, field4, field5] = record.fields;
        Self {
            id: record.id,
            ptype: record.ptype,
            field1,
            field2,
            field3,
            field4,
            field5,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
