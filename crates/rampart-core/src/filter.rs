//! Record filters for exact and partial-match deletes.

use crate::record::{MAX_FIELDS, PolicyRecord};

/// Predicate over [`PolicyRecord`]s.
///
/// The policy type must always match. Each positional field is either
/// constrained to a value or left unconstrained (`None`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    /// Required policy type.
    pub ptype: String,

    /// Per-field constraints, `field1..field5`.
    pub fields: [Option<String>; MAX_FIELDS],
}

impl RecordFilter {
    /// Filter matching rows identical to `record` in type and all five fields.
    ///
    /// Empty fields are constrained too, so a short rule only matches rows
    /// whose remaining fields are empty.
    pub fn exact(record: &PolicyRecord) -> Self {
        Self {
            ptype: record.ptype.clone(),
            fields: record.fields.clone().map(Some),
        }
    }

    /// Filter constraining a contiguous window of fields.
    ///
    /// Field position `i` is constrained to `field_values[i - field_index]`
    /// when `field_index <= i < field_index + field_values.len()`. Positions
    /// outside the window, and empty values inside it, match anything.
    ///
    /// The window always starts at or after the first field; a negative start
    /// (window beginning before field 1) is not representable.
    pub fn windowed<S: AsRef<str>>(ptype: &str, field_index: usize, field_values: &[S]) -> Self {
        let mut fields: [Option<String>; MAX_FIELDS] = Default::default();
        for (offset, value) in field_values.iter().enumerate() {
            let Some(slot) = fields.get_mut(field_index.saturating_add(offset)) else {
                break;
            };
            let value = value.as_ref();
            if !value.is_empty() {
                *slot = Some(value.to_string());
            }
        }

        Self {
            ptype: ptype.to_string(),
            fields,
        }
    }

    /// Whether `record` satisfies every constraint.
    pub fn matches(&self, record: &PolicyRecord) -> bool {
        record.ptype == self.ptype
            && self
                .fields
                .iter()
                .zip(&record.fields)
                .all(|(want, have)| want.as_ref().is_none_or(|w| w == have))
    }
}
