//! In-memory policy model.
//!
//! The host engine evaluates against a [`PolicyModel`]: section
//! (`"p"` for permissions, `"g"` for grouping) → policy type → ordered rules.
//! Each rule is an ordered list of string tokens.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Rules of a single policy type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assertion {
    /// Rules in insertion order.
    pub policy: Vec<Vec<String>>,
}

/// Section → policy type → [`Assertion`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyModel {
    sections: BTreeMap<String, BTreeMap<String, Assertion>>,
}

impl PolicyModel {
    /// Create an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Assertion for `section`/`ptype`, if present.
    pub fn get(&self, section: &str, ptype: &str) -> Option<&Assertion> {
        self.sections.get(section)?.get(ptype)
    }

    /// Policy types and their assertions under `section`.
    pub fn section(&self, section: &str) -> impl Iterator<Item = (&str, &Assertion)> {
        self.sections
            .get(section)
            .into_iter()
            .flatten()
            .map(|(ptype, assertion)| (ptype.as_str(), assertion))
    }

    /// Section keys present in the model.
    pub fn sections(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    /// Append a rule, creating the section and policy type as needed.
    pub fn add_rule(&mut self, section: &str, ptype: &str, rule: Vec<String>) {
        self.sections
            .entry(section.to_string())
            .or_default()
            .entry(ptype.to_string())
            .or_default()
            .policy
            .push(rule);
    }

    /// Rules for `section`/`ptype`; empty if absent.
    pub fn rules(&self, section: &str, ptype: &str) -> &[Vec<String>] {
        self.get(section, ptype)
            .map(|a| a.policy.as_slice())
            .unwrap_or_default()
    }

    /// Total number of rules across all sections.
    pub fn rule_count(&self) -> usize {
        self.sections
            .values()
            .flat_map(BTreeMap::values)
            .map(|a| a.policy.len())
            .sum()
    }

    /// Whether the model holds no rules.
    pub fn is_empty(&self) -> bool {
        self.rule_count() == 0
    }

    /// Remove every rule, keeping nothing.
    pub fn clear(&mut self) {
        self.sections.clear();
    }
}
