// crates/admission-shield-core/src/core/rule_table.rs
// ============================================================================
// Module: Rule Tables
// Description: Aggregated rule entries bound to owning profile references.
// Purpose: Find every profile governing a request without loading profiles.
// Dependencies: serde, crate::core::{identifiers, matcher, request, rule}
// ============================================================================

//! ## Overview
//! A [`RuleTable`] is an ordered list of rules, each bound to the set of
//! profile references that contributed it. The engine keeps one table per
//! [`RuleTableKind`]. Updates to a profile always rewrite its entries as a
//! `remove` followed by an `add`; `remove` is a no-op for absent references,
//! so a retried rewrite converges to the same table.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::ProfileRef;
use crate::core::matcher::MatchMode;
use crate::core::matcher::RuleMatcher;
use crate::core::request::RequestFields;
use crate::core::rule::Rule;

// ============================================================================
// SECTION: Table Kinds
// ============================================================================

/// The three rule tables maintained per cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleTableKind {
    /// Rules selecting protected requests.
    Protect,
    /// Rules selecting ignored requests.
    Ignore,
    /// Rules forcing a check regardless of ignore rules.
    ForceCheck,
}

impl RuleTableKind {
    /// Every table kind, in persistence order.
    pub const ALL: [Self; 3] = [Self::Protect, Self::Ignore, Self::ForceCheck];

    /// Returns the well-known document name of the table.
    #[must_use]
    pub const fn document_name(self) -> &'static str {
        match self {
            Self::Protect => "shield-rule-table",
            Self::Ignore => "shield-ignore-table",
            Self::ForceCheck => "shield-force-check-table",
        }
    }
}

impl fmt::Display for RuleTableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.document_name())
    }
}

// ============================================================================
// SECTION: Rule Table
// ============================================================================

/// One rule and the profiles that contributed it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleTableEntry {
    /// Rule evaluated against requests.
    pub rule: Rule,
    /// Owning profile references.
    #[serde(rename = "profileRefs", default)]
    pub profiles: BTreeSet<ProfileRef>,
}

/// Result of matching a request against a rule table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableMatch {
    /// True when any entry matched.
    pub matched: bool,
    /// Union of matching entries' references, in first-seen order.
    pub refs: Vec<ProfileRef>,
}

/// Ordered collection of rule entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleTable {
    /// Table entries.
    entries: Vec<RuleTableEntry>,
}

impl RuleTable {
    /// Creates an empty table.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Returns the table entries.
    #[must_use]
    pub fn entries(&self) -> &[RuleTableEntry] {
        &self.entries
    }

    /// Returns true when the table has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true when any entry is bound to `profile`.
    #[must_use]
    pub fn contains(&self, profile: &ProfileRef) -> bool {
        self.entries.iter().any(|entry| entry.profiles.contains(profile))
    }

    /// Appends one entry per rule, each bound to `profile`.
    pub fn add<'a>(&mut self, rules: impl IntoIterator<Item = &'a Rule>, profile: &ProfileRef) {
        self.entries.extend(rules.into_iter().map(|rule| RuleTableEntry {
            rule: rule.clone(),
            profiles: BTreeSet::from([profile.clone()]),
        }));
    }

    /// Unbinds `profile` from every entry and drops entries left without owners.
    pub fn remove(&mut self, profile: &ProfileRef) {
        for entry in &mut self.entries {
            entry.profiles.remove(profile);
        }
        self.entries.retain(|entry| !entry.profiles.is_empty());
    }

    /// Appends every entry of `other`.
    pub fn merge(&mut self, other: Self) {
        self.entries.extend(other.entries);
    }

    /// Matches a request against every entry.
    ///
    /// Strict mode applies per reference when the request is cluster-scoped
    /// and the reference lives outside `shield_namespace`.
    #[must_use]
    pub fn match_request(&self, fields: &RequestFields<'_>, shield_namespace: &str) -> TableMatch {
        let mut result = TableMatch::default();
        for entry in &self.entries {
            for profile in &entry.profiles {
                let mode = MatchMode::for_profile(fields.scope, &profile.namespace, shield_namespace);
                if RuleMatcher::matches(&entry.rule, fields, mode) {
                    result.matched = true;
                    if !result.refs.contains(profile) {
                        result.refs.push(profile.clone());
                    }
                }
            }
        }
        result
    }
}

impl FromIterator<RuleTableEntry> for RuleTable {
    fn from_iter<I: IntoIterator<Item = RuleTableEntry>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

// ============================================================================
// SECTION: Rule Table Set
// ============================================================================

/// The protect, ignore, and force-check tables together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleTableSet {
    /// Protect rules.
    pub protect: RuleTable,
    /// Ignore rules.
    pub ignore: RuleTable,
    /// Force-check rules.
    pub force_check: RuleTable,
}

impl RuleTableSet {
    /// Returns the table of the given kind.
    #[must_use]
    pub const fn get(&self, kind: RuleTableKind) -> &RuleTable {
        match kind {
            RuleTableKind::Protect => &self.protect,
            RuleTableKind::Ignore => &self.ignore,
            RuleTableKind::ForceCheck => &self.force_check,
        }
    }

    /// Returns the mutable table of the given kind.
    pub const fn get_mut(&mut self, kind: RuleTableKind) -> &mut RuleTable {
        match kind {
            RuleTableKind::Protect => &mut self.protect,
            RuleTableKind::Ignore => &mut self.ignore,
            RuleTableKind::ForceCheck => &mut self.force_check,
        }
    }

    /// Merges each table of `other` into the matching table of `self`.
    pub fn merge(&mut self, other: Self) {
        self.protect.merge(other.protect);
        self.ignore.merge(other.ignore);
        self.force_check.merge(other.force_check);
    }
}
