// crates/admission-shield-core/src/core/rule.rs
// ============================================================================
// Module: Protection Rules
// Description: Request patterns, rules, and attribute-level patterns.
// Purpose: Describe which requests a profile protects, ignores, or force-checks.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`Rule`] is a list of `match` request patterns minus a list of `exclude`
//! request patterns. Each [`RequestPattern`] dimension is optional; an absent
//! dimension is a wildcard. Field values are matched with [`FieldPattern`],
//! a comma-separated list of glob alternatives. Matching itself lives in
//! [`crate::core::matcher`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Field Pattern
// ============================================================================

/// Comma-separated glob alternatives matched against one request field.
///
/// An empty pattern or any `*` alternative matches every value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldPattern(String);

impl FieldPattern {
    /// Creates a new field pattern.
    #[must_use]
    pub fn new(pattern: impl Into<String>) -> Self {
        Self(pattern.into())
    }

    /// Returns the raw pattern text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the trimmed, non-empty alternatives.
    pub fn alternatives(&self) -> impl Iterator<Item = &str> {
        self.0.split(',').map(str::trim).filter(|alt| !alt.is_empty())
    }

    /// Returns true when the pattern matches every value.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.alternatives().next().is_none() || self.alternatives().any(|alt| alt == "*")
    }
}

impl fmt::Display for FieldPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for FieldPattern {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

// ============================================================================
// SECTION: Request Pattern
// ============================================================================

/// Pattern over the fields of an admission request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestPattern {
    /// API group pattern.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_group: Option<FieldPattern>,
    /// API version pattern.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<FieldPattern>,
    /// Kind pattern.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<FieldPattern>,
    /// Namespace pattern.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<FieldPattern>,
    /// Object name pattern.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<FieldPattern>,
    /// Operation pattern (`CREATE`, `UPDATE`, `DELETE`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<FieldPattern>,
    /// Requesting user name pattern.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<FieldPattern>,
    /// Requesting user group pattern; any group may match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_group: Option<FieldPattern>,
    /// Label selectors; every listed label must exist and match.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, FieldPattern>,
}

impl RequestPattern {
    /// Returns every configured field pattern, including label values.
    pub fn patterns(&self) -> impl Iterator<Item = &FieldPattern> {
        [
            self.api_group.as_ref(),
            self.api_version.as_ref(),
            self.kind.as_ref(),
            self.namespace.as_ref(),
            self.name.as_ref(),
            self.operation.as_ref(),
            self.username.as_ref(),
            self.user_group.as_ref(),
        ]
        .into_iter()
        .flatten()
        .chain(self.labels.values())
    }
}

// ============================================================================
// SECTION: Rule
// ============================================================================

/// Protection rule: any `match` pattern, and no `exclude` pattern.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Patterns selecting requests.
    #[serde(rename = "match", default)]
    pub match_patterns: Vec<RequestPattern>,
    /// Patterns removing requests from the selection.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<RequestPattern>,
}

impl Rule {
    /// Creates a rule from a single match pattern.
    #[must_use]
    pub fn matching(pattern: RequestPattern) -> Self {
        Self {
            match_patterns: vec![pattern],
            exclude: Vec::new(),
        }
    }

    /// Adds an exclude pattern.
    #[must_use]
    pub fn excluding(mut self, pattern: RequestPattern) -> Self {
        self.exclude.push(pattern);
        self
    }
}

// ============================================================================
// SECTION: Attribute Patterns
// ============================================================================

/// Object attributes to protect or ignore for matching requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttrsPattern {
    /// Requests the pattern applies to; empty applies to every request.
    #[serde(rename = "match", default)]
    pub match_patterns: Vec<RequestPattern>,
    /// Attribute paths.
    #[serde(default)]
    pub attrs: Vec<String>,
}

/// Overlay naming convention applied before comparing objects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KustomizePattern {
    /// Requests the pattern applies to; empty applies to every request.
    #[serde(rename = "match", default)]
    pub match_patterns: Vec<RequestPattern>,
    /// Optional name prefix added by the overlay.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_prefix: Option<String>,
    /// Optional name suffix added by the overlay.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_suffix: Option<String>,
}
