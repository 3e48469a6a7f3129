// crates/admission-shield-core/src/core/profile.rs
// ============================================================================
// Module: Signing Profiles
// Description: Protection profile bundles, their status, and the profile contract.
// Purpose: Model the policy bundles that decide which requests need signatures.
// Dependencies: serde, crate::core::{identifiers, matcher, request, rule, rule_table}
// ============================================================================

//! ## Overview
//! A [`SigningProfile`] bundles protect, ignore, and force-check rules with
//! attribute-level patterns and a denial [`ProfileStatus`]. The engine only
//! depends on the [`ProtectionProfile`] capability trait, so other profile
//! kinds can plug into the same pipeline.
//!
//! Status history is bounded: at most [`MAX_LATEST_EVENTS`] recent denials
//! are retained newest-first, and the summary holds one entry per
//! group/version/kind.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::ProfileRef;
use crate::core::matcher::MatchMode;
use crate::core::matcher::RuleMatcher;
use crate::core::request::RequestFields;
use crate::core::request::RequestSnapshot;
use crate::core::rule::AttrsPattern;
use crate::core::rule::KustomizePattern;
use crate::core::rule::Rule;
use crate::core::rule_table::RuleTableKind;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum number of recent denials retained in a profile status.
pub const MAX_LATEST_EVENTS: usize = 3;

// ============================================================================
// SECTION: Profile Status
// ============================================================================

/// Per group/version/kind denial counter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileStatusSummary {
    /// Group/version/kind key.
    pub group_version_kind: String,
    /// Denials recorded for the key.
    pub count: u64,
}

/// Outcome recorded with a denial.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResult {
    /// Denial message.
    pub message: String,
    /// Denial time (`YYYY-MM-DD HH:MM:SS`, UTC).
    pub timestamp: String,
}

/// One recent denial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileStatusDetail {
    /// Denied request.
    pub request: RequestSnapshot,
    /// Denial outcome.
    pub result: StatusResult,
}

/// Denial bookkeeping attached to a profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileStatus {
    /// Total denials.
    #[serde(default)]
    pub deny_count: u64,
    /// Denials per group/version/kind.
    #[serde(rename = "denySummary", default, skip_serializing_if = "Vec::is_empty")]
    pub summary: Vec<ProfileStatusSummary>,
    /// Recent denials, newest first.
    #[serde(rename = "latestDeniedEvents", default, skip_serializing_if = "Vec::is_empty")]
    pub latest: Vec<ProfileStatusDetail>,
}

impl ProfileStatus {
    /// Records one denial of `request`.
    pub fn record_denial(&mut self, request: RequestSnapshot, message: &str, timestamp: String) {
        self.deny_count = self.deny_count.saturating_add(1);

        let key = request.group_version_kind();
        if let Some(summary) = self.summary.iter_mut().find(|summary| summary.group_version_kind == key) {
            summary.count = summary.count.saturating_add(1);
        } else {
            self.summary.push(ProfileStatusSummary {
                group_version_kind: key,
                count: 1,
            });
        }

        self.latest.insert(
            0,
            ProfileStatusDetail {
                request,
                result: StatusResult {
                    message: message.to_string(),
                    timestamp,
                },
            },
        );
        self.latest.truncate(MAX_LATEST_EVENTS);
    }
}

// ============================================================================
// SECTION: Profile Contract
// ============================================================================

/// Result of matching a profile against a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileMatch {
    /// A force-check rule matched.
    Forced,
    /// An ignore rule matched before any protect rule.
    Ignored,
    /// A protect rule matched.
    Protected,
    /// No rule matched.
    Unmatched,
}

impl ProfileMatch {
    /// Returns true when the request is protected by the profile.
    #[must_use]
    pub const fn is_protected(self) -> bool {
        matches!(self, Self::Forced | Self::Protected)
    }
}

/// Borrowed rule lists of a profile.
#[derive(Debug, Clone, Copy)]
pub struct ProfileRuleSets<'a> {
    /// Protect rules.
    pub protect: &'a [Rule],
    /// Ignore rules.
    pub ignore: &'a [Rule],
    /// Force-check rules.
    pub force_check: &'a [Rule],
}

impl<'a> ProfileRuleSets<'a> {
    /// Returns the rules contributed to the table of the given kind.
    #[must_use]
    pub const fn for_kind(self, kind: RuleTableKind) -> &'a [Rule] {
        match kind {
            RuleTableKind::Protect => self.protect,
            RuleTableKind::Ignore => self.ignore,
            RuleTableKind::ForceCheck => self.force_check,
        }
    }
}

/// Capability contract shared by every profile kind.
pub trait ProtectionProfile {
    /// Returns the reference identifying this profile.
    fn reference(&self) -> ProfileRef;

    /// Returns true when the profile is disabled.
    fn is_disabled(&self) -> bool;

    /// Matches the request: force-check, then ignore, then protect rules.
    fn match_request(&self, fields: &RequestFields<'_>, shield_namespace: &str) -> ProfileMatch;

    /// Returns a profile with `other`'s rules and attributes appended.
    fn merge(&self, other: &Self) -> Self
    where
        Self: Sized;

    /// Returns the protect-attribute patterns applying to the request.
    fn protect_attrs(&self, fields: &RequestFields<'_>) -> Vec<&AttrsPattern>;

    /// Returns the ignore-attribute patterns applying to the request.
    fn ignore_attrs(&self, fields: &RequestFields<'_>) -> Vec<&AttrsPattern>;

    /// Returns the kustomize patterns applying to the request.
    fn kustomize_patterns(&self, fields: &RequestFields<'_>) -> Vec<&KustomizePattern>;

    /// Returns the rule lists contributed to the rule tables.
    fn rule_sets(&self) -> ProfileRuleSets<'_>;

    /// Returns the denial status.
    fn status(&self) -> &ProfileStatus;

    /// Returns the mutable denial status.
    fn status_mut(&mut self) -> &mut ProfileStatus;

    /// Records a denial in the profile status.
    fn update_status(&mut self, request: RequestSnapshot, message: &str, timestamp: String) {
        self.status_mut().record_denial(request, message, timestamp);
    }
}

// ============================================================================
// SECTION: Signing Profile
// ============================================================================

/// Minimal object metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    /// Object namespace.
    #[serde(default)]
    pub namespace: String,
    /// Object name.
    #[serde(default)]
    pub name: String,
    /// Object labels.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

/// Namespace selector for profiles that target other namespaces.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceSelector {
    /// Included namespace patterns.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,
    /// Excluded namespace patterns.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
}

/// Rules and attribute patterns of a signing profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningProfileSpec {
    /// Disabled profiles never govern requests.
    #[serde(default)]
    pub disabled: bool,
    /// Target namespaces; only honored in the shield namespace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_namespace_selector: Option<NamespaceSelector>,
    /// Protect rules.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub protect_rules: Vec<Rule>,
    /// Ignore rules.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignore_rules: Vec<Rule>,
    /// Force-check rules.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub force_check_rules: Vec<Rule>,
    /// Overlay naming patterns.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kustomize_patterns: Vec<KustomizePattern>,
    /// Attributes whose changes always count as mutations.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub protect_attrs: Vec<AttrsPattern>,
    /// Deprecated alias of `ignore_attrs`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unprotect_attrs: Vec<AttrsPattern>,
    /// Attributes whose changes never count as mutations.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignore_attrs: Vec<AttrsPattern>,
}

/// Protection profile resource.
///
/// The default value is the empty bundle substituted when no referenced
/// profile resolves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningProfile {
    /// API version of the resource.
    #[serde(default)]
    pub api_version: String,
    /// Kind of the resource.
    #[serde(default)]
    pub kind: String,
    /// Object metadata.
    #[serde(default)]
    pub metadata: ObjectMeta,
    /// Profile rules.
    #[serde(default)]
    pub spec: SigningProfileSpec,
    /// Denial status.
    #[serde(default)]
    pub status: ProfileStatus,
}

impl SigningProfile {
    /// Creates an enabled profile with the given identity and spec.
    #[must_use]
    pub fn new(
        api_version: impl Into<String>,
        kind: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
        spec: SigningProfileSpec,
    ) -> Self {
        Self {
            api_version: api_version.into(),
            kind: kind.into(),
            metadata: ObjectMeta {
                namespace: namespace.into(),
                name: name.into(),
                labels: BTreeMap::new(),
            },
            spec,
            status: ProfileStatus::default(),
        }
    }

    /// Returns true when the profile has no protect rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.spec.protect_rules.is_empty()
    }
}

impl ProtectionProfile for SigningProfile {
    fn reference(&self) -> ProfileRef {
        ProfileRef::new(
            self.api_version.clone(),
            self.kind.clone(),
            self.metadata.namespace.clone(),
            self.metadata.name.clone(),
        )
    }

    fn is_disabled(&self) -> bool {
        self.spec.disabled
    }

    fn match_request(&self, fields: &RequestFields<'_>, shield_namespace: &str) -> ProfileMatch {
        let mode = MatchMode::for_profile(fields.scope, &self.metadata.namespace, shield_namespace);
        let any = |rules: &[Rule]| rules.iter().any(|rule| RuleMatcher::matches(rule, fields, mode));
        if any(&self.spec.force_check_rules) {
            ProfileMatch::Forced
        } else if any(&self.spec.ignore_rules) {
            ProfileMatch::Ignored
        } else if any(&self.spec.protect_rules) {
            ProfileMatch::Protected
        } else {
            ProfileMatch::Unmatched
        }
    }

    fn merge(&self, other: &Self) -> Self {
        let mut merged = self.clone();
        merged.spec.protect_rules.extend(other.spec.protect_rules.iter().cloned());
        merged.spec.ignore_rules.extend(other.spec.ignore_rules.iter().cloned());
        merged.spec.force_check_rules.extend(other.spec.force_check_rules.iter().cloned());
        merged.spec.protect_attrs.extend(other.spec.protect_attrs.iter().cloned());
        merged.spec.ignore_attrs.extend(other.spec.ignore_attrs.iter().cloned());
        merged
    }

    fn protect_attrs(&self, fields: &RequestFields<'_>) -> Vec<&AttrsPattern> {
        self.spec
            .protect_attrs
            .iter()
            .filter(|pattern| RuleMatcher::matches_attrs(pattern, fields))
            .collect()
    }

    fn ignore_attrs(&self, fields: &RequestFields<'_>) -> Vec<&AttrsPattern> {
        self.spec
            .ignore_attrs
            .iter()
            .chain(&self.spec.unprotect_attrs)
            .filter(|pattern| RuleMatcher::matches_attrs(pattern, fields))
            .collect()
    }

    fn kustomize_patterns(&self, fields: &RequestFields<'_>) -> Vec<&KustomizePattern> {
        self.spec
            .kustomize_patterns
            .iter()
            .filter(|pattern| RuleMatcher::matches_kustomize(pattern, fields))
            .collect()
    }

    fn rule_sets(&self) -> ProfileRuleSets<'_> {
        ProfileRuleSets {
            protect: &self.spec.protect_rules,
            ignore: &self.spec.ignore_rules,
            force_check: &self.spec.force_check_rules,
        }
    }

    fn status(&self) -> &ProfileStatus {
        &self.status
    }

    fn status_mut(&mut self) -> &mut ProfileStatus {
        &mut self.status
    }
}
