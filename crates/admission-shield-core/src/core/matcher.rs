// crates/admission-shield-core/src/core/matcher.rs
// ============================================================================
// Module: Rule Matcher
// Description: Pure evaluation of rules and request patterns against requests.
// Purpose: Decide whether a rule applies to a request in permissive or strict mode.
// Dependencies: globset, crate::core::{request, rule}
// ============================================================================

//! ## Overview
//! The rule matcher is a pure function over a [`Rule`] and the
//! [`RequestFields`] of one request. All configured dimensions of a request
//! pattern must pass; absent dimensions are wildcards. Strict mode is used
//! for cluster-scoped requests governed by a profile outside the shield
//! namespace: the pattern must then name the request namespace literally.
//! Cluster-scoped requests have an empty namespace, which only an explicit
//! empty namespace pattern names.

// ============================================================================
// SECTION: Imports
// ============================================================================

use globset::GlobBuilder;

use crate::core::request::RequestFields;
use crate::core::request::ResourceScope;
use crate::core::rule::AttrsPattern;
use crate::core::rule::FieldPattern;
use crate::core::rule::KustomizePattern;
use crate::core::rule::RequestPattern;
use crate::core::rule::Rule;

// ============================================================================
// SECTION: Match Mode
// ============================================================================

/// How strictly a rule is applied to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Omitted dimensions are wildcards.
    Permissive,
    /// Namespace must be named literally in addition to normal matching.
    Strict,
}

impl MatchMode {
    /// Selects the match mode for a profile living in `profile_namespace`.
    #[must_use]
    pub fn for_profile(scope: ResourceScope, profile_namespace: &str, shield_namespace: &str) -> Self {
        if scope == ResourceScope::Cluster && profile_namespace != shield_namespace {
            Self::Strict
        } else {
            Self::Permissive
        }
    }
}

// ============================================================================
// SECTION: Rule Matcher
// ============================================================================

/// Stateless rule evaluation.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleMatcher;

impl RuleMatcher {
    /// Returns true when the rule applies to the request.
    ///
    /// Exclude patterns are always evaluated permissively.
    #[must_use]
    pub fn matches(rule: &Rule, fields: &RequestFields<'_>, mode: MatchMode) -> bool {
        rule.match_patterns.iter().any(|pattern| Self::matches_pattern(pattern, fields, mode))
            && !rule
                .exclude
                .iter()
                .any(|pattern| Self::matches_pattern(pattern, fields, MatchMode::Permissive))
    }

    /// Returns true when every configured dimension of the pattern passes.
    #[must_use]
    pub fn matches_pattern(
        pattern: &RequestPattern,
        fields: &RequestFields<'_>,
        mode: MatchMode,
    ) -> bool {
        let namespace_ok = match (mode, pattern.namespace.as_ref()) {
            (MatchMode::Strict, None) => false,
            (MatchMode::Strict, Some(namespace)) => {
                namespace.as_str().trim() == fields.namespace || field_equals(namespace, fields.namespace)
            }
            (MatchMode::Permissive, namespace) => optional_matches(namespace, fields.namespace),
        };
        namespace_ok
            && optional_matches(pattern.api_group.as_ref(), fields.api_group)
            && optional_matches(pattern.api_version.as_ref(), fields.api_version)
            && optional_matches(pattern.kind.as_ref(), fields.kind)
            && optional_matches(pattern.name.as_ref(), fields.name)
            && pattern
                .operation
                .as_ref()
                .is_none_or(|operation| field_matches_ci(operation, fields.operation.as_str()))
            && optional_matches(pattern.username.as_ref(), fields.username)
            && pattern.user_group.as_ref().is_none_or(|group_pattern| {
                fields.user_groups.iter().any(|group| field_matches(group_pattern, group))
            })
            && pattern.labels.iter().all(|(key, value_pattern)| {
                fields.labels.get(key).is_some_and(|value| field_matches(value_pattern, value))
            })
    }

    /// Returns true when any pattern in the list matches permissively.
    ///
    /// An empty list matches nothing.
    #[must_use]
    pub fn matches_any(patterns: &[RequestPattern], fields: &RequestFields<'_>) -> bool {
        patterns.iter().any(|pattern| Self::matches_pattern(pattern, fields, MatchMode::Permissive))
    }

    /// Returns true when an attribute pattern applies to the request.
    #[must_use]
    pub fn matches_attrs(pattern: &AttrsPattern, fields: &RequestFields<'_>) -> bool {
        pattern.match_patterns.is_empty() || Self::matches_any(&pattern.match_patterns, fields)
    }

    /// Returns true when a kustomize pattern applies to the request.
    #[must_use]
    pub fn matches_kustomize(pattern: &KustomizePattern, fields: &RequestFields<'_>) -> bool {
        pattern.match_patterns.is_empty() || Self::matches_any(&pattern.match_patterns, fields)
    }
}

// ============================================================================
// SECTION: Field Matching
// ============================================================================

/// Returns true when the field pattern matches the value.
#[must_use]
pub fn field_matches(pattern: &FieldPattern, value: &str) -> bool {
    pattern.is_wildcard() || pattern.alternatives().any(|alt| glob_matches(alt, value, false))
}

/// Returns true when one alternative equals the value literally.
#[must_use]
pub fn field_equals(pattern: &FieldPattern, value: &str) -> bool {
    pattern.alternatives().any(|alt| alt == value)
}

/// Validates that every alternative of the pattern compiles as a glob.
///
/// # Errors
///
/// Returns a description of the first alternative that fails to compile.
pub fn validate_field_pattern(pattern: &FieldPattern) -> Result<(), String> {
    for alt in pattern.alternatives() {
        GlobBuilder::new(alt)
            .literal_separator(false)
            .build()
            .map_err(|err| format!("invalid pattern {alt:?}: {err}"))?;
    }
    Ok(())
}

/// Case-insensitive variant of [`field_matches`].
fn field_matches_ci(pattern: &FieldPattern, value: &str) -> bool {
    pattern.is_wildcard() || pattern.alternatives().any(|alt| glob_matches(alt, value, true))
}

/// Matches an optional pattern; absent patterns are wildcards.
fn optional_matches(pattern: Option<&FieldPattern>, value: &str) -> bool {
    pattern.is_none_or(|pattern| field_matches(pattern, value))
}

/// Matches one glob alternative against a value.
fn glob_matches(alt: &str, value: &str, case_insensitive: bool) -> bool {
    if !alt.contains(['*', '?', '[']) {
        return if case_insensitive { alt.eq_ignore_ascii_case(value) } else { alt == value };
    }
    GlobBuilder::new(alt)
        .literal_separator(false)
        .case_insensitive(case_insensitive)
        .build()
        .is_ok_and(|glob| glob.compile_matcher().is_match(value))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
