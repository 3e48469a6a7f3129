// crates/admission-shield-core/src/core/policy.rs
// ============================================================================
// Module: Sign Policy and Signature Evidence
// Description: Signer policies, break-glass conditions, and signature records.
// Purpose: Carry the inputs handed to the external signature verifier.
// Dependencies: serde, crate::core::{identifiers, profile, request}
// ============================================================================

//! ## Overview
//! The sign policy names which signers may sign resources in which
//! namespaces, and carries the break-glass conditions that bypass denials.
//! The effective policy is the configured policy merged with the stored
//! `SignPolicy` object. Signature records are evidence objects selected by
//! the signed object's api version and kind labels.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::SIGNATURE_LABEL_API_VERSION;
use crate::core::identifiers::SIGNATURE_LABEL_KIND;
use crate::core::identifiers::SIGNATURE_LABEL_TIME;
use crate::core::profile::ObjectMeta;
use crate::core::request::ResourceScope;

// ============================================================================
// SECTION: Sign Policy
// ============================================================================

/// Namespaces whose resources must be signed by the listed signers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerPolicy {
    /// Namespace patterns governed by the policy.
    #[serde(default)]
    pub namespaces: Vec<String>,
    /// Signer names allowed to sign.
    #[serde(default)]
    pub signers: Vec<String>,
}

/// Named signer identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerDefinition {
    /// Signer name referenced by policies.
    pub name: String,
    /// Certificate subject patterns identifying the signer.
    #[serde(default)]
    pub subjects: Vec<String>,
}

/// Scope of a break-glass condition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BreakGlassScope {
    /// Unset scope; treated as namespaced.
    #[default]
    #[serde(rename = "")]
    Undefined,
    /// Applies to namespaced requests in the listed namespaces.
    Namespaced,
    /// Applies to cluster-scoped requests.
    Cluster,
}

/// Emergency bypass condition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakGlassCondition {
    /// Condition scope.
    #[serde(default)]
    pub scope: BreakGlassScope,
    /// Namespaces covered by a namespaced condition.
    #[serde(default)]
    pub namespaces: Vec<String>,
}

impl BreakGlassCondition {
    /// Returns true when the condition covers a request in `namespace`.
    #[must_use]
    pub fn covers(&self, scope: ResourceScope, namespace: &str) -> bool {
        match scope {
            ResourceScope::Namespaced => {
                matches!(self.scope, BreakGlassScope::Undefined | BreakGlassScope::Namespaced)
                    && self.namespaces.iter().any(|candidate| candidate == namespace)
            }
            ResourceScope::Cluster => self.scope == BreakGlassScope::Cluster,
        }
    }
}

/// Effective sign policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignPolicy {
    /// Signer policies.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub policies: Vec<SignerPolicy>,
    /// Signer definitions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub signers: Vec<SignerDefinition>,
    /// Break-glass conditions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub break_glass: Vec<BreakGlassCondition>,
}

impl SignPolicy {
    /// Returns a policy with `other`'s entries appended.
    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        let mut merged = self.clone();
        merged.policies.extend(other.policies.iter().cloned());
        merged.signers.extend(other.signers.iter().cloned());
        merged.break_glass.extend(other.break_glass.iter().cloned());
        merged
    }

    /// Returns true when any break-glass condition covers the request.
    #[must_use]
    pub fn break_glass_active(&self, scope: ResourceScope, namespace: &str) -> bool {
        self.break_glass.iter().any(|condition| condition.covers(scope, namespace))
    }
}

/// Stored sign policy resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignPolicyObject {
    /// API version of the resource.
    #[serde(default)]
    pub api_version: String,
    /// Kind of the resource.
    #[serde(default)]
    pub kind: String,
    /// Object metadata.
    #[serde(default)]
    pub metadata: ObjectMeta,
    /// Policy content.
    #[serde(default)]
    pub spec: SignPolicy,
}

// ============================================================================
// SECTION: Verifier Plugins
// ============================================================================

/// Verifier plugin toggle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginConfig {
    /// Plugin name.
    pub name: String,
    /// Whether the plugin is active.
    #[serde(default)]
    pub enabled: bool,
}

// ============================================================================
// SECTION: Signature Records
// ============================================================================

/// One signature entry of a signature record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureData {
    /// API version of the signed object.
    #[serde(default)]
    pub api_version: String,
    /// Kind of the signed object.
    #[serde(default)]
    pub kind: String,
    /// Encoded signed message.
    #[serde(default)]
    pub message: String,
    /// Encoded signature.
    #[serde(default)]
    pub signature: String,
    /// Encoded signing certificate.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub certificate: String,
}

/// Signature record body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureSpec {
    /// Signature entries.
    #[serde(default)]
    pub data: Vec<SignatureData>,
}

/// Signature evidence resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureRecord {
    /// API version of the resource.
    #[serde(default)]
    pub api_version: String,
    /// Kind of the resource.
    #[serde(default)]
    pub kind: String,
    /// Object metadata.
    #[serde(default)]
    pub metadata: ObjectMeta,
    /// Signature entries.
    #[serde(default)]
    pub spec: SignatureSpec,
}

impl SignatureRecord {
    /// Returns the signing time label as unix seconds, or zero when absent.
    #[must_use]
    pub fn signed_at(&self) -> i64 {
        self.metadata
            .labels
            .get(SIGNATURE_LABEL_TIME)
            .and_then(|value| value.parse().ok())
            .unwrap_or_default()
    }
}

/// Label selector for signature records of one object type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SignatureSelector {
    /// API version of the signed object.
    pub api_version: String,
    /// Kind of the signed object.
    pub kind: String,
}

impl SignatureSelector {
    /// Returns true when the labels select a record for this object type.
    #[must_use]
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        labels.get(SIGNATURE_LABEL_API_VERSION).is_some_and(|value| *value == self.api_version)
            && labels.get(SIGNATURE_LABEL_KIND).is_some_and(|value| *value == self.kind)
    }

    /// Renders the selector as a label selector string.
    #[must_use]
    pub fn to_label_selector(&self) -> String {
        format!(
            "{SIGNATURE_LABEL_API_VERSION}={},{SIGNATURE_LABEL_KIND}={}",
            self.api_version, self.kind
        )
    }
}
