// crates/admission-shield-core/src/core/identifiers.rs
// ============================================================================
// Module: Admission Shield Identifiers
// Description: Profile references and well-known resource names.
// Purpose: Provide stable, serializable pointers to policy bundles.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Profile references point at policy bundles by identity instead of embedding
//! their content, which keeps rule tables small and bundle lookups lazy. This
//! module also holds the well-known kinds, labels, and object names shared by
//! the engine and its collaborators.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Well-Known Names
// ============================================================================

/// Default API group of the shield's own policy resources.
pub const DEFAULT_POLICY_API_GROUP: &str = "apis.admission-shield.io";
/// Kind of signing profile resources.
pub const SIGNING_PROFILE_KIND: &str = "ResourceSigningProfile";
/// Kind of signature record resources.
pub const SIGNATURE_KIND: &str = "ResourceSignature";
/// Kind of sign policy resources.
pub const SIGN_POLICY_KIND: &str = "SignPolicy";
/// Kind of shield configuration resources.
pub const SHIELD_CONFIG_KIND: &str = "ShieldConfig";
/// Kind used for persisted rule table documents.
pub const CONFIG_MAP_KIND: &str = "ConfigMap";
/// Kind of secrets; request dumps are never logged for this kind.
pub const SECRET_KIND: &str = "Secret";

/// Label recording the verification state of an admitted object.
pub const RESOURCE_INTEGRITY_LABEL: &str = "admission-shield.io/resource-integrity";
/// Label recording the reason code of an admitted object.
pub const REASON_LABEL: &str = "admission-shield.io/reason";
/// Label value for objects admitted with a valid signature.
pub const LABEL_VALUE_VERIFIED: &str = "verified";
/// Label value for objects admitted without verification.
pub const LABEL_VALUE_UNVERIFIED: &str = "unverified";

/// Signature record label holding the signed object's api version.
pub const SIGNATURE_LABEL_API_VERSION: &str = "admission-shield.io/sigobject-apiversion";
/// Signature record label holding the signed object's kind.
pub const SIGNATURE_LABEL_KIND: &str = "admission-shield.io/sigobject-kind";
/// Signature record label holding the signing time (unix seconds).
pub const SIGNATURE_LABEL_TIME: &str = "admission-shield.io/sigtime";

/// Name of the shield server deployment, used for cluster-scope events.
pub const SHIELD_SERVER_NAME: &str = "shield-server";

// ============================================================================
// SECTION: Profile Reference
// ============================================================================

/// Pointer to a protection profile object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRef {
    /// API version (`group/version`) of the profile object.
    #[serde(default)]
    pub api_version: String,
    /// Kind of the profile object.
    #[serde(default)]
    pub kind: String,
    /// Namespace of the profile object.
    #[serde(default)]
    pub namespace: String,
    /// Name of the profile object.
    #[serde(default)]
    pub name: String,
}

impl ProfileRef {
    /// Creates a new profile reference.
    #[must_use]
    pub fn new(
        api_version: impl Into<String>,
        kind: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            api_version: api_version.into(),
            kind: kind.into(),
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Returns true when the reference does not name any object.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }
}

impl fmt::Display for ProfileRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.kind, self.namespace, self.name)
    }
}
