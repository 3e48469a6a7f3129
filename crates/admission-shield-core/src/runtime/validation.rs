// crates/admission-shield-core/src/runtime/validation.rs
// ============================================================================
// Module: Policy Resource Validation
// Description: Structural checks for the shield's own policy resources.
// Purpose: Reject malformed policy objects before any evaluation runs.
// Dependencies: serde_json, thiserror, crate::core
// ============================================================================

//! ## Overview
//! Policy resources are validated before the pipeline runs. A failure
//! denies the request immediately with the validation message. Delete
//! requests carry no object and are never validated.
//!
//! Security posture: policy objects are untrusted input; validation fails
//! closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;
use thiserror::Error;

use crate::core::identifiers::SHIELD_CONFIG_KIND;
use crate::core::identifiers::SIGN_POLICY_KIND;
use crate::core::identifiers::SIGNATURE_KIND;
use crate::core::identifiers::SIGNATURE_LABEL_API_VERSION;
use crate::core::identifiers::SIGNATURE_LABEL_KIND;
use crate::core::identifiers::SIGNATURE_LABEL_TIME;
use crate::core::identifiers::SIGNING_PROFILE_KIND;
use crate::core::policy::SignPolicyObject;
use crate::core::policy::SignatureRecord;
use crate::core::profile::SigningProfile;
use crate::core::request::RequestContext;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Policy resource validation failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyValidationError {
    /// Object body does not parse as its kind.
    #[error("Validation error; {0}")]
    Parse(String),
    /// Namespace selector used outside the shield namespace.
    #[error(
        "Validation error; {kind}.spec.targetNamespaceSelector is allowed only for {kind} in {0}.",
        kind = SIGNING_PROFILE_KIND
    )]
    TargetSelectorOutsideShield(String),
    /// More than one signature entry in a record.
    #[error("Validation error; Only 1 signature data can be defined in 1 {kind}.", kind = SIGNATURE_KIND)]
    TooManySignatures,
    /// Required signature labels are missing.
    #[error("Validation error; Required label {0} is missing.")]
    MissingLabels(String),
}

// ============================================================================
// SECTION: Validation
// ============================================================================

/// Validates a policy resource request.
///
/// # Errors
///
/// Returns [`PolicyValidationError`] when the object is malformed.
pub fn validate_policy_resource(
    request: &RequestContext,
    shield_namespace: &str,
) -> Result<(), PolicyValidationError> {
    if request.is_delete() {
        return Ok(());
    }
    match request.kind.as_str() {
        SIGNING_PROFILE_KIND => {
            let profile: SigningProfile = parse(&request.raw_object)?;
            if request.namespace != shield_namespace
                && profile.spec.target_namespace_selector.is_some()
            {
                return Err(PolicyValidationError::TargetSelectorOutsideShield(
                    shield_namespace.to_string(),
                ));
            }
            Ok(())
        }
        SIGNATURE_KIND => {
            let record: SignatureRecord = parse(&request.raw_object)?;
            if record.spec.data.len() > 1 {
                return Err(PolicyValidationError::TooManySignatures);
            }
            let missing: Vec<String> =
                [SIGNATURE_LABEL_API_VERSION, SIGNATURE_LABEL_KIND, SIGNATURE_LABEL_TIME]
                    .into_iter()
                    .filter(|label| !record.metadata.labels.contains_key(*label))
                    .map(|label| format!("\"{label}\""))
                    .collect();
            if missing.is_empty() {
                Ok(())
            } else {
                Err(PolicyValidationError::MissingLabels(missing.join(", ")))
            }
        }
        SIGN_POLICY_KIND => parse::<SignPolicyObject>(&request.raw_object).map(|_| ()),
        SHIELD_CONFIG_KIND => parse::<serde_json::Map<String, Value>>(&request.raw_object).map(|_| ()),
        _ => Ok(()),
    }
}

/// Parses an object body.
fn parse<T: serde::de::DeserializeOwned>(raw: &[u8]) -> Result<T, PolicyValidationError> {
    serde_json::from_slice(raw).map_err(|err| PolicyValidationError::Parse(err.to_string()))
}
