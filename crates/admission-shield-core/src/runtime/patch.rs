// crates/admission-shield-core/src/runtime/patch.rs
// ============================================================================
// Module: Label Patch Builder
// Description: JSON patch marking admitted objects with their verification state.
// Purpose: Label admitted objects as verified or unverified with the reason code.
// Dependencies: serde_json, crate::core
// ============================================================================

//! ## Overview
//! Admitted objects are labelled with the integrity state and reason code:
//! - not verified (override, skip): `unverified` plus the reason code.
//! - verified with an accepting signature: `verified` plus the reason code.
//! - verified otherwise: both labels are removed when present.
//!
//! Denied and delete requests never receive a patch.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Map;
use serde_json::Value;

use crate::core::identifiers::LABEL_VALUE_UNVERIFIED;
use crate::core::identifiers::LABEL_VALUE_VERIFIED;
use crate::core::identifiers::REASON_LABEL;
use crate::core::identifiers::RESOURCE_INTEGRITY_LABEL;
use crate::core::request::PatchOp;
use crate::core::request::PatchOperation;
use crate::core::request::RequestContext;
use crate::core::results::DecisionResult;

// ============================================================================
// SECTION: Patch Builder
// ============================================================================

/// Builds the label patch for a decision.
///
/// `signature_allowed` is the allow flag of the decisive signature result;
/// requests that never reached signature evaluation pass `false`.
#[must_use]
pub fn build_label_patch(
    request: &RequestContext,
    decision: &DecisionResult,
    signature_allowed: bool,
) -> Option<Vec<PatchOperation>> {
    if !decision.allow || request.is_delete() {
        return None;
    }
    let state = if !decision.verified {
        Some(LABEL_VALUE_UNVERIFIED)
    } else if signature_allowed {
        Some(LABEL_VALUE_VERIFIED)
    } else {
        None
    };

    let operations = match state {
        Some(state) => {
            let labels = [(RESOURCE_INTEGRITY_LABEL, state), (REASON_LABEL, decision.reason_code.code())];
            set_labels(request, &labels)
        }
        None => remove_labels(request, &[RESOURCE_INTEGRITY_LABEL, REASON_LABEL]),
    };
    (!operations.is_empty()).then_some(operations)
}

/// Adds labels, creating the label map when the object has none.
fn set_labels(request: &RequestContext, labels: &[(&str, &str)]) -> Vec<PatchOperation> {
    if request.has_label_map() {
        labels
            .iter()
            .map(|(key, value)| PatchOperation {
                op: PatchOp::Add,
                path: label_path(key),
                value: Some(Value::String((*value).to_string())),
            })
            .collect()
    } else {
        let map: Map<String, Value> = labels
            .iter()
            .map(|(key, value)| ((*key).to_string(), Value::String((*value).to_string())))
            .collect();
        vec![PatchOperation {
            op: PatchOp::Add,
            path: "/metadata/labels".to_string(),
            value: Some(Value::Object(map)),
        }]
    }
}

/// Removes the labels that are present on the object.
fn remove_labels(request: &RequestContext, keys: &[&str]) -> Vec<PatchOperation> {
    keys.iter()
        .filter(|key| request.labels().contains_key(**key))
        .map(|key| PatchOperation {
            op: PatchOp::Remove,
            path: label_path(key),
            value: None,
        })
        .collect()
}

/// Returns the JSON pointer of a label.
fn label_path(key: &str) -> String {
    format!("/metadata/labels/{}", key.replace('~', "~0").replace('/', "~1"))
}
