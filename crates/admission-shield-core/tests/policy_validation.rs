// crates/admission-shield-core/tests/policy_validation.rs
// ============================================================================
// Module: Policy Resource Validation Tests
// Description: Tests for structural checks on policy resource objects.
// ============================================================================
//! ## Overview
//! Validates that malformed policy objects are rejected before evaluation.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use admission_shield_core::AdmissionRequest;
use admission_shield_core::Operation;
use admission_shield_core::RequestContext;
use admission_shield_core::ResourceScope;
use admission_shield_core::SIGNATURE_KIND;
use admission_shield_core::SIGNATURE_LABEL_API_VERSION;
use admission_shield_core::SIGNATURE_LABEL_KIND;
use admission_shield_core::SIGNATURE_LABEL_TIME;
use admission_shield_core::SIGNING_PROFILE_KIND;
use admission_shield_core::UserInfo;
use admission_shield_core::runtime::PolicyValidationError;
use admission_shield_core::runtime::validate_policy_resource;
use serde_json::Value;
use serde_json::json;

const SHIELD_NS: &str = "shield-system";

fn request(kind: &str, namespace: &str, operation: Operation, object: &[u8]) -> RequestContext {
    RequestContext::new(AdmissionRequest {
        uid: "uid".to_string(),
        api_group: "apis.admission-shield.io".to_string(),
        api_version: "v1alpha1".to_string(),
        kind: kind.to_string(),
        namespace: namespace.to_string(),
        name: "obj".to_string(),
        operation,
        user_info: UserInfo::default(),
        resource_scope: ResourceScope::Namespaced,
        dry_run: false,
        object: object.to_vec(),
    })
}

fn bytes(value: &Value) -> Vec<u8> {
    serde_json::to_vec(value).unwrap()
}

#[test]
fn namespace_selector_is_allowed_only_in_shield_namespace() {
    let profile = bytes(&json!({
        "metadata": { "name": "obj" },
        "spec": { "targetNamespaceSelector": { "include": ["team-*"] } }
    }));
    let ctx = request(SIGNING_PROFILE_KIND, SHIELD_NS, Operation::Create, &profile);
    assert_eq!(validate_policy_resource(&ctx, SHIELD_NS), Ok(()));

    let ctx = request(SIGNING_PROFILE_KIND, "team-a", Operation::Create, &profile);
    let err = validate_policy_resource(&ctx, SHIELD_NS).unwrap_err();
    assert_eq!(err, PolicyValidationError::TargetSelectorOutsideShield(SHIELD_NS.to_string()));
    assert!(err.to_string().contains("targetNamespaceSelector is allowed only"));
}

#[test]
fn signature_records_hold_one_entry_and_required_labels() {
    let labels = json!({
        SIGNATURE_LABEL_API_VERSION: "v1",
        SIGNATURE_LABEL_KIND: "ConfigMap",
        SIGNATURE_LABEL_TIME: "1700000000",
    });
    let valid = bytes(&json!({
        "metadata": { "name": "obj", "labels": labels },
        "spec": { "data": [ { "message": "m", "signature": "s" } ] }
    }));
    let ctx = request(SIGNATURE_KIND, "team-a", Operation::Create, &valid);
    assert_eq!(validate_policy_resource(&ctx, SHIELD_NS), Ok(()));

    let doubled = bytes(&json!({
        "metadata": { "name": "obj", "labels": labels },
        "spec": { "data": [ { "message": "a" }, { "message": "b" } ] }
    }));
    let ctx = request(SIGNATURE_KIND, "team-a", Operation::Create, &doubled);
    assert_eq!(validate_policy_resource(&ctx, SHIELD_NS), Err(PolicyValidationError::TooManySignatures));

    let empty = bytes(&json!({
        "metadata": { "name": "obj", "labels": labels },
        "spec": { "data": [] }
    }));
    let ctx = request(SIGNATURE_KIND, "team-a", Operation::Create, &empty);
    assert_eq!(validate_policy_resource(&ctx, SHIELD_NS), Ok(()));

    let unlabelled = bytes(&json!({
        "metadata": { "name": "obj", "labels": { SIGNATURE_LABEL_KIND: "ConfigMap" } },
        "spec": { "data": [] }
    }));
    let ctx = request(SIGNATURE_KIND, "team-a", Operation::Create, &unlabelled);
    let err = validate_policy_resource(&ctx, SHIELD_NS).unwrap_err();
    assert_eq!(
        err.to_string(),
        format!(
            "Validation error; Required label \"{SIGNATURE_LABEL_API_VERSION}\", \"{SIGNATURE_LABEL_TIME}\" is missing."
        )
    );
}

#[test]
fn unparsable_objects_are_rejected() {
    let ctx = request(SIGNING_PROFILE_KIND, SHIELD_NS, Operation::Update, b"{not json");
    assert!(matches!(validate_policy_resource(&ctx, SHIELD_NS), Err(PolicyValidationError::Parse(_))));
}

#[test]
fn deletes_and_unknown_kinds_are_not_validated() {
    let ctx = request(SIGNING_PROFILE_KIND, SHIELD_NS, Operation::Delete, b"");
    assert_eq!(validate_policy_resource(&ctx, SHIELD_NS), Ok(()));

    let ctx = request("ConfigMap", SHIELD_NS, Operation::Update, b"{not json");
    assert_eq!(validate_policy_resource(&ctx, SHIELD_NS), Ok(()));
}
