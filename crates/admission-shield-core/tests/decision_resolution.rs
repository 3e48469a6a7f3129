// crates/admission-shield-core/tests/decision_resolution.rs
// ============================================================================
// Module: Decision Resolution Tests
// Description: Tests for final decision resolution and overrides.
// ============================================================================
//! ## Overview
//! Validates base decisions per resource class, detect-only and break-glass
//! overrides, and the forced unexpected reason code.

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

use admission_shield_core::Operation;
use admission_shield_core::ReasonCode;
use admission_shield_core::SIGNATURE_KIND;
use admission_shield_core::SIGNING_PROFILE_KIND;
use admission_shield_core::runtime::DecisionInputs;
use admission_shield_core::runtime::ResourceClass;
use admission_shield_core::runtime::resolve_decision;

fn inputs(class: ResourceClass, operation: Operation) -> DecisionInputs<'static> {
    DecisionInputs {
        class,
        operation,
        kind: "ConfigMap",
        privileged_requester: false,
        allowed: false,
        eval_reason: ReasonCode::NoSig,
        error_message: "no signature found",
        abort_reason: None,
        detect_only: false,
        break_glass: false,
    }
}

// ============================================================================
// SECTION: General Resources
// ============================================================================

#[test]
fn general_delete_is_skipped() {
    let decision = resolve_decision(&inputs(ResourceClass::General, Operation::Delete));
    assert!(decision.allow);
    assert!(decision.verified);
    assert_eq!(decision.reason_code, ReasonCode::SkipDelete);
}

#[test]
fn general_denial_carries_the_evaluation_message() {
    let decision = resolve_decision(&inputs(ResourceClass::General, Operation::Update));
    assert!(!decision.allow);
    assert!(!decision.verified);
    assert_eq!(decision.reason_code, ReasonCode::NoSig);
    assert_eq!(decision.message, "no signature found");
}

#[test]
fn general_allow_uses_the_reason_message() {
    let mut input = inputs(ResourceClass::General, Operation::Create);
    input.allowed = true;
    input.eval_reason = ReasonCode::ValidSig;
    let decision = resolve_decision(&input);
    assert!(decision.allow);
    assert!(decision.verified);
    assert_eq!(decision.message, ReasonCode::ValidSig.message());
}

#[test]
fn abort_denies_with_the_abort_reason() {
    let mut input = inputs(ResourceClass::General, Operation::Update);
    input.abort_reason = Some("Error when evaluating mutation");
    input.eval_reason = ReasonCode::InvalidSig;
    let decision = resolve_decision(&input);
    assert!(!decision.allow);
    assert_eq!(decision.reason_code, ReasonCode::Aborted);
    assert_eq!(decision.message, "Error when evaluating mutation");
}

// ============================================================================
// SECTION: Policy Resources
// ============================================================================

#[test]
fn policy_delete_is_blocked_for_ordinary_users() {
    let mut input = inputs(ResourceClass::Policy, Operation::Delete);
    input.kind = SIGNING_PROFILE_KIND;
    let decision = resolve_decision(&input);
    assert!(!decision.allow);
    assert!(decision.verified);
    assert_eq!(decision.reason_code, ReasonCode::BlockDelete);
}

#[test]
fn policy_delete_is_evaluated_for_signatures_and_administrators() {
    let mut input = inputs(ResourceClass::Policy, Operation::Delete);
    input.kind = SIGNATURE_KIND;
    input.allowed = true;
    input.eval_reason = ReasonCode::ValidSig;
    assert_eq!(resolve_decision(&input).reason_code, ReasonCode::ValidSig);

    let mut input = inputs(ResourceClass::Policy, Operation::Delete);
    input.kind = SIGNING_PROFILE_KIND;
    input.privileged_requester = true;
    input.allowed = true;
    input.eval_reason = ReasonCode::IeAdmin;
    let decision = resolve_decision(&input);
    assert!(decision.allow);
    assert_eq!(decision.reason_code, ReasonCode::IeAdmin);
}

#[test]
fn break_glass_does_not_apply_to_policy_resources() {
    let mut input = inputs(ResourceClass::Policy, Operation::Update);
    input.break_glass = true;
    let decision = resolve_decision(&input);
    assert!(!decision.allow);
    assert!(!decision.allow_by_break_glass_mode);
}

// ============================================================================
// SECTION: Overrides
// ============================================================================

#[test]
fn detect_only_converts_denials_to_allows() {
    let mut input = inputs(ResourceClass::Policy, Operation::Delete);
    input.kind = SIGNING_PROFILE_KIND;
    input.detect_only = true;
    input.break_glass = true;
    let decision = resolve_decision(&input);
    assert!(decision.allow);
    assert!(!decision.verified);
    assert!(decision.allow_by_detect_only_mode);
    assert!(!decision.allow_by_break_glass_mode);
    assert_eq!(decision.reason_code, ReasonCode::Detection);
}

#[test]
fn break_glass_converts_general_denials_to_allows() {
    let mut input = inputs(ResourceClass::General, Operation::Update);
    input.break_glass = true;
    let decision = resolve_decision(&input);
    assert!(decision.allow);
    assert!(decision.allow_by_break_glass_mode);
    assert_eq!(decision.reason_code, ReasonCode::BreakGlass);
    assert_eq!(decision.message, ReasonCode::BreakGlass.message());
}

#[test]
fn overrides_apply_after_an_abort() {
    let mut input = inputs(ResourceClass::General, Operation::Update);
    input.abort_reason = Some("Error when evaluating sign policy");
    input.break_glass = true;
    let decision = resolve_decision(&input);
    assert!(decision.allow);
    assert!(decision.allow_by_break_glass_mode);
}

#[test]
fn overrides_leave_allows_untouched() {
    let mut input = inputs(ResourceClass::General, Operation::Create);
    input.allowed = true;
    input.eval_reason = ReasonCode::NotProtected;
    input.detect_only = true;
    input.break_glass = true;
    let decision = resolve_decision(&input);
    assert_eq!(decision.reason_code, ReasonCode::NotProtected);
    assert!(!decision.allow_by_detect_only_mode);
    assert!(!decision.allow_by_break_glass_mode);
}

#[test]
fn unexpected_evaluation_reason_is_always_reported() {
    let mut input = inputs(ResourceClass::General, Operation::Update);
    input.eval_reason = ReasonCode::Unexpected;
    input.abort_reason = Some("Error when evaluating sign policy");
    let decision = resolve_decision(&input);
    assert!(!decision.allow);
    assert_eq!(decision.reason_code, ReasonCode::Unexpected);
    assert_eq!(decision.message, "Error when evaluating sign policy");

    input.detect_only = true;
    let decision = resolve_decision(&input);
    assert!(decision.allow);
    assert!(decision.allow_by_detect_only_mode);
    assert_eq!(decision.reason_code, ReasonCode::Unexpected);
}
