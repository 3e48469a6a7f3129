// crates/admission-shield-core/src/runtime/decision.rs
// ============================================================================
// Module: Final Decision Resolution
// Description: Pure state machine turning pipeline outcomes into a decision.
// Purpose: Apply delete handling, aborts, evaluation results, and overrides.
// Dependencies: crate::core::{identifiers, request, results}
// ============================================================================

//! ## Overview
//! Resolution runs in three steps:
//! 1. A base decision from delete handling, abort state, and the evaluated
//!    allow flag. General and policy resources differ only here.
//! 2. Overrides: detect-only converts any denial into an allow; break-glass
//!    does the same for general resources only. Overrides apply after aborts
//!    and blocked deletes too.
//! 3. When the evaluated reason was `UNEXPECTED`, the reason code alone is
//!    forced back to `UNEXPECTED`; allow, verified, and message are kept.
//!
//! Security posture: an active override also admits requests whose
//! evaluation aborted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::identifiers::SIGNATURE_KIND;
use crate::core::request::Operation;
use crate::core::results::DecisionResult;
use crate::core::results::ReasonCode;

// ============================================================================
// SECTION: Inputs
// ============================================================================

/// Class of the requested resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceClass {
    /// Any resource other than the shield's own policy resources.
    General,
    /// One of the shield's own policy resources.
    Policy,
}

/// Pipeline outcome handed to resolution.
#[derive(Debug, Clone, Copy)]
pub struct DecisionInputs<'a> {
    /// Resource class.
    pub class: ResourceClass,
    /// Requested operation.
    pub operation: Operation,
    /// Requested kind.
    pub kind: &'a str,
    /// Requester is a shield administrator or the shield server.
    pub privileged_requester: bool,
    /// Pipeline allow flag.
    pub allowed: bool,
    /// Reason carried out of the pipeline.
    pub eval_reason: ReasonCode,
    /// Error text carried out of the pipeline.
    pub error_message: &'a str,
    /// Abort reason when evaluation aborted.
    pub abort_reason: Option<&'a str>,
    /// Detect-only mode is active.
    pub detect_only: bool,
    /// Break-glass is active for the request.
    pub break_glass: bool,
}

// ============================================================================
// SECTION: Resolution
// ============================================================================

/// Resolves the final decision.
#[must_use]
pub fn resolve_decision(inputs: &DecisionInputs<'_>) -> DecisionResult {
    let mut decision = match inputs.class {
        ResourceClass::General => base_general(inputs),
        ResourceClass::Policy => base_policy(inputs),
    };

    if !decision.allow && inputs.detect_only {
        decision = DecisionResult {
            allow: true,
            verified: false,
            reason_code: ReasonCode::Detection,
            message: ReasonCode::Detection.message().to_string(),
            allow_by_detect_only_mode: true,
            allow_by_break_glass_mode: false,
        };
    } else if !decision.allow && inputs.break_glass && inputs.class == ResourceClass::General {
        decision = DecisionResult {
            allow: true,
            verified: false,
            reason_code: ReasonCode::BreakGlass,
            message: ReasonCode::BreakGlass.message().to_string(),
            allow_by_detect_only_mode: false,
            allow_by_break_glass_mode: true,
        };
    }

    if inputs.eval_reason == ReasonCode::Unexpected {
        decision.reason_code = ReasonCode::Unexpected;
    }
    decision
}

/// Base decision for general resources.
fn base_general(inputs: &DecisionInputs<'_>) -> DecisionResult {
    if inputs.operation == Operation::Delete {
        return verdict(true, true, ReasonCode::SkipDelete, ReasonCode::SkipDelete.message());
    }
    if let Some(reason) = inputs.abort_reason {
        return verdict(false, false, ReasonCode::Aborted, reason);
    }
    evaluated(inputs)
}

/// Base decision for policy resources.
fn base_policy(inputs: &DecisionInputs<'_>) -> DecisionResult {
    if let Some(reason) = inputs.abort_reason {
        return verdict(false, false, ReasonCode::Aborted, reason);
    }
    if inputs.operation == Operation::Delete
        && inputs.kind != SIGNATURE_KIND
        && !inputs.privileged_requester
    {
        return verdict(false, true, ReasonCode::BlockDelete, ReasonCode::BlockDelete.message());
    }
    evaluated(inputs)
}

/// Decision taken from the evaluated allow flag and reason.
fn evaluated(inputs: &DecisionInputs<'_>) -> DecisionResult {
    if inputs.allowed {
        verdict(true, true, inputs.eval_reason, inputs.eval_reason.message())
    } else {
        verdict(false, false, inputs.eval_reason, inputs.error_message)
    }
}

/// Builds a decision without override flags.
fn verdict(allow: bool, verified: bool, reason_code: ReasonCode, message: &str) -> DecisionResult {
    DecisionResult {
        allow,
        verified,
        reason_code,
        message: message.to_string(),
        allow_by_detect_only_mode: false,
        allow_by_break_glass_mode: false,
    }
}
