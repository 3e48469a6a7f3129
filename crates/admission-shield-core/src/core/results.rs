// crates/admission-shield-core/src/core/results.rs
// ============================================================================
// Module: Evaluation Results
// Description: Reason codes, evaluator results, and the final decision record.
// Purpose: Give every decision outcome a stable code, message, and structure.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! [`ReasonCode`] is the closed set of decision outcomes; each maps to a
//! stable short code (used in labels and events) and a human message (used
//! in admission responses). Evaluator results carry structured failures so
//! the engine never classifies errors by parsing message text.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Reason Codes
// ============================================================================

/// Closed set of decision outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    /// No stage determined an outcome.
    #[default]
    Unexpected,
    /// Requester is a shield administrator or the shield itself.
    IeAdmin,
    /// Request matched an ignore rule.
    IgnoredSa,
    /// Request is not protected by any profile.
    NotProtected,
    /// Signature verified.
    ValidSig,
    /// Signature present but invalid.
    InvalidSig,
    /// No signer policy applies.
    NoPolicy,
    /// No signature present.
    NoSig,
    /// Update does not change the object.
    NoMutation,
    /// Verifier reported another error.
    Error,
    /// Delete requests are not checked.
    SkipDelete,
    /// Evaluation aborted on an internal failure.
    Aborted,
    /// Deletion of a policy resource is blocked.
    BlockDelete,
    /// Denial converted to allow by detect-only mode.
    Detection,
    /// Denial converted to allow by break-glass.
    BreakGlass,
}

impl ReasonCode {
    /// Returns the stable short code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Unexpected => "unexpected",
            Self::IeAdmin => "shield-admin",
            Self::IgnoredSa => "ignored-sa",
            Self::NotProtected => "no-protect",
            Self::ValidSig => "valid-sig",
            Self::InvalidSig => "invalid-signature",
            Self::NoPolicy => "no-signer-policy",
            Self::NoSig => "no-signature",
            Self::NoMutation => "no-mutation",
            Self::Error => "error",
            Self::SkipDelete => "skip-delete",
            Self::Aborted => "aborted",
            Self::BlockDelete => "block-delete",
            Self::Detection => "detection",
            Self::BreakGlass => "break-glass",
        }
    }

    /// Returns the human-readable message.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Unexpected => "unexpected",
            Self::IeAdmin => "allowed by shield admin",
            Self::IgnoredSa => "allowed by ignore rule",
            Self::NotProtected => "not protected",
            Self::ValidSig => "allowed by valid signer's signature",
            Self::InvalidSig => "Signature verification is required for this request, but failed to verify signature.",
            Self::NoPolicy => "Signature verification is required for this request, but no signer policy is defined.",
            Self::NoSig => "Signature verification is required for this request, but no signature is found.",
            Self::NoMutation => "allowed because no mutation found",
            Self::Error => "Error during signature verification",
            Self::SkipDelete => "skip delete request",
            Self::Aborted => "aborted",
            Self::BlockDelete => "deletion of this resource is blocked",
            Self::Detection => "allowed by detect-only mode",
            Self::BreakGlass => "allowed by break-glass mode",
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// ============================================================================
// SECTION: Signature Evaluation
// ============================================================================

/// Structured class of a signature verification failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureFailureKind {
    /// A signature exists but does not verify.
    InvalidSignature,
    /// No signer policy covers the request.
    NoPolicy,
    /// No signature evidence exists.
    NoSignature,
    /// Any other verifier failure.
    Other,
}

impl SignatureFailureKind {
    /// Returns the reason code reported for the failure.
    #[must_use]
    pub const fn reason(self) -> ReasonCode {
        match self {
            Self::InvalidSignature => ReasonCode::InvalidSig,
            Self::NoPolicy => ReasonCode::NoPolicy,
            Self::NoSignature => ReasonCode::NoSig,
            Self::Other => ReasonCode::Error,
        }
    }
}

/// Failure reported by the signature verifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureFailure {
    /// Failure class.
    pub kind: SignatureFailureKind,
    /// Failure message.
    pub message: String,
    /// Optional detail appended to the message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl SignatureFailure {
    /// Creates a failure with the class's default message.
    #[must_use]
    pub fn new(kind: SignatureFailureKind) -> Self {
        Self {
            kind,
            message: kind.reason().message().to_string(),
            detail: None,
        }
    }

    /// Attaches detail text.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Renders the message reported to the requester.
    #[must_use]
    pub fn render(&self) -> String {
        match &self.detail {
            Some(detail) => format!("{} ({detail})", self.message),
            None => self.message.clone(),
        }
    }
}

/// Identity of a verified signer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signer {
    /// Signer email.
    #[serde(default)]
    pub email: String,
    /// Signer common name.
    #[serde(default)]
    pub name: String,
    /// Signer comment.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub comment: String,
}

/// Result of one signature evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureEvalResult {
    /// Verification was performed.
    pub checked: bool,
    /// Signature was accepted.
    pub allow: bool,
    /// Verified signer, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signer: Option<Signer>,
    /// Structured failure, when verification failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<SignatureFailure>,
}

impl SignatureEvalResult {
    /// Returns an accepted result.
    #[must_use]
    pub const fn allowed(signer: Option<Signer>) -> Self {
        Self {
            checked: true,
            allow: true,
            signer,
            error: None,
        }
    }

    /// Returns a rejected result with a failure.
    #[must_use]
    pub const fn denied(error: SignatureFailure) -> Self {
        Self {
            checked: true,
            allow: false,
            signer: None,
            error: Some(error),
        }
    }
}

// ============================================================================
// SECTION: Mutation Evaluation
// ============================================================================

/// Failure reported by the mutation checker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckError {
    /// Failure message.
    pub message: String,
    /// Failure reason.
    #[serde(default)]
    pub reason: String,
}

/// Result of one mutation evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationEvalResult {
    /// Comparison was performed.
    pub checked: bool,
    /// Object differs from its trusted baseline.
    pub is_mutated: bool,
    /// Rendered difference.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub diff: String,
    /// Difference remaining after ignore attributes were filtered.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub filtered: String,
    /// Failure, when comparison failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<CheckError>,
}

impl MutationEvalResult {
    /// Returns a checked result.
    #[must_use]
    pub const fn checked(is_mutated: bool) -> Self {
        Self {
            checked: true,
            is_mutated,
            diff: String::new(),
            filtered: String::new(),
            error: None,
        }
    }
}

// ============================================================================
// SECTION: Decision Result
// ============================================================================

/// Final decision of one request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionResult {
    /// Mutation is admitted.
    pub allow: bool,
    /// Decision was reached by verification rather than override or skip.
    pub verified: bool,
    /// Outcome code.
    pub reason_code: ReasonCode,
    /// Response message.
    pub message: String,
    /// Allow was produced by detect-only mode.
    pub allow_by_detect_only_mode: bool,
    /// Allow was produced by break-glass.
    pub allow_by_break_glass_mode: bool,
}
