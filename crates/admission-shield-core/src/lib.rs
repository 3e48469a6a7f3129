// crates/admission-shield-core/src/lib.rs
// ============================================================================
// Module: Admission Shield Core Library
// Description: Public API surface for the Admission Shield decision engine.
// Purpose: Expose core types, collaborator interfaces, and runtime helpers.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Admission Shield core decides whether a mutation of a managed resource is
//! admitted, based on declarative protection rules, signature verification,
//! and mutation analysis, with break-glass and detect-only overrides. It is
//! backend-agnostic: signature verification, mutation analysis, and object
//! persistence are reached through explicit interfaces.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::AuditEvent;
pub use interfaces::Clock;
pub use interfaces::EvaluatorError;
pub use interfaces::EventStore;
pub use interfaces::InvolvedObject;
pub use interfaces::MutationChecker;
pub use interfaces::ProfileSource;
pub use interfaces::RuleTableStore;
pub use interfaces::SignatureSource;
pub use interfaces::SignatureVerifier;
pub use interfaces::StoreError;
pub use interfaces::SwapOutcome;
pub use interfaces::TableVersion;
pub use interfaces::VersionedTable;
pub use runtime::Collaborators;
pub use runtime::DecisionEngine;
pub use runtime::DecisionLogSink;
pub use runtime::EngineConfig;
pub use runtime::Evaluation;
pub use runtime::InMemoryDecisionLog;
pub use runtime::InMemoryEventStore;
pub use runtime::InMemoryProfileStore;
pub use runtime::InMemoryRuleTableStore;
pub use runtime::InMemorySignatureStore;
pub use runtime::LoaderCaches;
pub use runtime::ManualClock;
pub use runtime::ProfileStatusTracker;
pub use runtime::RuleTableError;
pub use runtime::ShieldMode;
pub use runtime::SystemClock;
