// crates/admission-shield-core/src/runtime/mod.rs
// ============================================================================
// Module: Admission Shield Runtime
// Description: Decision engine, rule table maintenance, and runtime helpers.
// Purpose: Decide admission requests against injected collaborators.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Runtime modules implement the per-request decision pipeline and the
//! bookkeeping around it: profile loading through shared caches, final
//! decision resolution, label patches, profile status, denial events, and
//! rule table read-modify-write. In-memory collaborators support tests and
//! local demos.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod audit;
pub mod cache;
pub mod decision;
pub mod engine;
pub mod events;
pub mod loader;
pub mod patch;
pub mod rule_update;
pub mod settings;
pub mod status;
pub mod store;
pub mod validation;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::ConsoleEventKind;
pub use audit::ConsoleLogEvent;
pub use audit::DecisionLogRecord;
pub use audit::DecisionLogSink;
pub use audit::FileDecisionLog;
pub use audit::InMemoryDecisionLog;
pub use audit::LogScope;
pub use audit::NoopDecisionLog;
pub use audit::StderrDecisionLog;
pub use cache::CacheKey;
pub use cache::CacheTtls;
pub use cache::CacheValue;
pub use cache::LoaderCaches;
pub use cache::LoaderKind;
pub use cache::TtlCache;
pub use decision::DecisionInputs;
pub use decision::ResourceClass;
pub use decision::resolve_decision;
pub use engine::Collaborators;
pub use engine::DRY_RUN_MESSAGE;
pub use engine::DecisionEngine;
pub use engine::Evaluation;
pub use engine::MUTATION_ABORT_REASON;
pub use engine::SIGNATURE_ABORT_REASON;
pub use engine::UNPROCESSED_MESSAGE;
pub use events::DenialEventRecorder;
pub use events::denial_event_name;
pub use loader::Loaded;
pub use loader::LoaderSources;
pub use loader::ProfileLoader;
pub use loader::build_rule_tables;
pub use patch::build_label_patch;
pub use rule_update::RuleTableError;
pub use rule_update::RuleTableMaintainer;
pub use rule_update::initialize_rule_tables;
pub use settings::DEFAULT_RULE_TABLE_MAX_ATTEMPTS;
pub use settings::EngineConfig;
pub use settings::ShieldMode;
pub use status::ProfileStatusTracker;
pub use status::format_status_timestamp;
pub use store::InMemoryEventStore;
pub use store::InMemoryProfileStore;
pub use store::InMemoryRuleTableStore;
pub use store::InMemorySignatureStore;
pub use store::ManualClock;
pub use store::SystemClock;
pub use validation::PolicyValidationError;
pub use validation::validate_policy_resource;
