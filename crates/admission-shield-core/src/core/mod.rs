// crates/admission-shield-core/src/core/mod.rs
// ============================================================================
// Module: Admission Shield Core Types
// Description: Canonical request, rule, profile, and decision structures.
// Purpose: Provide stable, serializable types shared by the engine and its collaborators.
// Dependencies: globset, serde, serde_json
// ============================================================================

//! ## Overview
//! Admission Shield core types define admission requests and responses,
//! protection rules and rule tables, signing profiles, sign policies, and
//! evaluation results. Rule matching is pure and lives alongside the types
//! it evaluates.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod identifiers;
pub mod matcher;
pub mod policy;
pub mod profile;
pub mod request;
pub mod results;
pub mod rule;
pub mod rule_table;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use identifiers::CONFIG_MAP_KIND;
pub use identifiers::DEFAULT_POLICY_API_GROUP;
pub use identifiers::LABEL_VALUE_UNVERIFIED;
pub use identifiers::LABEL_VALUE_VERIFIED;
pub use identifiers::ProfileRef;
pub use identifiers::REASON_LABEL;
pub use identifiers::RESOURCE_INTEGRITY_LABEL;
pub use identifiers::SECRET_KIND;
pub use identifiers::SHIELD_CONFIG_KIND;
pub use identifiers::SHIELD_SERVER_NAME;
pub use identifiers::SIGN_POLICY_KIND;
pub use identifiers::SIGNATURE_KIND;
pub use identifiers::SIGNATURE_LABEL_API_VERSION;
pub use identifiers::SIGNATURE_LABEL_KIND;
pub use identifiers::SIGNATURE_LABEL_TIME;
pub use identifiers::SIGNING_PROFILE_KIND;
pub use matcher::MatchMode;
pub use matcher::RuleMatcher;
pub use matcher::field_equals;
pub use matcher::field_matches;
pub use matcher::validate_field_pattern;
pub use policy::BreakGlassCondition;
pub use policy::BreakGlassScope;
pub use policy::PluginConfig;
pub use policy::SignPolicy;
pub use policy::SignPolicyObject;
pub use policy::SignatureData;
pub use policy::SignatureRecord;
pub use policy::SignatureSelector;
pub use policy::SignatureSpec;
pub use policy::SignerDefinition;
pub use policy::SignerPolicy;
pub use profile::MAX_LATEST_EVENTS;
pub use profile::NamespaceSelector;
pub use profile::ObjectMeta;
pub use profile::ProfileMatch;
pub use profile::ProfileRuleSets;
pub use profile::ProfileStatus;
pub use profile::ProfileStatusDetail;
pub use profile::ProfileStatusSummary;
pub use profile::ProtectionProfile;
pub use profile::SigningProfile;
pub use profile::SigningProfileSpec;
pub use profile::StatusResult;
pub use request::AdmissionRequest;
pub use request::AdmissionResponse;
pub use request::Operation;
pub use request::PatchOp;
pub use request::PatchOperation;
pub use request::RequestContext;
pub use request::RequestFields;
pub use request::RequestSnapshot;
pub use request::ResourceScope;
pub use request::UserInfo;
pub use results::CheckError;
pub use results::DecisionResult;
pub use results::MutationEvalResult;
pub use results::ReasonCode;
pub use results::SignatureEvalResult;
pub use results::SignatureFailure;
pub use results::SignatureFailureKind;
pub use results::Signer;
pub use rule::AttrsPattern;
pub use rule::FieldPattern;
pub use rule::KustomizePattern;
pub use rule::RequestPattern;
pub use rule::Rule;
pub use rule_table::RuleTable;
pub use rule_table::RuleTableEntry;
pub use rule_table::RuleTableKind;
pub use rule_table::RuleTableSet;
pub use rule_table::TableMatch;
