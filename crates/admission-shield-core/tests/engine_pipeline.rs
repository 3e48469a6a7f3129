// crates/admission-shield-core/tests/engine_pipeline.rs
// ============================================================================
// Module: Decision Engine Pipeline Tests
// Description: End-to-end tests of the decision engine over in-memory stores.
// ============================================================================
//! ## Overview
//! Drives full requests through the engine with scripted verifiers and
//! in-memory collaborators, checking decisions, patches, status updates,
//! denial events, rule table rewrites, and decision logs.

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

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;
use std::time::Duration;

use admission_shield_core::AdmissionRequest;
use admission_shield_core::BreakGlassCondition;
use admission_shield_core::BreakGlassScope;
use admission_shield_core::Collaborators;
use admission_shield_core::DecisionEngine;
use admission_shield_core::EngineConfig;
use admission_shield_core::EvaluatorError;
use admission_shield_core::EventStore;
use admission_shield_core::Evaluation;
use admission_shield_core::FieldPattern;
use admission_shield_core::InMemoryDecisionLog;
use admission_shield_core::InMemoryEventStore;
use admission_shield_core::InMemoryProfileStore;
use admission_shield_core::InMemoryRuleTableStore;
use admission_shield_core::InMemorySignatureStore;
use admission_shield_core::LoaderCaches;
use admission_shield_core::ManualClock;
use admission_shield_core::MutationChecker;
use admission_shield_core::MutationEvalResult;
use admission_shield_core::Operation;
use admission_shield_core::PatchOp;
use admission_shield_core::PluginConfig;
use admission_shield_core::ProfileRef;
use admission_shield_core::ProfileSource;
use admission_shield_core::ProfileStatus;
use admission_shield_core::ProtectionProfile;
use admission_shield_core::ReasonCode;
use admission_shield_core::RequestContext;
use admission_shield_core::RequestPattern;
use admission_shield_core::ResourceScope;
use admission_shield_core::Rule;
use admission_shield_core::RuleTable;
use admission_shield_core::RuleTableKind;
use admission_shield_core::RuleTableStore;
use admission_shield_core::ShieldMode;
use admission_shield_core::SignPolicy;
use admission_shield_core::SignatureEvalResult;
use admission_shield_core::SignatureFailure;
use admission_shield_core::SignatureFailureKind;
use admission_shield_core::SignatureRecord;
use admission_shield_core::SignatureVerifier;
use admission_shield_core::SigningProfile;
use admission_shield_core::SigningProfileSpec;
use admission_shield_core::StoreError;
use admission_shield_core::SwapOutcome;
use admission_shield_core::TableVersion;
use admission_shield_core::UserInfo;
use admission_shield_core::VersionedTable;
use admission_shield_core::runtime::CacheTtls;
use admission_shield_core::runtime::ConsoleEventKind;
use admission_shield_core::runtime::DRY_RUN_MESSAGE;
use admission_shield_core::runtime::SIGNATURE_ABORT_REASON;
use admission_shield_core::runtime::UNPROCESSED_MESSAGE;
use serde_json::Value;
use serde_json::json;
use time::macros::datetime;

const SHIELD_NS: &str = "shield-system";
const SECURE_NS: &str = "secure-ns";
const POLICY_GROUP: &str = "apis.admission-shield.io";

// ============================================================================
// SECTION: Scripted Collaborators
// ============================================================================

/// Scripted outcome of one signature evaluation.
#[derive(Clone, Copy)]
enum Verdict {
    Allow,
    Deny(SignatureFailureKind),
    Fail,
}

/// Verifier answering per profile name; unknown profiles have no signature.
#[derive(Default)]
struct ScriptedVerifier {
    verdicts: BTreeMap<String, Verdict>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedVerifier {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl SignatureVerifier for ScriptedVerifier {
    fn evaluate(
        &self,
        _request: &RequestContext,
        _signatures: &[SignatureRecord],
        profile: &dyn ProtectionProfile,
        _policy: &SignPolicy,
        _plugins: &[PluginConfig],
    ) -> Result<SignatureEvalResult, EvaluatorError> {
        let name = profile.reference().name;
        self.calls.lock().unwrap().push(name.clone());
        match self.verdicts.get(&name).copied() {
            Some(Verdict::Allow) => Ok(SignatureEvalResult::allowed(None)),
            Some(Verdict::Deny(kind)) => Ok(SignatureEvalResult::denied(SignatureFailure::new(kind))),
            Some(Verdict::Fail) => Err(EvaluatorError::Evaluation("verifier offline".to_string())),
            None => Ok(SignatureEvalResult::denied(SignatureFailure::new(SignatureFailureKind::NoSignature))),
        }
    }
}

/// Mutation checker reporting a fixed result for every profile.
struct ScriptedMutation {
    mutated: bool,
}

impl MutationChecker for ScriptedMutation {
    fn evaluate(
        &self,
        _request: &RequestContext,
        _profile: &dyn ProtectionProfile,
    ) -> Result<MutationEvalResult, EvaluatorError> {
        Ok(MutationEvalResult::checked(self.mutated))
    }
}

/// Rule table store whose reads always fail.
struct BrokenRuleTables;

impl RuleTableStore for BrokenRuleTables {
    fn read(&self, _kind: RuleTableKind) -> Result<Option<VersionedTable>, StoreError> {
        Err(StoreError::Io("connection refused".to_string()))
    }

    fn compare_and_swap(
        &self,
        _kind: RuleTableKind,
        _expected: Option<TableVersion>,
        _table: &RuleTable,
    ) -> Result<SwapOutcome, StoreError> {
        Err(StoreError::Io("connection refused".to_string()))
    }
}

/// Profile store counting namespace listings.
struct CountingProfiles {
    inner: InMemoryProfileStore<SigningProfile>,
    lists: AtomicU32,
}

impl ProfileSource<SigningProfile> for CountingProfiles {
    fn list_profiles(&self, namespace: &str) -> Result<Vec<SigningProfile>, StoreError> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        self.inner.list_profiles(namespace)
    }

    fn get_profile(&self, reference: &ProfileRef) -> Result<Option<SigningProfile>, StoreError> {
        self.inner.get_profile(reference)
    }

    fn update_status(&self, reference: &ProfileRef, status: &ProfileStatus) -> Result<(), StoreError> {
        self.inner.update_status(reference, status)
    }
}

// ============================================================================
// SECTION: Harness
// ============================================================================

struct Harness {
    config: EngineConfig,
    profiles: InMemoryProfileStore<SigningProfile>,
    signatures: InMemorySignatureStore,
    rule_tables: InMemoryRuleTableStore,
    events: InMemoryEventStore,
    log: InMemoryDecisionLog,
    caches: LoaderCaches<SigningProfile>,
    clock: ManualClock,
    verifier: ScriptedVerifier,
    mutation: ScriptedMutation,
}

impl Harness {
    fn new() -> Self {
        let mut config = EngineConfig::new(SHIELD_NS);
        config.admin_groups = vec![FieldPattern::new("shield-admins")];
        config.server_username = FieldPattern::new("system:serviceaccount:shield-system:shield-sa");
        Self {
            config,
            profiles: InMemoryProfileStore::new(),
            signatures: InMemorySignatureStore::new(),
            rule_tables: InMemoryRuleTableStore::new(),
            events: InMemoryEventStore::new(),
            log: InMemoryDecisionLog::new(),
            caches: LoaderCaches::new(CacheTtls {
                profiles: Duration::ZERO,
                sign_policy: Duration::ZERO,
                signatures: Duration::ZERO,
            }),
            clock: ManualClock::new(datetime!(2024-05-01 09:00:00 UTC)),
            verifier: ScriptedVerifier::default(),
            mutation: ScriptedMutation {
                mutated: true,
            },
        }
    }

    fn with_profile(self, name: &str, spec: SigningProfileSpec) -> Self {
        let profile = SigningProfile::new(
            format!("{POLICY_GROUP}/v1alpha1"),
            "ResourceSigningProfile",
            SECURE_NS,
            name,
            spec,
        );
        self.profiles.insert(profile).unwrap();
        self
    }

    fn with_verdict(mut self, name: &str, verdict: Verdict) -> Self {
        self.verifier.verdicts.insert(name.to_string(), verdict);
        self
    }

    fn collaborators<'a>(&'a self, rule_tables: &'a dyn RuleTableStore) -> Collaborators<'a, SigningProfile> {
        Collaborators {
            verifier: &self.verifier,
            mutation: &self.mutation,
            profiles: &self.profiles,
            signatures: &self.signatures,
            rule_tables,
            events: &self.events,
            log: &self.log,
            caches: &self.caches,
            clock: &self.clock,
        }
    }

    fn evaluate(&self, request: AdmissionRequest) -> Evaluation {
        DecisionEngine::new(&self.config, self.collaborators(&self.rule_tables)).evaluate(request)
    }

    fn stored_profile(&self, name: &str) -> SigningProfile {
        let reference =
            ProfileRef::new(format!("{POLICY_GROUP}/v1alpha1"), "ResourceSigningProfile", SECURE_NS, name);
        self.profiles.get_profile(&reference).unwrap().unwrap()
    }
}

fn kind_rule(kind: &str) -> Rule {
    Rule::matching(RequestPattern {
        kind: Some(FieldPattern::new(kind)),
        ..RequestPattern::default()
    })
}

fn protect(kind: &str) -> SigningProfileSpec {
    SigningProfileSpec {
        protect_rules: vec![kind_rule(kind)],
        ..SigningProfileSpec::default()
    }
}

fn config_map(operation: Operation, name: &str) -> AdmissionRequest {
    let object = json!({
        "apiVersion": "v1",
        "kind": "ConfigMap",
        "metadata": { "name": name, "namespace": SECURE_NS, "labels": { "app": "web" } },
        "data": { "key": "value" }
    });
    AdmissionRequest {
        uid: format!("uid-{name}"),
        api_group: String::new(),
        api_version: "v1".to_string(),
        kind: "ConfigMap".to_string(),
        namespace: SECURE_NS.to_string(),
        name: name.to_string(),
        operation,
        user_info: UserInfo {
            username: "alice".to_string(),
            groups: vec!["developers".to_string()],
        },
        resource_scope: ResourceScope::Namespaced,
        dry_run: false,
        object: serde_json::to_vec(&object).unwrap(),
    }
}

fn profile_request(operation: Operation, name: &str, groups: &[&str], spec: &Value) -> AdmissionRequest {
    let object = json!({
        "apiVersion": format!("{POLICY_GROUP}/v1alpha1"),
        "kind": "ResourceSigningProfile",
        "metadata": { "name": name, "namespace": SECURE_NS },
        "spec": spec
    });
    AdmissionRequest {
        uid: format!("uid-{name}"),
        api_group: POLICY_GROUP.to_string(),
        api_version: "v1alpha1".to_string(),
        kind: "ResourceSigningProfile".to_string(),
        namespace: SECURE_NS.to_string(),
        name: name.to_string(),
        operation,
        user_info: UserInfo {
            username: "bob".to_string(),
            groups: groups.iter().map(|group| (*group).to_string()).collect(),
        },
        resource_scope: ResourceScope::Namespaced,
        dry_run: false,
        object: if operation == Operation::Delete {
            Vec::new()
        } else {
            serde_json::to_vec(&object).unwrap()
        },
    }
}

// ============================================================================
// SECTION: Short Circuits
// ============================================================================

#[test]
fn dry_run_requests_are_admitted_without_evaluation() {
    let harness = Harness::new().with_profile("p1", protect("ConfigMap"));
    let mut request = config_map(Operation::Update, "cm1");
    request.dry_run = true;
    let evaluation = harness.evaluate(request);
    assert!(evaluation.response.allowed);
    assert_eq!(evaluation.response.message, DRY_RUN_MESSAGE);
    assert!(harness.verifier.calls().is_empty());
}

#[test]
fn unprocessed_requests_are_admitted_without_evaluation() {
    let mut harness = Harness::new().with_profile("p1", protect("ConfigMap"));
    harness.config.unprocessed = vec![RequestPattern {
        namespace: Some(FieldPattern::new("secure-*")),
        ..RequestPattern::default()
    }];
    let evaluation = harness.evaluate(config_map(Operation::Update, "cm1"));
    assert!(evaluation.response.allowed);
    assert_eq!(evaluation.response.message, UNPROCESSED_MESSAGE);
    assert!(harness.verifier.calls().is_empty());
}

// ============================================================================
// SECTION: General Resources
// ============================================================================

#[test]
fn unmatched_request_is_not_protected() {
    let harness = Harness::new().with_profile("p1", protect("Secret"));
    let evaluation = harness.evaluate(config_map(Operation::Update, "cm1"));
    assert!(evaluation.response.allowed);
    assert!(!evaluation.protected);
    assert_eq!(evaluation.decision.reason_code, ReasonCode::NotProtected);
    assert_eq!(evaluation.response.message, "not protected");
    assert_eq!(evaluation.response.patch, None);
    assert!(harness.events.events().unwrap().is_empty());
}

#[test]
fn ignored_request_reports_not_protected() {
    let spec = SigningProfileSpec {
        ignore_rules: vec![Rule::matching(RequestPattern {
            username: Some(FieldPattern::new("alice")),
            ..RequestPattern::default()
        })],
        ..protect("ConfigMap")
    };
    let harness = Harness::new().with_profile("p1", spec);
    let evaluation = harness.evaluate(config_map(Operation::Update, "cm1"));
    assert!(evaluation.response.allowed);
    assert!(evaluation.ignored);
    assert_eq!(evaluation.decision.reason_code, ReasonCode::NotProtected);
    assert!(harness.verifier.calls().is_empty());
}

#[test]
fn force_checked_denial_updates_status_and_creates_event() {
    let spec = SigningProfileSpec {
        force_check_rules: vec![kind_rule("ConfigMap")],
        ignore_rules: vec![Rule::matching(RequestPattern {
            username: Some(FieldPattern::new("alice")),
            ..RequestPattern::default()
        })],
        ..SigningProfileSpec::default()
    };
    let harness = Harness::new().with_profile("p1", spec);
    let evaluation = harness.evaluate(config_map(Operation::Update, "cm1"));

    assert!(!evaluation.response.allowed);
    assert!(evaluation.protected);
    assert!(!evaluation.ignored);
    assert_eq!(evaluation.decision.reason_code, ReasonCode::NoSig);
    assert_eq!(evaluation.response.message, ReasonCode::NoSig.message());
    assert_eq!(evaluation.denying_profile.as_ref().map(|r| r.name.as_str()), Some("p1"));
    assert_eq!(evaluation.response.patch, None);

    let stored = harness.stored_profile("p1");
    assert_eq!(stored.status.deny_count, 1);
    assert_eq!(stored.status.latest[0].result.message, ReasonCode::NoSig.message());
    assert_eq!(stored.status.latest[0].result.timestamp, "2024-05-01 09:00:00");
    assert_eq!(stored.status.latest[0].request.name, "cm1");

    let events = harness.events.events().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].name, "shield-deny-update-configmap-cm1");
    assert_eq!(events[0].namespace, SECURE_NS);
    assert_eq!(events[0].count, 1);
    assert_eq!(events[0].reason, "no-signature");

    let again = harness.evaluate(config_map(Operation::Update, "cm1"));
    assert!(!again.response.allowed);
    assert_eq!(harness.stored_profile("p1").status.deny_count, 2);
    assert_eq!(harness.events.get(SECURE_NS, "shield-deny-update-configmap-cm1").unwrap().unwrap().count, 2);
}

#[test]
fn first_denying_profile_decides_and_stops_evaluation() {
    let harness = Harness::new()
        .with_profile("p1", protect("ConfigMap"))
        .with_profile("p2", protect("ConfigMap"))
        .with_profile("p3", protect("ConfigMap"))
        .with_profile("p4", protect("ConfigMap"))
        .with_verdict("p1", Verdict::Allow)
        .with_verdict("p2", Verdict::Allow)
        .with_verdict("p3", Verdict::Deny(SignatureFailureKind::InvalidSignature))
        .with_verdict("p4", Verdict::Allow);
    let evaluation = harness.evaluate(config_map(Operation::Create, "cm1"));

    assert!(!evaluation.response.allowed);
    assert_eq!(evaluation.decision.reason_code, ReasonCode::InvalidSig);
    assert_eq!(evaluation.denying_profile.map(|r| r.name), Some("p3".to_string()));
    assert_eq!(harness.verifier.calls(), vec!["p1", "p2", "p3"]);
    assert_eq!(harness.stored_profile("p1").status.deny_count, 0);
    assert_eq!(harness.stored_profile("p3").status.deny_count, 1);
}

#[test]
fn all_permitting_profiles_report_the_last_reason() {
    let mut harness = Harness::new()
        .with_profile("p1", protect("ConfigMap"))
        .with_profile("p2", protect("ConfigMap"))
        .with_verdict("p1", Verdict::Allow);
    harness.mutation = ScriptedMutation {
        mutated: false,
    };
    let evaluation = harness.evaluate(config_map(Operation::Update, "cm1"));

    assert!(evaluation.response.allowed);
    assert_eq!(evaluation.decision.reason_code, ReasonCode::NoMutation);
    assert!(evaluation.decision.verified);
    assert_eq!(evaluation.denying_profile, None);
    assert_eq!(evaluation.response.patch, None);
}

#[test]
fn valid_signature_labels_the_admitted_object() {
    let harness =
        Harness::new().with_profile("p1", protect("ConfigMap")).with_verdict("p1", Verdict::Allow);
    let evaluation = harness.evaluate(config_map(Operation::Create, "cm1"));

    assert!(evaluation.response.allowed);
    assert_eq!(evaluation.decision.reason_code, ReasonCode::ValidSig);
    let patch = evaluation.response.patch.unwrap();
    assert_eq!(patch.len(), 2);
    assert!(patch.iter().all(|operation| operation.op == PatchOp::Add));
    assert_eq!(patch[0].value, Some(json!("verified")));
    assert_eq!(patch[1].value, Some(json!("valid-sig")));
}

#[test]
fn disabled_patching_omits_labels() {
    let mut harness =
        Harness::new().with_profile("p1", protect("ConfigMap")).with_verdict("p1", Verdict::Allow);
    harness.config.patch_enabled = false;
    let evaluation = harness.evaluate(config_map(Operation::Create, "cm1"));
    assert!(evaluation.response.allowed);
    assert_eq!(evaluation.response.patch, None);
}

#[test]
fn verifier_failure_aborts_into_an_unexpected_denial() {
    let harness =
        Harness::new().with_profile("p1", protect("ConfigMap")).with_verdict("p1", Verdict::Fail);
    let evaluation = harness.evaluate(config_map(Operation::Update, "cm1"));

    assert!(!evaluation.response.allowed);
    assert_eq!(evaluation.abort_reason.as_deref(), Some(SIGNATURE_ABORT_REASON));
    assert_eq!(evaluation.decision.reason_code, ReasonCode::Unexpected);
    assert_eq!(evaluation.response.message, SIGNATURE_ABORT_REASON);
    assert!(
        harness
            .log
            .console_events()
            .iter()
            .any(|event| event.event == ConsoleEventKind::Error && event.message == SIGNATURE_ABORT_REASON)
    );
}

#[test]
fn delete_of_general_resource_is_skipped() {
    let harness = Harness::new().with_profile("p1", protect("ConfigMap"));
    let evaluation = harness.evaluate(config_map(Operation::Delete, "cm1"));
    assert!(evaluation.response.allowed);
    assert_eq!(evaluation.decision.reason_code, ReasonCode::SkipDelete);
    assert!(harness.events.events().unwrap().is_empty());
}

// ============================================================================
// SECTION: Overrides
// ============================================================================

#[test]
fn detect_only_mode_admits_and_marks_unverified() {
    let mut harness = Harness::new().with_profile("p1", protect("ConfigMap"));
    harness.config.mode = ShieldMode::Detect;
    let evaluation = harness.evaluate(config_map(Operation::Update, "cm1"));

    assert!(evaluation.response.allowed);
    assert!(evaluation.decision.allow_by_detect_only_mode);
    assert_eq!(evaluation.decision.reason_code, ReasonCode::Detection);
    let patch = evaluation.response.patch.unwrap();
    assert_eq!(patch[0].value, Some(json!("unverified")));
    assert_eq!(patch[1].value, Some(json!("detection")));
    assert!(harness.events.events().unwrap().is_empty());
    assert_eq!(harness.stored_profile("p1").status.deny_count, 0);
}

#[test]
fn break_glass_admits_covered_namespaces() {
    let mut harness = Harness::new().with_profile("p1", protect("ConfigMap"));
    harness.config.sign_policy.break_glass = vec![BreakGlassCondition {
        scope: BreakGlassScope::Namespaced,
        namespaces: vec![SECURE_NS.to_string()],
    }];
    let evaluation = harness.evaluate(config_map(Operation::Update, "cm1"));

    assert!(evaluation.response.allowed);
    assert!(evaluation.decision.allow_by_break_glass_mode);
    assert_eq!(evaluation.decision.reason_code, ReasonCode::BreakGlass);
}

// ============================================================================
// SECTION: Policy Resources
// ============================================================================

#[test]
fn admin_profile_creation_rewrites_rule_tables() {
    let harness = Harness::new().with_profile("p1", protect("ConfigMap"));
    let spec = json!({ "protectRules": [ { "match": [ { "kind": "Secret" } ] } ] });
    let evaluation = harness.evaluate(profile_request(Operation::Create, "p9", &["shield-admins"], &spec));

    assert!(evaluation.response.allowed);
    assert!(evaluation.policy_resource);
    assert_eq!(evaluation.decision.reason_code, ReasonCode::IeAdmin);

    let reference = ProfileRef::new(format!("{POLICY_GROUP}/v1alpha1"), "ResourceSigningProfile", SECURE_NS, "p9");
    let protect_table = harness.rule_tables.read(RuleTableKind::Protect).unwrap().unwrap().table;
    assert!(protect_table.contains(&reference));
    assert_eq!(protect_table.entries()[0].rule, kind_rule("Secret"));
}

#[test]
fn disabled_profile_update_removes_its_rules() {
    let harness = Harness::new();
    let enabled = json!({ "protectRules": [ { "match": [ { "kind": "Secret" } ] } ] });
    let created = harness.evaluate(profile_request(Operation::Create, "p9", &["shield-admins"], &enabled));
    assert!(created.response.allowed);
    let disabled = json!({ "disabled": true, "protectRules": [ { "match": [ { "kind": "Secret" } ] } ] });
    let evaluation = harness.evaluate(profile_request(Operation::Update, "p9", &["shield-admins"], &disabled));

    assert!(evaluation.response.allowed);
    let protect_table = harness.rule_tables.read(RuleTableKind::Protect).unwrap().unwrap().table;
    assert!(protect_table.is_empty());
}

#[test]
fn profile_deletion_is_blocked_for_ordinary_users() {
    let harness = Harness::new();
    let evaluation = harness.evaluate(profile_request(Operation::Delete, "p1", &["developers"], &json!({})));

    assert!(!evaluation.response.allowed);
    assert_eq!(evaluation.decision.reason_code, ReasonCode::BlockDelete);
    assert!(harness.events.events().unwrap().is_empty());
    assert!(harness.rule_tables.read(RuleTableKind::Protect).unwrap().is_none());
}

#[test]
fn invalid_policy_resource_is_denied_before_evaluation() {
    let harness = Harness::new();
    let spec = json!({ "targetNamespaceSelector": { "include": ["team-*"] } });
    let evaluation = harness.evaluate(profile_request(Operation::Create, "p1", &["shield-admins"], &spec));

    assert!(!evaluation.response.allowed);
    assert!(evaluation.policy_resource);
    assert!(evaluation.response.message.starts_with("Validation error;"));
    assert!(harness.verifier.calls().is_empty());
}

#[test]
fn rule_table_documents_are_policy_resources() {
    let harness = Harness::new();
    let mut request = config_map(Operation::Update, RuleTableKind::Protect.document_name());
    request.namespace = SHIELD_NS.to_string();
    let evaluation = harness.evaluate(request);

    assert!(evaluation.policy_resource);
    assert!(!evaluation.response.allowed);
    assert_eq!(harness.verifier.calls(), vec![String::new()]);
}

// ============================================================================
// SECTION: Collaborator Failures and Logging
// ============================================================================

#[test]
fn rule_table_read_failure_is_logged_and_treated_as_empty() {
    let harness = Harness::new().with_profile("p1", protect("ConfigMap"));
    let broken = BrokenRuleTables;
    let engine = DecisionEngine::new(&harness.config, harness.collaborators(&broken));
    let evaluation = engine.evaluate(config_map(Operation::Update, "cm1"));

    assert!(evaluation.response.allowed);
    assert_eq!(evaluation.decision.reason_code, ReasonCode::NotProtected);
    let errors: Vec<_> = harness
        .log
        .console_events()
        .into_iter()
        .filter(|event| event.event == ConsoleEventKind::Error)
        .collect();
    assert!(!errors.is_empty());
    assert!(errors.iter().all(|event| event.message == "failed to read rule table"));
}

#[test]
fn unpersisted_tables_list_profiles_once_per_request() {
    let harness = Harness::new().with_profile("p1", protect("Secret"));
    let counting = CountingProfiles {
        inner: harness.profiles.clone(),
        lists: AtomicU32::new(0),
    };
    let mut collaborators = harness.collaborators(&harness.rule_tables);
    collaborators.profiles = &counting;
    let engine = DecisionEngine::new(&harness.config, collaborators);
    let evaluation = engine.evaluate(config_map(Operation::Update, "cm1"));

    assert_eq!(evaluation.decision.reason_code, ReasonCode::NotProtected);
    // One listing each for the shield namespace and the request namespace.
    assert_eq!(counting.lists.load(Ordering::SeqCst), 2);
}

#[test]
fn context_and_console_logs_follow_their_scopes() {
    let mut harness = Harness::new();
    harness.config.context_log.enabled = true;
    harness.config.console_log.enabled = true;
    harness.config.include_request = true;
    let evaluation = harness.evaluate(config_map(Operation::Update, "cm1"));
    assert!(evaluation.response.allowed);

    let records = harness.log.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].reason_code, "no-protect");
    assert!(records[0].allowed);
    assert!(records[0].request.is_some());

    let kinds: Vec<ConsoleEventKind> = harness.log.console_events().iter().map(|event| event.event).collect();
    assert_eq!(kinds, vec![ConsoleEventKind::RequestReceived, ConsoleEventKind::ResponseSent]);

    let mut secret = config_map(Operation::Update, "token");
    secret.kind = "Secret".to_string();
    let evaluation = harness.evaluate(secret);
    assert_eq!(evaluation.decision.reason_code, ReasonCode::NotProtected);
    let records = harness.log.records();
    assert_eq!(records.len(), 2);
    assert!(records[1].request.is_none());
}
