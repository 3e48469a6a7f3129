// crates/admission-shield-core/src/runtime/engine.rs
// ============================================================================
// Module: Decision Engine
// Description: Per-request admission pipeline over injected collaborators.
// Purpose: Classify, match, evaluate, resolve, patch, and record one request.
// Dependencies: serde, serde_json, crate::core, crate::interfaces, crate::runtime
// ============================================================================

//! ## Overview
//! The [`DecisionEngine`] runs one strictly sequential pipeline per request:
//! 1. Dry-run and unprocessed requests are admitted immediately.
//! 2. Policy resources are validated, then admitted for administrators or
//!    evaluated against the common profile.
//! 3. Other requests are matched against the force-check, ignore, and
//!    protect rule tables.
//! 4. Protected requests are evaluated profile by profile; the first
//!    profile that does not permit the request denies it.
//! 5. The final decision is resolved with overrides, and a label patch is
//!    built for admitted objects.
//! 6. Side effects: rule tables are rewritten for admitted profile changes;
//!    denials update the denying profile's status and an audit event.
//!
//! Collaborator failures never cross the decision boundary. Store failures
//! are logged and the pipeline continues with what resolved; evaluator
//! failures abort evaluation into a denial.
//!
//! Security posture: requests are untrusted input; any evaluation failure
//! denies unless an override is active.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::de::DeserializeOwned;

use crate::core::identifiers::CONFIG_MAP_KIND;
use crate::core::identifiers::ProfileRef;
use crate::core::identifiers::SECRET_KIND;
use crate::core::identifiers::SIGNING_PROFILE_KIND;
use crate::core::matcher::RuleMatcher;
use crate::core::policy::SignPolicy;
use crate::core::policy::SignatureSelector;
use crate::core::profile::ProtectionProfile;
use crate::core::profile::SigningProfile;
use crate::core::request::AdmissionRequest;
use crate::core::request::AdmissionResponse;
use crate::core::request::RequestContext;
use crate::core::request::RequestFields;
use crate::core::results::DecisionResult;
use crate::core::results::MutationEvalResult;
use crate::core::results::ReasonCode;
use crate::core::results::SignatureEvalResult;
use crate::core::rule_table::RuleTable;
use crate::core::rule_table::RuleTableKind;
use crate::core::rule_table::RuleTableSet;
use crate::interfaces::Clock;
use crate::interfaces::EventStore;
use crate::interfaces::MutationChecker;
use crate::interfaces::ProfileSource;
use crate::interfaces::RuleTableStore;
use crate::interfaces::SignatureSource;
use crate::interfaces::SignatureVerifier;
use crate::runtime::audit::ConsoleLogEvent;
use crate::runtime::audit::DecisionLogRecord;
use crate::runtime::audit::DecisionLogSink;
use crate::runtime::audit::timestamp_ms;
use crate::runtime::cache::LoaderCaches;
use crate::runtime::decision::DecisionInputs;
use crate::runtime::decision::ResourceClass;
use crate::runtime::decision::resolve_decision;
use crate::runtime::events::DenialEventRecorder;
use crate::runtime::loader::Loaded;
use crate::runtime::loader::LoaderSources;
use crate::runtime::loader::ProfileLoader;
use crate::runtime::patch::build_label_patch;
use crate::runtime::rule_update::RuleTableMaintainer;
use crate::runtime::settings::EngineConfig;
use crate::runtime::status::ProfileStatusTracker;
use crate::runtime::validation::validate_policy_resource;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Message of admitted dry-run requests.
pub const DRY_RUN_MESSAGE: &str = "request is dry run";
/// Message of admitted unprocessed requests.
pub const UNPROCESSED_MESSAGE: &str = "request is not processed by shield";
/// Abort reason when signature evaluation fails to run.
pub const SIGNATURE_ABORT_REASON: &str = "Error when evaluating sign policy";
/// Abort reason when mutation evaluation fails to run.
pub const MUTATION_ABORT_REASON: &str = "Error when evaluating mutation";

/// Event identifier of decision context records.
const DECISION_EVENT: &str = "admission_decision";

// ============================================================================
// SECTION: Collaborators
// ============================================================================

/// Borrowed collaborators of the engine.
pub struct Collaborators<'a, P> {
    /// Signature verifier.
    pub verifier: &'a dyn SignatureVerifier,
    /// Mutation checker.
    pub mutation: &'a dyn MutationChecker,
    /// Profile store.
    pub profiles: &'a dyn ProfileSource<P>,
    /// Sign policy and signature store.
    pub signatures: &'a dyn SignatureSource,
    /// Versioned rule table store.
    pub rule_tables: &'a dyn RuleTableStore,
    /// Denial event store.
    pub events: &'a dyn EventStore,
    /// Decision log sink.
    pub log: &'a dyn DecisionLogSink,
    /// Shared loader caches.
    pub caches: &'a LoaderCaches<P>,
    /// Time source.
    pub clock: &'a dyn Clock,
}

impl<P> Clone for Collaborators<'_, P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P> Copy for Collaborators<'_, P> {}

// ============================================================================
// SECTION: Evaluation
// ============================================================================

/// Outcome of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    /// Response returned across the decision boundary.
    pub response: AdmissionResponse,
    /// Resolved decision.
    pub decision: DecisionResult,
    /// Request targeted a policy resource.
    pub policy_resource: bool,
    /// Request matched an ignore rule.
    pub ignored: bool,
    /// Request was protected.
    pub protected: bool,
    /// Abort reason when evaluation aborted.
    pub abort_reason: Option<String>,
    /// Profile that denied the request.
    pub denying_profile: Option<ProfileRef>,
    /// Signature result of the decisive profile.
    pub signature: Option<SignatureEvalResult>,
    /// Mutation result of the decisive profile.
    pub mutation: Option<MutationEvalResult>,
}

impl Evaluation {
    /// Builds an outcome decided before any pipeline stage ran.
    fn short_circuit(allowed: bool, message: &str) -> Self {
        Self {
            response: AdmissionResponse::new(allowed, message),
            decision: DecisionResult {
                allow: allowed,
                message: message.to_string(),
                ..DecisionResult::default()
            },
            policy_resource: false,
            ignored: false,
            protected: false,
            abort_reason: None,
            denying_profile: None,
            signature: None,
            mutation: None,
        }
    }
}

/// Mutable state carried through the pipeline.
struct PipelineState<P> {
    /// Request matched an ignore rule.
    ignored: bool,
    /// Request is protected.
    protected: bool,
    /// Pipeline allow flag.
    allowed: bool,
    /// Reason carried out of the pipeline.
    reason: ReasonCode,
    /// Error text carried out of the pipeline.
    error_message: String,
    /// Abort reason when evaluation aborted.
    abort_reason: Option<&'static str>,
    /// Signature result of the decisive profile.
    signature: Option<SignatureEvalResult>,
    /// Mutation result of the decisive profile.
    mutation: Option<MutationEvalResult>,
    /// Profile that denied the request.
    denying: Option<P>,
}

impl<P> Default for PipelineState<P> {
    fn default() -> Self {
        Self {
            ignored: false,
            protected: false,
            allowed: false,
            reason: ReasonCode::Unexpected,
            error_message: String::new(),
            abort_reason: None,
            signature: None,
            mutation: None,
            denying: None,
        }
    }
}

/// Outcome of evaluating one profile.
struct ProfileOutcome {
    /// Profile permits the request.
    allowed: bool,
    /// Reason reported by the profile.
    reason: ReasonCode,
    /// Failure text reported by the profile.
    error_message: String,
    /// Signature result.
    signature: Option<SignatureEvalResult>,
    /// Mutation result.
    mutation: Option<MutationEvalResult>,
}

// ============================================================================
// SECTION: Engine
// ============================================================================

/// Admission decision engine.
pub struct DecisionEngine<'a, P> {
    /// Engine configuration.
    config: &'a EngineConfig,
    /// Injected collaborators.
    collaborators: Collaborators<'a, P>,
}

impl<'a, P> DecisionEngine<'a, P>
where
    P: ProtectionProfile + Clone + Default + From<SigningProfile> + DeserializeOwned,
{
    /// Creates an engine over the given configuration and collaborators.
    #[must_use]
    pub const fn new(config: &'a EngineConfig, collaborators: Collaborators<'a, P>) -> Self {
        Self {
            config,
            collaborators,
        }
    }

    /// Decides one request and returns only the boundary response.
    #[must_use]
    pub fn decide(&self, request: AdmissionRequest) -> AdmissionResponse {
        self.evaluate(request).response
    }

    /// Decides one request.
    #[must_use]
    pub fn evaluate(&self, request: AdmissionRequest) -> Evaluation {
        let ctx = RequestContext::new(request);
        if ctx.dry_run {
            return Evaluation::short_circuit(true, DRY_RUN_MESSAGE);
        }
        let fields = ctx.fields();
        if RuleMatcher::matches_any(&self.config.unprocessed, &fields) {
            return Evaluation::short_circuit(true, UNPROCESSED_MESSAGE);
        }

        let console = self.config.console_log.applies(&fields);
        if console {
            self.collaborators.log.console(&ConsoleLogEvent::entry(&ctx));
        }

        let loader = ProfileLoader::new(
            self.config,
            LoaderSources {
                profiles: self.collaborators.profiles,
                signatures: self.collaborators.signatures,
                caches: self.collaborators.caches,
                clock: self.collaborators.clock,
            },
            &ctx.namespace,
        );

        let policy_resource = self.is_policy_resource(&ctx);
        let privileged = self.config.is_admin_request(&ctx) || self.config.is_server_request(&ctx);
        let mut state = PipelineState::default();
        let mut references = Vec::new();
        if policy_resource {
            if let Err(err) = validate_policy_resource(&ctx, &self.config.shield_namespace) {
                let mut evaluation = Evaluation::short_circuit(false, &err.to_string());
                evaluation.policy_resource = true;
                if console {
                    self.collaborators.log.console(&ConsoleLogEvent::exit(&ctx, false, false));
                }
                return evaluation;
            }
            if privileged {
                state.allowed = true;
                state.reason = ReasonCode::IeAdmin;
            } else {
                state.protected = true;
            }
        } else {
            self.classify(&ctx, &fields, &loader, &mut state, &mut references);
        }

        let sign_policy = self.logged(&ctx, "failed to load sign policy", loader.merged_sign_policy());
        if state.protected && !state.allowed && state.abort_reason.is_none() {
            self.evaluate_profiles(&ctx, &loader, &sign_policy, &references, policy_resource, &mut state);
        }

        let break_glass = sign_policy.break_glass_active(ctx.resource_scope, &ctx.namespace);
        let detect_only = self.config.detect_only();
        let decision = resolve_decision(&DecisionInputs {
            class: if policy_resource { ResourceClass::Policy } else { ResourceClass::General },
            operation: ctx.operation,
            kind: &ctx.kind,
            privileged_requester: privileged,
            allowed: state.allowed,
            eval_reason: state.reason,
            error_message: &state.error_message,
            abort_reason: state.abort_reason,
            detect_only,
            break_glass,
        });

        let signature_allowed = state.signature.as_ref().is_some_and(|result| result.allow);
        let patch = if self.config.patch_enabled {
            build_label_patch(&ctx, &decision, signature_allowed)
        } else {
            None
        };
        let response = AdmissionResponse {
            allowed: decision.allow,
            message: decision.message.clone(),
            patch,
        };

        if decision.allow && policy_resource && ctx.kind == SIGNING_PROFILE_KIND {
            self.rewrite_rule_tables(&ctx);
        }
        if !decision.allow
            && !policy_resource
            && let Some(profile) = &state.denying
        {
            self.record_denial(&ctx, profile, &state.error_message, &decision);
        }

        let evaluation = Evaluation {
            response,
            decision,
            policy_resource,
            ignored: state.ignored,
            protected: state.protected,
            abort_reason: state.abort_reason.map(str::to_string),
            denying_profile: state.denying.as_ref().map(|profile| profile.reference()),
            signature: state.signature,
            mutation: state.mutation,
        };

        if self.config.context_log.applies(&fields) {
            let record = self.context_record(&ctx, &evaluation, break_glass, detect_only);
            self.collaborators.log.record(&record);
        }
        if console {
            self.collaborators.log.console(&ConsoleLogEvent::exit(
                &ctx,
                evaluation.decision.allow,
                evaluation.abort_reason.is_some(),
            ));
        }
        evaluation
    }

    // ------------------------------------------------------------------------
    // Classification
    // ------------------------------------------------------------------------

    /// Returns true when the request targets a policy resource or a rule
    /// table document.
    fn is_policy_resource(&self, ctx: &RequestContext) -> bool {
        let table_document = ctx.kind == CONFIG_MAP_KIND
            && ctx.namespace == self.config.shield_namespace
            && RuleTableKind::ALL.iter().any(|kind| kind.document_name() == ctx.name);
        ctx.api_group == self.config.policy_api_group || table_document
    }

    /// Matches a general request against the rule tables.
    fn classify(
        &self,
        ctx: &RequestContext,
        fields: &RequestFields<'_>,
        loader: &ProfileLoader<'_, P>,
        state: &mut PipelineState<P>,
        references: &mut Vec<ProfileRef>,
    ) {
        let shield_namespace = self.config.shield_namespace.as_str();
        let mut aggregated = None;
        let forced = self
            .rule_table(ctx, loader, &mut aggregated, RuleTableKind::ForceCheck)
            .match_request(fields, shield_namespace);
        if forced.matched {
            state.protected = true;
            extend_unique(references, forced.refs);
        } else {
            let ignored = self
                .rule_table(ctx, loader, &mut aggregated, RuleTableKind::Ignore)
                .match_request(fields, shield_namespace);
            if ignored.matched {
                state.ignored = true;
                state.allowed = true;
                state.reason = ReasonCode::IgnoredSa;
            }
        }

        let mut protected = false;
        if state.abort_reason.is_none() && !state.allowed {
            let matched = self
                .rule_table(ctx, loader, &mut aggregated, RuleTableKind::Protect)
                .match_request(fields, shield_namespace);
            if matched.matched {
                protected = true;
                extend_unique(references, matched.refs);
            }
        }

        if forced.matched || protected {
            state.protected = true;
        } else {
            state.allowed = true;
            state.reason = ReasonCode::NotProtected;
        }
    }

    /// Reads a rule table, aggregating it from profiles when never persisted.
    ///
    /// Profiles are aggregated at most once per request; `aggregated` holds
    /// the result for the remaining table kinds.
    fn rule_table(
        &self,
        ctx: &RequestContext,
        loader: &ProfileLoader<'_, P>,
        aggregated: &mut Option<RuleTableSet>,
        kind: RuleTableKind,
    ) -> RuleTable {
        match self.collaborators.rule_tables.read(kind) {
            Ok(Some(stored)) => stored.table,
            Ok(None) => aggregated
                .get_or_insert_with(|| {
                    self.logged(ctx, "failed to list profiles", loader.aggregate_rule_tables())
                })
                .get(kind)
                .clone(),
            Err(err) => {
                self.log_error(ctx, "failed to read rule table", err);
                RuleTable::new()
            }
        }
    }

    // ------------------------------------------------------------------------
    // Evaluation
    // ------------------------------------------------------------------------

    /// Evaluates the matched profiles in order until one denies.
    fn evaluate_profiles(
        &self,
        ctx: &RequestContext,
        loader: &ProfileLoader<'_, P>,
        sign_policy: &SignPolicy,
        references: &[ProfileRef],
        policy_resource: bool,
        state: &mut PipelineState<P>,
    ) {
        let profiles = self.logged(ctx, "failed to load signing profile", loader.signing_profiles(references));
        if profiles.is_empty() {
            return;
        }
        let selector = SignatureSelector {
            api_version: ctx.group_version(),
            kind: ctx.kind.clone(),
        };
        let signatures = self.logged(ctx, "failed to list signatures", loader.signatures(&selector));
        let plugins = self.config.enabled_plugins();

        for profile in profiles {
            let mut outcome = ProfileOutcome {
                allowed: false,
                reason: ReasonCode::Unexpected,
                error_message: String::new(),
                signature: None,
                mutation: None,
            };

            match self.collaborators.verifier.evaluate(ctx, &signatures, &profile, sign_policy, &plugins) {
                Ok(result) => {
                    if result.checked && result.allow {
                        outcome.allowed = true;
                        outcome.reason = ReasonCode::ValidSig;
                    }
                    if let Some(failure) = &result.error {
                        outcome.error_message = failure.render();
                        outcome.reason = failure.kind.reason();
                    }
                    outcome.signature = Some(result);
                }
                Err(err) => {
                    self.log_error(ctx, SIGNATURE_ABORT_REASON, err);
                    state.abort_reason = Some(SIGNATURE_ABORT_REASON);
                }
            }

            if state.abort_reason.is_none() && !outcome.allowed && ctx.is_update() && !policy_resource {
                match self.collaborators.mutation.evaluate(ctx, &profile) {
                    Ok(result) => {
                        if result.checked && !result.is_mutated {
                            outcome.allowed = true;
                            outcome.reason = ReasonCode::NoMutation;
                        }
                        outcome.mutation = Some(result);
                    }
                    Err(err) => {
                        self.log_error(ctx, MUTATION_ABORT_REASON, err);
                        state.abort_reason = Some(MUTATION_ABORT_REASON);
                    }
                }
            }

            state.allowed = outcome.allowed;
            state.reason = outcome.reason;
            state.error_message = outcome.error_message;
            state.signature = outcome.signature;
            state.mutation = outcome.mutation;
            if !outcome.allowed {
                state.denying = Some(profile);
                break;
            }
        }
    }

    // ------------------------------------------------------------------------
    // Side Effects
    // ------------------------------------------------------------------------

    /// Rewrites the rule table entries of an admitted profile change.
    fn rewrite_rule_tables(&self, ctx: &RequestContext) {
        let reference =
            ProfileRef::new(ctx.group_version(), ctx.kind.clone(), ctx.namespace.clone(), ctx.name.clone());
        let maintainer =
            RuleTableMaintainer::new(self.collaborators.rule_tables, self.config.rule_table_max_attempts);
        let result = if ctx.is_delete() {
            maintainer.rewrite_profile_rules(&reference, None)
        } else {
            match serde_json::from_slice::<P>(&ctx.raw_object) {
                Ok(profile) if profile.is_disabled() => maintainer.rewrite_profile_rules(&reference, None),
                Ok(profile) => maintainer.rewrite_profile_rules(&reference, Some(profile.rule_sets())),
                Err(err) => {
                    self.log_error(ctx, "failed to parse signing profile", err);
                    return;
                }
            }
        };
        if let Err(err) = result {
            self.log_error(ctx, "failed to update rule table", err);
        }
    }

    /// Updates the denying profile's status and the denial event.
    fn record_denial(&self, ctx: &RequestContext, denying: &P, message: &str, decision: &DecisionResult) {
        let reference = denying.reference();
        if !reference.is_empty() {
            let tracker = ProfileStatusTracker::new(self.collaborators.clock);
            match self.collaborators.profiles.get_profile(&reference) {
                Ok(Some(stored)) => {
                    if let Err(err) =
                        tracker.record_denial(stored, ctx.snapshot(), message, self.collaborators.profiles)
                    {
                        self.log_error(ctx, "failed to update status", err);
                    }
                }
                Ok(None) => self.log_error(ctx, "failed to update status", format!("profile {reference} not found")),
                Err(err) => self.log_error(ctx, "failed to update status", err),
            }
        }

        let recorder = DenialEventRecorder::new(
            self.collaborators.events,
            self.collaborators.clock,
            &self.config.shield_namespace,
        );
        if let Err(err) = recorder.record(ctx, decision) {
            self.log_error(ctx, "failed to create an event", err);
        }
    }

    // ------------------------------------------------------------------------
    // Logging
    // ------------------------------------------------------------------------

    /// Logs the failures of a lookup and returns its value.
    fn logged<T>(&self, ctx: &RequestContext, message: &str, loaded: Loaded<T>) -> T {
        for failure in loaded.failures {
            self.log_error(ctx, message, failure);
        }
        loaded.value
    }

    /// Emits a collaborator failure event.
    fn log_error(&self, ctx: &RequestContext, message: &str, error: impl ToString) {
        self.collaborators.log.console(&ConsoleLogEvent::error(ctx, message, error));
    }

    /// Builds the decision context record.
    fn context_record(
        &self,
        ctx: &RequestContext,
        evaluation: &Evaluation,
        break_glass: bool,
        detect_only: bool,
    ) -> DecisionLogRecord {
        let decision = &evaluation.decision;
        let request = if self.config.include_request && ctx.kind != SECRET_KIND {
            ctx.object().cloned()
        } else {
            None
        };
        let error = evaluation
            .signature
            .as_ref()
            .and_then(|result| result.error.as_ref())
            .map(|failure| failure.render());
        DecisionLogRecord {
            event: DECISION_EVENT,
            timestamp_ms: timestamp_ms(),
            request_uid: ctx.uid.clone(),
            api_group: ctx.api_group.clone(),
            api_version: ctx.api_version.clone(),
            kind: ctx.kind.clone(),
            namespace: ctx.namespace.clone(),
            name: ctx.name.clone(),
            operation: ctx.operation,
            user_name: ctx.user_info.username.clone(),
            user_groups: ctx.user_info.groups.clone(),
            scope: ctx.resource_scope,
            policy_resource: evaluation.policy_resource,
            ignored: evaluation.ignored,
            protected: evaluation.protected,
            allowed: decision.allow,
            verified: decision.verified,
            aborted: evaluation.abort_reason.is_some(),
            abort_reason: evaluation.abort_reason.clone(),
            break_glass,
            detect_only,
            allow_by_break_glass_mode: decision.allow_by_break_glass_mode,
            allow_by_detect_only_mode: decision.allow_by_detect_only_mode,
            reason_code: decision.reason_code.code(),
            message: decision.message.clone(),
            denying_profile: evaluation.denying_profile.clone(),
            signature: evaluation.signature.clone(),
            mutation: evaluation.mutation.clone(),
            error,
            request,
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Appends references not already present.
fn extend_unique(references: &mut Vec<ProfileRef>, more: Vec<ProfileRef>) {
    for reference in more {
        if !references.contains(&reference) {
            references.push(reference);
        }
    }
}
