// crates/admission-shield-core/src/interfaces/mod.rs
// ============================================================================
// Module: Admission Shield Interfaces
// Description: Backend-agnostic collaborator contracts of the decision engine.
// Purpose: Define verifier, checker, store, event, and clock surfaces.
// Dependencies: thiserror, time, crate::core
// ============================================================================

//! ## Overview
//! Interfaces define how the decision engine reaches its external
//! collaborators without embedding cluster-client details. Signature
//! verification and mutation analysis are consumed as evaluators; profile,
//! signature, rule table, and event persistence are consumed as stores.
//! Rule table persistence is a versioned document store with
//! compare-and-swap so concurrent profile updates never lose writes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;
use time::OffsetDateTime;

use crate::core::identifiers::ProfileRef;
use crate::core::policy::PluginConfig;
use crate::core::policy::SignPolicy;
use crate::core::policy::SignPolicyObject;
use crate::core::policy::SignatureRecord;
use crate::core::policy::SignatureSelector;
use crate::core::profile::ProfileStatus;
use crate::core::profile::ProtectionProfile;
use crate::core::request::RequestContext;
use crate::core::results::MutationEvalResult;
use crate::core::results::SignatureEvalResult;
use crate::core::rule_table::RuleTable;
use crate::core::rule_table::RuleTableKind;

// ============================================================================
// SECTION: Evaluators
// ============================================================================

/// Evaluator errors.
#[derive(Debug, Error)]
pub enum EvaluatorError {
    /// Evaluator could not be constructed.
    #[error("evaluator construction error: {0}")]
    Construction(String),
    /// Evaluator failed while running.
    #[error("evaluator error: {0}")]
    Evaluation(String),
}

/// External signature verifier.
pub trait SignatureVerifier {
    /// Verifies the request against signature evidence under a profile and policy.
    ///
    /// Verification failures are reported inside the result; `Err` means the
    /// verifier itself could not run.
    ///
    /// # Errors
    ///
    /// Returns [`EvaluatorError`] when the verifier cannot run.
    fn evaluate(
        &self,
        request: &RequestContext,
        signatures: &[SignatureRecord],
        profile: &dyn ProtectionProfile,
        policy: &SignPolicy,
        plugins: &[PluginConfig],
    ) -> Result<SignatureEvalResult, EvaluatorError>;
}

/// External mutation checker.
pub trait MutationChecker {
    /// Compares the request object with its trusted baseline.
    ///
    /// # Errors
    ///
    /// Returns [`EvaluatorError`] when the checker cannot run.
    fn evaluate(
        &self,
        request: &RequestContext,
        profile: &dyn ProtectionProfile,
    ) -> Result<MutationEvalResult, EvaluatorError>;
}

// ============================================================================
// SECTION: Stores
// ============================================================================

/// Object store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store I/O error.
    #[error("object store io error: {0}")]
    Io(String),
    /// Referenced object does not exist.
    #[error("object not found: {0}")]
    NotFound(String),
    /// Object already exists.
    #[error("object conflict: {0}")]
    Conflict(String),
    /// Stored data is invalid.
    #[error("object store invalid data: {0}")]
    Invalid(String),
    /// Store reported an error.
    #[error("object store error: {0}")]
    Store(String),
}

/// Source of protection profiles.
pub trait ProfileSource<P> {
    /// Lists the profiles stored in a namespace; empty lists every namespace.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when listing fails.
    fn list_profiles(&self, namespace: &str) -> Result<Vec<P>, StoreError>;

    /// Fetches a profile by reference.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    fn get_profile(&self, reference: &ProfileRef) -> Result<Option<P>, StoreError>;

    /// Persists a profile status.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the profile is missing or the write fails.
    fn update_status(&self, reference: &ProfileRef, status: &ProfileStatus) -> Result<(), StoreError>;
}

/// Source of sign policies and signature records.
pub trait SignatureSource {
    /// Fetches the sign policy object stored in a namespace.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    fn sign_policy(&self, namespace: &str) -> Result<Option<SignPolicyObject>, StoreError>;

    /// Lists signature records in a namespace matching a selector.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when listing fails.
    fn list_signatures(
        &self,
        namespace: &str,
        selector: &SignatureSelector,
    ) -> Result<Vec<SignatureRecord>, StoreError>;
}

/// Opaque version token of a persisted rule table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableVersion(pub u64);

/// Rule table read together with its version token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedTable {
    /// Table content.
    pub table: RuleTable,
    /// Version token read with the table.
    pub version: TableVersion,
}

/// Outcome of a compare-and-swap write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapOutcome {
    /// Write applied.
    Applied,
    /// Stored version differed from the expected version.
    Conflict,
}

/// Versioned document store for rule tables.
pub trait RuleTableStore {
    /// Reads a table and its version; `None` when the table was never written.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the read fails.
    fn read(&self, kind: RuleTableKind) -> Result<Option<VersionedTable>, StoreError>;

    /// Writes a table when the stored version equals `expected`.
    ///
    /// `expected` of `None` creates the table only when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn compare_and_swap(
        &self,
        kind: RuleTableKind,
        expected: Option<TableVersion>,
        table: &RuleTable,
    ) -> Result<SwapOutcome, StoreError>;
}

// ============================================================================
// SECTION: Events
// ============================================================================

/// Object an audit event is reported against.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvolvedObject {
    /// Object namespace.
    pub namespace: String,
    /// Object API version.
    pub api_version: String,
    /// Object kind.
    pub kind: String,
    /// Object name.
    pub name: String,
}

/// Denial audit event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEvent {
    /// Event namespace.
    pub namespace: String,
    /// Deterministic event name.
    pub name: String,
    /// Object the event is reported against.
    pub involved_object: InvolvedObject,
    /// Event message.
    pub message: String,
    /// Reason short code.
    pub reason: String,
    /// Number of occurrences.
    pub count: u32,
    /// First occurrence.
    pub first_timestamp: OffsetDateTime,
    /// Latest occurrence.
    pub last_timestamp: OffsetDateTime,
}

/// Event persistence.
pub trait EventStore {
    /// Fetches an event by namespace and name.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    fn get(&self, namespace: &str, name: &str) -> Result<Option<AuditEvent>, StoreError>;

    /// Creates a new event.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the event exists or the write fails.
    fn create(&self, event: &AuditEvent) -> Result<(), StoreError>;

    /// Replaces an existing event.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the event is missing or the write fails.
    fn update(&self, event: &AuditEvent) -> Result<(), StoreError>;
}

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Time source for status and event timestamps.
pub trait Clock {
    /// Returns the current time.
    fn now(&self) -> OffsetDateTime;
}
