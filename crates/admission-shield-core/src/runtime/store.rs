// crates/admission-shield-core/src/runtime/store.rs
// ============================================================================
// Module: Admission Shield In-Memory Stores
// Description: In-memory collaborators for tests and local demos.
// Purpose: Provide deterministic stores and clocks without a cluster.
// Dependencies: time, crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! In-memory implementations of the store contracts and two clocks. Maps are
//! shared behind `Arc<Mutex<_>>` so clones observe the same data. They are
//! not intended for production use.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use time::Duration;
use time::OffsetDateTime;

use crate::core::identifiers::ProfileRef;
use crate::core::policy::SignPolicyObject;
use crate::core::policy::SignatureRecord;
use crate::core::policy::SignatureSelector;
use crate::core::profile::ProfileStatus;
use crate::core::profile::ProtectionProfile;
use crate::core::rule_table::RuleTable;
use crate::core::rule_table::RuleTableKind;
use crate::interfaces::AuditEvent;
use crate::interfaces::Clock;
use crate::interfaces::EventStore;
use crate::interfaces::ProfileSource;
use crate::interfaces::RuleTableStore;
use crate::interfaces::SignatureSource;
use crate::interfaces::StoreError;
use crate::interfaces::SwapOutcome;
use crate::interfaces::TableVersion;
use crate::interfaces::VersionedTable;

// ============================================================================
// SECTION: Profiles
// ============================================================================

/// In-memory profile store keyed by profile reference.
#[derive(Debug, Clone)]
pub struct InMemoryProfileStore<P> {
    /// Profiles protected by a mutex.
    profiles: Arc<Mutex<BTreeMap<ProfileRef, P>>>,
}

impl<P> Default for InMemoryProfileStore<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> InMemoryProfileStore<P> {
    /// Creates an empty profile store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            profiles: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }
}

impl<P: ProtectionProfile + Clone> InMemoryProfileStore<P> {
    /// Inserts or replaces a profile.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store lock is poisoned.
    pub fn insert(&self, profile: P) -> Result<(), StoreError> {
        lock(&self.profiles, "profile store")?.insert(profile.reference(), profile);
        Ok(())
    }

    /// Removes a profile.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store lock is poisoned.
    pub fn remove(&self, reference: &ProfileRef) -> Result<Option<P>, StoreError> {
        Ok(lock(&self.profiles, "profile store")?.remove(reference))
    }
}

impl<P: ProtectionProfile + Clone> ProfileSource<P> for InMemoryProfileStore<P> {
    fn list_profiles(&self, namespace: &str) -> Result<Vec<P>, StoreError> {
        let guard = lock(&self.profiles, "profile store")?;
        Ok(guard
            .iter()
            .filter(|(reference, _)| namespace.is_empty() || reference.namespace == namespace)
            .map(|(_, profile)| profile.clone())
            .collect())
    }

    fn get_profile(&self, reference: &ProfileRef) -> Result<Option<P>, StoreError> {
        Ok(lock(&self.profiles, "profile store")?.get(reference).cloned())
    }

    fn update_status(&self, reference: &ProfileRef, status: &ProfileStatus) -> Result<(), StoreError> {
        let mut guard = lock(&self.profiles, "profile store")?;
        let profile = guard
            .get_mut(reference)
            .ok_or_else(|| StoreError::NotFound(reference.to_string()))?;
        *profile.status_mut() = status.clone();
        drop(guard);
        Ok(())
    }
}

// ============================================================================
// SECTION: Signatures
// ============================================================================

/// In-memory sign policy and signature record store.
#[derive(Debug, Clone, Default)]
pub struct InMemorySignatureStore {
    /// Sign policy objects keyed by namespace.
    policies: Arc<Mutex<BTreeMap<String, SignPolicyObject>>>,
    /// Signature records keyed by namespace and name.
    signatures: Arc<Mutex<BTreeMap<(String, String), SignatureRecord>>>,
}

impl InMemorySignatureStore {
    /// Creates an empty signature store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the sign policy of a namespace.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store lock is poisoned.
    pub fn put_sign_policy(&self, policy: SignPolicyObject) -> Result<(), StoreError> {
        lock(&self.policies, "sign policy store")?.insert(policy.metadata.namespace.clone(), policy);
        Ok(())
    }

    /// Inserts or replaces a signature record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store lock is poisoned.
    pub fn insert_signature(&self, record: SignatureRecord) -> Result<(), StoreError> {
        let key = (record.metadata.namespace.clone(), record.metadata.name.clone());
        lock(&self.signatures, "signature store")?.insert(key, record);
        Ok(())
    }
}

impl SignatureSource for InMemorySignatureStore {
    fn sign_policy(&self, namespace: &str) -> Result<Option<SignPolicyObject>, StoreError> {
        Ok(lock(&self.policies, "sign policy store")?.get(namespace).cloned())
    }

    fn list_signatures(
        &self,
        namespace: &str,
        selector: &SignatureSelector,
    ) -> Result<Vec<SignatureRecord>, StoreError> {
        let guard = lock(&self.signatures, "signature store")?;
        Ok(guard
            .iter()
            .filter(|((ns, _), record)| ns == namespace && selector.matches(&record.metadata.labels))
            .map(|(_, record)| record.clone())
            .collect())
    }
}

// ============================================================================
// SECTION: Rule Tables
// ============================================================================

/// In-memory versioned rule table store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRuleTableStore {
    /// Tables with their version counters.
    tables: Arc<Mutex<BTreeMap<RuleTableKind, (RuleTable, u64)>>>,
}

impl InMemoryRuleTableStore {
    /// Creates an empty rule table store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl RuleTableStore for InMemoryRuleTableStore {
    fn read(&self, kind: RuleTableKind) -> Result<Option<VersionedTable>, StoreError> {
        let guard = lock(&self.tables, "rule table store")?;
        Ok(guard.get(&kind).map(|(table, version)| VersionedTable {
            table: table.clone(),
            version: TableVersion(*version),
        }))
    }

    fn compare_and_swap(
        &self,
        kind: RuleTableKind,
        expected: Option<TableVersion>,
        table: &RuleTable,
    ) -> Result<SwapOutcome, StoreError> {
        let mut guard = lock(&self.tables, "rule table store")?;
        let current = guard.get(&kind).map(|(_, version)| TableVersion(*version));
        if current != expected {
            return Ok(SwapOutcome::Conflict);
        }
        let next = current.map_or(1, |TableVersion(version)| version.saturating_add(1));
        guard.insert(kind, (table.clone(), next));
        drop(guard);
        Ok(SwapOutcome::Applied)
    }
}

// ============================================================================
// SECTION: Events
// ============================================================================

/// In-memory event store keyed by namespace and name.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventStore {
    /// Events protected by a mutex.
    events: Arc<Mutex<BTreeMap<(String, String), AuditEvent>>>,
}

impl InMemoryEventStore {
    /// Creates an empty event store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every stored event ordered by namespace and name.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store lock is poisoned.
    pub fn events(&self) -> Result<Vec<AuditEvent>, StoreError> {
        Ok(lock(&self.events, "event store")?.values().cloned().collect())
    }
}

impl EventStore for InMemoryEventStore {
    fn get(&self, namespace: &str, name: &str) -> Result<Option<AuditEvent>, StoreError> {
        let key = (namespace.to_string(), name.to_string());
        Ok(lock(&self.events, "event store")?.get(&key).cloned())
    }

    fn create(&self, event: &AuditEvent) -> Result<(), StoreError> {
        let key = (event.namespace.clone(), event.name.clone());
        let mut guard = lock(&self.events, "event store")?;
        if guard.contains_key(&key) {
            return Err(StoreError::Conflict(format!("{}/{}", event.namespace, event.name)));
        }
        guard.insert(key, event.clone());
        drop(guard);
        Ok(())
    }

    fn update(&self, event: &AuditEvent) -> Result<(), StoreError> {
        let key = (event.namespace.clone(), event.name.clone());
        let mut guard = lock(&self.events, "event store")?;
        let slot = guard
            .get_mut(&key)
            .ok_or_else(|| StoreError::NotFound(format!("{}/{}", event.namespace, event.name)))?;
        *slot = event.clone();
        drop(guard);
        Ok(())
    }
}

// ============================================================================
// SECTION: Clocks
// ============================================================================

/// Wall clock in UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Manually driven clock for deterministic tests.
#[derive(Debug, Clone)]
pub struct ManualClock {
    /// Current time protected by a mutex.
    now: Arc<Mutex<OffsetDateTime>>,
}

impl ManualClock {
    /// Creates a clock frozen at `start`.
    #[must_use]
    pub fn new(start: OffsetDateTime) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        if let Ok(mut guard) = self.now.lock() {
            *guard += by;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> OffsetDateTime {
        self.now.lock().map_or(OffsetDateTime::UNIX_EPOCH, |guard| *guard)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Locks a store map, mapping poisoning to a store error.
fn lock<'a, T>(
    mutex: &'a Mutex<T>,
    label: &str,
) -> Result<std::sync::MutexGuard<'a, T>, StoreError> {
    mutex.lock().map_err(|_| StoreError::Store(format!("{label} mutex poisoned")))
}
