// crates/admission-shield-core/src/runtime/events.rs
// ============================================================================
// Module: Denial Events
// Description: Deterministically named audit events for denied requests.
// Purpose: Create or refresh one event per denied operation, kind, and name.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! Denials are reported as events named `shield-deny-<op>-<kind>-<name>`.
//! A repeated denial refreshes the existing event and increments its count
//! instead of creating a duplicate. Cluster-scoped resources have no
//! namespace, so their events are reported in the shield namespace against
//! the shield server deployment.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::identifiers::SHIELD_SERVER_NAME;
use crate::core::request::RequestContext;
use crate::core::request::ResourceScope;
use crate::core::results::DecisionResult;
use crate::interfaces::AuditEvent;
use crate::interfaces::Clock;
use crate::interfaces::EventStore;
use crate::interfaces::InvolvedObject;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: Recorder
// ============================================================================

/// Creates or updates denial events.
pub struct DenialEventRecorder<'a> {
    /// Event persistence.
    store: &'a dyn EventStore,
    /// Time source for event timestamps.
    clock: &'a dyn Clock,
    /// Namespace cluster-scope events are reported in.
    shield_namespace: &'a str,
}

impl<'a> DenialEventRecorder<'a> {
    /// Creates a recorder.
    #[must_use]
    pub const fn new(store: &'a dyn EventStore, clock: &'a dyn Clock, shield_namespace: &'a str) -> Self {
        Self {
            store,
            clock,
            shield_namespace,
        }
    }

    /// Records the denial of `request`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup or write fails.
    pub fn record(
        &self,
        request: &RequestContext,
        decision: &DecisionResult,
    ) -> Result<AuditEvent, StoreError> {
        let name = denial_event_name(request);
        let (namespace, involved_object) = match request.resource_scope {
            ResourceScope::Namespaced => (
                request.namespace.clone(),
                InvolvedObject {
                    namespace: request.namespace.clone(),
                    api_version: request.group_version(),
                    kind: request.kind.clone(),
                    name: request.name.clone(),
                },
            ),
            ResourceScope::Cluster => (
                self.shield_namespace.to_string(),
                InvolvedObject {
                    namespace: self.shield_namespace.to_string(),
                    api_version: "apps/v1".to_string(),
                    kind: "Deployment".to_string(),
                    name: SHIELD_SERVER_NAME.to_string(),
                },
            ),
        };
        let message = format!("{}, Resource: {}", decision.message, request.resource_ref());
        let reason = decision.reason_code.code().to_string();
        let now = self.clock.now();

        if let Some(mut existing) = self.store.get(&namespace, &name)? {
            existing.message = message;
            existing.reason = reason;
            existing.count = existing.count.saturating_add(1);
            existing.last_timestamp = now;
            self.store.update(&existing)?;
            return Ok(existing);
        }

        let event = AuditEvent {
            namespace,
            name,
            involved_object,
            message,
            reason,
            count: 1,
            first_timestamp: now,
            last_timestamp: now,
        };
        self.store.create(&event)?;
        Ok(event)
    }
}

/// Returns the deterministic event name of a denial.
#[must_use]
pub fn denial_event_name(request: &RequestContext) -> String {
    format!(
        "shield-deny-{}-{}-{}",
        request.operation.as_str().to_lowercase(),
        request.kind.to_lowercase(),
        request.name
    )
}
