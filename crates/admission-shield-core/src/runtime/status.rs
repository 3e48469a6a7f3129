// crates/admission-shield-core/src/runtime/status.rs
// ============================================================================
// Module: Profile Status Tracker
// Description: Denial bookkeeping for the profile that denied a request.
// Purpose: Stamp and record denials, then hand the status to the store.
// Dependencies: time, crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! [`ProfileStatusTracker::update_status`] is a pure transformation: it
//! returns the profile with one more denial recorded. Persisting the new
//! status is a separate step so callers can decide how store failures are
//! reported.

// ============================================================================
// SECTION: Imports
// ============================================================================

use time::OffsetDateTime;
use time::UtcOffset;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

use crate::core::profile::ProtectionProfile;
use crate::core::request::RequestSnapshot;
use crate::interfaces::Clock;
use crate::interfaces::ProfileSource;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Timestamp layout of status entries (UTC).
const STATUS_TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

// ============================================================================
// SECTION: Tracker
// ============================================================================

/// Records denials in profile status.
pub struct ProfileStatusTracker<'a> {
    /// Time source for status timestamps.
    clock: &'a dyn Clock,
}

impl<'a> ProfileStatusTracker<'a> {
    /// Creates a tracker.
    #[must_use]
    pub const fn new(clock: &'a dyn Clock) -> Self {
        Self {
            clock,
        }
    }

    /// Returns the profile with the denial of `request` recorded.
    #[must_use]
    pub fn update_status<P: ProtectionProfile>(
        &self,
        mut profile: P,
        request: RequestSnapshot,
        message: &str,
    ) -> P {
        let timestamp = format_status_timestamp(self.clock.now());
        profile.update_status(request, message, timestamp);
        profile
    }

    /// Records the denial and persists the new status.
    ///
    /// Profiles without an identity (the stand-in empty profile) are not
    /// persisted.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the status write fails.
    pub fn record_denial<P: ProtectionProfile>(
        &self,
        profile: P,
        request: RequestSnapshot,
        message: &str,
        store: &dyn ProfileSource<P>,
    ) -> Result<P, StoreError> {
        let updated = self.update_status(profile, request, message);
        let reference = updated.reference();
        if !reference.is_empty() {
            store.update_status(&reference, updated.status())?;
        }
        Ok(updated)
    }
}

/// Formats a status timestamp as `YYYY-MM-DD HH:MM:SS` in UTC.
#[must_use]
pub fn format_status_timestamp(now: OffsetDateTime) -> String {
    now.to_offset(UtcOffset::UTC).format(STATUS_TIMESTAMP_FORMAT).unwrap_or_default()
}

// ============================================================================
// SECTION: Tests
// ============================================================================
