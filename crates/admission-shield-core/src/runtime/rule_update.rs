// crates/admission-shield-core/src/runtime/rule_update.rs
// ============================================================================
// Module: Rule Table Maintenance
// Description: Compare-and-swap rewrites of the persisted rule tables.
// Purpose: Keep rule tables consistent under concurrent profile updates.
// Dependencies: thiserror, crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! Each persisted table is a versioned document. A profile change rewrites
//! every table as read, remove the profile's entries, add its new rules, and
//! compare-and-swap against the version that was read. Conflicts retry the
//! whole cycle up to a bounded number of attempts. `remove` is a no-op for
//! absent references, so a retried cycle produces the same table.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::identifiers::ProfileRef;
use crate::core::profile::ProfileRuleSets;
use crate::core::profile::ProtectionProfile;
use crate::core::rule::Rule;
use crate::core::rule_table::RuleTable;
use crate::core::rule_table::RuleTableKind;
use crate::core::rule_table::RuleTableSet;
use crate::interfaces::ProfileSource;
use crate::interfaces::RuleTableStore;
use crate::interfaces::StoreError;
use crate::interfaces::SwapOutcome;
use crate::runtime::loader::build_rule_tables;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Rule table maintenance errors.
#[derive(Debug, Error)]
pub enum RuleTableError {
    /// Every compare-and-swap attempt conflicted.
    #[error("rule table {kind} update conflicted after {attempts} attempts")]
    Exhausted {
        /// Table that could not be written.
        kind: RuleTableKind,
        /// Attempts made.
        attempts: u32,
    },
    /// Store failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

// ============================================================================
// SECTION: Maintainer
// ============================================================================

/// Bounded read-modify-write over the rule table store.
pub struct RuleTableMaintainer<'a> {
    /// Versioned table store.
    store: &'a dyn RuleTableStore,
    /// Attempts per table before giving up.
    max_attempts: u32,
}

impl<'a> RuleTableMaintainer<'a> {
    /// Creates a maintainer; at least one attempt is always made.
    #[must_use]
    pub fn new(store: &'a dyn RuleTableStore, max_attempts: u32) -> Self {
        Self {
            store,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Replaces the entries of `reference` in every table.
    ///
    /// `rules` of `None` removes the profile's entries without adding any.
    ///
    /// # Errors
    ///
    /// Returns [`RuleTableError`] when a store call fails or retries run out.
    pub fn rewrite_profile_rules(
        &self,
        reference: &ProfileRef,
        rules: Option<ProfileRuleSets<'_>>,
    ) -> Result<(), RuleTableError> {
        for kind in RuleTableKind::ALL {
            let kind_rules = rules.map(|sets| sets.for_kind(kind));
            self.update(kind, |table| rewrite_entries(table, reference, kind_rules))?;
        }
        Ok(())
    }

    /// Persists freshly built tables, replacing whatever is stored.
    ///
    /// # Errors
    ///
    /// Returns [`RuleTableError`] when a store call fails or retries run out.
    pub fn initialize(&self, tables: &RuleTableSet) -> Result<(), RuleTableError> {
        for kind in RuleTableKind::ALL {
            let fresh = tables.get(kind);
            self.update(kind, |table| table.clone_from(fresh))?;
        }
        Ok(())
    }

    /// Runs one bounded compare-and-swap cycle for a table.
    fn update(
        &self,
        kind: RuleTableKind,
        mut apply: impl FnMut(&mut RuleTable),
    ) -> Result<(), RuleTableError> {
        for _ in 0..self.max_attempts {
            let (mut table, version) = match self.store.read(kind)? {
                Some(current) => (current.table, Some(current.version)),
                None => (RuleTable::new(), None),
            };
            apply(&mut table);
            match self.store.compare_and_swap(kind, version, &table)? {
                SwapOutcome::Applied => return Ok(()),
                SwapOutcome::Conflict => {}
            }
        }
        Err(RuleTableError::Exhausted {
            kind,
            attempts: self.max_attempts,
        })
    }
}

// ============================================================================
// SECTION: Bootstrap
// ============================================================================

/// Builds the three tables from every enabled profile and persists them.
///
/// An empty namespace in `namespaces` lists profiles across all namespaces.
///
/// # Errors
///
/// Returns [`RuleTableError`] when listing profiles or writing a table fails.
pub fn initialize_rule_tables<P: ProtectionProfile>(
    source: &dyn ProfileSource<P>,
    namespaces: &[&str],
    store: &dyn RuleTableStore,
    max_attempts: u32,
) -> Result<RuleTableSet, RuleTableError> {
    let mut profiles = Vec::new();
    for namespace in namespaces {
        profiles.extend(source.list_profiles(namespace)?);
    }
    let tables = build_rule_tables(profiles.iter());
    RuleTableMaintainer::new(store, max_attempts).initialize(&tables)?;
    Ok(tables)
}

/// Removes the entries of `reference` and adds `rules` in their place.
fn rewrite_entries(table: &mut RuleTable, reference: &ProfileRef, rules: Option<&[Rule]>) {
    table.remove(reference);
    if let Some(rules) = rules {
        table.add(rules, reference);
    }
}
