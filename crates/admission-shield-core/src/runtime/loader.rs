// crates/admission-shield-core/src/runtime/loader.rs
// ============================================================================
// Module: Profile Loader
// Description: Per-request facade over profile, policy, and signature stores.
// Purpose: Resolve profile references and policy inputs through shared caches.
// Dependencies: crate::core, crate::interfaces, crate::runtime::{cache, settings}
// ============================================================================

//! ## Overview
//! A [`ProfileLoader`] is built for one request and holds only borrowed
//! collaborators: the stores, the shared [`LoaderCaches`], and the clock.
//! Store failures never abort a lookup; they are collected in
//! [`Loaded::failures`] so the caller can log them and continue with what
//! resolved.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::identifiers::ProfileRef;
use crate::core::policy::SignPolicy;
use crate::core::policy::SignatureRecord;
use crate::core::policy::SignatureSelector;
use crate::core::profile::ProtectionProfile;
use crate::core::profile::SigningProfile;
use crate::core::rule_table::RuleTableKind;
use crate::core::rule_table::RuleTableSet;
use crate::interfaces::Clock;
use crate::interfaces::ProfileSource;
use crate::interfaces::SignatureSource;
use crate::interfaces::StoreError;
use crate::runtime::cache::CacheKey;
use crate::runtime::cache::LoaderCaches;
use crate::runtime::cache::LoaderKind;
use crate::runtime::settings::EngineConfig;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Lookup result together with the store failures met along the way.
#[derive(Debug)]
pub struct Loaded<T> {
    /// Resolved value.
    pub value: T,
    /// Store failures that were skipped.
    pub failures: Vec<StoreError>,
}

impl<T> Loaded<T> {
    /// Wraps a value without failures.
    #[must_use]
    pub const fn ok(value: T) -> Self {
        Self {
            value,
            failures: Vec::new(),
        }
    }
}

/// Borrowed collaborators of a loader.
pub struct LoaderSources<'a, P> {
    /// Profile store.
    pub profiles: &'a dyn ProfileSource<P>,
    /// Sign policy and signature store.
    pub signatures: &'a dyn SignatureSource,
    /// Shared lookup caches.
    pub caches: &'a LoaderCaches<P>,
    /// Time source for cache expiry.
    pub clock: &'a dyn Clock,
}

// ============================================================================
// SECTION: Profile Loader
// ============================================================================

/// Per-request loader facade.
pub struct ProfileLoader<'a, P> {
    /// Engine configuration.
    config: &'a EngineConfig,
    /// Store collaborators.
    sources: LoaderSources<'a, P>,
    /// Namespace of the request being decided.
    request_namespace: &'a str,
}

impl<'a, P> ProfileLoader<'a, P>
where
    P: ProtectionProfile + Clone + Default + From<SigningProfile>,
{
    /// Creates a loader for one request.
    #[must_use]
    pub const fn new(
        config: &'a EngineConfig,
        sources: LoaderSources<'a, P>,
        request_namespace: &'a str,
    ) -> Self {
        Self {
            config,
            sources,
            request_namespace,
        }
    }

    /// Resolves references into enabled profiles merged with the common profile.
    ///
    /// When no reference resolves, one empty profile stands in so the common
    /// profile still applies.
    #[must_use]
    pub fn signing_profiles(&self, references: &[ProfileRef]) -> Loaded<Vec<P>> {
        let mut failures = Vec::new();
        let mut resolved = Vec::new();
        for reference in references {
            match self.sources.profiles.get_profile(reference) {
                Ok(Some(profile)) => resolved.push(profile),
                Ok(None) => failures.push(StoreError::NotFound(reference.to_string())),
                Err(err) => failures.push(err),
            }
        }
        if resolved.is_empty() {
            resolved.push(P::default());
        }
        let common = P::from(self.config.common_profile.clone());
        let value = resolved
            .iter()
            .map(|profile| profile.merge(&common))
            .filter(|profile| !profile.is_disabled())
            .collect();
        Loaded {
            value,
            failures,
        }
    }

    /// Lists profiles from the shield, profile, and request namespaces.
    #[must_use]
    pub fn profiles_in_scope(&self) -> Loaded<Vec<P>> {
        let mut failures = Vec::new();
        let mut value = Vec::new();
        let now = self.sources.clock.now();
        for namespace in self.scope_namespaces() {
            let key = CacheKey::new(LoaderKind::Profiles, namespace);
            match self
                .sources
                .caches
                .profiles
                .get_or_load(key, now, || self.sources.profiles.list_profiles(namespace))
            {
                Ok(profiles) => value.extend(profiles),
                Err(err) => failures.push(err),
            }
        }
        Loaded {
            value,
            failures,
        }
    }

    /// Aggregates the rule tables of every enabled profile in scope.
    #[must_use]
    pub fn aggregate_rule_tables(&self) -> Loaded<RuleTableSet> {
        let Loaded {
            value: profiles,
            failures,
        } = self.profiles_in_scope();
        Loaded {
            value: build_rule_tables(profiles.iter()),
            failures,
        }
    }

    /// Returns the configured sign policy merged with the stored one.
    #[must_use]
    pub fn merged_sign_policy(&self) -> Loaded<SignPolicy> {
        let namespace = self.config.shield_namespace.as_str();
        let key = CacheKey::new(LoaderKind::SignPolicy, namespace);
        let now = self.sources.clock.now();
        match self
            .sources
            .caches
            .sign_policy
            .get_or_load(key, now, || self.sources.signatures.sign_policy(namespace))
        {
            Ok(Some(stored)) => Loaded::ok(self.config.sign_policy.merge(&stored.spec)),
            Ok(None) => Loaded::ok(self.config.sign_policy.clone()),
            Err(err) => Loaded {
                value: self.config.sign_policy.clone(),
                failures: vec![err],
            },
        }
    }

    /// Lists signature records for an object type, newest first.
    #[must_use]
    pub fn signatures(&self, selector: &SignatureSelector) -> Loaded<Vec<SignatureRecord>> {
        let mut failures = Vec::new();
        let mut value: Vec<SignatureRecord> = Vec::new();
        let now = self.sources.clock.now();
        let namespaces = unique([self.config.signature_namespace.as_str(), self.request_namespace]);
        for namespace in namespaces {
            let key = CacheKey::new(LoaderKind::Signatures, namespace)
                .with_selector(selector.to_label_selector());
            match self
                .sources
                .caches
                .signatures
                .get_or_load(key, now, || self.sources.signatures.list_signatures(namespace, selector))
            {
                Ok(records) => value.extend(records),
                Err(err) => failures.push(err),
            }
        }
        value.sort_by_key(|record| std::cmp::Reverse(record.signed_at()));
        Loaded {
            value,
            failures,
        }
    }

    /// Returns the distinct namespaces profiles are listed from.
    fn scope_namespaces(&self) -> Vec<&'a str> {
        unique([
            self.config.shield_namespace.as_str(),
            self.config.profile_namespace.as_str(),
            self.request_namespace,
        ])
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds all three rule tables from the enabled profiles.
pub fn build_rule_tables<'p, P>(profiles: impl IntoIterator<Item = &'p P>) -> RuleTableSet
where
    P: ProtectionProfile + 'p,
{
    let mut tables = RuleTableSet::default();
    for profile in profiles.into_iter().filter(|profile| !profile.is_disabled()) {
        let reference = profile.reference();
        let rule_sets = profile.rule_sets();
        for kind in RuleTableKind::ALL {
            tables.get_mut(kind).add(rule_sets.for_kind(kind), &reference);
        }
    }
    tables
}

/// Drops repeated and empty namespaces while keeping order.
fn unique<const N: usize>(namespaces: [&str; N]) -> Vec<&str> {
    let mut out: Vec<&str> = Vec::with_capacity(N);
    for namespace in namespaces {
        if !namespace.is_empty() && !out.contains(&namespace) {
            out.push(namespace);
        }
    }
    out
}
