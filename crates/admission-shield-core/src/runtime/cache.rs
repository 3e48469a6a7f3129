// crates/admission-shield-core/src/runtime/cache.rs
// ============================================================================
// Module: Loader Cache
// Description: Namespace and kind keyed TTL cache for store lookups.
// Purpose: Share recent profile, policy, and signature lookups across requests.
// Dependencies: time, crate::core
// ============================================================================

//! ## Overview
//! Each loader kind gets its own [`TtlCache`] with a configured TTL. A TTL of
//! zero disables caching so every lookup reaches the store. Only
//! non-empty results are cached, so a newly created object is visible on
//! the next request instead of after the TTL expires.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

use time::OffsetDateTime;

use crate::core::policy::SignPolicyObject;
use crate::core::policy::SignatureRecord;

// ============================================================================
// SECTION: Keys and Values
// ============================================================================

/// Kind of loader owning a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LoaderKind {
    /// Profile lists.
    Profiles,
    /// Sign policy objects.
    SignPolicy,
    /// Signature record lists.
    Signatures,
}

/// Cache key: loader kind, namespace, and optional selector.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CacheKey {
    /// Owning loader.
    pub loader: LoaderKind,
    /// Namespace of the lookup.
    pub namespace: String,
    /// Extra selector; empty when unused.
    pub selector: String,
}

impl CacheKey {
    /// Creates a key without a selector.
    #[must_use]
    pub fn new(loader: LoaderKind, namespace: &str) -> Self {
        Self {
            loader,
            namespace: namespace.to_string(),
            selector: String::new(),
        }
    }

    /// Adds a selector to the key.
    #[must_use]
    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = selector.into();
        self
    }
}

/// Values that may be cached.
pub trait CacheValue: Clone {
    /// Returns true when the value should be cached.
    fn is_cacheable(&self) -> bool;
}

impl<T: Clone> CacheValue for Vec<T> {
    fn is_cacheable(&self) -> bool {
        !self.is_empty()
    }
}

impl<T: Clone> CacheValue for Option<T> {
    fn is_cacheable(&self) -> bool {
        self.is_some()
    }
}

// ============================================================================
// SECTION: TTL Cache
// ============================================================================

/// Cached value with its insertion time.
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    /// Cached value.
    value: V,
    /// Insertion time.
    stored_at: OffsetDateTime,
}

/// TTL cache keyed by [`CacheKey`].
#[derive(Debug)]
pub struct TtlCache<V> {
    /// Entry lifetime; zero disables caching.
    ttl: Duration,
    /// Cached entries.
    entries: Mutex<BTreeMap<CacheKey, CacheEntry<V>>>,
}

impl<V: CacheValue> TtlCache<V> {
    /// Creates an empty cache.
    #[must_use]
    pub const fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    /// Returns a fresh cached value.
    #[must_use]
    pub fn get(&self, key: &CacheKey, now: OffsetDateTime) -> Option<V> {
        if self.ttl.is_zero() {
            return None;
        }
        let entries = self.entries.lock().ok()?;
        let entry = entries.get(key)?;
        let age = now - entry.stored_at;
        (!age.is_negative() && age.unsigned_abs() < self.ttl).then(|| entry.value.clone())
    }

    /// Stores a value when caching is enabled and the value is cacheable.
    pub fn put(&self, key: CacheKey, value: &V, now: OffsetDateTime) {
        if self.ttl.is_zero() || !value.is_cacheable() {
            return;
        }
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(
                key,
                CacheEntry {
                    value: value.clone(),
                    stored_at: now,
                },
            );
        }
    }

    /// Returns the cached value or loads and caches it.
    ///
    /// # Errors
    ///
    /// Returns the loader error unchanged.
    pub fn get_or_load<E>(
        &self,
        key: CacheKey,
        now: OffsetDateTime,
        load: impl FnOnce() -> Result<V, E>,
    ) -> Result<V, E> {
        if let Some(value) = self.get(&key, now) {
            return Ok(value);
        }
        let value = load()?;
        self.put(key, &value, now);
        Ok(value)
    }
}

// ============================================================================
// SECTION: Loader Caches
// ============================================================================

/// Per-entity cache TTLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtls {
    /// Profile list TTL.
    pub profiles: Duration,
    /// Sign policy TTL.
    pub sign_policy: Duration,
    /// Signature record TTL.
    pub signatures: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            profiles: Duration::from_secs(60),
            sign_policy: Duration::from_secs(10),
            signatures: Duration::ZERO,
        }
    }
}

/// Caches shared by every per-request loader.
#[derive(Debug)]
pub struct LoaderCaches<P> {
    /// Profile lists per namespace.
    pub profiles: TtlCache<Vec<P>>,
    /// Sign policy objects per namespace.
    pub sign_policy: TtlCache<Option<SignPolicyObject>>,
    /// Signature records per namespace and selector.
    pub signatures: TtlCache<Vec<SignatureRecord>>,
}

impl<P: Clone> LoaderCaches<P> {
    /// Creates empty caches with the given TTLs.
    #[must_use]
    pub const fn new(ttls: CacheTtls) -> Self {
        Self {
            profiles: TtlCache::new(ttls.profiles),
            sign_policy: TtlCache::new(ttls.sign_policy),
            signatures: TtlCache::new(ttls.signatures),
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
