// crates/admission-shield-core/src/runtime/settings.rs
// ============================================================================
// Module: Engine Settings
// Description: Runtime configuration consumed by the decision engine.
// Purpose: Carry identity, policy, and tuning inputs into each decision call.
// Dependencies: serde, crate::core, crate::runtime::{audit, cache}
// ============================================================================

//! ## Overview
//! [`EngineConfig`] is the fully validated runtime view of the shield
//! configuration. File loading and validation live in the config crate;
//! the engine only reads these values.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::DEFAULT_POLICY_API_GROUP;
use crate::core::matcher::field_matches;
use crate::core::policy::PluginConfig;
use crate::core::policy::SignPolicy;
use crate::core::profile::SigningProfile;
use crate::core::request::RequestContext;
use crate::core::rule::FieldPattern;
use crate::core::rule::RequestPattern;
use crate::runtime::audit::LogScope;
use crate::runtime::cache::CacheTtls;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default bound on rule table compare-and-swap attempts.
pub const DEFAULT_RULE_TABLE_MAX_ATTEMPTS: u32 = 5;

// ============================================================================
// SECTION: Mode
// ============================================================================

/// Enforcement mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShieldMode {
    /// Denials are enforced.
    #[default]
    Enforce,
    /// Denials are logged and converted to allows.
    Detect,
}

// ============================================================================
// SECTION: Engine Config
// ============================================================================

/// Runtime configuration of the decision engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Namespace the shield runs in.
    pub shield_namespace: String,
    /// Shared profile namespace.
    pub profile_namespace: String,
    /// Shared signature namespace.
    pub signature_namespace: String,
    /// Enforcement mode.
    pub mode: ShieldMode,
    /// API group of the shield's own policy resources.
    pub policy_api_group: String,
    /// Group patterns identifying shield administrators.
    pub admin_groups: Vec<FieldPattern>,
    /// User pattern identifying the shield server itself.
    pub server_username: FieldPattern,
    /// Requests that are never processed.
    pub unprocessed: Vec<RequestPattern>,
    /// Profile merged into every evaluated profile.
    pub common_profile: SigningProfile,
    /// Configured sign policy merged with the stored one.
    pub sign_policy: SignPolicy,
    /// Verifier plugins.
    pub plugins: Vec<PluginConfig>,
    /// Label patches are emitted on allow.
    pub patch_enabled: bool,
    /// Store lookup cache TTLs.
    pub cache_ttls: CacheTtls,
    /// Bound on rule table compare-and-swap attempts.
    pub rule_table_max_attempts: u32,
    /// Console log scope.
    pub console_log: LogScope,
    /// Context log scope.
    pub context_log: LogScope,
    /// Context records include the request object.
    pub include_request: bool,
}

impl EngineConfig {
    /// Creates a configuration with defaults for everything but the namespace.
    #[must_use]
    pub fn new(shield_namespace: impl Into<String>) -> Self {
        let shield_namespace = shield_namespace.into();
        Self {
            profile_namespace: shield_namespace.clone(),
            signature_namespace: shield_namespace.clone(),
            shield_namespace,
            mode: ShieldMode::Enforce,
            policy_api_group: DEFAULT_POLICY_API_GROUP.to_string(),
            admin_groups: Vec::new(),
            server_username: FieldPattern::default(),
            unprocessed: Vec::new(),
            common_profile: SigningProfile::default(),
            sign_policy: SignPolicy::default(),
            plugins: Vec::new(),
            patch_enabled: true,
            cache_ttls: CacheTtls::default(),
            rule_table_max_attempts: DEFAULT_RULE_TABLE_MAX_ATTEMPTS,
            console_log: LogScope::default(),
            context_log: LogScope::default(),
            include_request: false,
        }
    }

    /// Returns true when the engine runs in detect-only mode.
    #[must_use]
    pub fn detect_only(&self) -> bool {
        self.mode == ShieldMode::Detect
    }

    /// Returns true when the requester is in a shield administrator group.
    #[must_use]
    pub fn is_admin_request(&self, request: &RequestContext) -> bool {
        self.admin_groups.iter().any(|pattern| {
            request.user_info.groups.iter().any(|group| field_matches(pattern, group))
        })
    }

    /// Returns true when the requester is the shield server itself.
    ///
    /// An unset server user pattern never matches.
    #[must_use]
    pub fn is_server_request(&self, request: &RequestContext) -> bool {
        self.server_username.alternatives().next().is_some()
            && field_matches(&self.server_username, &request.user_info.username)
    }

    /// Returns the enabled plugins.
    #[must_use]
    pub fn enabled_plugins(&self) -> Vec<PluginConfig> {
        self.plugins.iter().filter(|plugin| plugin.enabled).cloned().collect()
    }
}
