// crates/admission-shield-config/src/config.rs
// ============================================================================
// Module: Admission Shield Configuration
// Description: Configuration loading and validation for Admission Shield.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: admission-shield-core, serde, thiserror, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits
//! and converted into the core [`EngineConfig`]. Missing or invalid
//! configuration fails closed.
//!
//! Security posture: config inputs are untrusted; every pattern is compiled
//! and every bound is checked before the engine sees it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use admission_shield_core::BreakGlassScope;
use admission_shield_core::DEFAULT_POLICY_API_GROUP;
use admission_shield_core::FieldPattern;
use admission_shield_core::PluginConfig;
use admission_shield_core::RequestPattern;
use admission_shield_core::Rule;
use admission_shield_core::ShieldMode;
use admission_shield_core::SignPolicy;
use admission_shield_core::SigningProfile;
use admission_shield_core::SigningProfileSpec;
use admission_shield_core::runtime::CacheTtls;
use admission_shield_core::runtime::DEFAULT_RULE_TABLE_MAX_ATTEMPTS;
use admission_shield_core::runtime::EngineConfig;
use admission_shield_core::runtime::LogScope;
use admission_shield_core::validate_field_pattern;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "admission-shield.toml";
/// Environment variable used to override the config path.
pub(crate) const CONFIG_ENV_VAR: &str = "ADMISSION_SHIELD_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum rule table compare-and-swap attempts.
pub(crate) const MAX_RULE_TABLE_ATTEMPTS: u32 = 32;
/// Maximum cache TTL in seconds.
pub(crate) const MAX_CACHE_TTL_SECS: u64 = 3600;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Admission Shield configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShieldConfig {
    /// Shield identity and enforcement settings.
    pub shield: ShieldSection,
    /// Requests admitted without any evaluation.
    #[serde(default)]
    pub unprocessed: Vec<RequestPattern>,
    /// Rules merged into every resolved profile.
    #[serde(default)]
    pub common_profile: SigningProfileSpec,
    /// Sign policy merged with the stored policy.
    #[serde(default)]
    pub sign_policy: SignPolicy,
    /// Verifier plugin toggles.
    #[serde(default)]
    pub plugins: Vec<PluginConfig>,
    /// Loader cache TTLs.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Rule table maintenance settings.
    #[serde(default)]
    pub rule_table: RuleTableConfig,
    /// Decision log settings.
    #[serde(default)]
    pub log: LogConfig,
}

/// Shield identity and enforcement settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShieldSection {
    /// Namespace the shield runs in.
    pub namespace: String,
    /// Shared profile namespace; defaults to the shield namespace.
    #[serde(default)]
    pub profile_namespace: Option<String>,
    /// Signature namespace; defaults to the shield namespace.
    #[serde(default)]
    pub signature_namespace: Option<String>,
    /// Enforcement mode.
    #[serde(default)]
    pub mode: ShieldMode,
    /// API group of the shield's own policy resources.
    #[serde(default = "default_policy_api_group")]
    pub policy_api_group: String,
    /// Administrator group patterns.
    #[serde(default)]
    pub admin_groups: Vec<String>,
    /// Shield server user name pattern.
    #[serde(default)]
    pub server_username: String,
    /// Whether admitted objects are labelled.
    #[serde(default = "default_true")]
    pub patch_enabled: bool,
}

/// Loader cache TTLs in seconds; zero disables caching.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Profile list TTL.
    #[serde(default = "default_profiles_ttl")]
    pub profiles_ttl_secs: u64,
    /// Sign policy TTL.
    #[serde(default = "default_sign_policy_ttl")]
    pub sign_policy_ttl_secs: u64,
    /// Signature record TTL.
    #[serde(default)]
    pub signatures_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        let ttls = CacheTtls::default();
        Self {
            profiles_ttl_secs: ttls.profiles.as_secs(),
            sign_policy_ttl_secs: ttls.sign_policy.as_secs(),
            signatures_ttl_secs: ttls.signatures.as_secs(),
        }
    }
}

impl CacheConfig {
    /// Validates TTL bounds.
    fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("cache.profiles_ttl_secs", self.profiles_ttl_secs),
            ("cache.sign_policy_ttl_secs", self.sign_policy_ttl_secs),
            ("cache.signatures_ttl_secs", self.signatures_ttl_secs),
        ] {
            if value > MAX_CACHE_TTL_SECS {
                return Err(ConfigError::Invalid(format!(
                    "{field} must be at most {MAX_CACHE_TTL_SECS}"
                )));
            }
        }
        Ok(())
    }

    /// Returns the TTLs as durations.
    #[must_use]
    pub const fn ttls(&self) -> CacheTtls {
        CacheTtls {
            profiles: Duration::from_secs(self.profiles_ttl_secs),
            sign_policy: Duration::from_secs(self.sign_policy_ttl_secs),
            signatures: Duration::from_secs(self.signatures_ttl_secs),
        }
    }
}

/// Rule table maintenance settings.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleTableConfig {
    /// Compare-and-swap attempts per table update.
    #[serde(default = "default_rule_table_attempts")]
    pub max_attempts: u32,
}

impl Default for RuleTableConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_RULE_TABLE_MAX_ATTEMPTS,
        }
    }
}

/// Decision log settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Include the request object in context records (never for secrets).
    #[serde(default)]
    pub include_request: bool,
    /// Console trace scope.
    #[serde(default)]
    pub console: LogScopeConfig,
    /// Context record scope.
    #[serde(default)]
    pub context: LogScopeConfig,
}

/// Request scope of one log stream.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogScopeConfig {
    /// Stream is enabled.
    #[serde(default)]
    pub enabled: bool,
    /// Requests logged; empty logs every request.
    #[serde(default)]
    pub in_scope: Vec<RequestPattern>,
    /// Requests never logged.
    #[serde(default)]
    pub out_of_scope: Vec<RequestPattern>,
}

impl LogScopeConfig {
    /// Converts into the runtime scope.
    fn to_scope(&self) -> LogScope {
        LogScope {
            enabled: self.enabled,
            in_scope: self.in_scope.clone(),
            out_of_scope: self.out_of_scope.clone(),
        }
    }
}

// ============================================================================
// SECTION: Loading and Validation
// ============================================================================

impl ShieldConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml(content)
    }

    /// Parses and validates configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shield.validate()?;
        validate_request_patterns("unprocessed", &self.unprocessed)?;
        validate_profile_spec(&self.common_profile)?;
        validate_sign_policy(&self.sign_policy)?;
        for plugin in &self.plugins {
            require_non_empty("plugins.name", &plugin.name)?;
        }
        self.cache.validate()?;
        if !(1..=MAX_RULE_TABLE_ATTEMPTS).contains(&self.rule_table.max_attempts) {
            return Err(ConfigError::Invalid(format!(
                "rule_table.max_attempts must be between 1 and {MAX_RULE_TABLE_ATTEMPTS}"
            )));
        }
        validate_request_patterns("log.console.in_scope", &self.log.console.in_scope)?;
        validate_request_patterns("log.console.out_of_scope", &self.log.console.out_of_scope)?;
        validate_request_patterns("log.context.in_scope", &self.log.context.in_scope)?;
        validate_request_patterns("log.context.out_of_scope", &self.log.context.out_of_scope)?;
        Ok(())
    }

    /// Returns the runtime engine configuration.
    #[must_use]
    pub fn engine_config(&self) -> EngineConfig {
        let shield = &self.shield;
        let mut config = EngineConfig::new(shield.namespace.trim());
        if let Some(namespace) = &shield.profile_namespace {
            config.profile_namespace = namespace.trim().to_string();
        }
        if let Some(namespace) = &shield.signature_namespace {
            config.signature_namespace = namespace.trim().to_string();
        }
        config.mode = shield.mode;
        config.policy_api_group.clone_from(&shield.policy_api_group);
        config.admin_groups = shield.admin_groups.iter().map(|group| FieldPattern::new(group.as_str())).collect();
        config.server_username = FieldPattern::new(shield.server_username.as_str());
        config.patch_enabled = shield.patch_enabled;
        config.unprocessed.clone_from(&self.unprocessed);
        config.common_profile = SigningProfile {
            spec: self.common_profile.clone(),
            ..SigningProfile::default()
        };
        config.sign_policy.clone_from(&self.sign_policy);
        config.plugins.clone_from(&self.plugins);
        config.cache_ttls = self.cache.ttls();
        config.rule_table_max_attempts = self.rule_table.max_attempts;
        config.console_log = self.log.console.to_scope();
        config.context_log = self.log.context.to_scope();
        config.include_request = self.log.include_request;
        config
    }
}

impl ShieldSection {
    /// Validates identity fields and requester patterns.
    fn validate(&self) -> Result<(), ConfigError> {
        require_non_empty("shield.namespace", &self.namespace)?;
        if let Some(namespace) = &self.profile_namespace {
            require_non_empty("shield.profile_namespace", namespace)?;
        }
        if let Some(namespace) = &self.signature_namespace {
            require_non_empty("shield.signature_namespace", namespace)?;
        }
        require_non_empty("shield.policy_api_group", &self.policy_api_group)?;
        for group in &self.admin_groups {
            require_non_empty("shield.admin_groups", group)?;
            validate_pattern("shield.admin_groups", &FieldPattern::new(group.as_str()))?;
        }
        validate_pattern("shield.server_username", &FieldPattern::new(self.server_username.as_str()))
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from the argument or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Rejects empty or whitespace-only values.
fn require_non_empty(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    Ok(())
}

/// Compiles every alternative of a field pattern.
fn validate_pattern(field: &str, pattern: &FieldPattern) -> Result<(), ConfigError> {
    validate_field_pattern(pattern).map_err(|err| ConfigError::Invalid(format!("{field}: {err}")))
}

/// Compiles every field pattern of a request pattern list.
fn validate_request_patterns(field: &str, patterns: &[RequestPattern]) -> Result<(), ConfigError> {
    patterns
        .iter()
        .flat_map(|pattern| pattern.patterns())
        .try_for_each(|pattern| validate_pattern(field, pattern))
}

/// Compiles every pattern of a rule list.
fn validate_rules(field: &str, rules: &[Rule]) -> Result<(), ConfigError> {
    for rule in rules {
        validate_request_patterns(field, &rule.match_patterns)?;
        validate_request_patterns(field, &rule.exclude)?;
    }
    Ok(())
}

/// Validates the common profile rules and attribute patterns.
fn validate_profile_spec(spec: &SigningProfileSpec) -> Result<(), ConfigError> {
    if spec.target_namespace_selector.is_some() {
        return Err(ConfigError::Invalid(
            "common_profile.targetNamespaceSelector is not supported".to_string(),
        ));
    }
    validate_rules("common_profile.protectRules", &spec.protect_rules)?;
    validate_rules("common_profile.ignoreRules", &spec.ignore_rules)?;
    validate_rules("common_profile.forceCheckRules", &spec.force_check_rules)?;
    for pattern in spec.protect_attrs.iter().chain(&spec.ignore_attrs).chain(&spec.unprotect_attrs) {
        validate_request_patterns("common_profile attrs", &pattern.match_patterns)?;
    }
    for pattern in &spec.kustomize_patterns {
        validate_request_patterns("common_profile.kustomizePatterns", &pattern.match_patterns)?;
    }
    Ok(())
}

/// Validates signer definitions and break-glass conditions.
fn validate_sign_policy(policy: &SignPolicy) -> Result<(), ConfigError> {
    for signer in &policy.signers {
        require_non_empty("sign_policy.signers.name", &signer.name)?;
    }
    for condition in &policy.break_glass {
        if condition.scope != BreakGlassScope::Cluster && condition.namespaces.is_empty() {
            return Err(ConfigError::Invalid(
                "sign_policy.breakGlass namespaced conditions must list namespaces".to_string(),
            ));
        }
        for namespace in &condition.namespaces {
            require_non_empty("sign_policy.breakGlass.namespaces", namespace)?;
        }
    }
    Ok(())
}

/// Default policy API group.
fn default_policy_api_group() -> String {
    DEFAULT_POLICY_API_GROUP.to_string()
}

/// Serde default for enabled flags.
const fn default_true() -> bool {
    true
}

/// Default profile list TTL, taken from the engine defaults.
fn default_profiles_ttl() -> u64 {
    CacheTtls::default().profiles.as_secs()
}

/// Default sign policy TTL, taken from the engine defaults.
fn default_sign_policy_ttl() -> u64 {
    CacheTtls::default().sign_policy.as_secs()
}

/// Default rule table attempts.
const fn default_rule_table_attempts() -> u32 {
    DEFAULT_RULE_TABLE_MAX_ATTEMPTS
}
