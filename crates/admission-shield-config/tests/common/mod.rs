// crates/admission-shield-config/tests/common/mod.rs
// =============================================================================
// Module: Config Test Helpers
// Description: Shared helpers for config validation tests.
// Purpose: Reduce duplication across integration tests for admission-shield-config.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use admission_shield_config::ConfigError;
use admission_shield_config::ShieldConfig;

/// Minimal valid configuration text.
pub const MINIMAL_TOML: &str = r#"
[shield]
namespace = "shield-system"
"#;

/// Parses and validates a TOML string for tests.
pub fn config_from_toml(toml_str: &str) -> Result<ShieldConfig, ConfigError> {
    ShieldConfig::from_toml(toml_str)
}

/// Returns a minimal config with all defaults applied.
pub fn minimal_config() -> Result<ShieldConfig, ConfigError> {
    config_from_toml(MINIMAL_TOML)
}

/// Returns the minimal config text followed by `extra`.
pub fn with_sections(extra: &str) -> String {
    format!("{MINIMAL_TOML}\n{extra}")
}
