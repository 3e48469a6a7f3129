// crates/admission-shield-config/src/lib.rs
// ============================================================================
// Module: Admission Shield Config Library
// Description: Canonical config model and fail-closed validation.
// Purpose: Single source of truth for admission-shield.toml semantics.
// Dependencies: admission-shield-core, serde, thiserror, toml
// ============================================================================

//! ## Overview
//! `admission-shield-config` defines the configuration model of the
//! Admission Shield decision engine. It loads TOML with strict limits,
//! validates every pattern and bound, and produces the runtime
//! `EngineConfig`.
//!
//! Security posture: config inputs are untrusted; invalid configuration is
//! rejected rather than defaulted.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
