//! Configuration Module
//!
//! Provides the normative engine configuration loaded from TOML files: the
//! variable-key scheme shared by the reference tables and subject data, the
//! reference loader settings, and numeric thresholds.
//!
//! ## Loading Order
//!
//! 1. `NORMATEP_CONFIG` environment variable (path to TOML file)
//! 2. `normatep.toml` in the current working directory
//! 3. Built-in defaults
//!
//! ## Usage
//!
//! Call `config::init()` once at startup, then `config::get()` anywhere:
//!
//! ```ignore
//! config::init(NormativeConfig::load());
//!
//! let separator = &config::current().keys.separator;
//! ```
//!
//! Library entry points that need configuration use `config::current()`,
//! which falls back to defaults when `init()` was never called.

mod normative_config;
pub mod defaults;

pub use normative_config::*;

use std::sync::OnceLock;

/// Global configuration, initialized once at startup.
static NORMATIVE_CONFIG: OnceLock<NormativeConfig> = OnceLock::new();

/// Built-in defaults, materialised lazily for `current()`.
static DEFAULT_CONFIG: OnceLock<NormativeConfig> = OnceLock::new();

/// Initialize the global configuration.
///
/// Later calls are ignored with a warning.
pub fn init(config: NormativeConfig) {
    if NORMATIVE_CONFIG.set(config).is_err() {
        tracing::warn!("config::init() called more than once, ignoring");
    }
}

/// Get the global configuration, if `init()` has been called.
pub fn get() -> Option<&'static NormativeConfig> {
    NORMATIVE_CONFIG.get()
}

/// Check whether the config has been initialized.
pub fn is_initialized() -> bool {
    NORMATIVE_CONFIG.get().is_some()
}

/// The global configuration, or the built-in defaults when uninitialised.
pub fn current() -> &'static NormativeConfig {
    NORMATIVE_CONFIG
        .get()
        .unwrap_or_else(|| DEFAULT_CONFIG.get_or_init(NormativeConfig::default))
}
