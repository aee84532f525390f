//! Normative Configuration - key scheme, loader and numeric thresholds as TOML values
//!
//! Each struct implements `Default` with the values in `defaults.rs`, so an
//! empty or missing config file behaves exactly like the built-in settings.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use super::defaults;
use crate::codec::KeyScheme;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for the normative engine.
///
/// Load with `NormativeConfig::load()` which searches:
/// 1. `$NORMATEP_CONFIG` env var
/// 2. `./normatep.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NormativeConfig {
    /// Variable key construction, shared by reference tables and subject data
    #[serde(default)]
    pub keys: KeyScheme,

    /// Reference table fetching
    #[serde(default)]
    pub loader: LoaderConfig,

    /// Numeric guards for the scoring engines
    #[serde(default)]
    pub numerics: NumericsConfig,
}

/// Reference table loader settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Timeout for fetching a reference table over HTTP(S), in seconds
    pub http_timeout_secs: u64,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            http_timeout_secs: defaults::HTTP_TIMEOUT_SECS,
        }
    }
}

impl LoaderConfig {
    pub const fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

/// Numeric thresholds used when validating and inverting covariance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NumericsConfig {
    /// Covariance submatrices with a larger condition number are treated as singular
    pub max_condition_number: f64,
    /// Relative tolerance for |a_ij - a_ji| when checking symmetry at load time
    pub symmetry_tolerance: f64,
}

impl Default for NumericsConfig {
    fn default() -> Self {
        Self {
            max_condition_number: defaults::MAX_CONDITION_NUMBER,
            symmetry_tolerance: defaults::SYMMETRY_TOLERANCE,
        }
    }
}

impl NormativeConfig {
    /// Load configuration using the standard search order:
    /// 1. `$NORMATEP_CONFIG` environment variable
    /// 2. `./normatep.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(defaults::CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded config from NORMATEP_CONFIG");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from NORMATEP_CONFIG, falling back");
                    }
                }
            } else {
                warn!(path = %path, "NORMATEP_CONFIG points to non-existent file, falling back");
            }
        }

        let local = PathBuf::from(defaults::CONFIG_FILE_NAME);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded config from ./normatep.toml");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./normatep.toml, using defaults");
                }
            }
        }

        info!("No normatep.toml found, using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
            other => other,
        })
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Validate all settings for internal consistency.
    ///
    /// Rules:
    /// - Key order is a permutation of the four axes
    /// - Key separator is non-empty and never occurs inside an axis label
    /// - Condition number limit is finite and > 1
    /// - Symmetry tolerance is finite and >= 0
    /// - HTTP timeout is > 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        if let Err(e) = self.keys.validate() {
            errors.push(format!("keys: {e}"));
        }

        let n = &self.numerics;
        if !n.max_condition_number.is_finite() || n.max_condition_number <= 1.0 {
            errors.push(format!(
                "numerics.max_condition_number must be finite and > 1, got {}",
                n.max_condition_number
            ));
        }
        if !n.symmetry_tolerance.is_finite() || n.symmetry_tolerance < 0.0 {
            errors.push(format!(
                "numerics.symmetry_tolerance must be finite and >= 0, got {}",
                n.symmetry_tolerance
            ));
        }

        if self.loader.http_timeout_secs == 0 {
            errors.push("loader.http_timeout_secs must be > 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            ConfigError::Parse(path, e) => {
                write!(f, "Config parse error ({}): {}", path.display(), e)
            }
            ConfigError::Serialize(e) => write!(f, "Config serialization error: {}", e),
            ConfigError::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {}", e)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}
