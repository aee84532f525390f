//! System-wide default constants.
//!
//! Grouped by subsystem for easy discovery. Every value here can be overridden
//! in `normatep.toml` unless noted otherwise.

// ============================================================================
// Variable keys
// ============================================================================

/// Separator between axis labels in a variable key.
pub const KEY_SEPARATOR: &str = "_";

// ============================================================================
// Reference loading
// ============================================================================

/// HTTP client timeout when fetching reference tables (seconds).
pub const HTTP_TIMEOUT_SECS: u64 = 30;

/// Environment variable naming the config file.
pub const CONFIG_ENV_VAR: &str = "NORMATEP_CONFIG";

/// Config file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "normatep.toml";

// ============================================================================
// Numerics
// ============================================================================

/// Largest acceptable condition number of a covariance submatrix.
///
/// Above this, roughly 12 significant digits of the inverse are lost and the
/// distance is reported as singular instead of returned.
pub const MAX_CONDITION_NUMBER: f64 = 1e12;

/// Relative tolerance for the covariance symmetry check at load time.
pub const SYMMETRY_TOLERANCE: f64 = 1e-8;

// ============================================================================
// Synthetic fixtures (not configurable)
// ============================================================================

/// Reference cohort size simulated by the fixture generator.
pub const SYNTHETIC_SUBJECTS: usize = 1_000;

/// Number of shared latent factors driving inter-variable correlation.
pub const SYNTHETIC_LATENT_FACTORS: usize = 8;
