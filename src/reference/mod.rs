//! Reference Store - normative statistics and covariance
//!
//! Holds the normative population as two immutable tables:
//!
//! - **Statistics**: one `NormativeEntry` (mean, std) per variable key
//! - **Covariance**: a square matrix over the same key universe
//!
//! ## Loading
//!
//! ```ignore
//! let store = ReferenceStore::load("norm.csv", "https://host/norm_cov.csv").await?;
//! let entry = store.lookup_stats("Early_Alpha_ERSP_Parietal Left");
//! ```
//!
//! Both tables are validated against the store's `KeyScheme` when they carry
//! descriptor columns, and their key universes must coincide. Any violation
//! is a `DataLoadError`; a store that exists is internally consistent.
//!
//! After construction the store is never mutated. Hot reloading goes through
//! `SharedReferenceStore`, which swaps whole snapshots.

mod csv;
mod filter;
mod shared;
mod source;

pub use filter::DescriptorFilter;
pub use shared::SharedReferenceStore;
pub use source::ReferenceSource;

pub(crate) use self::csv::{csv_join, CsvRow, CsvTable};

use std::collections::{HashMap, HashSet};

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::codec::{KeyScheme, KeySchemeError};
use crate::config::{self, NormativeConfig, NumericsConfig};
use crate::types::{Axis, DescriptorError, MeasurementDescriptor};

// ============================================================================
// Column names
// ============================================================================

/// Variable key column in both tables.
pub const VARIABLE_COLUMN: &str = "Variable";

/// Accepted headers for the normative mean, preferred name first.
pub const MEAN_COLUMNS: &[&str] = &["Normative_Mean", "Mean"];

/// Accepted headers for the normative standard deviation, preferred name first.
pub const STD_COLUMNS: &[&str] = &["Normative_Std", "Std"];

/// Unlabelled index columns written by dataframe exporters.
const INDEX_COLUMNS: &[&str] = &["", "Unnamed: 0"];

/// Whether a covariance-table header names metadata rather than a variable.
pub fn is_metadata_column(header: &str) -> bool {
    header == VARIABLE_COLUMN
        || INDEX_COLUMNS.contains(&header)
        || Axis::ALL.iter().any(|a| a.column() == header)
}

const STATISTICS: &str = "statistics";
const COVARIANCE: &str = "covariance";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum DataLoadError {
    #[error("Cannot read {origin}: {error}")]
    Io {
        origin: String,
        #[source]
        error: std::io::Error,
    },

    #[error("HTTP error fetching {origin}: {error}")]
    Http {
        origin: String,
        #[source]
        error: reqwest::Error,
    },

    #[error("{origin} returned HTTP status {status}")]
    HttpStatus { origin: String, status: u16 },

    #[error("{origin} contains no header row")]
    Empty { origin: String },

    #[error("{origin} line {line}: {reason}")]
    Malformed {
        origin: String,
        line: usize,
        reason: String,
    },

    #[error("{origin} is missing required column '{column}'")]
    MissingColumn { origin: String, column: String },

    #[error("{origin} line {line}: {error}")]
    Descriptor {
        origin: String,
        line: usize,
        #[source]
        error: DescriptorError,
    },

    #[error("{origin}: variable '{variable}' does not match its descriptor columns (expected '{expected}')")]
    KeyMismatch {
        origin: String,
        variable: String,
        expected: String,
    },

    #[error("{origin}: duplicate variable '{key}'")]
    DuplicateKey { origin: String, key: String },

    #[error("{origin}: invalid entry for '{key}': {reason}")]
    InvalidEntry {
        origin: String,
        key: String,
        reason: String,
    },

    #[error("covariance matrix is not square: {0}")]
    NotSquare(String),

    #[error("covariance matrix is not symmetric at ('{row}', '{column}'): {upper} vs {lower}")]
    Asymmetric {
        row: String,
        column: String,
        upper: f64,
        lower: f64,
    },

    #[error(
        "statistics and covariance cover different variables \
         (missing from covariance: {}; missing from statistics: {})",
        preview(.missing_in_covariance),
        preview(.missing_in_statistics)
    )]
    UniverseMismatch {
        missing_in_covariance: Vec<String>,
        missing_in_statistics: Vec<String>,
    },

    #[error("invalid key scheme: {0}")]
    Scheme(#[from] KeySchemeError),
}

/// Short listing of keys for error messages.
fn preview(keys: &[String]) -> String {
    const SHOWN: usize = 5;
    match keys.len() {
        0 => "none".to_string(),
        n if n <= SHOWN => keys.join(", "),
        n => format!("{} and {} more", keys[..SHOWN].join(", "), n - SHOWN),
    }
}

/// Requested variables that are absent from the covariance universe.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("covariance has no entry for: {}", .0.join(", "))]
pub struct MissingKeys(pub Vec<String>);

// ============================================================================
// Normative entries
// ============================================================================

/// One row of the normative statistics table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormativeEntry {
    /// Variable key
    pub variable: String,
    /// Axis labels, when the table carried descriptor columns
    pub descriptor: Option<MeasurementDescriptor>,
    /// Normative mean
    pub mean: f64,
    /// Normative standard deviation (>= 0)
    pub std: f64,
}

impl NormativeEntry {
    pub fn new(variable: impl Into<String>, mean: f64, std: f64) -> Self {
        Self {
            variable: variable.into(),
            descriptor: None,
            mean,
            std,
        }
    }

    /// Entry keyed by `scheme.encode(descriptor)`.
    pub fn for_descriptor(scheme: &KeyScheme, descriptor: MeasurementDescriptor, mean: f64, std: f64) -> Self {
        Self {
            variable: scheme.encode(&descriptor),
            descriptor: Some(descriptor),
            mean,
            std,
        }
    }
}

// ============================================================================
// Reference Store
// ============================================================================

/// Immutable normative reference data.
#[derive(Debug, Clone)]
pub struct ReferenceStore {
    scheme: KeyScheme,
    numerics: NumericsConfig,
    /// Statistics in table order
    entries: Vec<NormativeEntry>,
    stats_index: HashMap<String, usize>,
    /// Covariance labels in canonical (row) order
    covariance_keys: Vec<String>,
    covariance_index: HashMap<String, usize>,
    covariance: DMatrix<f64>,
}

impl ReferenceStore {
    /// Load both tables using the global configuration (or defaults).
    pub async fn load(
        statistics: impl Into<ReferenceSource>,
        covariance: impl Into<ReferenceSource>,
    ) -> Result<Self, DataLoadError> {
        Self::load_with_config(statistics, covariance, config::current()).await
    }

    /// Load both tables with an explicit configuration.
    ///
    /// The two sources are fetched concurrently.
    pub async fn load_with_config(
        statistics: impl Into<ReferenceSource>,
        covariance: impl Into<ReferenceSource>,
        config: &NormativeConfig,
    ) -> Result<Self, DataLoadError> {
        let stats_source = statistics.into();
        let cov_source = covariance.into();

        let (stats_text, cov_text) = tokio::try_join!(
            stats_source.fetch(&config.loader),
            cov_source.fetch(&config.loader)
        )?;

        let store = Self::parse(
            &stats_source.to_string(),
            &stats_text,
            &cov_source.to_string(),
            &cov_text,
            config,
        )?;
        info!(
            variables = store.len(),
            statistics = %stats_source,
            covariance = %cov_source,
            "Reference store loaded"
        );
        Ok(store)
    }

    /// Build a store from in-memory CSV documents.
    pub fn from_csv_str(
        statistics: &str,
        covariance: &str,
        config: &NormativeConfig,
    ) -> Result<Self, DataLoadError> {
        Self::parse(STATISTICS, statistics, COVARIANCE, covariance, config)
    }

    fn parse(
        stats_origin: &str,
        stats_text: &str,
        cov_origin: &str,
        cov_text: &str,
        config: &NormativeConfig,
    ) -> Result<Self, DataLoadError> {
        config.keys.validate()?;
        let stats_table = CsvTable::parse(stats_origin, stats_text)?;
        let cov_table = CsvTable::parse(cov_origin, cov_text)?;

        let entries = parse_statistics(&stats_table, &config.keys)?;
        let (keys, matrix) = parse_covariance(&cov_table, &config.keys)?;
        Self::from_parts(config.keys.clone(), config.numerics, entries, keys, matrix)
    }

    /// Build a store from already-parsed parts, applying every load-time check.
    ///
    /// `keys` labels both the rows and columns of `covariance`, in order.
    pub fn from_parts(
        scheme: KeyScheme,
        numerics: NumericsConfig,
        entries: Vec<NormativeEntry>,
        keys: Vec<String>,
        covariance: DMatrix<f64>,
    ) -> Result<Self, DataLoadError> {
        scheme.validate()?;

        let mut stats_index = HashMap::with_capacity(entries.len());
        for (i, entry) in entries.iter().enumerate() {
            validate_entry(&scheme, entry)?;
            if stats_index.insert(entry.variable.clone(), i).is_some() {
                return Err(DataLoadError::DuplicateKey {
                    origin: STATISTICS.to_string(),
                    key: entry.variable.clone(),
                });
            }
        }

        let n = keys.len();
        if covariance.nrows() != n || covariance.ncols() != n {
            return Err(DataLoadError::NotSquare(format!(
                "{} labels for a {}x{} matrix",
                n,
                covariance.nrows(),
                covariance.ncols()
            )));
        }
        let mut covariance_index = HashMap::with_capacity(n);
        for (i, key) in keys.iter().enumerate() {
            if covariance_index.insert(key.clone(), i).is_some() {
                return Err(DataLoadError::DuplicateKey {
                    origin: COVARIANCE.to_string(),
                    key: key.clone(),
                });
            }
        }
        validate_covariance(&keys, &covariance, numerics.symmetry_tolerance)?;

        let missing_in_covariance: Vec<String> = entries
            .iter()
            .filter(|e| !covariance_index.contains_key(&e.variable))
            .map(|e| e.variable.clone())
            .collect();
        let missing_in_statistics: Vec<String> = keys
            .iter()
            .filter(|k| !stats_index.contains_key(*k))
            .cloned()
            .collect();
        if !missing_in_covariance.is_empty() || !missing_in_statistics.is_empty() {
            return Err(DataLoadError::UniverseMismatch {
                missing_in_covariance,
                missing_in_statistics,
            });
        }

        debug!(variables = n, "Reference tables validated");
        Ok(Self {
            scheme,
            numerics,
            entries,
            stats_index,
            covariance_keys: keys,
            covariance_index,
            covariance,
        })
    }

    /// Key scheme the tables were validated against.
    pub const fn scheme(&self) -> &KeyScheme {
        &self.scheme
    }

    /// Numeric thresholds used by the scoring engines.
    pub const fn numerics(&self) -> &NumericsConfig {
        &self.numerics
    }

    /// Encode a descriptor with this store's scheme.
    pub fn encode(&self, descriptor: &MeasurementDescriptor) -> String {
        self.scheme.encode(descriptor)
    }

    /// Number of normative variables.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Statistics rows in table order.
    pub fn entries(&self) -> &[NormativeEntry] {
        &self.entries
    }

    /// Mean and std for `key`, or `None` when the key is unknown.
    pub fn lookup_stats(&self, key: &str) -> Option<&NormativeEntry> {
        self.stats_index.get(key).map(|&i| &self.entries[i])
    }

    /// Covariance labels in canonical order.
    pub fn covariance_keys(&self) -> &[String] {
        &self.covariance_keys
    }

    /// Position of `key` in the canonical covariance order.
    pub fn covariance_position(&self, key: &str) -> Option<usize> {
        self.covariance_index.get(key).copied()
    }

    /// The full covariance matrix in canonical order.
    pub const fn covariance(&self) -> &DMatrix<f64> {
        &self.covariance
    }

    /// Covariance restricted to `keys` x `keys`, in the order given.
    pub fn sub_covariance<K: AsRef<str>>(&self, keys: &[K]) -> Result<DMatrix<f64>, MissingKeys> {
        let mut positions = Vec::with_capacity(keys.len());
        let mut missing = Vec::new();
        for key in keys {
            match self.covariance_position(key.as_ref()) {
                Some(p) => positions.push(p),
                None => missing.push(key.as_ref().to_string()),
            }
        }
        if !missing.is_empty() {
            return Err(MissingKeys(missing));
        }

        let n = positions.len();
        Ok(DMatrix::from_fn(n, n, |i, j| {
            self.covariance[(positions[i], positions[j])]
        }))
    }

    /// Statistics rows matching `filter`, in table order.
    pub fn filter<'a>(&'a self, filter: &'a DescriptorFilter) -> impl Iterator<Item = &'a NormativeEntry> + 'a {
        self.entries.iter().filter(move |e| filter.matches(e.descriptor.as_ref()))
    }

    /// Distinct labels present on `axis`, in first-seen order.
    pub fn axis_values(&self, axis: Axis) -> Vec<&'static str> {
        let mut seen = HashSet::new();
        self.entries
            .iter()
            .filter_map(|e| e.descriptor.as_ref().map(|d| d.label(axis)))
            .filter(|label| seen.insert(*label))
            .collect()
    }
}

// ============================================================================
// Table parsing
// ============================================================================

/// Positions of the four axis columns, if all are present.
fn axis_columns(table: &CsvTable) -> Option<[usize; 4]> {
    let mut cols = [0usize; 4];
    for (slot, axis) in cols.iter_mut().zip(Axis::ALL) {
        *slot = table.column(&[axis.column()])?;
    }
    Some(cols)
}

/// Resolve the variable key (and descriptor, if present) of one row.
///
/// When both a `Variable` cell and descriptor columns are present they must
/// agree under `scheme`.
fn row_label(
    table: &CsvTable,
    row: &CsvRow,
    variable_col: Option<usize>,
    axis_cols: Option<[usize; 4]>,
    scheme: &KeyScheme,
) -> Result<(String, Option<MeasurementDescriptor>), DataLoadError> {
    let descriptor = match axis_cols {
        Some([t, b, m, c]) => Some(
            MeasurementDescriptor::parse(&row.fields[t], &row.fields[b], &row.fields[m], &row.fields[c])
                .map_err(|error| DataLoadError::Descriptor {
                    origin: table.origin.clone(),
                    line: row.line,
                    error,
                })?,
        ),
        None => None,
    };

    let key = match (variable_col, &descriptor) {
        (Some(col), _) => {
            let variable = row.fields[col].trim();
            if variable.is_empty() {
                return Err(DataLoadError::Malformed {
                    origin: table.origin.clone(),
                    line: row.line,
                    reason: "empty Variable".to_string(),
                });
            }
            if let Some(d) = &descriptor {
                let expected = scheme.encode(d);
                if expected != variable {
                    return Err(DataLoadError::KeyMismatch {
                        origin: table.origin.clone(),
                        variable: variable.to_string(),
                        expected,
                    });
                }
            }
            variable.to_string()
        }
        (None, Some(d)) => scheme.encode(d),
        (None, None) => {
            return Err(DataLoadError::MissingColumn {
                origin: table.origin.clone(),
                column: VARIABLE_COLUMN.to_string(),
            })
        }
    };
    Ok((key, descriptor))
}

fn parse_statistics(table: &CsvTable, scheme: &KeyScheme) -> Result<Vec<NormativeEntry>, DataLoadError> {
    let variable_col = table.column(&[VARIABLE_COLUMN]);
    let axis_cols = axis_columns(table);
    if variable_col.is_none() && axis_cols.is_none() {
        return Err(DataLoadError::MissingColumn {
            origin: table.origin.clone(),
            column: VARIABLE_COLUMN.to_string(),
        });
    }
    let mean_col = table.require_column(MEAN_COLUMNS)?;
    let std_col = table.require_column(STD_COLUMNS)?;

    table
        .rows
        .iter()
        .map(|row| {
            let (variable, descriptor) = row_label(table, row, variable_col, axis_cols, scheme)?;
            Ok(NormativeEntry {
                variable,
                descriptor,
                mean: table.number(row, mean_col)?,
                std: table.number(row, std_col)?,
            })
        })
        .collect()
}

/// The single unnamed column of a dataframe export (`df.cov().to_csv()`),
/// which then holds the row labels.
fn unnamed_label_column(table: &CsvTable) -> Option<usize> {
    let mut unnamed = table
        .header
        .iter()
        .enumerate()
        .filter(|(_, h)| INDEX_COLUMNS.contains(&h.as_str()))
        .map(|(i, _)| i);
    let first = unnamed.next()?;
    unnamed.next().is_none().then_some(first)
}

/// Split metadata from the numeric block by header name and assemble the
/// matrix in row order.
fn parse_covariance(table: &CsvTable, scheme: &KeyScheme) -> Result<(Vec<String>, DMatrix<f64>), DataLoadError> {
    let axis_cols = axis_columns(table);
    let variable_col = table
        .column(&[VARIABLE_COLUMN])
        .or_else(|| axis_cols.is_none().then(|| unnamed_label_column(table)).flatten());

    let mut column_of: HashMap<&str, usize> = HashMap::new();
    for (idx, header) in table.header.iter().enumerate() {
        if is_metadata_column(header) {
            continue;
        }
        if column_of.insert(header.as_str(), idx).is_some() {
            return Err(DataLoadError::DuplicateKey {
                origin: table.origin.clone(),
                key: header.clone(),
            });
        }
    }
    if column_of.is_empty() {
        return Err(DataLoadError::NotSquare(format!("{} has no numeric columns", table.origin)));
    }

    let mut keys = Vec::with_capacity(table.rows.len());
    for row in &table.rows {
        let (key, _) = row_label(table, row, variable_col, axis_cols, scheme)?;
        keys.push(key);
    }

    let unlabelled_rows: Vec<&str> = keys
        .iter()
        .map(String::as_str)
        .filter(|k| !column_of.contains_key(k))
        .collect();
    if !unlabelled_rows.is_empty() {
        return Err(DataLoadError::NotSquare(format!(
            "rows without a matching column: {}",
            unlabelled_rows.join(", ")
        )));
    }
    if keys.len() != column_of.len() {
        return Err(DataLoadError::NotSquare(format!(
            "{} rows but {} numeric columns",
            keys.len(),
            column_of.len()
        )));
    }

    let n = keys.len();
    let mut matrix = DMatrix::zeros(n, n);
    for (i, row) in table.rows.iter().enumerate() {
        for (j, key) in keys.iter().enumerate() {
            matrix[(i, j)] = table.number(row, column_of[key.as_str()])?;
        }
    }
    Ok((keys, matrix))
}

// ============================================================================
// Validation
// ============================================================================

fn validate_entry(scheme: &KeyScheme, entry: &NormativeEntry) -> Result<(), DataLoadError> {
    let invalid = |reason: String| DataLoadError::InvalidEntry {
        origin: STATISTICS.to_string(),
        key: entry.variable.clone(),
        reason,
    };
    if entry.variable.is_empty() {
        return Err(invalid("empty variable key".to_string()));
    }
    if !entry.mean.is_finite() {
        return Err(invalid(format!("mean is not finite ({})", entry.mean)));
    }
    if !entry.std.is_finite() || entry.std < 0.0 {
        return Err(invalid(format!("std must be finite and >= 0 ({})", entry.std)));
    }
    if let Some(d) = &entry.descriptor {
        let expected = scheme.encode(d);
        if expected != entry.variable {
            return Err(DataLoadError::KeyMismatch {
                origin: STATISTICS.to_string(),
                variable: entry.variable.clone(),
                expected,
            });
        }
    }
    Ok(())
}

fn validate_covariance(keys: &[String], matrix: &DMatrix<f64>, tolerance: f64) -> Result<(), DataLoadError> {
    let n = keys.len();
    for i in 0..n {
        let diag = matrix[(i, i)];
        if !diag.is_finite() || diag < 0.0 {
            return Err(DataLoadError::InvalidEntry {
                origin: COVARIANCE.to_string(),
                key: keys[i].clone(),
                reason: format!("variance must be finite and >= 0 ({diag})"),
            });
        }
        for j in (i + 1)..n {
            let upper = matrix[(i, j)];
            let lower = matrix[(j, i)];
            // Tolerance scales with sqrt(σii·σjj), never absolute
            let scale = (matrix[(i, i)] * matrix[(j, j)]).sqrt().max(upper.abs()).max(lower.abs());
            if !upper.is_finite() || !lower.is_finite() || (upper - lower).abs() > tolerance * scale {
                return Err(DataLoadError::Asymmetric {
                    row: keys[i].clone(),
                    column: keys[j].clone(),
                    upper,
                    lower,
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Band, Cluster, Measure, Time};

    const STATS: &str = "\
Variable,Normative_Mean,Normative_Std
A,10,2
B,5,0
";

    const COV: &str = "\
Variable,A,B
A,4,0
B,0,9
";

    fn defaults() -> NormativeConfig {
        NormativeConfig::default()
    }

    #[test]
    fn test_loads_minimal_tables() {
        let store = ReferenceStore::from_csv_str(STATS, COV, &defaults()).unwrap();
        assert_eq!(store.len(), 2);
        let a = store.lookup_stats("A").unwrap();
        assert_eq!((a.mean, a.std), (10.0, 2.0));
        assert!(store.lookup_stats("C").is_none());
        assert_eq!(store.covariance_keys(), &["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn test_metadata_columns_found_by_name_not_position() {
        // Metadata interleaved with and after the numeric block
        let cov = "\
B,Variable,A,Time
9,B,0,x
0,A,4,y
";
        // Time without the other axes is still metadata, not a variable
        let store = ReferenceStore::from_csv_str(STATS, cov, &defaults()).unwrap();
        assert_eq!(store.covariance_keys(), &["B".to_string(), "A".to_string()]);
        assert_eq!(store.covariance()[(0, 0)], 9.0);
        assert_eq!(store.covariance()[(1, 1)], 4.0);
    }

    #[test]
    fn test_index_column_is_ignored() {
        let cov = ",Variable,A,B\n0,A,4,0\n1,B,0,9\n";
        let store = ReferenceStore::from_csv_str(STATS, cov, &defaults()).unwrap();
        assert_eq!(store.covariance().nrows(), 2);
    }

    #[test]
    fn test_unnamed_first_column_labels_rows() {
        // Layout written by `df.cov().to_csv()`
        let store = ReferenceStore::from_csv_str(STATS, ",A,B\nA,4,0\nB,0,9\n", &defaults()).unwrap();
        assert_eq!(store.covariance_keys(), &["A".to_string(), "B".to_string()]);
        assert_eq!(store.covariance()[(1, 1)], 9.0);

        let store = ReferenceStore::from_csv_str(STATS, "Unnamed: 0,B,A\nB,9,0\nA,0,4\n", &defaults()).unwrap();
        assert_eq!(store.covariance_keys(), &["B".to_string(), "A".to_string()]);

        // Labels that disagree with the headers are still rejected
        let err = ReferenceStore::from_csv_str(STATS, ",A,B\n0,4,0\n1,0,9\n", &defaults()).unwrap_err();
        assert!(matches!(err, DataLoadError::NotSquare(_)), "{err}");
    }

    #[test]
    fn test_missing_required_columns() {
        let err = ReferenceStore::from_csv_str("Variable,Normative_Mean\nA,1\n", COV, &defaults()).unwrap_err();
        assert!(matches!(err, DataLoadError::MissingColumn { ref column, .. } if column == "Normative_Std"));

        let err = ReferenceStore::from_csv_str("Normative_Mean,Normative_Std\n1,1\n", COV, &defaults()).unwrap_err();
        assert!(matches!(err, DataLoadError::MissingColumn { ref column, .. } if column == "Variable"));
    }

    #[test]
    fn test_non_square_covariance() {
        let cov = "Variable,A,B\nA,4,0\n";
        let err = ReferenceStore::from_csv_str(STATS, cov, &defaults()).unwrap_err();
        assert!(matches!(err, DataLoadError::NotSquare(_)), "{err}");

        let cov = "Variable,A,B\nA,4,0\nC,0,9\n";
        let err = ReferenceStore::from_csv_str(STATS, cov, &defaults()).unwrap_err();
        assert!(matches!(err, DataLoadError::NotSquare(_)), "{err}");
    }

    #[test]
    fn test_asymmetric_covariance() {
        let cov = "Variable,A,B\nA,4,1\nB,0,9\n";
        let err = ReferenceStore::from_csv_str(STATS, cov, &defaults()).unwrap_err();
        assert!(matches!(err, DataLoadError::Asymmetric { .. }));
    }

    #[test]
    fn test_symmetry_tolerance_is_relative_to_variances() {
        // Sign flip on a small-scale off-diagonal
        let cov = "Variable,A,B\nA,1e-10,9e-11\nB,-9e-11,1e-10\n";
        let err = ReferenceStore::from_csv_str(STATS, cov, &defaults()).unwrap_err();
        assert!(matches!(err, DataLoadError::Asymmetric { .. }), "{err}");

        // Round-off at the same scale is accepted
        let cov = "Variable,A,B\nA,1e-10,9e-11\nB,9.0000000001e-11,1e-10\n";
        assert!(ReferenceStore::from_csv_str(STATS, cov, &defaults()).is_ok());
    }

    #[test]
    fn test_negative_std_rejected() {
        let stats = "Variable,Normative_Mean,Normative_Std\nA,1,-0.5\nB,1,1\n";
        let err = ReferenceStore::from_csv_str(stats, COV, &defaults()).unwrap_err();
        assert!(matches!(err, DataLoadError::InvalidEntry { .. }));
    }

    #[test]
    fn test_universe_mismatch_fails_loudly() {
        let stats = "Variable,Normative_Mean,Normative_Std\nA,1,1\nZ,1,1\n";
        let err = ReferenceStore::from_csv_str(stats, COV, &defaults()).unwrap_err();
        match err {
            DataLoadError::UniverseMismatch {
                missing_in_covariance,
                missing_in_statistics,
            } => {
                assert_eq!(missing_in_covariance, vec!["Z"]);
                assert_eq!(missing_in_statistics, vec!["B"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_duplicate_statistics_row() {
        let stats = "Variable,Normative_Mean,Normative_Std\nA,1,1\nA,2,1\nB,1,1\n";
        let err = ReferenceStore::from_csv_str(stats, COV, &defaults()).unwrap_err();
        assert!(matches!(err, DataLoadError::DuplicateKey { .. }));
    }

    #[test]
    fn test_key_derived_from_axis_columns() {
        let stats = "\
Measure,Time,Cluster,Band,Mean,Std
ERSP,Early,Parietal Left,Alpha,1.5,0.2
";
        let cov = "Variable,Early_Alpha_ERSP_Parietal Left\nEarly_Alpha_ERSP_Parietal Left,0.04\n";
        let store = ReferenceStore::from_csv_str(stats, cov, &defaults()).unwrap();
        let d = MeasurementDescriptor::new(Time::Early, Band::Alpha, Measure::Ersp, Cluster::ParietalLeft);
        let entry = store.lookup_stats(&store.encode(&d)).unwrap();
        assert_eq!(entry.descriptor, Some(d));
        assert_eq!(entry.mean, 1.5);
    }

    #[test]
    fn test_variable_disagreeing_with_descriptor_is_rejected() {
        // Variable written in a different axis order than the configured scheme
        let stats = "\
Variable,Time,Band,Measure,Cluster,Normative_Mean,Normative_Std
ERSP_Early_Parietal Left_Alpha,Early,Alpha,ERSP,Parietal Left,1,1
";
        let cov = "Variable,ERSP_Early_Parietal Left_Alpha\nERSP_Early_Parietal Left_Alpha,1\n";
        let err = ReferenceStore::from_csv_str(stats, cov, &defaults()).unwrap_err();
        assert!(matches!(err, DataLoadError::KeyMismatch { .. }), "{err}");

        let mut config = defaults();
        config.keys = KeyScheme::new([Axis::Measure, Axis::Time, Axis::Cluster, Axis::Band], "_").unwrap();
        assert!(ReferenceStore::from_csv_str(stats, cov, &config).is_ok());
    }

    #[test]
    fn test_unknown_axis_label_in_table() {
        let stats = "\
Time,Band,Measure,Cluster,Normative_Mean,Normative_Std
Early,Kappa,ERSP,Parietal Left,1,1
";
        let err = ReferenceStore::from_csv_str(stats, COV, &defaults()).unwrap_err();
        assert!(matches!(err, DataLoadError::Descriptor { line: 2, .. }));
    }

    #[test]
    fn test_sub_covariance_follows_requested_order() {
        let cov = "Variable,A,B\nA,4,1.5\nB,1.5,9\n";
        let store = ReferenceStore::from_csv_str(STATS, cov, &defaults()).unwrap();
        let sub = store.sub_covariance(&["B", "A"]).unwrap();
        assert_eq!(sub[(0, 0)], 9.0);
        assert_eq!(sub[(1, 1)], 4.0);
        assert_eq!(sub[(0, 1)], 1.5);

        let err = store.sub_covariance(&["A", "Q"]).unwrap_err();
        assert_eq!(err, MissingKeys(vec!["Q".to_string()]));
    }

    #[test]
    fn test_from_parts_shape_check() {
        let entries = vec![NormativeEntry::new("A", 0.0, 1.0)];
        let err = ReferenceStore::from_parts(
            KeyScheme::default(),
            NumericsConfig::default(),
            entries,
            vec!["A".to_string()],
            DMatrix::zeros(2, 2),
        )
        .unwrap_err();
        assert!(matches!(err, DataLoadError::NotSquare(_)));
    }
}
