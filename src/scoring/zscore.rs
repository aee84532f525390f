//! Univariate z-scores against the normative statistics table.

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::reference::ReferenceStore;
use crate::types::{MeasurementDescriptor, Observation};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ZScoreError {
    #[error("No normative entry for variable: {0}")]
    NotFound(String),

    #[error("Normative std of {0} is zero, z-score is undefined")]
    Undefined(String),

    #[error("Value for {key} is not a finite number: {value}")]
    InvalidValue { key: String, value: f64 },
}

/// `(value - mean) / std` for the normative entry at `key`.
///
/// A zero std yields `Undefined` regardless of `value`.
pub fn zscore(store: &ReferenceStore, key: &str, value: f64) -> Result<f64, ZScoreError> {
    let entry = store
        .lookup_stats(key)
        .ok_or_else(|| ZScoreError::NotFound(key.to_string()))?;
    if !value.is_finite() {
        return Err(ZScoreError::InvalidValue {
            key: key.to_string(),
            value,
        });
    }
    if entry.std == 0.0 {
        return Err(ZScoreError::Undefined(key.to_string()));
    }
    let z = (value - entry.mean) / entry.std;
    debug!(variable = key, value, z, "z-score");
    Ok(z)
}

/// `zscore` keyed through the store's own scheme.
pub fn zscore_descriptor(
    store: &ReferenceStore,
    descriptor: &MeasurementDescriptor,
    value: f64,
) -> Result<f64, ZScoreError> {
    zscore(store, &store.encode(descriptor), value)
}

/// One row of a comparison table after scoring.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredRow {
    pub observation: Observation,
    /// Key the row was looked up under
    pub variable: String,
    #[serde(serialize_with = "serialize_outcome")]
    pub z_score: Result<f64, ZScoreError>,
}

impl ScoredRow {
    /// Cell text for a results table: two decimals, or a marker that can never
    /// be mistaken for a number.
    pub fn display_score(&self) -> String {
        match &self.z_score {
            Ok(z) => format!("{z:.2}"),
            Err(ZScoreError::NotFound(_)) => "N/A".to_string(),
            Err(ZScoreError::Undefined(_)) => "undefined".to_string(),
            Err(ZScoreError::InvalidValue { .. }) => "invalid".to_string(),
        }
    }
}

fn serialize_outcome<S: serde::Serializer>(
    outcome: &Result<f64, ZScoreError>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match outcome {
        Ok(z) => serializer.serialize_f64(*z),
        Err(e) => serializer.serialize_str(&e.to_string()),
    }
}

/// Score every row independently, preserving input order.
pub fn score_rows(store: &ReferenceStore, rows: &[Observation]) -> Vec<ScoredRow> {
    rows.iter()
        .map(|obs| {
            let variable = store.encode(&obs.descriptor);
            let z_score = zscore(store, &variable, obs.value);
            ScoredRow {
                observation: *obs,
                variable,
                z_score,
            }
        })
        .collect()
}
