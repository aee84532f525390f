//! Variable Key Codec
//!
//! Maps a `MeasurementDescriptor` to the flat string key that indexes both
//! reference tables. The key is the four axis labels joined by a separator,
//! in a configurable axis order.
//!
//! The `ReferenceStore` owns the scheme its tables were validated against, and
//! subject-side keys are built through `store.scheme()`. Producer and consumer
//! therefore share one scheme instance instead of two independent copies.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::defaults::KEY_SEPARATOR;
use crate::types::{Axis, MeasurementDescriptor};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeySchemeError {
    #[error("axis order must name each axis exactly once, got {0:?}")]
    NotAPermutation([Axis; 4]),

    #[error("separator must not be empty")]
    EmptySeparator,

    #[error("separator '{separator}' occurs inside {axis} label '{label}'")]
    AmbiguousSeparator {
        separator: String,
        axis: Axis,
        label: &'static str,
    },
}

/// Field order and separator for variable keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyScheme {
    /// Axis order within the key
    pub order: [Axis; 4],
    /// String placed between consecutive axis labels
    pub separator: String,
}

impl Default for KeyScheme {
    /// `Time_Band_Measure_Cluster`
    fn default() -> Self {
        Self {
            order: Axis::ALL,
            separator: KEY_SEPARATOR.to_string(),
        }
    }
}

impl KeyScheme {
    /// Build a validated scheme.
    pub fn new(order: [Axis; 4], separator: impl Into<String>) -> Result<Self, KeySchemeError> {
        let scheme = Self {
            order,
            separator: separator.into(),
        };
        scheme.validate()?;
        Ok(scheme)
    }

    /// Check that every descriptor maps to a distinct key under this scheme.
    pub fn validate(&self) -> Result<(), KeySchemeError> {
        let is_permutation = Axis::ALL.iter().all(|a| self.order.contains(a));
        if !is_permutation {
            return Err(KeySchemeError::NotAPermutation(self.order));
        }
        if self.separator.is_empty() {
            return Err(KeySchemeError::EmptySeparator);
        }
        for axis in Axis::ALL {
            if let Some(label) = axis.labels().into_iter().find(|l| l.contains(&self.separator)) {
                return Err(KeySchemeError::AmbiguousSeparator {
                    separator: self.separator.clone(),
                    axis,
                    label,
                });
            }
        }
        Ok(())
    }

    /// Encode a descriptor as a variable key.
    pub fn encode(&self, descriptor: &MeasurementDescriptor) -> String {
        let labels = self.order.map(|axis| descriptor.label(axis));
        labels.join(self.separator.as_str())
    }
}
