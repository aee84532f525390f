//! Multivariate Mahalanobis distance against the normative covariance
//!
//! D² = (x - μ)ᵀ Σ⁻¹ (x - μ) over the observed variables that the covariance
//! covers. The variable order used for x, μ and Σ is always the store's
//! canonical covariance order, never the caller's.
//!
//! Σ is checked before it is used: a condition number above
//! `numerics.max_condition_number`, or a failed Cholesky factorisation,
//! yields `SingularCovariance` listing the variables involved.

use nalgebra::{Cholesky, DMatrix, DVector};
use serde::Serialize;
use statrs::distribution::{ChiSquared, ContinuousCDF};
use thiserror::Error;
use tracing::debug;

use super::ObservationSet;
use crate::reference::{MissingKeys, ReferenceStore};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MahalanobisError {
    #[error("No observed variable is covered by the normative covariance")]
    InsufficientData,

    #[error(
        "Covariance over {} variables is singular (condition number {condition_number:.3e}); \
         consider dropping one of: {}",
        .variables.len(),
        .variables.join(", ")
    )]
    SingularCovariance {
        variables: Vec<String>,
        condition_number: f64,
    },

    #[error("Value for {key} is not a finite number: {value}")]
    InvalidValue { key: String, value: f64 },

    #[error(transparent)]
    MissingVariables(#[from] MissingKeys),
}

/// Full result of a multivariate comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MahalanobisAssessment {
    /// Squared Mahalanobis distance
    pub d2: f64,
    /// Variables that entered the distance, in canonical order
    pub variables: Vec<String>,
    /// Observed keys outside the covariance universe, sorted
    pub ignored: Vec<String>,
    /// Equal to `variables.len()`
    pub degrees_of_freedom: usize,
    /// P(χ²(df) >= d2)
    pub p_value: f64,
}

/// Squared Mahalanobis distance of `observations` from the normative mean.
pub fn d2(store: &ReferenceStore, observations: &ObservationSet) -> Result<f64, MahalanobisError> {
    distance(store, observations).map(|(d2, _)| d2)
}

/// D² together with the variables used and its chi-squared p-value.
pub fn assess(
    store: &ReferenceStore,
    observations: &ObservationSet,
) -> Result<MahalanobisAssessment, MahalanobisError> {
    let (d2, variables) = distance(store, observations)?;
    let mut ignored: Vec<String> = observations
        .keys()
        .filter(|k| store.covariance_position(k).is_none())
        .map(str::to_string)
        .collect();
    ignored.sort();

    let degrees_of_freedom = variables.len();
    Ok(MahalanobisAssessment {
        d2,
        p_value: chi_squared_sf(d2, degrees_of_freedom),
        variables,
        ignored,
        degrees_of_freedom,
    })
}

/// Survival function of χ² with `dof` degrees of freedom.
pub fn chi_squared_sf(x: f64, dof: usize) -> f64 {
    match ChiSquared::new(dof as f64) {
        Ok(dist) => dist.sf(x).clamp(0.0, 1.0),
        Err(_) => 1.0,
    }
}

fn distance(
    store: &ReferenceStore,
    observations: &ObservationSet,
) -> Result<(f64, Vec<String>), MahalanobisError> {
    // Ordered intersection, canonical order
    let variables: Vec<String> = store
        .covariance_keys()
        .iter()
        .filter(|k| observations.contains(k))
        .cloned()
        .collect();
    if variables.is_empty() {
        return Err(MahalanobisError::InsufficientData);
    }

    let mut diff = DVector::zeros(variables.len());
    for (i, key) in variables.iter().enumerate() {
        let value = observations.get(key).unwrap_or(f64::NAN);
        if !value.is_finite() {
            return Err(MahalanobisError::InvalidValue {
                key: key.clone(),
                value,
            });
        }
        let entry = store
            .lookup_stats(key)
            .ok_or_else(|| MissingKeys(vec![key.clone()]))?;
        diff[i] = value - entry.mean;
    }

    let sigma = store.sub_covariance(&variables)?;
    let condition_number = condition_number(&sigma);
    if !condition_number.is_finite() || condition_number > store.numerics().max_condition_number {
        return Err(MahalanobisError::SingularCovariance {
            variables,
            condition_number,
        });
    }
    let Some(cholesky) = Cholesky::new(sigma) else {
        // Well conditioned but indefinite
        return Err(MahalanobisError::SingularCovariance {
            variables,
            condition_number,
        });
    };

    let solved = cholesky.solve(&diff);
    // Round-off can push an exact zero slightly negative
    let d2 = diff.dot(&solved).max(0.0);
    debug!(variables = variables.len(), d2, condition_number, "Mahalanobis distance");
    Ok((d2, variables))
}

/// σmax / σmin, or infinity when σmin is zero.
fn condition_number(matrix: &DMatrix<f64>) -> f64 {
    let singular_values = matrix.singular_values();
    let max = singular_values.iter().copied().fold(0.0_f64, f64::max);
    let min = singular_values.iter().copied().fold(f64::INFINITY, f64::min);
    if min > 0.0 && min.is_finite() {
        max / min
    } else {
        f64::INFINITY
    }
}
