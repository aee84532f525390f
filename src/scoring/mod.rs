//! Normative Scoring Engines
//!
//! Compares one subject's measurements with the reference population held in
//! a `ReferenceStore`.
//!
//! - `zscore`: standardized deviation of a single value, `(x - μ) / σ`
//! - `mahalanobis`: squared generalized distance over several variables,
//!   optionally with a chi-squared p-value
//!
//! Every scoring call is a pure function of the store and its arguments.
//! Failures on the subject side (unknown variable, zero-variance reference,
//! singular covariance) are returned as error values and never abort the caller.
//!
//! ## Usage
//!
//! ```ignore
//! let z = scoring::zscore_descriptor(&store, &descriptor, 1.8)?;
//!
//! let subject = ObservationSet::from_observations(store.scheme(), &rows);
//! let assessment = scoring::assess(&store, &subject)?;
//! println!("D² = {:.2}, p = {:.3}", assessment.d2, assessment.p_value);
//! ```

pub mod mahalanobis;
mod observations;
pub mod zscore;

pub use mahalanobis::{assess, chi_squared_sf, d2, MahalanobisAssessment, MahalanobisError};
pub use observations::ObservationSet;
pub use zscore::{score_rows, zscore, zscore_descriptor, ScoredRow, ZScoreError};
