//! NormaTEP: Normative scoring for TMS-EEG derived metrics
//!
//! Compares a subject's TEP-derived measurements with a normative reference
//! population.
//!
//! ## Architecture
//!
//! - **Reference Store**: normative statistics (mean/std) and covariance, loaded once
//! - **Key Codec**: (Time, Band, Measure, Cluster) descriptor -> variable key
//! - **Z-Score Engine**: standardized deviation of a single measurement
//! - **Mahalanobis Engine**: squared generalized distance over many measurements
//! - **Synthetic fixtures**: consistent reference tables for testing

pub mod codec;
pub mod config;
pub mod reference;
pub mod scoring;
pub mod synthetic;
pub mod types;

// Re-export configuration
pub use config::NormativeConfig;

// Re-export commonly used types
pub use codec::KeyScheme;
pub use types::{Axis, Band, Cluster, Measure, MeasurementDescriptor, Observation, Time};

// Re-export reference store
pub use reference::{DataLoadError, DescriptorFilter, NormativeEntry, ReferenceSource, ReferenceStore, SharedReferenceStore};

// Re-export scoring
pub use scoring::{MahalanobisAssessment, MahalanobisError, ObservationSet, ScoredRow, ZScoreError};
