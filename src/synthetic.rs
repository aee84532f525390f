//! Synthetic normative reference fixtures
//!
//! Simulates a reference cohort for every (Measure, Time, Cluster, Band)
//! combination and derives both reference tables from it, so the statistics
//! and the covariance describe the same population and the covariance is
//! positive semidefinite by construction.
//!
//! ## Model
//!
//! Each variable j has a scale `w_j`, the sum of the emphasis weights of its
//! axis labels (1.0 when none apply). Its population centre is drawn as
//! `N(0, 1) * w_j`. A subject's value is
//!
//! ```text
//! x_j = centre_j + 0.1 * w_j * (λ_j · f + u_j * ε_j)
//! ```
//!
//! with `f ~ N(0, I_k)` shared latent factors (inter-variable correlation),
//! `λ_j ~ N(0, 1/k)` loadings, `u_j ∈ [0.3, 1)` uniqueness and `ε_j ~ N(0, 1)`.

use std::io::{self, Write};

use nalgebra::DMatrix;
use rand::prelude::*;
use rand_distr::{Distribution, Normal, NormalError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::codec::KeyScheme;
use crate::config::defaults::{SYNTHETIC_LATENT_FACTORS, SYNTHETIC_SUBJECTS};
use crate::reference::{csv_join, DescriptorFilter, NormativeEntry, MEAN_COLUMNS, STD_COLUMNS, VARIABLE_COLUMN};
use crate::types::{Axis, Band, Cluster, Measure, MeasurementDescriptor, Time};

/// Emphasis weights per axis label.
pub const LABEL_WEIGHTS: &[(&str, f64)] = &[
    ("Early", 1.6),
    ("Alpha", 1.5),
    ("Beta", 1.4),
    ("Gamma", 0.5),
    ("GMFP", 2.0),
    ("ERSP", 0.9),
    ("RSP", 1.5),
    ("NF", 0.5),
];

/// Spread of subject values relative to the variable scale.
const SPREAD: f64 = 0.1;

#[derive(Debug, Error)]
pub enum SyntheticError {
    #[error("Need at least 2 simulated subjects, got {0}")]
    TooFewSubjects(usize),

    #[error("Need at least 1 latent factor")]
    NoLatentFactors,

    #[error("Filter selects no variables")]
    NoVariables,

    #[error("Distribution error: {0}")]
    Distribution(#[from] NormalError),
}

/// Generation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntheticConfig {
    /// Simulated reference cohort size
    pub subjects: usize,
    /// Shared latent factors
    pub latent_factors: usize,
    /// Generate `BroadBand` variables in addition to the narrow bands
    pub include_broadband: bool,
    /// Restrict the generated variables
    pub filter: DescriptorFilter,
    pub seed: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            subjects: SYNTHETIC_SUBJECTS,
            latent_factors: SYNTHETIC_LATENT_FACTORS,
            include_broadband: false,
            filter: DescriptorFilter::default(),
            seed: 0,
        }
    }
}

/// Record of how a fixture set was produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntheticManifest {
    pub config: SyntheticConfig,
    pub keys: KeyScheme,
    pub variables: usize,
}

/// Generated reference tables.
#[derive(Debug, Clone)]
pub struct SyntheticReference {
    /// Statistics rows, in generation order
    pub entries: Vec<NormativeEntry>,
    /// Covariance labels (same order as `entries`)
    pub keys: Vec<String>,
    pub covariance: DMatrix<f64>,
}

/// Scale of a variable: summed weights of its labels, or 1.0 if none match.
pub fn variable_weight(descriptor: &MeasurementDescriptor) -> f64 {
    let total: f64 = LABEL_WEIGHTS
        .iter()
        .filter(|(label, _)| Axis::ALL.iter().any(|&a| descriptor.label(a) == *label))
        .map(|(_, w)| w)
        .sum();
    if total > 0.0 {
        total
    } else {
        1.0
    }
}

/// Descriptors in generation order (measure, time, cluster, band).
pub fn descriptors(include_broadband: bool, filter: &DescriptorFilter) -> Vec<MeasurementDescriptor> {
    let bands = if include_broadband { Band::ALL } else { Band::NARROW };
    let mut out = Vec::new();
    for &measure in Measure::ALL {
        for &time in Time::ALL {
            for &cluster in Cluster::ALL {
                for &band in bands {
                    let d = MeasurementDescriptor::new(time, band, measure, cluster);
                    if filter.matches(Some(&d)) {
                        out.push(d);
                    }
                }
            }
        }
    }
    out
}

/// Simulate a cohort and derive the reference tables from it.
pub fn generate(scheme: &KeyScheme, config: &SyntheticConfig) -> Result<SyntheticReference, SyntheticError> {
    if config.subjects < 2 {
        return Err(SyntheticError::TooFewSubjects(config.subjects));
    }
    if config.latent_factors == 0 {
        return Err(SyntheticError::NoLatentFactors);
    }
    let descriptors = descriptors(config.include_broadband, &config.filter);
    if descriptors.is_empty() {
        return Err(SyntheticError::NoVariables);
    }

    let p = descriptors.len();
    let k = config.latent_factors;
    let n = config.subjects;
    if n <= p {
        warn!(subjects = n, variables = p, "Cohort smaller than variable count, covariance will be singular");
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let standard = Normal::new(0.0, 1.0)?;
    let loading = Normal::new(0.0, 1.0 / (k as f64).sqrt())?;

    let scales: Vec<f64> = descriptors.iter().map(variable_weight).collect();
    let centres: Vec<f64> = scales.iter().map(|w| standard.sample(&mut rng) * w).collect();
    let loadings = DMatrix::from_fn(p, k, |_, _| loading.sample(&mut rng));
    let uniqueness: Vec<f64> = (0..p).map(|_| rng.gen_range(0.3..1.0)).collect();

    let mut samples = DMatrix::zeros(n, p);
    for s in 0..n {
        let factors: Vec<f64> = (0..k).map(|_| standard.sample(&mut rng)).collect();
        for j in 0..p {
            let shared: f64 = (0..k).map(|f| loadings[(j, f)] * factors[f]).sum();
            let noise = uniqueness[j] * standard.sample(&mut rng);
            samples[(s, j)] = centres[j] + SPREAD * scales[j] * (shared + noise);
        }
    }

    let means: Vec<f64> = (0..p).map(|j| samples.column(j).mean()).collect();
    for j in 0..p {
        let mean = means[j];
        samples.column_mut(j).iter_mut().for_each(|v| *v -= mean);
    }
    let scatter = samples.tr_mul(&samples) / (n - 1) as f64;
    // Exact symmetry survives the CSV round trip
    let covariance = (&scatter + scatter.transpose()) * 0.5;

    let entries: Vec<NormativeEntry> = descriptors
        .iter()
        .enumerate()
        .map(|(j, d)| NormativeEntry::for_descriptor(scheme, *d, means[j], covariance[(j, j)].sqrt()))
        .collect();
    let keys = entries.iter().map(|e| e.variable.clone()).collect();

    info!(variables = p, subjects = n, seed = config.seed, "Synthetic reference generated");
    Ok(SyntheticReference {
        entries,
        keys,
        covariance,
    })
}

/// Header labels for the descriptor columns, in axis order.
fn descriptor_fields(entry: &NormativeEntry) -> [&'static str; 4] {
    entry
        .descriptor
        .as_ref()
        .map_or([""; 4], |d| Axis::ALL.map(|a| d.label(a)))
}

/// Write the statistics table in the loader's CSV dialect.
pub fn write_statistics_csv<W: Write>(reference: &SyntheticReference, mut out: W) -> io::Result<()> {
    let header = [VARIABLE_COLUMN]
        .into_iter()
        .chain(Axis::ALL.map(Axis::column))
        .chain([MEAN_COLUMNS[0], STD_COLUMNS[0]]);
    writeln!(out, "{}", csv_join(header))?;

    for entry in &reference.entries {
        let mean = entry.mean.to_string();
        let std = entry.std.to_string();
        let fields = [entry.variable.as_str()]
            .into_iter()
            .chain(descriptor_fields(entry))
            .chain([mean.as_str(), std.as_str()]);
        writeln!(out, "{}", csv_join(fields))?;
    }
    out.flush()
}

/// Write the covariance table: descriptor metadata columns, then one numeric
/// column per variable.
pub fn write_covariance_csv<W: Write>(reference: &SyntheticReference, mut out: W) -> io::Result<()> {
    let header = [VARIABLE_COLUMN]
        .into_iter()
        .chain(Axis::ALL.map(Axis::column))
        .chain(reference.keys.iter().map(String::as_str));
    writeln!(out, "{}", csv_join(header))?;

    for (i, entry) in reference.entries.iter().enumerate() {
        let values: Vec<String> = reference.covariance.row(i).iter().map(f64::to_string).collect();
        let fields = [entry.variable.as_str()]
            .into_iter()
            .chain(descriptor_fields(entry))
            .chain(values.iter().map(String::as_str));
        writeln!(out, "{}", csv_join(fields))?;
    }
    out.flush()
}
