//! Synthetic Normative Reference Generator
//!
//! Writes a mutually consistent pair of reference tables for development and
//! testing:
//! - `norm.csv`: Variable, descriptor columns, Normative_Mean, Normative_Std
//! - `norm_cov.csv`: descriptor metadata columns plus the covariance block
//! - `manifest.json`: parameters needed to regenerate the same files
//!
//! # Usage
//! ```bash
//! ./synthetic-norms --out-dir data --subjects 1000 --seed 42
//! ```

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use normatep::config::{self, defaults, NormativeConfig};
use normatep::synthetic::{self, SyntheticConfig, SyntheticManifest};

#[derive(Parser, Debug)]
#[command(name = "synthetic-norms")]
#[command(about = "Generate synthetic normative reference tables for NormaTEP testing")]
#[command(version)]
struct Args {
    /// Directory receiving norm.csv, norm_cov.csv and manifest.json
    #[arg(short, long, default_value = ".")]
    out_dir: PathBuf,

    /// Simulated reference cohort size
    #[arg(short, long, default_value_t = defaults::SYNTHETIC_SUBJECTS)]
    subjects: usize,

    /// Shared latent factors (inter-variable correlation)
    #[arg(long, default_value_t = defaults::SYNTHETIC_LATENT_FACTORS)]
    latent_factors: usize,

    /// Also generate BroadBand variables
    #[arg(long)]
    broadband: bool,

    /// Random seed for reproducibility (random if omitted)
    #[arg(long, env = "NORMATEP_SEED")]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();
    config::init(NormativeConfig::load());
    let scheme = &config::current().keys;

    let generation = SyntheticConfig {
        subjects: args.subjects,
        latent_factors: args.latent_factors,
        include_broadband: args.broadband,
        seed: args.seed.unwrap_or_else(rand::random),
        ..Default::default()
    };

    let reference = synthetic::generate(scheme, &generation).context("Failed to generate reference tables")?;

    fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("Failed to create {}", args.out_dir.display()))?;

    let stats_path = args.out_dir.join("norm.csv");
    let file = File::create(&stats_path).with_context(|| format!("Failed to create {}", stats_path.display()))?;
    synthetic::write_statistics_csv(&reference, BufWriter::new(file))
        .with_context(|| format!("Failed to write {}", stats_path.display()))?;

    let cov_path = args.out_dir.join("norm_cov.csv");
    let file = File::create(&cov_path).with_context(|| format!("Failed to create {}", cov_path.display()))?;
    synthetic::write_covariance_csv(&reference, BufWriter::new(file))
        .with_context(|| format!("Failed to write {}", cov_path.display()))?;

    let manifest = SyntheticManifest {
        variables: reference.entries.len(),
        keys: scheme.clone(),
        config: generation,
    };
    let manifest_path = args.out_dir.join("manifest.json");
    fs::write(&manifest_path, serde_json::to_string_pretty(&manifest)?)
        .with_context(|| format!("Failed to write {}", manifest_path.display()))?;

    info!(
        variables = manifest.variables,
        seed = manifest.config.seed,
        out_dir = %args.out_dir.display(),
        "Reference tables written"
    );
    Ok(())
}
