//! Measurement descriptor taxonomy for TMS-EEG derived metrics
//!
//! Every normative variable is one point in a four-axis grid:
//! post-stimulus time window, frequency band, measure and electrode cluster.
//! The labels here are the exact strings used in the reference tables.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    #[error("Unknown {axis} value: '{value}'")]
    UnknownValue { axis: Axis, value: String },
}

// ============================================================================
// Axis
// ============================================================================

/// One of the four descriptor axes.
///
/// The variant name doubles as the column header in the reference tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    Time,
    Band,
    Measure,
    Cluster,
}

impl Axis {
    pub const ALL: [Self; 4] = [Self::Time, Self::Band, Self::Measure, Self::Cluster];

    /// Column header for this axis in the statistics and covariance tables.
    pub const fn column(self) -> &'static str {
        match self {
            Self::Time => "Time",
            Self::Band => "Band",
            Self::Measure => "Measure",
            Self::Cluster => "Cluster",
        }
    }

    /// Every label that can appear on this axis.
    pub fn labels(self) -> Vec<&'static str> {
        match self {
            Self::Time => Time::ALL.iter().map(|t| t.as_str()).collect(),
            Self::Band => Band::ALL.iter().map(|b| b.as_str()).collect(),
            Self::Measure => Measure::ALL.iter().map(|m| m.as_str()).collect(),
            Self::Cluster => Cluster::ALL.iter().map(|c| c.as_str()).collect(),
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

// ============================================================================
// Axis value enums
// ============================================================================

/// Implements `as_str`, `Display` and `FromStr` for a label enum.
macro_rules! axis_labels {
    ($ty:ident, $axis:expr, { $($variant:ident => $label:literal),+ $(,)? }) => {
        impl $ty {
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = DescriptorError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    $($label => Ok(Self::$variant),)+
                    other => Err(DescriptorError::UnknownValue {
                        axis: $axis,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

/// Post-stimulus time window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Time {
    Early,
    Mid,
    Late,
    Global,
}

axis_labels!(Time, Axis::Time, {
    Early => "Early",
    Mid => "Mid",
    Late => "Late",
    Global => "Global",
});

impl Time {
    /// Window bounds in milliseconds after the TMS pulse.
    pub const fn window_ms(self) -> (u32, u32) {
        match self {
            Self::Early => (15, 120),
            Self::Mid => (120, 180),
            Self::Late => (180, 300),
            Self::Global => (15, 300),
        }
    }
}

/// EEG frequency band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Band {
    Delta,
    Theta,
    Alpha,
    Beta,
    Gamma,
    BroadBand,
}

axis_labels!(Band, Axis::Band, {
    Delta => "Delta",
    Theta => "Theta",
    Alpha => "Alpha",
    Beta => "Beta",
    Gamma => "Gamma",
    BroadBand => "BroadBand",
});

impl Band {
    /// The five narrow bands (everything except `BroadBand`).
    pub const NARROW: &'static [Self] = &[Self::Delta, Self::Theta, Self::Alpha, Self::Beta, Self::Gamma];

    /// Frequency range in Hz.
    pub const fn range_hz(self) -> (f64, f64) {
        match self {
            Self::Delta => (0.5, 4.0),
            Self::Theta => (4.0, 8.0),
            Self::Alpha => (8.0, 12.0),
            Self::Beta => (12.0, 30.0),
            Self::Gamma => (30.0, 100.0),
            Self::BroadBand => (0.5, 100.0),
        }
    }
}

/// TEP-derived measure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Measure {
    /// Event-related spectral perturbation
    #[serde(rename = "ERSP")]
    Ersp,
    /// Relative spectral power
    #[serde(rename = "RSP")]
    Rsp,
    /// Global mean field power
    #[serde(rename = "GMFP")]
    Gmfp,
    /// Local mean field power
    #[serde(rename = "LMFP")]
    Lmfp,
    /// Perturbational complexity index (state transitions)
    #[serde(rename = "PCIst")]
    PciSt,
    /// Natural frequency
    #[serde(rename = "NF")]
    Nf,
}

axis_labels!(Measure, Axis::Measure, {
    Ersp => "ERSP",
    Rsp => "RSP",
    Gmfp => "GMFP",
    Lmfp => "LMFP",
    PciSt => "PCIst",
    Nf => "NF",
});

/// Electrode cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cluster {
    #[serde(rename = "Centro-Parietal Left")]
    CentroParietalLeft,
    #[serde(rename = "Parietal Left")]
    ParietalLeft,
    #[serde(rename = "Parietal Right")]
    ParietalRight,
    #[serde(rename = "Centro-Parietal Right")]
    CentroParietalRight,
}

axis_labels!(Cluster, Axis::Cluster, {
    CentroParietalLeft => "Centro-Parietal Left",
    ParietalLeft => "Parietal Left",
    ParietalRight => "Parietal Right",
    CentroParietalRight => "Centro-Parietal Right",
});

impl Cluster {
    /// 10-10 electrodes pooled into this cluster.
    pub const fn electrodes(self) -> &'static [&'static str] {
        match self {
            Self::CentroParietalLeft => &["CP3", "CP5"],
            Self::ParietalLeft => &["P3", "P5"],
            Self::ParietalRight => &["P4", "P6"],
            Self::CentroParietalRight => &["CP4", "CP6"],
        }
    }
}

// ============================================================================
// Descriptor
// ============================================================================

/// A single (Time, Band, Measure, Cluster) coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MeasurementDescriptor {
    pub time: Time,
    pub band: Band,
    pub measure: Measure,
    pub cluster: Cluster,
}

impl MeasurementDescriptor {
    pub const fn new(time: Time, band: Band, measure: Measure, cluster: Cluster) -> Self {
        Self {
            time,
            band,
            measure,
            cluster,
        }
    }

    /// Label of this descriptor on the given axis.
    pub const fn label(&self, axis: Axis) -> &'static str {
        match axis {
            Axis::Time => self.time.as_str(),
            Axis::Band => self.band.as_str(),
            Axis::Measure => self.measure.as_str(),
            Axis::Cluster => self.cluster.as_str(),
        }
    }

    /// Parse a descriptor from raw axis labels.
    pub fn parse(time: &str, band: &str, measure: &str, cluster: &str) -> Result<Self, DescriptorError> {
        Ok(Self {
            time: time.parse()?,
            band: band.parse()?,
            measure: measure.parse()?,
            cluster: cluster.parse()?,
        })
    }
}

impl fmt::Display for MeasurementDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {} / {} / {}", self.time, self.band, self.measure, self.cluster)
    }
}

/// One subject measurement: a descriptor plus the observed value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub descriptor: MeasurementDescriptor,
    pub value: f64,
}

impl Observation {
    pub const fn new(descriptor: MeasurementDescriptor, value: f64) -> Self {
        Self { descriptor, value }
    }
}
