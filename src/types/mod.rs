//! Shared data structures for normative TMS-EEG scoring
//!
//! - `MeasurementDescriptor`: (Time, Band, Measure, Cluster) coordinate of a metric
//! - `Observation`: one subject measurement (descriptor + value)

mod descriptor;

pub use descriptor::*;
