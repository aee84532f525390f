//! Axis filters for browsing the normative statistics table.

use serde::{Deserialize, Serialize};

use crate::types::{Band, Cluster, Measure, MeasurementDescriptor, Time};

/// Allowed values per axis. An empty list leaves that axis unconstrained;
/// constrained axes combine with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptorFilter {
    #[serde(default)]
    pub times: Vec<Time>,
    #[serde(default)]
    pub bands: Vec<Band>,
    #[serde(default)]
    pub measures: Vec<Measure>,
    #[serde(default)]
    pub clusters: Vec<Cluster>,
}

impl DescriptorFilter {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn times(mut self, times: impl IntoIterator<Item = Time>) -> Self {
        self.times.extend(times);
        self
    }

    #[must_use]
    pub fn bands(mut self, bands: impl IntoIterator<Item = Band>) -> Self {
        self.bands.extend(bands);
        self
    }

    #[must_use]
    pub fn measures(mut self, measures: impl IntoIterator<Item = Measure>) -> Self {
        self.measures.extend(measures);
        self
    }

    #[must_use]
    pub fn clusters(mut self, clusters: impl IntoIterator<Item = Cluster>) -> Self {
        self.clusters.extend(clusters);
        self
    }

    /// No axis is constrained.
    pub fn is_unconstrained(&self) -> bool {
        self.times.is_empty() && self.bands.is_empty() && self.measures.is_empty() && self.clusters.is_empty()
    }

    /// Whether a row with this descriptor passes the filter.
    ///
    /// Rows without descriptor columns only pass an unconstrained filter.
    pub fn matches(&self, descriptor: Option<&MeasurementDescriptor>) -> bool {
        let Some(d) = descriptor else {
            return self.is_unconstrained();
        };
        allows(&self.times, &d.time)
            && allows(&self.bands, &d.band)
            && allows(&self.measures, &d.measure)
            && allows(&self.clusters, &d.cluster)
    }
}

fn allows<T: PartialEq>(allowed: &[T], value: &T) -> bool {
    allowed.is_empty() || allowed.contains(value)
}
