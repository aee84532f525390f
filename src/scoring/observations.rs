//! Subject observation sets: variable key -> observed value.

use std::collections::HashMap;

use tracing::warn;

use crate::codec::KeyScheme;
use crate::types::Observation;

/// One subject's measurements for a single comparison request.
///
/// Iteration order carries no meaning; the Mahalanobis engine re-orders
/// everything against the reference store's canonical key order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservationSet {
    values: HashMap<String, f64>,
}

impl ObservationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Key each observation with `scheme`. For repeated descriptors the last
    /// value wins.
    pub fn from_observations(scheme: &KeyScheme, observations: &[Observation]) -> Self {
        let mut set = Self::new();
        for obs in observations {
            let key = scheme.encode(&obs.descriptor);
            if let Some(previous) = set.insert(key.clone(), obs.value) {
                warn!(variable = %key, previous, replacement = obs.value, "Duplicate observation, keeping the later value");
            }
        }
        set
    }

    /// Insert by raw key, returning the value it replaced.
    pub fn insert(&mut self, key: impl Into<String>, value: f64) -> Option<f64> {
        self.values.insert(key.into(), value)
    }

    /// Builder-style `insert`.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: f64) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for ObservationSet {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Band, Cluster, Measure, MeasurementDescriptor, Time};

    #[test]
    fn test_from_observations_uses_scheme() {
        let d = MeasurementDescriptor::new(Time::Mid, Band::Theta, Measure::Lmfp, Cluster::ParietalRight);
        let set = ObservationSet::from_observations(&KeyScheme::default(), &[Observation::new(d, 1.25)]);
        assert_eq!(set.get("Mid_Theta_LMFP_Parietal Right"), Some(1.25));
    }

    #[test]
    fn test_duplicate_descriptor_keeps_last_value() {
        let d = MeasurementDescriptor::new(Time::Mid, Band::Theta, Measure::Lmfp, Cluster::ParietalRight);
        let set = ObservationSet::from_observations(
            &KeyScheme::default(),
            &[Observation::new(d, 1.0), Observation::new(d, 2.0)],
        );
        assert_eq!(set.len(), 1);
        assert_eq!(set.get(&KeyScheme::default().encode(&d)), Some(2.0));
    }

    #[test]
    fn test_collect_from_pairs() {
        let set: ObservationSet = [("A", 1.0), ("B", 2.0)].into_iter().collect();
        assert!(set.contains("A"));
        assert_eq!(set.iter().count(), 2);
    }
}
