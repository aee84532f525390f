//! Atomically swappable handle to the current reference store.
//!
//! Readers take an `Arc` snapshot and keep using it for the whole scoring call,
//! so a concurrent reload can never expose a half-replaced matrix.

use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::{info, warn};

use super::{DataLoadError, ReferenceSource, ReferenceStore};
use crate::config::NormativeConfig;

#[derive(Debug)]
pub struct SharedReferenceStore {
    current: ArcSwap<ReferenceStore>,
}

impl SharedReferenceStore {
    pub fn new(store: ReferenceStore) -> Self {
        Self {
            current: ArcSwap::from_pointee(store),
        }
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> Arc<ReferenceStore> {
        self.current.load_full()
    }

    /// Replace the snapshot, returning the previous one.
    pub fn replace(&self, store: ReferenceStore) -> Arc<ReferenceStore> {
        self.current.swap(Arc::new(store))
    }

    /// Load a fresh store and swap it in.
    ///
    /// On failure the previous snapshot stays active and the error is returned.
    pub async fn reload(
        &self,
        statistics: impl Into<ReferenceSource>,
        covariance: impl Into<ReferenceSource>,
        config: &NormativeConfig,
    ) -> Result<Arc<ReferenceStore>, DataLoadError> {
        match ReferenceStore::load_with_config(statistics, covariance, config).await {
            Ok(store) => {
                let variables = store.len();
                self.replace(store);
                info!(variables, "Reference store reloaded");
                Ok(self.snapshot())
            }
            Err(e) => {
                warn!(error = %e, "Reference reload failed, keeping previous store");
                Err(e)
            }
        }
    }
}
