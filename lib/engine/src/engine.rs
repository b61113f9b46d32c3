//! Engine lifecycle and snapshot publishing
//!
//! Fits run one at a time behind a mutex and build a complete [`Snapshot`]
//! before it is published with a single write-lock assignment. Readers only
//! hold the read lock long enough to clone the `Arc`.
//!
//! Configuration can be replaced between fits with [`Engine::reconfigure`];
//! the serving snapshot keeps the configuration and weights it was fitted with.

use crate::config::EngineConfig;
use crate::lifecycle::{Lifecycle, State};
use crate::snapshot::Snapshot;
use crate::stores::CatalogStore;
use blendrec_core::{Error, Product, Result};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

pub struct Engine {
    /// Configuration the next fit uses
    config: RwLock<EngineConfig>,
    lifecycle: RwLock<Lifecycle>,
    fit_lock: Mutex<()>,
    generation: AtomicU64,
}

impl Engine {
    /// Create an unfitted engine. Fails on invalid configuration or fusion weights.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.fusion_weights()?;
        Ok(Self {
            config: RwLock::new(config),
            lifecycle: RwLock::new(Lifecycle::Unfitted),
            fit_lock: Mutex::new(()),
            generation: AtomicU64::new(0),
        })
    }

    pub fn config(&self) -> EngineConfig {
        self.config.read().clone()
    }

    /// Replace the configuration used by the next fit.
    ///
    /// The serving snapshot is untouched. An invalid configuration is rejected
    /// and the current one kept; an empty ensemble is accepted here and fails
    /// at fit time with [`Error::NoScorersConfigured`].
    pub fn reconfigure(&self, config: EngineConfig) -> Result<()> {
        config.fusion_weights()?;
        *self.config.write() = config;
        info!("configuration replaced, takes effect on next fit");
        Ok(())
    }

    pub fn state(&self) -> State {
        self.lifecycle.read().state()
    }

    /// The snapshot currently serving queries
    pub fn snapshot(&self) -> Result<Arc<Snapshot>> {
        self.lifecycle.read().serving().cloned().ok_or(Error::NotReady)
    }

    /// Fit a new snapshot on `catalog` and publish it.
    ///
    /// On failure the previous lifecycle state is restored and its snapshot, if
    /// any, keeps serving.
    pub fn fit(&self, catalog: Vec<Product>) -> Result<Arc<Snapshot>> {
        let _fitting = self.fit_lock.lock();

        {
            let mut lifecycle = self.lifecycle.write();
            let prior = std::mem::replace(&mut *lifecycle, Lifecycle::Unfitted);
            *lifecycle = Lifecycle::Fitting {
                prior: Box::new(prior),
            };
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        info!("fitting generation {} on {} items", generation, catalog.len());

        let config = self.config();
        let built = Snapshot::build(catalog, &config, generation);

        let mut lifecycle = self.lifecycle.write();
        let prior = match std::mem::replace(&mut *lifecycle, Lifecycle::Unfitted) {
            Lifecycle::Fitting { prior } => *prior,
            other => other,
        };
        match built {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                *lifecycle = Lifecycle::Fitted(snapshot.clone());
                info!("published snapshot generation {}", generation);
                Ok(snapshot)
            }
            Err(e) => {
                warn!("fit of generation {} failed: {}", generation, e);
                *lifecycle = prior;
                Err(e)
            }
        }
    }

    /// Fetch the catalog from `store` and fit on it
    pub fn refit(&self, store: &dyn CatalogStore) -> Result<Arc<Snapshot>> {
        let catalog = store.fetch_all()?;
        self.fit(catalog)
    }

    /// Record that the upstream catalog changed; queries fail with
    /// [`Error::NotReady`] until the next successful fit
    pub fn mark_stale(&self) {
        let mut lifecycle = self.lifecycle.write();
        let current = std::mem::replace(&mut *lifecycle, Lifecycle::Unfitted);
        *lifecycle = current.into_stale();
        info!("engine marked {:?}", lifecycle.state());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::MemoryCatalog;

    fn catalog() -> Vec<Product> {
        vec![
            Product::new(1u64, "X").with_price(100.0).with_rating(4.5),
            Product::new(2u64, "X").with_price(105.0).with_rating(4.4),
            Product::new(3u64, "Y").with_price(900.0).with_rating(2.0),
        ]
    }

    #[test]
    fn test_unfitted_is_not_ready() {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        assert_eq!(engine.state(), State::Unfitted);
        assert!(matches!(engine.snapshot(), Err(Error::NotReady)));
    }

    #[test]
    fn test_fit_publishes_snapshot() {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        let snapshot = engine.fit(catalog()).unwrap();
        assert_eq!(engine.state(), State::Fitted);
        assert_eq!(snapshot.generation(), 1);
        assert!(Arc::ptr_eq(&snapshot, &engine.snapshot().unwrap()));
    }

    #[test]
    fn test_failed_fit_keeps_prior_snapshot() {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        let first = engine.fit(catalog()).unwrap();

        assert!(matches!(engine.fit(Vec::new()), Err(Error::EmptyCatalog)));
        assert_eq!(engine.state(), State::Fitted);
        assert!(Arc::ptr_eq(&first, &engine.snapshot().unwrap()));
    }

    #[test]
    fn test_failed_first_fit_stays_unfitted() {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        assert!(engine.fit(Vec::new()).is_err());
        assert_eq!(engine.state(), State::Unfitted);
    }

    #[test]
    fn test_stale_until_refit() {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        engine.fit(catalog()).unwrap();
        engine.mark_stale();
        assert_eq!(engine.state(), State::Stale);
        assert!(matches!(engine.snapshot(), Err(Error::NotReady)));

        let store = MemoryCatalog::new(catalog());
        let refitted = engine.refit(&store).unwrap();
        assert_eq!(refitted.generation(), 2);
        assert_eq!(engine.state(), State::Fitted);
    }

    #[test]
    fn test_reconfigure_to_empty_ensemble_keeps_serving() {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        let first = engine.fit(catalog()).unwrap();

        let no_members = EngineConfig {
            ensemble: Vec::new(),
            ..EngineConfig::default()
        };
        engine.reconfigure(no_members).unwrap();
        assert!(engine.config().ensemble.is_empty());

        assert!(matches!(engine.fit(catalog()), Err(Error::NoScorersConfigured)));
        assert_eq!(engine.state(), State::Fitted);
        let serving = engine.snapshot().unwrap();
        assert!(Arc::ptr_eq(&first, &serving));
        assert_eq!(serving.ensemble().len(), 3);
    }

    #[test]
    fn test_reconfigure_applies_on_next_fit() {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        engine.fit(catalog()).unwrap();

        let single = EngineConfig {
            ensemble: vec![blendrec_core::MemberSpec::kernel()],
            ..EngineConfig::default()
        };
        engine.reconfigure(single).unwrap();
        assert_eq!(engine.snapshot().unwrap().ensemble().len(), 3);

        let refitted = engine.fit(catalog()).unwrap();
        assert_eq!(refitted.ensemble().len(), 1);
        assert!((refitted.aggregator().weights().weight("kernel") - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_invalid_reconfigure_rejected() {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        let config = EngineConfig {
            weights: Some(std::collections::HashMap::from([("svm".to_string(), 1.0)])),
            ..EngineConfig::default()
        };
        assert!(matches!(engine.reconfigure(config), Err(Error::UnknownModel(_))));
        assert_eq!(engine.config().ensemble.len(), 3);
    }

    #[test]
    fn test_invalid_weights_rejected_at_construction() {
        let config = EngineConfig {
            weights: Some(std::collections::HashMap::from([("svm".to_string(), 1.0)])),
            ..EngineConfig::default()
        };
        assert!(matches!(Engine::new(config), Err(Error::UnknownModel(_))));
    }
}
