//! Immutable fitted state
//!
//! A [`Snapshot`] bundles the catalog with everything fitted on it. It is never
//! mutated after [`Snapshot::build`]; a refit produces a new one.

use crate::config::EngineConfig;
use ahash::AHashMap;
use blendrec_core::{
    ClassifierEnsemble, ClusterAssigner, Error, FeatureEncoder, NeighborIndex, Product, ProductId,
    Result, ScopedEncoding, Vector,
};
use blendrec_fusion::ScoreAggregator;
use tracing::info;

#[derive(Debug)]
pub struct Snapshot {
    generation: u64,
    catalog: Vec<Product>,
    positions: AHashMap<ProductId, usize>,
    encoder: FeatureEncoder,
    index: NeighborIndex,
    ensemble: ClassifierEnsemble,
    clusters: ClusterAssigner,
    aggregator: ScoreAggregator,
    config: EngineConfig,
}

impl Snapshot {
    /// Fit every component on `catalog`. Catalog order becomes the positional order.
    pub fn build(catalog: Vec<Product>, config: &EngineConfig, generation: u64) -> Result<Self> {
        if config.ensemble.is_empty() {
            return Err(Error::NoScorersConfigured);
        }
        if catalog.is_empty() {
            return Err(Error::EmptyCatalog);
        }
        let aggregator = ScoreAggregator::new(config.fusion_weights()?);

        let mut positions = AHashMap::with_capacity(catalog.len());
        for (position, product) in catalog.iter().enumerate() {
            product.validate()?;
            if positions.insert(product.id.clone(), position).is_some() {
                return Err(Error::DuplicateProduct(product.id.to_string()));
            }
        }

        let encoder = FeatureEncoder::fit(&catalog, &config.encoder)?;
        let vectors: Vec<Vector> = catalog.iter().map(|p| encoder.encode_product(p)).collect();

        let (ensemble, (clusters, index)) = rayon::join(
            || ClassifierEnsemble::fit(&vectors, &config.ensemble),
            || {
                (
                    ClusterAssigner::fit(&vectors, &config.clusters),
                    NeighborIndex::build(vectors.clone(), config.metric),
                )
            },
        );
        let (ensemble, clusters, index) = (ensemble?, clusters?, index?);

        info!(
            "built snapshot generation {}: {} items, dim {}, {} members, {} clusters",
            generation,
            catalog.len(),
            encoder.dim(),
            ensemble.len(),
            clusters.num_clusters()
        );

        Ok(Self {
            generation,
            catalog,
            positions,
            encoder,
            index,
            ensemble,
            clusters,
            aggregator,
            config: config.clone(),
        })
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.catalog.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.catalog.is_empty()
    }

    pub fn catalog(&self) -> &[Product] {
        &self.catalog
    }

    pub fn product(&self, position: usize) -> Option<&Product> {
        self.catalog.get(position)
    }

    #[inline]
    pub fn position_of(&self, id: &ProductId) -> Option<usize> {
        self.positions.get(id).copied()
    }

    pub fn encoder(&self) -> &FeatureEncoder {
        &self.encoder
    }

    pub fn index(&self) -> &NeighborIndex {
        &self.index
    }

    pub fn ensemble(&self) -> &ClassifierEnsemble {
        &self.ensemble
    }

    pub fn clusters(&self) -> &ClusterAssigner {
        &self.clusters
    }

    /// Fusion weights the snapshot was fitted with
    pub fn aggregator(&self) -> &ScoreAggregator {
        &self.aggregator
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Catalog-wide encoding of the item at `position`
    pub fn vector(&self, position: usize) -> Option<&Vector> {
        self.index.vector(position)
    }

    /// Positions whose category equals `category`, ascending
    pub fn category_positions(&self, category: &str) -> Vec<usize> {
        self.catalog
            .iter()
            .enumerate()
            .filter(|(_, p)| p.category == category)
            .map(|(i, _)| i)
            .collect()
    }

    /// Fresh encoder restricted to `positions`, with their vectors in the same order
    pub fn encode_scope(&self, positions: &[usize]) -> Result<ScopedEncoding> {
        let items: Vec<&Product> = positions.iter().filter_map(|&p| self.product(p)).collect();
        FeatureEncoder::encode_subset(&items, &self.config.encoder)
    }
}
