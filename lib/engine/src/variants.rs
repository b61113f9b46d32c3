//! Model variants
//!
//! Every scoring strategy answers the same question: given a query vector,
//! which catalog positions in scope does it vote for? The set of strategies is
//! closed, so they are dispatched over an enum rather than a trait object.

use crate::snapshot::Snapshot;
use blendrec_core::{NeighborIndex, Result, Scope, Vector};
use blendrec_fusion::{FusionWeights, ModelVotes, CLUSTER_MODEL, NEIGHBOR_MODEL};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelVariant {
    Neighbor,
    /// Ensemble member by index
    Classifier(usize),
    Cluster,
}

/// Nearest-neighbor search over a category-scoped encoding
#[derive(Debug)]
pub struct ScopedNeighbors {
    /// Catalog positions of the scoped index, in index order
    pub positions: Vec<usize>,
    pub index: NeighborIndex,
    /// Query encoded with the scoped encoder
    pub query: Vector,
}

/// Inputs shared by every variant for one request
#[derive(Debug)]
pub struct VariantContext<'a> {
    pub snapshot: &'a Snapshot,
    pub query: &'a Vector,
    pub scope: &'a Scope,
    pub limit: usize,
    pub scoped_neighbors: Option<&'a ScopedNeighbors>,
}

impl ModelVariant {
    /// Variants with a positive fusion weight, in fixed order: neighbor, members, cluster
    pub fn active(snapshot: &Snapshot, weights: &FusionWeights) -> Vec<ModelVariant> {
        let mut variants = Vec::new();
        if weights.is_active(NEIGHBOR_MODEL) {
            variants.push(ModelVariant::Neighbor);
        }
        for (member, name) in snapshot.ensemble().names().into_iter().enumerate() {
            if weights.is_active(name) {
                variants.push(ModelVariant::Classifier(member));
            }
        }
        if weights.is_active(CLUSTER_MODEL) {
            variants.push(ModelVariant::Cluster);
        }
        variants
    }

    pub fn name<'a>(&self, snapshot: &'a Snapshot) -> &'a str {
        match self {
            ModelVariant::Neighbor => NEIGHBOR_MODEL,
            ModelVariant::Classifier(member) => snapshot.ensemble().member_name(*member).unwrap_or("unknown"),
            ModelVariant::Cluster => CLUSTER_MODEL,
        }
    }

    /// Up to `ctx.limit` positions in scope this variant votes for
    pub fn candidates(&self, ctx: &VariantContext<'_>) -> Result<ModelVotes> {
        let name = self.name(ctx.snapshot);
        let positions: Vec<usize> = match self {
            ModelVariant::Neighbor => match ctx.scoped_neighbors {
                Some(scoped) => scoped
                    .index
                    .query(&scoped.query, ctx.limit)?
                    .into_iter()
                    .filter_map(|n| scoped.positions.get(n.position).copied())
                    .collect(),
                None => ctx
                    .snapshot
                    .index()
                    .query_within(ctx.query, ctx.limit, ctx.scope)?
                    .into_iter()
                    .map(|n| n.position)
                    .collect(),
            },
            ModelVariant::Classifier(member) => ctx
                .snapshot
                .ensemble()
                .top(*member, ctx.query, ctx.limit, ctx.scope)?
                .into_iter()
                .map(|(position, _)| position)
                .collect(),
            ModelVariant::Cluster => {
                let clusters = ctx.snapshot.clusters();
                let label = clusters.predict(ctx.query)?;
                clusters.members_within(label, ctx.limit, ctx.scope)
            }
        };
        Ok(ModelVotes::new(name, positions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use blendrec_core::Product;
    use std::collections::HashMap;

    fn snapshot() -> Snapshot {
        let catalog = vec![
            Product::new(1u64, "X").with_price(100.0).with_rating(4.5),
            Product::new(2u64, "X").with_price(105.0).with_rating(4.4),
            Product::new(3u64, "Y").with_price(900.0).with_rating(2.0),
            Product::new(4u64, "Y").with_price(880.0).with_rating(2.2),
        ];
        Snapshot::build(catalog, &EngineConfig::default(), 1).unwrap()
    }

    #[test]
    fn test_active_skips_zero_weight() {
        let snapshot = snapshot();
        let names = snapshot.config().member_names();
        let weights = FusionWeights::new(
            &HashMap::from([(NEIGHBOR_MODEL.to_string(), 1.0), ("forest".to_string(), 0.5)]),
            &names,
        )
        .unwrap();
        assert_eq!(
            ModelVariant::active(&snapshot, &weights),
            vec![ModelVariant::Neighbor, ModelVariant::Classifier(2)]
        );

        let all = FusionWeights::defaults(&names).unwrap();
        assert_eq!(ModelVariant::active(&snapshot, &all).len(), 5);
        assert_eq!(ModelVariant::Classifier(1).name(&snapshot), "naive_bayes");
    }

    #[test]
    fn test_candidates_respect_scope_and_limit() {
        let snapshot = snapshot();
        let query = snapshot.vector(2).unwrap().clone();
        let scope = Scope::subset(vec![2, 3], 4);
        let ctx = VariantContext {
            snapshot: &snapshot,
            query: &query,
            scope: &scope,
            limit: 3,
            scoped_neighbors: None,
        };

        for variant in [ModelVariant::Neighbor, ModelVariant::Classifier(0), ModelVariant::Cluster] {
            let votes = variant.candidates(&ctx).unwrap();
            assert!(votes.positions.len() <= 3);
            assert!(votes.positions.iter().all(|p| scope.contains(*p)), "{:?}", votes);
        }

        let nearest = ModelVariant::Neighbor.candidates(&ctx).unwrap();
        assert_eq!(nearest.positions[0], 2);
    }

    #[test]
    fn test_scoped_neighbors_map_back_to_catalog() {
        let snapshot = snapshot();
        let positions = vec![2, 3];
        let scoped = snapshot.encode_scope(&positions).unwrap();
        let query = scoped.vectors[1].clone();
        let scoped = ScopedNeighbors {
            positions,
            index: NeighborIndex::build(scoped.vectors, snapshot.config().metric).unwrap(),
            query,
        };
        let catalog_query = snapshot.vector(3).unwrap().clone();
        let ctx = VariantContext {
            snapshot: &snapshot,
            query: &catalog_query,
            scope: &Scope::Full,
            limit: 2,
            scoped_neighbors: Some(&scoped),
        };
        let votes = ModelVariant::Neighbor.candidates(&ctx).unwrap();
        assert_eq!(votes.positions.as_slice(), &[3, 2]);
    }
}
