//! Candidate filtering and fallback policy
//!
//! Exclusions (the query item, a user's liked/viewed items) are removed after
//! fusion. When nothing survives, a uniform sample of the remaining pool is
//! returned instead.

use crate::aggregate::ScoredCandidate;
use ahash::AHashSet;
use blendrec_core::Scope;
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::SeedableRng;
use smallvec::SmallVec;
use tracing::debug;

/// Outcome of widening a requested scope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveScope {
    pub scope: Scope,
    /// True when a category scope had no eligible positions and was replaced by the full catalog
    pub widened: bool,
}

#[derive(Debug, Clone, Default)]
pub struct CandidateFilter {
    excluded: AHashSet<usize>,
}

impl CandidateFilter {
    pub fn new(exclusions: impl IntoIterator<Item = usize>) -> Self {
        Self {
            excluded: exclusions.into_iter().collect(),
        }
    }

    #[inline]
    pub fn is_excluded(&self, position: usize) -> bool {
        self.excluded.contains(&position)
    }

    pub fn exclusion_count(&self) -> usize {
        self.excluded.len()
    }

    /// Widen `requested` to the full catalog when it holds no position outside the exclusions
    pub fn effective_scope(&self, requested: Scope, catalog_len: usize) -> EffectiveScope {
        if requested.is_full() {
            return EffectiveScope {
                scope: requested,
                widened: false,
            };
        }
        let eligible = requested
            .positions(catalog_len)
            .into_iter()
            .any(|p| !self.is_excluded(p));
        if eligible {
            EffectiveScope {
                scope: requested,
                widened: false,
            }
        } else {
            debug!("scoped candidate set empty, widening to full catalog");
            EffectiveScope {
                scope: Scope::Full,
                widened: true,
            }
        }
    }

    /// Drop excluded positions from a fused ranking and keep the top `k`
    pub fn apply(&self, ranked: Vec<ScoredCandidate>, k: usize) -> Vec<ScoredCandidate> {
        ranked
            .into_iter()
            .filter(|c| !self.is_excluded(c.position))
            .take(k)
            .collect()
    }

    /// Positions of `scope` that are not excluded, ascending
    pub fn remaining_pool(&self, scope: &Scope, catalog_len: usize) -> Vec<usize> {
        scope
            .positions(catalog_len)
            .into_iter()
            .filter(|p| !self.is_excluded(*p))
            .collect()
    }
}

/// Uniformly sample `min(k, pool.len())` positions from `pool`.
///
/// Reproducible when `seed` is given. The sample is returned in ascending position order.
pub fn fallback_sample(pool: &[usize], k: usize, seed: Option<u64>) -> Vec<usize> {
    let amount = k.min(pool.len());
    if amount == 0 {
        return Vec::new();
    }
    let picked = match seed {
        Some(seed) => sample(&mut StdRng::seed_from_u64(seed), pool.len(), amount),
        None => sample(&mut rand::rng(), pool.len(), amount),
    };
    let mut positions: SmallVec<[usize; 16]> = picked.iter().map(|i| pool[i]).collect();
    positions.sort_unstable();
    positions.into_vec()
}
