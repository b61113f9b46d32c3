//! Exact nearest-neighbor index over the encoded catalog.
//!
//! A query scans every indexed vector: O(catalog size × dimension).
//! Large catalogs are scanned in parallel with rayon.

use crate::{Error, Result, Scope, Vector};
use ordered_float::OrderedFloat;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Scans at or above this many candidates run on the rayon pool
const PARALLEL_SCAN_THRESHOLD: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    #[default]
    Cosine,
    Euclidean,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub position: usize,
    pub distance: f32,
}

#[derive(Debug, Clone)]
pub struct NeighborIndex {
    metric: Metric,
    dim: usize,
    vectors: Vec<Vector>,
    norms: Vec<f32>,
}

impl NeighborIndex {
    /// Store the full matrix; every vector must share one dimension
    pub fn build(vectors: Vec<Vector>, metric: Metric) -> Result<Self> {
        let dim = vectors.first().map(Vector::dim).ok_or(Error::EmptyCatalog)?;
        if let Some(bad) = vectors.iter().find(|v| v.dim() != dim) {
            return Err(Error::InvalidDimension {
                expected: dim,
                actual: bad.dim(),
            });
        }
        let norms = vectors.iter().map(Vector::norm).collect();
        Ok(Self {
            metric,
            dim,
            vectors,
            norms,
        })
    }

    #[inline]
    pub fn metric(&self) -> Metric {
        self.metric
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    #[inline]
    pub fn vector(&self, position: usize) -> Option<&Vector> {
        self.vectors.get(position)
    }

    pub fn vectors(&self) -> &[Vector] {
        &self.vectors
    }

    /// The `k` nearest catalog positions, ascending by distance then position
    pub fn query(&self, query: &Vector, k: usize) -> Result<Vec<Neighbor>> {
        self.query_within(query, k, &Scope::Full)
    }

    /// Same as [`query`](Self::query) but only positions inside `scope` are considered
    pub fn query_within(&self, query: &Vector, k: usize, scope: &Scope) -> Result<Vec<Neighbor>> {
        if query.dim() != self.dim {
            return Err(Error::InvalidDimension {
                expected: self.dim,
                actual: query.dim(),
            });
        }
        let k = k.min(scope.len(self.len()));
        if k == 0 {
            return Ok(Vec::new());
        }

        let query_norm = query.norm();
        let candidates = scope.positions(self.len());
        let score = |&position: &usize| Neighbor {
            position,
            distance: self.distance(query, query_norm, position),
        };
        let mut scored: Vec<Neighbor> = if candidates.len() >= PARALLEL_SCAN_THRESHOLD {
            candidates.par_iter().map(score).collect()
        } else {
            candidates.iter().map(score).collect()
        };

        let key = |n: &Neighbor| (OrderedFloat(n.distance), n.position);
        if k < scored.len() {
            scored.select_nth_unstable_by_key(k - 1, key);
            scored.truncate(k);
        }
        scored.sort_unstable_by_key(key);
        Ok(scored)
    }

    /// Distance between a query and one indexed vector.
    /// Cosine falls back to Euclidean when either side has zero norm.
    #[inline]
    fn distance(&self, query: &Vector, query_norm: f32, position: usize) -> f32 {
        let item = &self.vectors[position];
        let item_norm = self.norms[position];
        let cosine = match self.metric {
            Metric::Cosine => query.cosine_with_norms(item, query_norm, item_norm),
            Metric::Euclidean => None,
        };
        match cosine {
            Some(cos) => (1.0 - cos).max(0.0),
            None => query.l2_distance(item),
        }
    }
}
