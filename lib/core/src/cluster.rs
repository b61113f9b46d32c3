//! K-Means cluster assignment.
//!
//! Lloyd's algorithm with seeded k-means++ initialisation. Every catalog
//! position keeps its label so cluster members can be enumerated in catalog order.

use crate::{Error, Result, Scope, Vector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_NUM_CLUSTERS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    pub num_clusters: usize,
    pub max_iter: usize,
    /// Stop once the summed squared centroid shift falls to or below this
    pub tolerance: f32,
    pub seed: u64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            num_clusters: DEFAULT_NUM_CLUSTERS,
            max_iter: 300,
            tolerance: 1e-4,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClusterAssigner {
    centroids: Vec<Vector>,
    labels: Vec<usize>,
    /// positions per label, ascending
    members: Vec<Vec<usize>>,
    inertia: f32,
}

impl ClusterAssigner {
    /// Partition the catalog; `num_clusters` is clamped to the catalog size
    pub fn fit(vectors: &[Vector], config: &ClusterConfig) -> Result<Self> {
        if vectors.is_empty() {
            return Err(Error::EmptyCatalog);
        }
        if config.num_clusters == 0 {
            return Err(Error::InvalidConfig("num_clusters must be at least 1".to_string()));
        }
        let k = config.num_clusters.min(vectors.len());
        let mut rng = StdRng::seed_from_u64(config.seed);

        let mut centroids = init_plus_plus(vectors, k, &mut rng);
        let mut labels = vec![0usize; vectors.len()];
        let mut n_iter = 0;

        for _ in 0..config.max_iter.max(1) {
            n_iter += 1;
            for (label, v) in labels.iter_mut().zip(vectors) {
                *label = nearest(&centroids, v).0;
            }

            let mut updated = recompute(vectors, &labels, k, &centroids);
            reseed_empty(vectors, &labels, &mut updated);

            let shift: f32 = centroids
                .iter()
                .zip(&updated)
                .map(|(a, b)| a.l2_distance_squared(b))
                .sum();
            centroids = updated;
            if shift <= config.tolerance {
                break;
            }
        }

        let mut inertia = 0.0;
        for (label, v) in labels.iter_mut().zip(vectors) {
            let (best, dist) = nearest(&centroids, v);
            *label = best;
            inertia += dist;
        }

        debug!("k-means stopped after {} iterations, k={}, inertia={:.4}", n_iter, k, inertia);

        let mut members = vec![Vec::new(); k];
        for (position, &label) in labels.iter().enumerate() {
            members[label].push(position);
        }

        Ok(Self {
            centroids,
            labels,
            members,
            inertia,
        })
    }

    #[inline]
    pub fn num_clusters(&self) -> usize {
        self.centroids.len()
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    #[inline]
    pub fn label_of(&self, position: usize) -> Option<usize> {
        self.labels.get(position).copied()
    }

    pub fn inertia(&self) -> f32 {
        self.inertia
    }

    /// Label of the nearest centroid, ties to the lowest label
    pub fn predict(&self, query: &Vector) -> Result<usize> {
        let dim = self.centroids[0].dim();
        if query.dim() != dim {
            return Err(Error::InvalidDimension {
                expected: dim,
                actual: query.dim(),
            });
        }
        Ok(nearest(&self.centroids, query).0)
    }

    /// Up to `limit` positions carrying `label`, in catalog order
    pub fn members_of(&self, label: usize, limit: usize) -> Vec<usize> {
        self.members_within(label, limit, &Scope::Full)
    }

    pub fn members_within(&self, label: usize, limit: usize, scope: &Scope) -> Vec<usize> {
        self.members
            .get(label)
            .map(|positions| {
                positions
                    .iter()
                    .copied()
                    .filter(|p| scope.contains(*p))
                    .take(limit)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of positions carrying `label`
    pub fn cluster_size(&self, label: usize) -> usize {
        self.members.get(label).map_or(0, Vec::len)
    }
}

fn nearest(centroids: &[Vector], v: &Vector) -> (usize, f32) {
    let mut best = (0, f32::INFINITY);
    for (label, c) in centroids.iter().enumerate() {
        let d = v.l2_distance_squared(c);
        if d < best.1 {
            best = (label, d);
        }
    }
    best
}

fn init_plus_plus(vectors: &[Vector], k: usize, rng: &mut StdRng) -> Vec<Vector> {
    let mut centroids = Vec::with_capacity(k);
    let mut chosen = vec![false; vectors.len()];
    let first = rng.random_range(0..vectors.len());
    chosen[first] = true;
    centroids.push(vectors[first].clone());

    let mut d2: Vec<f64> = vectors
        .iter()
        .map(|v| v.l2_distance_squared(&centroids[0]) as f64)
        .collect();

    while centroids.len() < k {
        let total: f64 = d2.iter().sum();
        let next = if total > 0.0 {
            let mut target = rng.random::<f64>() * total;
            let mut pick = d2.len() - 1;
            for (i, w) in d2.iter().enumerate() {
                if *w <= 0.0 {
                    continue;
                }
                if target < *w {
                    pick = i;
                    break;
                }
                target -= w;
            }
            pick
        } else {
            // all remaining points coincide with a centroid
            let free: Vec<usize> = (0..vectors.len()).filter(|i| !chosen[*i]).collect();
            free[rng.random_range(0..free.len())]
        };

        chosen[next] = true;
        let newest = &vectors[next];
        for (w, v) in d2.iter_mut().zip(vectors) {
            *w = w.min(v.l2_distance_squared(newest) as f64);
        }
        centroids.push(newest.clone());
    }
    centroids
}

fn recompute(vectors: &[Vector], labels: &[usize], k: usize, previous: &[Vector]) -> Vec<Vector> {
    let dim = vectors[0].dim();
    let mut sums = vec![vec![0.0f64; dim]; k];
    let mut counts = vec![0usize; k];
    for (v, &label) in vectors.iter().zip(labels) {
        counts[label] += 1;
        for (s, x) in sums[label].iter_mut().zip(v.as_slice()) {
            *s += *x as f64;
        }
    }
    sums.into_iter()
        .zip(counts)
        .enumerate()
        .map(|(label, (sum, count))| {
            if count == 0 {
                previous[label].clone()
            } else {
                Vector::new(sum.into_iter().map(|s| (s / count as f64) as f32).collect())
            }
        })
        .collect()
}

/// Move centroids of empty clusters onto the points farthest from their centroid
fn reseed_empty(vectors: &[Vector], labels: &[usize], centroids: &mut [Vector]) {
    let mut counts = vec![0usize; centroids.len()];
    for &label in labels {
        counts[label] += 1;
    }
    let mut taken = vec![false; vectors.len()];
    for label in 0..centroids.len() {
        if counts[label] > 0 {
            continue;
        }
        let farthest = vectors
            .iter()
            .enumerate()
            .filter(|(i, _)| !taken[*i] && counts[labels[*i]] > 1)
            .map(|(i, v)| (i, v.l2_distance_squared(&centroids[labels[i]])))
            .fold(None, |best: Option<(usize, f32)>, cur| match best {
                Some(b) if b.1 >= cur.1 => Some(b),
                _ => Some(cur),
            });
        if let Some((i, _)) = farthest {
            taken[i] = true;
            counts[labels[i]] -= 1;
            counts[label] += 1;
            centroids[label] = vectors[i].clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blobs() -> Vec<Vector> {
        vec![
            Vector::new(vec![0.0, 0.0]),
            Vector::new(vec![10.0, 10.0]),
            Vector::new(vec![0.2, 0.1]),
            Vector::new(vec![10.1, 9.8]),
            Vector::new(vec![0.1, 0.3]),
            Vector::new(vec![9.9, 10.2]),
        ]
    }

    fn config(k: usize) -> ClusterConfig {
        ClusterConfig {
            num_clusters: k,
            ..ClusterConfig::default()
        }
    }

    #[test]
    fn test_separates_blobs() {
        let clusters = ClusterAssigner::fit(&blobs(), &config(2)).unwrap();
        let labels = clusters.labels();
        assert_eq!(labels[0], labels[2]);
        assert_eq!(labels[0], labels[4]);
        assert_eq!(labels[1], labels[3]);
        assert_eq!(labels[1], labels[5]);
        assert_ne!(labels[0], labels[1]);
    }

    #[test]
    fn test_predict_and_members_in_catalog_order() {
        let clusters = ClusterAssigner::fit(&blobs(), &config(2)).unwrap();
        let label = clusters.predict(&Vector::new(vec![9.5, 9.5])).unwrap();
        assert_eq!(clusters.members_of(label, 10), vec![1, 3, 5]);
        assert_eq!(clusters.members_of(label, 2), vec![1, 3]);
        assert!(clusters.members_of(99, 2).is_empty());
        assert_eq!(clusters.cluster_size(label), 3);
        assert_eq!(clusters.cluster_size(99), 0);

        let scope = Scope::subset(vec![3, 4], 6);
        assert_eq!(clusters.members_within(label, 10, &scope), vec![3]);
    }

    #[test]
    fn test_clusters_clamped_to_catalog() {
        let vectors = vec![Vector::new(vec![1.0]), Vector::new(vec![2.0])];
        let clusters = ClusterAssigner::fit(&vectors, &config(6)).unwrap();
        assert_eq!(clusters.num_clusters(), 2);
        assert_ne!(clusters.label_of(0), clusters.label_of(1));
    }

    #[test]
    fn test_duplicates_do_not_panic() {
        let vectors = vec![Vector::new(vec![1.0, 1.0]); 5];
        let clusters = ClusterAssigner::fit(&vectors, &config(3)).unwrap();
        assert_eq!(clusters.labels().len(), 5);
        assert!(clusters.inertia() < 1e-6);
    }

    #[test]
    fn test_deterministic_under_seed() {
        let a = ClusterAssigner::fit(&blobs(), &config(3)).unwrap();
        let b = ClusterAssigner::fit(&blobs(), &config(3)).unwrap();
        assert_eq!(a.labels(), b.labels());
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            ClusterAssigner::fit(&[], &config(2)),
            Err(Error::EmptyCatalog)
        ));
        assert!(matches!(
            ClusterAssigner::fit(&blobs(), &config(0)),
            Err(Error::InvalidConfig(_))
        ));
        let clusters = ClusterAssigner::fit(&blobs(), &config(2)).unwrap();
        assert!(clusters.predict(&Vector::new(vec![1.0])).is_err());
    }
}
