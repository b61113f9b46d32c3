use super::{check_dim, CatalogScorer};
use crate::{Error, Result, Vector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

/// Minimum feature spread considered splittable
const MIN_SPREAD: f32 = 1e-6;

#[derive(Debug, Clone)]
enum Node {
    Split {
        feature: usize,
        threshold: f32,
        left: usize,
        right: usize,
    },
    Leaf {
        positions: Vec<usize>,
    },
}

#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    /// Extra-trees style growth: a random splittable feature and a uniform
    /// threshold inside its range, until a node holds at most `max_leaf` items.
    fn grow(vectors: &[Vector], max_leaf: usize, rng: &mut StdRng) -> Self {
        let mut nodes = vec![Node::Leaf { positions: Vec::new() }];
        let mut stack: Vec<(usize, Vec<usize>)> = vec![(0, (0..vectors.len()).collect())];

        while let Some((slot, positions)) = stack.pop() {
            if positions.len() <= max_leaf {
                nodes[slot] = Node::Leaf { positions };
                continue;
            }

            let splittable: Vec<(usize, f32, f32)> = (0..vectors[positions[0]].dim())
                .filter_map(|f| {
                    let (lo, hi) = positions.iter().fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &p| {
                        let x = vectors[p].as_slice()[f];
                        (lo.min(x), hi.max(x))
                    });
                    (hi - lo > MIN_SPREAD).then_some((f, lo, hi))
                })
                .collect();

            if splittable.is_empty() {
                // duplicates: nothing separates them
                nodes[slot] = Node::Leaf { positions };
                continue;
            }

            let (feature, lo, hi) = splittable[rng.random_range(0..splittable.len())];
            let threshold = rng.random_range(lo..hi);
            let (left_pos, right_pos): (Vec<usize>, Vec<usize>) = positions
                .into_iter()
                .partition(|&p| vectors[p].as_slice()[feature] <= threshold);

            let left = nodes.len();
            let right = left + 1;
            nodes.push(Node::Leaf { positions: Vec::new() });
            nodes.push(Node::Leaf { positions: Vec::new() });
            nodes[slot] = Node::Split {
                feature,
                threshold,
                left,
                right,
            };
            stack.push((right, right_pos));
            stack.push((left, left_pos));
        }

        Self { nodes }
    }

    fn leaf(&self, query: &[f32]) -> &[usize] {
        let mut slot = 0;
        loop {
            match &self.nodes[slot] {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    slot = if query[*feature] <= *threshold { *left } else { *right };
                }
                Node::Leaf { positions } => return positions,
            }
        }
    }
}

/// Randomized-tree ensemble member.
///
/// The probability of item `j` is the mean over trees of `1 / |leaf|` when the
/// query lands in the leaf holding `j`, zero otherwise.
#[derive(Debug, Clone)]
pub struct ForestScorer {
    trees: Vec<Tree>,
    catalog_len: usize,
    dim: usize,
}

impl ForestScorer {
    pub fn train(vectors: &[Vector], trees: usize, max_leaf: usize, seed: u64) -> Result<Self> {
        let dim = vectors.first().map(Vector::dim).ok_or(Error::EmptyCatalog)?;
        if trees == 0 || max_leaf == 0 {
            return Err(Error::InvalidConfig(
                "forest needs at least one tree and a leaf size of at least one".to_string(),
            ));
        }

        let trees = (0..trees as u64)
            .into_par_iter()
            .map(|t| {
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(t));
                Tree::grow(vectors, max_leaf, &mut rng)
            })
            .collect();

        Ok(Self {
            trees,
            catalog_len: vectors.len(),
            dim,
        })
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }
}

impl CatalogScorer for ForestScorer {
    fn name(&self) -> &str {
        "forest"
    }

    fn score(&self, query: &Vector) -> Result<Vec<f32>> {
        check_dim(self.name(), self.dim, query)?;
        let mut probs = vec![0.0f32; self.catalog_len];
        let per_tree = 1.0 / self.trees.len() as f32;
        for tree in &self.trees {
            let leaf = tree.leaf(query.as_slice());
            if leaf.is_empty() {
                continue;
            }
            let share = per_tree / leaf.len() as f32;
            for &p in leaf {
                probs[p] += share;
            }
        }
        Ok(probs)
    }
}
