//! Classifier ensemble.
//!
//! Every member is trained with one synthetic class per catalog position, so a
//! member's class probabilities double as a relevance ranking of catalog items.
//! Members are interchangeable behind [`CatalogScorer`]; the built-in ones are
//! selected through [`MemberSpec`].

mod bayes;
mod forest;
mod kernel;

pub use bayes::NaiveBayesScorer;
pub use forest::ForestScorer;
pub use kernel::KernelScorer;

use crate::{Error, Result, Scope, Vector};
use ordered_float::OrderedFloat;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_VAR_SMOOTHING: f32 = 1e-9;
pub const DEFAULT_FOREST_TREES: usize = 25;
pub const DEFAULT_FOREST_MAX_LEAF: usize = 3;
pub const DEFAULT_FOREST_SEED: u64 = 42;

/// A fitted member: scores a query vector against every catalog item
pub trait CatalogScorer: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// One probability per catalog position
    fn score(&self, query: &Vector) -> Result<Vec<f32>>;
}

/// Trains a [`CatalogScorer`] on the encoded catalog
pub trait ScorerTrainer: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn train(&self, vectors: &[Vector]) -> Result<Box<dyn CatalogScorer>>;
}

/// Declarative description of one ensemble member
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MemberSpec {
    /// RBF kernel scoring, support-vector style
    Kernel {
        #[serde(default)]
        gamma: Option<f32>,
    },
    /// Gaussian naive Bayes centred on each item
    NaiveBayes {
        #[serde(default = "default_var_smoothing")]
        var_smoothing: f32,
    },
    /// Randomized decision trees
    Forest {
        #[serde(default = "default_forest_trees")]
        trees: usize,
        #[serde(default = "default_forest_max_leaf")]
        max_leaf: usize,
        #[serde(default = "default_forest_seed")]
        seed: u64,
    },
    /// Externally supplied member
    #[serde(skip)]
    Custom(Arc<dyn ScorerTrainer>),
}

fn default_var_smoothing() -> f32 {
    DEFAULT_VAR_SMOOTHING
}

fn default_forest_trees() -> usize {
    DEFAULT_FOREST_TREES
}

fn default_forest_max_leaf() -> usize {
    DEFAULT_FOREST_MAX_LEAF
}

fn default_forest_seed() -> u64 {
    DEFAULT_FOREST_SEED
}

impl MemberSpec {
    pub fn kernel() -> Self {
        MemberSpec::Kernel { gamma: None }
    }

    pub fn naive_bayes() -> Self {
        MemberSpec::NaiveBayes {
            var_smoothing: DEFAULT_VAR_SMOOTHING,
        }
    }

    pub fn forest() -> Self {
        MemberSpec::Forest {
            trees: DEFAULT_FOREST_TREES,
            max_leaf: DEFAULT_FOREST_MAX_LEAF,
            seed: DEFAULT_FOREST_SEED,
        }
    }

    pub fn custom(trainer: impl ScorerTrainer + 'static) -> Self {
        MemberSpec::Custom(Arc::new(trainer))
    }

    /// Model name used for fusion weights and diagnostics
    pub fn name(&self) -> &str {
        match self {
            MemberSpec::Kernel { .. } => "kernel",
            MemberSpec::NaiveBayes { .. } => "naive_bayes",
            MemberSpec::Forest { .. } => "forest",
            MemberSpec::Custom(trainer) => trainer.name(),
        }
    }

    fn train(&self, vectors: &[Vector]) -> Result<Box<dyn CatalogScorer>> {
        Ok(match self {
            MemberSpec::Kernel { gamma } => Box::new(KernelScorer::train(vectors, *gamma)?),
            MemberSpec::NaiveBayes { var_smoothing } => {
                Box::new(NaiveBayesScorer::train(vectors, *var_smoothing)?)
            }
            MemberSpec::Forest {
                trees,
                max_leaf,
                seed,
            } => Box::new(ForestScorer::train(vectors, *trees, *max_leaf, *seed)?),
            MemberSpec::Custom(trainer) => trainer.train(vectors)?,
        })
    }
}

impl fmt::Debug for MemberSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberSpec::Kernel { gamma } => f.debug_struct("Kernel").field("gamma", gamma).finish(),
            MemberSpec::NaiveBayes { var_smoothing } => f
                .debug_struct("NaiveBayes")
                .field("var_smoothing", var_smoothing)
                .finish(),
            MemberSpec::Forest {
                trees,
                max_leaf,
                seed,
            } => f
                .debug_struct("Forest")
                .field("trees", trees)
                .field("max_leaf", max_leaf)
                .field("seed", seed)
                .finish(),
            MemberSpec::Custom(trainer) => f.debug_tuple("Custom").field(&trainer.name()).finish(),
        }
    }
}

/// Fitted ensemble members sharing one catalog
#[derive(Debug)]
pub struct ClassifierEnsemble {
    members: Vec<Box<dyn CatalogScorer>>,
    catalog_len: usize,
}

impl ClassifierEnsemble {
    /// Train every configured member on the encoded catalog
    pub fn fit(vectors: &[Vector], specs: &[MemberSpec]) -> Result<Self> {
        if specs.is_empty() {
            return Err(Error::NoScorersConfigured);
        }
        if vectors.is_empty() {
            return Err(Error::EmptyCatalog);
        }

        let members = specs
            .par_iter()
            .map(|spec| spec.train(vectors))
            .collect::<Result<Vec<_>>>()?;
        debug!("trained {} ensemble members on {} items", members.len(), vectors.len());

        Ok(Self {
            members,
            catalog_len: vectors.len(),
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.members.iter().map(|m| m.name()).collect()
    }

    pub fn member_name(&self, member: usize) -> Option<&str> {
        self.members.get(member).map(|m| m.name())
    }

    /// Class probabilities of one member, checked for shape and finiteness
    pub fn score(&self, member: usize, query: &Vector) -> Result<Vec<f32>> {
        let scorer = self.members.get(member).ok_or_else(|| {
            Error::InvalidInput(format!("no ensemble member at index {}", member))
        })?;
        let probs = scorer.score(query)?;
        if probs.len() != self.catalog_len {
            return Err(Error::Scorer {
                model: scorer.name().to_string(),
                reason: format!("returned {} scores for {} items", probs.len(), self.catalog_len),
            });
        }
        if probs.iter().any(|p| !p.is_finite()) {
            return Err(Error::Scorer {
                model: scorer.name().to_string(),
                reason: "returned a non-finite score".to_string(),
            });
        }
        Ok(probs)
    }

    /// The `n` most probable positions in `scope`, ties by ascending position.
    /// Positions with zero probability are never returned.
    pub fn top(&self, member: usize, query: &Vector, n: usize, scope: &Scope) -> Result<Vec<(usize, f32)>> {
        let probs = self.score(member, query)?;
        Ok(top_positions(&probs, n, scope))
    }
}

pub(crate) fn top_positions(probs: &[f32], n: usize, scope: &Scope) -> Vec<(usize, f32)> {
    let mut ranked: Vec<(usize, f32)> = probs
        .iter()
        .enumerate()
        .filter(|(pos, p)| **p > 0.0 && scope.contains(*pos))
        .map(|(pos, p)| (pos, *p))
        .collect();
    ranked.sort_unstable_by_key(|(pos, p)| (Reverse(OrderedFloat(*p)), *pos));
    ranked.truncate(n);
    ranked
}

/// Softmax over logits, computed in f64 with the max subtracted
pub(crate) fn softmax(logits: &[f64]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        let uniform = 1.0 / logits.len().max(1) as f32;
        return vec![uniform; logits.len()];
    }
    let exps: Vec<f64> = logits.iter().map(|l| (l - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.iter().map(|e| (e / sum) as f32).collect()
}

pub(crate) fn check_dim(model: &str, expected: usize, query: &Vector) -> Result<()> {
    if query.dim() != expected {
        return Err(Error::Scorer {
            model: model.to_string(),
            reason: format!("expected dimension {}, got {}", expected, query.dim()),
        });
    }
    Ok(())
}
