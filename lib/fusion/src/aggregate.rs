//! Weighted-vote rank fusion
//!
//! Each model contributes a candidate set rather than calibrated scores. Every
//! appearance of a position adds the model's flat weight to that position's
//! combined score; within-model rank and probability are ignored.

use crate::weights::FusionWeights;
use ahash::AHashMap;
use ordered_float::OrderedFloat;
use serde::Serialize;
use smallvec::SmallVec;
use std::cmp::Reverse;
use std::collections::BTreeMap;

/// Candidate positions voted for by one model
#[derive(Debug, Clone, PartialEq)]
pub struct ModelVotes {
    pub model: String,
    pub positions: SmallVec<[usize; 16]>,
}

impl ModelVotes {
    pub fn new(model: impl Into<String>, positions: impl IntoIterator<Item = usize>) -> Self {
        Self {
            model: model.into(),
            positions: positions.into_iter().collect(),
        }
    }
}

/// A fused candidate with per-model contributions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredCandidate {
    /// Catalog position
    pub position: usize,
    /// Weight contributed by each model that voted for this position
    pub contributions: BTreeMap<String, f32>,
    /// Sum of contributions
    pub combined: f32,
}

/// Fuses per-model candidate sets into one ranking
#[derive(Debug, Clone)]
pub struct ScoreAggregator {
    weights: FusionWeights,
}

impl ScoreAggregator {
    pub fn new(weights: FusionWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &FusionWeights {
        &self.weights
    }

    /// Combine the votes of every model.
    ///
    /// Returns all voted positions sorted by combined score descending, ties by
    /// ascending catalog position. A model votes at most once per position and
    /// models with zero weight contribute nothing.
    pub fn fuse(&self, votes: &[ModelVotes]) -> Vec<ScoredCandidate> {
        let mut by_position: AHashMap<usize, ScoredCandidate> = AHashMap::new();

        for model_votes in votes {
            let weight = self.weights.weight(&model_votes.model);
            if weight <= 0.0 {
                continue;
            }
            for &position in &model_votes.positions {
                let candidate = by_position.entry(position).or_insert_with(|| ScoredCandidate {
                    position,
                    contributions: BTreeMap::new(),
                    combined: 0.0,
                });
                if candidate.contributions.contains_key(&model_votes.model) {
                    continue;
                }
                candidate.contributions.insert(model_votes.model.clone(), weight);
                candidate.combined += weight;
            }
        }

        let mut ranked: Vec<ScoredCandidate> = by_position.into_values().collect();
        sort_ranked(&mut ranked);
        ranked
    }
}

/// Combined score descending, then catalog position ascending
pub fn sort_ranked(ranked: &mut [ScoredCandidate]) {
    ranked.sort_by_key(|c| (Reverse(OrderedFloat(c.combined)), c.position));
}
