//! Fusion weight definitions
//!
//! Maps every registered model name to the flat vote weight it adds for each
//! candidate it returns. Weights are validated against the registered models
//! when constructed; they do not need to sum to 1.0.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Name of the nearest-neighbor model
pub const NEIGHBOR_MODEL: &str = "neighbor";

/// Name of the cluster-membership model
pub const CLUSTER_MODEL: &str = "cluster";

pub const DEFAULT_NEIGHBOR_WEIGHT: f32 = 0.30;
pub const DEFAULT_ENSEMBLE_BUDGET: f32 = 0.60;
pub const DEFAULT_CLUSTER_WEIGHT: f32 = 0.10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FusionWeights {
    weights: BTreeMap<String, f32>,
}

impl FusionWeights {
    /// Default weighting: neighbor 0.30, cluster 0.10, ensemble members split 0.60
    pub fn defaults(member_names: &[&str]) -> Result<Self, WeightError> {
        let registered = registered_models(member_names)?;
        let share = if member_names.is_empty() {
            0.0
        } else {
            DEFAULT_ENSEMBLE_BUDGET / member_names.len() as f32
        };

        let weights = registered
            .into_iter()
            .map(|name| {
                let weight = match name.as_str() {
                    NEIGHBOR_MODEL => DEFAULT_NEIGHBOR_WEIGHT,
                    CLUSTER_MODEL => DEFAULT_CLUSTER_WEIGHT,
                    _ => share,
                };
                (name, weight)
            })
            .collect();

        Ok(Self { weights })
    }

    /// Validate an explicit mapping.
    /// - Every key must name a registered model
    /// - Weights must be finite and non-negative, and not all zero
    /// - Registered models missing from the mapping get weight 0
    pub fn new(overrides: &HashMap<String, f32>, member_names: &[&str]) -> Result<Self, WeightError> {
        let registered = registered_models(member_names)?;

        for (name, weight) in overrides {
            if !registered.iter().any(|r| r == name) {
                return Err(WeightError::UnknownModel(name.clone()));
            }
            if !weight.is_finite() {
                return Err(WeightError::NonFiniteWeight(name.clone()));
            }
            if *weight < 0.0 {
                return Err(WeightError::NegativeWeight(name.clone()));
            }
        }

        let weights: BTreeMap<String, f32> = registered
            .into_iter()
            .map(|name| {
                let weight = overrides.get(&name).copied().unwrap_or(0.0);
                (name, weight)
            })
            .collect();

        if weights.values().sum::<f32>() <= 0.0 {
            return Err(WeightError::ZeroTotalWeight);
        }

        Ok(Self { weights })
    }

    /// Weight of a model; unregistered names weigh nothing
    #[inline]
    pub fn weight(&self, model: &str) -> f32 {
        self.weights.get(model).copied().unwrap_or(0.0)
    }

    /// Models with zero weight are not evaluated at all
    #[inline]
    pub fn is_active(&self, model: &str) -> bool {
        self.weight(model) > 0.0
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.weights.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

fn registered_models(member_names: &[&str]) -> Result<Vec<String>, WeightError> {
    let mut registered = vec![NEIGHBOR_MODEL.to_string(), CLUSTER_MODEL.to_string()];
    for name in member_names {
        if registered.iter().any(|r| r == name) {
            return Err(WeightError::DuplicateModel(name.to_string()));
        }
        registered.push(name.to_string());
    }
    Ok(registered)
}

/// Errors that can occur during weight validation
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WeightError {
    #[error("Model '{0}' is not registered")]
    UnknownModel(String),

    #[error("Model '{0}' is registered more than once")]
    DuplicateModel(String),

    #[error("Model '{0}' has negative weight")]
    NegativeWeight(String),

    #[error("Model '{0}' has a non-finite weight")]
    NonFiniteWeight(String),

    #[error("Total weight cannot be zero")]
    ZeroTotalWeight,
}

impl From<WeightError> for blendrec_core::Error {
    fn from(err: WeightError) -> Self {
        match err {
            WeightError::UnknownModel(name) => blendrec_core::Error::UnknownModel(name),
            other => blendrec_core::Error::InvalidConfig(other.to_string()),
        }
    }
}
