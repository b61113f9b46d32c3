use blendrec_core::{ClusterConfig, EncoderConfig, Error, MemberSpec, Metric, Result};
use blendrec_fusion::FusionWeights;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

pub const DEFAULT_TOP_K: usize = 5;
pub const DEFAULT_CANDIDATES_PER_MODEL: usize = 10;

/// Configuration for an [`Engine`](crate::Engine)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub encoder: EncoderConfig,
    pub metric: Metric,
    /// Classifier ensemble members, trained in this order
    pub ensemble: Vec<MemberSpec>,
    pub clusters: ClusterConfig,
    /// Model name → vote weight. `None` selects the default weighting.
    pub weights: Option<HashMap<String, f32>>,
    pub top_k: usize,
    /// Candidates each model votes for, before exclusions are added
    pub candidates_per_model: usize,
    /// Seed for fallback sampling; unseeded sampling when `None`
    pub fallback_seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            encoder: EncoderConfig::default(),
            metric: Metric::Cosine,
            ensemble: vec![MemberSpec::kernel(), MemberSpec::naive_bayes(), MemberSpec::forest()],
            clusters: ClusterConfig::default(),
            weights: None,
            top_k: DEFAULT_TOP_K,
            candidates_per_model: DEFAULT_CANDIDATES_PER_MODEL,
            fallback_seed: None,
        }
    }
}

impl EngineConfig {
    /// Load a configuration from a JSON file; absent fields keep their defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn member_names(&self) -> Vec<&str> {
        self.ensemble.iter().map(|m| m.name()).collect()
    }

    /// Validate the configuration and resolve the fusion weights
    pub fn fusion_weights(&self) -> Result<FusionWeights> {
        if self.candidates_per_model == 0 {
            return Err(Error::InvalidConfig(
                "candidates_per_model must be at least 1".to_string(),
            ));
        }
        if self.clusters.num_clusters == 0 {
            return Err(Error::InvalidConfig("num_clusters must be at least 1".to_string()));
        }
        if let Some(text) = &self.encoder.text {
            if text.max_terms == 0 {
                return Err(Error::InvalidConfig("text.max_terms must be at least 1".to_string()));
            }
        }

        let names = self.member_names();
        let weights = match &self.weights {
            Some(map) => FusionWeights::new(map, &names)?,
            None => FusionWeights::defaults(&names)?,
        };
        Ok(weights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blendrec_fusion::{CLUSTER_MODEL, NEIGHBOR_MODEL};
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.member_names(), vec!["kernel", "naive_bayes", "forest"]);
        assert_eq!(config.top_k, 5);

        let weights = config.fusion_weights().unwrap();
        assert!((weights.weight(NEIGHBOR_MODEL) - 0.3).abs() < 1e-6);
        assert!((weights.weight("forest") - 0.2).abs() < 1e-6);
        assert!((weights.weight(CLUSTER_MODEL) - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_misspelled_weight_rejected() {
        let config = EngineConfig {
            weights: Some(HashMap::from([("knn".to_string(), 1.0)])),
            ..EngineConfig::default()
        };
        assert!(matches!(config.fusion_weights(), Err(Error::UnknownModel(name)) if name == "knn"));
    }

    #[test]
    fn test_duplicate_members_rejected() {
        let config = EngineConfig {
            ensemble: vec![MemberSpec::kernel(), MemberSpec::kernel()],
            ..EngineConfig::default()
        };
        assert!(matches!(config.fusion_weights(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_from_json_file_partial() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "metric": "euclidean",
                "ensemble": [{{"type": "forest", "trees": 5}}, {{"type": "kernel"}}],
                "weights": {{"neighbor": 0.5, "forest": 0.5}},
                "top_k": 3
            }}"#
        )
        .unwrap();

        let config = EngineConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.metric, Metric::Euclidean);
        assert_eq!(config.top_k, 3);
        assert_eq!(config.candidates_per_model, DEFAULT_CANDIDATES_PER_MODEL);
        assert_eq!(config.member_names(), vec!["forest", "kernel"]);

        let weights = config.fusion_weights().unwrap();
        assert_eq!(weights.weight("kernel"), 0.0);
        assert_eq!(weights.weight("forest"), 0.5);
    }
}
