use super::{check_dim, softmax, CatalogScorer};
use crate::{Error, Result, Vector};

/// Gaussian naive Bayes with one class per item.
///
/// Each class mean is the item's own vector; all classes share the per-feature
/// catalog variance (plus smoothing) and a uniform prior.
#[derive(Debug, Clone)]
pub struct NaiveBayesScorer {
    means: Vec<Vector>,
    inv_variances: Vec<f64>,
}

impl NaiveBayesScorer {
    pub fn train(vectors: &[Vector], var_smoothing: f32) -> Result<Self> {
        let dim = vectors.first().map(Vector::dim).ok_or(Error::EmptyCatalog)?;
        if !(var_smoothing >= 0.0 && var_smoothing.is_finite()) {
            return Err(Error::InvalidConfig(format!(
                "var_smoothing must be non-negative, got {}",
                var_smoothing
            )));
        }

        let n = vectors.len() as f64;
        let mut variances = vec![0.0f64; dim];
        for (f, var) in variances.iter_mut().enumerate() {
            let mean = vectors.iter().map(|v| v.as_slice()[f] as f64).sum::<f64>() / n;
            *var = vectors
                .iter()
                .map(|v| (v.as_slice()[f] as f64 - mean).powi(2))
                .sum::<f64>()
                / n;
        }

        let max_var = variances.iter().copied().fold(0.0, f64::max);
        let epsilon = var_smoothing as f64 * max_var;
        let inv_variances = variances
            .into_iter()
            .map(|v| {
                let v = v + epsilon;
                if v > f64::EPSILON {
                    1.0 / v
                } else {
                    // constant feature: identical for every class
                    0.0
                }
            })
            .collect();

        Ok(Self {
            means: vectors.to_vec(),
            inv_variances,
        })
    }
}

impl CatalogScorer for NaiveBayesScorer {
    fn name(&self) -> &str {
        "naive_bayes"
    }

    fn score(&self, query: &Vector) -> Result<Vec<f32>> {
        check_dim(self.name(), self.inv_variances.len(), query)?;
        let x = query.as_slice();
        let logits: Vec<f64> = self
            .means
            .iter()
            .map(|mean| {
                let mahalanobis: f64 = mean
                    .as_slice()
                    .iter()
                    .zip(x)
                    .zip(&self.inv_variances)
                    .map(|((m, q), inv)| (*q as f64 - *m as f64).powi(2) * inv)
                    .sum();
                -0.5 * mahalanobis
            })
            .collect();
        Ok(softmax(&logits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_features_weighted_by_inverse_variance() {
        // feature 0 varies a lot, feature 1 barely
        let vectors = vec![
            Vector::new(vec![0.0, 0.0]),
            Vector::new(vec![10.0, 0.1]),
            Vector::new(vec![20.0, 0.2]),
        ];
        let scorer = NaiveBayesScorer::train(&vectors, 1e-9).unwrap();
        // 1.0 off on the wide feature costs less than 0.1 off on the narrow one
        let probs = scorer.score(&Vector::new(vec![11.0, 0.0])).unwrap();
        assert!(probs[1] > probs[0]);
        let probs = scorer.score(&Vector::new(vec![10.0, 0.0])).unwrap();
        assert!(probs[1] > probs[2]);
    }

    #[test]
    fn test_constant_features_ignored() {
        let vectors = vec![Vector::new(vec![1.0, 0.0]), Vector::new(vec![1.0, 2.0])];
        let scorer = NaiveBayesScorer::train(&vectors, 0.0).unwrap();
        let probs = scorer.score(&Vector::new(vec![50.0, 2.0])).unwrap();
        assert!(probs.iter().all(|p| p.is_finite()));
        assert!(probs[1] > probs[0]);
    }
}
