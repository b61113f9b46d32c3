use super::{check_dim, softmax, CatalogScorer};
use crate::{Error, Result, Vector};

/// RBF kernel member: `p_j ∝ exp(-γ‖x − x_j‖²)`
#[derive(Debug, Clone)]
pub struct KernelScorer {
    vectors: Vec<Vector>,
    gamma: f32,
    dim: usize,
}

impl KernelScorer {
    /// `gamma` defaults to `1 / (dim · Var(X))` over all matrix entries
    pub fn train(vectors: &[Vector], gamma: Option<f32>) -> Result<Self> {
        let dim = vectors.first().map(Vector::dim).ok_or(Error::EmptyCatalog)?;
        let gamma = match gamma {
            Some(g) if g > 0.0 && g.is_finite() => g,
            Some(g) => return Err(Error::InvalidConfig(format!("kernel gamma must be positive, got {}", g))),
            None => scale_gamma(vectors, dim),
        };
        Ok(Self {
            vectors: vectors.to_vec(),
            gamma,
            dim,
        })
    }

    pub fn gamma(&self) -> f32 {
        self.gamma
    }
}

fn scale_gamma(vectors: &[Vector], dim: usize) -> f32 {
    let count = (vectors.len() * dim).max(1) as f64;
    let mean = vectors
        .iter()
        .flat_map(|v| v.as_slice())
        .map(|x| *x as f64)
        .sum::<f64>()
        / count;
    let var = vectors
        .iter()
        .flat_map(|v| v.as_slice())
        .map(|x| (*x as f64 - mean).powi(2))
        .sum::<f64>()
        / count;
    if var > f64::EPSILON {
        (1.0 / (dim as f64 * var)) as f32
    } else {
        1.0 / dim.max(1) as f32
    }
}

impl CatalogScorer for KernelScorer {
    fn name(&self) -> &str {
        "kernel"
    }

    fn score(&self, query: &Vector) -> Result<Vec<f32>> {
        check_dim(self.name(), self.dim, query)?;
        let logits: Vec<f64> = self
            .vectors
            .iter()
            .map(|v| -(self.gamma as f64) * query.l2_distance_squared(v) as f64)
            .collect();
        Ok(softmax(&logits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closer_items_score_higher() {
        let vectors = vec![
            Vector::new(vec![0.0]),
            Vector::new(vec![1.0]),
            Vector::new(vec![3.0]),
        ];
        let scorer = KernelScorer::train(&vectors, None).unwrap();
        let probs = scorer.score(&Vector::new(vec![0.9])).unwrap();
        assert!(probs[1] > probs[0]);
        assert!(probs[0] > probs[2]);
    }

    #[test]
    fn test_invalid_gamma() {
        let vectors = vec![Vector::new(vec![0.0])];
        assert!(KernelScorer::train(&vectors, Some(-1.0)).is_err());
        assert_eq!(KernelScorer::train(&vectors, Some(0.5)).unwrap().gamma(), 0.5);
    }
}
