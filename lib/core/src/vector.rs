use serde::{Deserialize, Serialize};

/// A fixed-dimension feature vector
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Vector {
    data: Vec<f32>,
}

impl Vector {
    #[inline]
    #[must_use]
    pub fn new(data: Vec<f32>) -> Self {
        Self { data }
    }

    #[inline]
    #[must_use]
    pub fn dim(&self) -> usize {
        self.data.len()
    }

    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    pub fn dot(&self, other: &Vector) -> f32 {
        dot(&self.data, &other.data)
    }

    #[inline]
    pub fn norm(&self) -> f32 {
        dot(&self.data, &self.data).sqrt()
    }

    /// Cosine similarity given both norms; `None` when either norm is zero
    #[inline]
    pub fn cosine_with_norms(&self, other: &Vector, norm: f32, other_norm: f32) -> Option<f32> {
        if norm == 0.0 || other_norm == 0.0 || self.dim() != other.dim() {
            return None;
        }
        Some(self.dot(other) / (norm * other_norm))
    }

    /// Compute L2 (Euclidean) distance
    #[inline]
    pub fn l2_distance(&self, other: &Vector) -> f32 {
        self.l2_distance_squared(other).sqrt()
    }

    #[inline]
    pub fn l2_distance_squared(&self, other: &Vector) -> f32 {
        if self.dim() != other.dim() {
            return f32::INFINITY;
        }
        squared_l2(&self.data, &other.data)
    }

    /// Arithmetic mean of a non-empty set of equal-dimension vectors.
    ///
    /// Returns `None` for an empty input or mismatched dimensions.
    pub fn mean<'a, I>(vectors: I) -> Option<Vector>
    where
        I: IntoIterator<Item = &'a Vector>,
    {
        let mut iter = vectors.into_iter();
        let first = iter.next()?;
        let mut sum = first.data.clone();
        let mut count = 1usize;
        for v in iter {
            if v.dim() != sum.len() {
                return None;
            }
            for (s, x) in sum.iter_mut().zip(v.data.iter()) {
                *s += x;
            }
            count += 1;
        }
        let inv = 1.0 / count as f32;
        sum.iter_mut().for_each(|s| *s *= inv);
        Some(Vector::new(sum))
    }
}

/// Dot product with two accumulators for better pipelining
#[inline]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let mut sum0 = 0.0f32;
    let mut sum1 = 0.0f32;
    let mut chunks_a = a.chunks_exact(2);
    let mut chunks_b = b.chunks_exact(2);
    for (ca, cb) in (&mut chunks_a).zip(&mut chunks_b) {
        sum0 += ca[0] * cb[0];
        sum1 += ca[1] * cb[1];
    }
    for (x, y) in chunks_a.remainder().iter().zip(chunks_b.remainder()) {
        sum0 += x * y;
    }
    sum0 + sum1
}

#[inline]
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_with_norms() {
        let v1 = Vector::new(vec![1.0, 0.0]);
        let v2 = Vector::new(vec![2.0, 0.0]);
        let cos = v1.cosine_with_norms(&v2, v1.norm(), v2.norm()).unwrap();
        assert!((cos - 1.0).abs() < 1e-6);

        let v3 = Vector::new(vec![0.0, 1.0]);
        let cos = v1.cosine_with_norms(&v3, 1.0, 1.0).unwrap();
        assert!(cos.abs() < 1e-6);

        let zero = Vector::new(vec![0.0; 2]);
        assert!(v1.cosine_with_norms(&zero, 1.0, zero.norm()).is_none());
    }

    #[test]
    fn test_l2_distance() {
        let v1 = Vector::new(vec![0.0, 0.0]);
        let v2 = Vector::new(vec![3.0, 4.0]);
        assert!((v1.l2_distance(&v2) - 5.0).abs() < 1e-6);
        assert!((v1.l2_distance_squared(&v2) - 25.0).abs() < 1e-6);
    }

    #[test]
    fn test_dot_odd_length() {
        let a = [1.0, 2.0, 3.0];
        let b = [4.0, 5.0, 6.0];
        assert!((dot(&a, &b) - 32.0).abs() < 1e-6);
    }

    #[test]
    fn test_mean() {
        let a = Vector::new(vec![1.0, 3.0]);
        let b = Vector::new(vec![3.0, 5.0]);
        let m = Vector::mean([&a, &b]).unwrap();
        assert_eq!(m.as_slice(), &[2.0, 4.0]);
        assert!(Vector::mean(std::iter::empty::<&Vector>()).is_none());
    }
}
