//! Feature Encoder
//!
//! Converts catalog items into fixed-length numeric vectors:
//! `[scaled price, scaled rating, one-hot category, optional title terms]`.
//! All scaling statistics and vocabularies are frozen by [`FeatureEncoder::fit`].

use crate::product::{Attributes, Product};
use crate::text::TextVocabulary;
use crate::{Error, Result, Vector};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// Number of leading numeric slots (price, rating)
pub const NUMERIC_FIELDS: usize = 2;

/// Default upper bound on the title vocabulary
pub const DEFAULT_MAX_TERMS: usize = 32;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// Title term block; disabled when `None`
    pub text: Option<TextConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextConfig {
    pub max_terms: usize,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            max_terms: DEFAULT_MAX_TERMS,
        }
    }
}

/// Mean and standard deviation of one numeric field
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericStats {
    pub mean: f64,
    pub std: f64,
}

impl NumericStats {
    /// Missing values are imputed with the mean of the present ones before
    /// the deviation is computed. A zero deviation is replaced by 1.0.
    fn fit<I>(values: I) -> Self
    where
        I: IntoIterator<Item = Option<f64>>,
    {
        let values: Vec<Option<f64>> = values.into_iter().collect();
        let present: Vec<f64> = values.iter().flatten().copied().collect();
        let mean = if present.is_empty() {
            0.0
        } else {
            present.iter().sum::<f64>() / present.len() as f64
        };

        let n = values.len().max(1) as f64;
        // imputed entries sit exactly on the mean and add nothing to the variance
        let variance = present.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
        let std = variance.sqrt();
        let std = if std > f64::EPSILON { std } else { 1.0 };

        Self { mean, std }
    }

    #[inline]
    fn scale(&self, value: Option<f64>) -> f32 {
        let v = value.unwrap_or(self.mean);
        ((v - self.mean) / self.std) as f32
    }
}

/// Encoder state frozen at fit time
#[derive(Debug, Clone)]
pub struct FeatureEncoder {
    price: NumericStats,
    rating: NumericStats,
    categories: Vec<String>,
    category_index: AHashMap<String, usize>,
    text: Option<TextVocabulary>,
}

/// A category-scoped encoder together with the vectors of the items it was fitted on
#[derive(Debug, Clone)]
pub struct ScopedEncoding {
    pub encoder: FeatureEncoder,
    pub vectors: Vec<Vector>,
}

impl FeatureEncoder {
    /// Fit scaling statistics and vocabularies on the full catalog
    pub fn fit(catalog: &[Product], config: &EncoderConfig) -> Result<Self> {
        let items: Vec<&Product> = catalog.iter().collect();
        Self::fit_items(&items, config)
    }

    fn fit_items(items: &[&Product], config: &EncoderConfig) -> Result<Self> {
        if items.is_empty() {
            return Err(Error::EmptyCatalog);
        }

        let price = NumericStats::fit(items.iter().map(|p| p.price));
        let rating = NumericStats::fit(items.iter().map(|p| p.rating));

        let mut categories = Vec::new();
        let mut category_index = AHashMap::new();
        for item in items {
            if !category_index.contains_key(&item.category) {
                category_index.insert(item.category.clone(), categories.len());
                categories.push(item.category.clone());
            }
        }

        let text = config
            .text
            .map(|cfg| TextVocabulary::fit(items.iter().map(|p| p.title.as_str()), cfg.max_terms));

        Ok(Self {
            price,
            rating,
            categories,
            category_index,
            text,
        })
    }

    /// Build an independent encoder restricted to `items` and encode them with it.
    ///
    /// Used for category-scoped ranking; the result is never cached.
    pub fn encode_subset(items: &[&Product], config: &EncoderConfig) -> Result<ScopedEncoding> {
        let encoder = Self::fit_items(items, config)?;
        let vectors = items.iter().map(|p| encoder.encode_product(p)).collect();
        Ok(ScopedEncoding { encoder, vectors })
    }

    /// Output dimension, fixed at fit time
    #[inline]
    pub fn dim(&self) -> usize {
        NUMERIC_FIELDS + self.categories.len() + self.text.as_ref().map_or(0, |t| t.len())
    }

    /// Encode attributes against the frozen state.
    ///
    /// Missing numbers use the frozen mean, an unseen category yields an all-zero
    /// category block and unknown title terms are ignored.
    pub fn encode(&self, attrs: &Attributes<'_>) -> Vector {
        let mut data = vec![0.0f32; self.dim()];
        data[0] = self.price.scale(attrs.price);
        data[1] = self.rating.scale(attrs.rating);

        if let Some(slot) = attrs.category.and_then(|c| self.category_slot(c)) {
            data[NUMERIC_FIELDS + slot] = 1.0;
        }

        if let (Some(vocab), Some(title)) = (&self.text, attrs.title) {
            let start = NUMERIC_FIELDS + self.categories.len();
            vocab.encode_into(title, &mut data[start..]);
        }

        Vector::new(data)
    }

    #[inline]
    pub fn encode_product(&self, product: &Product) -> Vector {
        self.encode(&product.attributes())
    }

    /// Vocabulary position of a category (first-seen order in the fitted items)
    #[inline]
    pub fn category_slot(&self, category: &str) -> Option<usize> {
        self.category_index.get(category).copied()
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn price_stats(&self) -> NumericStats {
        self.price
    }

    pub fn rating_stats(&self) -> NumericStats {
        self.rating
    }

    pub fn text_vocabulary(&self) -> Option<&TextVocabulary> {
        self.text.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Vec<Product> {
        vec![
            Product::new(1u64, "X").with_title("red shirt").with_price(100.0).with_rating(4.5),
            Product::new(2u64, "X").with_title("blue shirt").with_price(105.0).with_rating(4.4),
            Product::new(3u64, "Y").with_title("gold ring").with_price(900.0).with_rating(2.0),
        ]
    }

    #[test]
    fn test_empty_catalog_error() {
        assert!(matches!(
            FeatureEncoder::fit(&[], &EncoderConfig::default()),
            Err(Error::EmptyCatalog)
        ));
    }

    #[test]
    fn test_dimension_fixed_at_fit() {
        let encoder = FeatureEncoder::fit(&catalog(), &EncoderConfig::default()).unwrap();
        assert_eq!(encoder.dim(), 2 + 2);
        assert_eq!(encoder.categories(), &["X".to_string(), "Y".to_string()]);

        let v = encoder.encode_product(&catalog()[2]);
        assert_eq!(v.dim(), encoder.dim());
        assert_eq!(&v.as_slice()[2..], &[0.0, 1.0]);
    }

    #[test]
    fn test_zscore_scaling() {
        let encoder = FeatureEncoder::fit(&catalog(), &EncoderConfig::default()).unwrap();
        let vectors: Vec<Vector> = catalog().iter().map(|p| encoder.encode_product(p)).collect();
        let mean_price: f32 = vectors.iter().map(|v| v.as_slice()[0]).sum::<f32>() / 3.0;
        assert!(mean_price.abs() < 1e-5);
        let var: f32 = vectors.iter().map(|v| v.as_slice()[0].powi(2)).sum::<f32>() / 3.0;
        assert!((var - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_missing_numeric_imputed_with_mean() {
        let mut items = catalog();
        items.push(Product::new(4u64, "Y"));
        let encoder = FeatureEncoder::fit(&items, &EncoderConfig::default()).unwrap();
        assert!((encoder.price_stats().mean - 368.333).abs() < 1e-2);

        let v = encoder.encode_product(&items[3]);
        assert_eq!(v.as_slice()[0], 0.0);
        assert_eq!(v.as_slice()[1], 0.0);
    }

    #[test]
    fn test_constant_field_does_not_divide_by_zero() {
        let items = vec![
            Product::new(1u64, "X").with_price(5.0),
            Product::new(2u64, "X").with_price(5.0),
        ];
        let encoder = FeatureEncoder::fit(&items, &EncoderConfig::default()).unwrap();
        assert_eq!(encoder.price_stats().std, 1.0);
        assert!(encoder.encode_product(&items[0]).as_slice().iter().all(|x| x.is_finite()));
    }

    #[test]
    fn test_unseen_category_is_all_zero() {
        let encoder = FeatureEncoder::fit(&catalog(), &EncoderConfig::default()).unwrap();
        let attrs = Attributes {
            price: Some(100.0),
            rating: Some(4.0),
            category: Some("Z"),
            title: None,
        };
        let v = encoder.encode(&attrs);
        assert_eq!(v.dim(), encoder.dim());
        assert!(v.as_slice()[2..].iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_text_block() {
        let config = EncoderConfig {
            text: Some(TextConfig { max_terms: 3 }),
        };
        let encoder = FeatureEncoder::fit(&catalog(), &config).unwrap();
        assert_eq!(encoder.dim(), 2 + 2 + 3);

        let v = encoder.encode_product(&catalog()[0]);
        let text_block = &v.as_slice()[4..];
        assert!(text_block.iter().any(|x| *x > 0.0));
    }

    #[test]
    fn test_encode_subset_is_independent() {
        let items = catalog();
        let scoped: Vec<&Product> = items.iter().filter(|p| p.category == "X").collect();
        let scoped = FeatureEncoder::encode_subset(&scoped, &EncoderConfig::default()).unwrap();

        assert_eq!(scoped.encoder.dim(), 2 + 1);
        assert_eq!(scoped.vectors.len(), 2);
        assert!((scoped.encoder.price_stats().mean - 102.5).abs() < 1e-9);
    }
}
