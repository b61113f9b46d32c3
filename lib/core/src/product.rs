use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Upper bound of the rating scale
pub const MAX_RATING: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProductId {
    Integer(u64),
    Uuid(Uuid),
    String(String),
}

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProductId::String(s) => write!(f, "{}", s),
            ProductId::Uuid(u) => write!(f, "{}", u),
            ProductId::Integer(i) => write!(f, "{}", i),
        }
    }
}

impl From<String> for ProductId {
    fn from(s: String) -> Self {
        ProductId::String(s)
    }
}

impl From<&str> for ProductId {
    fn from(s: &str) -> Self {
        ProductId::String(s.to_string())
    }
}

impl From<u64> for ProductId {
    fn from(i: u64) -> Self {
        ProductId::Integer(i)
    }
}

impl From<Uuid> for ProductId {
    fn from(u: Uuid) -> Self {
        ProductId::Uuid(u)
    }
}

/// A catalog item. Immutable once it is part of a fitted snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    #[serde(default, alias = "name")]
    pub title: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Product {
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<ProductId>, category: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            category: category.into(),
            price: None,
            rating: None,
            image: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    #[inline]
    #[must_use]
    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_rating(mut self, rating: f64) -> Self {
        self.rating = Some(rating);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_price(self.price)
            .and_then(|_| validate_rating(self.rating))
            .map_err(|e| match e {
                Error::InvalidInput(msg) => Error::InvalidInput(format!("product {}: {}", self.id, msg)),
                other => other,
            })
    }

    pub fn attributes(&self) -> Attributes<'_> {
        Attributes {
            price: self.price,
            rating: self.rating,
            category: Some(self.category.as_str()),
            title: Some(self.title.as_str()),
        }
    }
}

/// Free-form attributes for a profile-driven recommendation request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileQuery {
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

impl ProfileQuery {
    pub fn new(price: f64, rating: f64, category: impl Into<String>) -> Self {
        Self {
            price: Some(price),
            rating: Some(rating),
            category: Some(category.into()),
            title: None,
        }
    }

    /// Reject malformed attributes before they reach the encoder
    pub fn validate(&self) -> Result<()> {
        validate_price(self.price)?;
        validate_rating(self.rating)
    }

    pub fn attributes(&self) -> Attributes<'_> {
        Attributes {
            price: self.price,
            rating: self.rating,
            category: self.category.as_deref(),
            title: self.title.as_deref(),
        }
    }
}

/// Borrowed view over the encodable fields of a product or a query
#[derive(Debug, Clone, Copy, Default)]
pub struct Attributes<'a> {
    pub price: Option<f64>,
    pub rating: Option<f64>,
    pub category: Option<&'a str>,
    pub title: Option<&'a str>,
}

fn validate_price(price: Option<f64>) -> Result<()> {
    match price {
        Some(p) if !p.is_finite() => Err(Error::InvalidInput(format!("price {} is not finite", p))),
        Some(p) if p < 0.0 => Err(Error::InvalidInput(format!("price {} is negative", p))),
        _ => Ok(()),
    }
}

fn validate_rating(rating: Option<f64>) -> Result<()> {
    match rating {
        Some(r) if !r.is_finite() || !(0.0..=MAX_RATING).contains(&r) => Err(Error::InvalidInput(
            format!("rating {} outside [0, {}]", r, MAX_RATING),
        )),
        _ => Ok(()),
    }
}
