//! # blendrec Core
//!
//! Core library for the blendrec hybrid recommendation engine.
//!
//! This crate provides the fitted building blocks of a catalog snapshot:
//!
//! - [`Product`] - A catalog item with its recommendable attributes
//! - [`FeatureEncoder`] - Frozen scaling and vocabularies, item → [`Vector`]
//! - [`NeighborIndex`] - Exact cosine / Euclidean nearest-neighbor scan
//! - [`ClassifierEnsemble`] - Multiclass members with one class per catalog item
//! - [`ClusterAssigner`] - K-Means partition of the catalog
//!
//! ## Example
//!
//! ```rust
//! use blendrec_core::{EncoderConfig, FeatureEncoder, Metric, NeighborIndex, Product, Vector};
//!
//! let catalog = vec![
//!     Product::new(1u64, "X").with_price(100.0).with_rating(4.5),
//!     Product::new(2u64, "X").with_price(105.0).with_rating(4.4),
//!     Product::new(3u64, "Y").with_price(900.0).with_rating(2.0),
//! ];
//!
//! let encoder = FeatureEncoder::fit(&catalog, &EncoderConfig::default()).unwrap();
//! let vectors: Vec<Vector> = catalog.iter().map(|p| encoder.encode_product(p)).collect();
//! let index = NeighborIndex::build(vectors, Metric::Cosine).unwrap();
//!
//! let query = encoder.encode_product(&catalog[0]);
//! let nearest = index.query(&query, 2).unwrap();
//! assert_eq!(nearest[0].position, 0);
//! assert_eq!(nearest[1].position, 1);
//! ```

pub mod cluster;
pub mod encoder;
pub mod ensemble;
pub mod error;
pub mod index;
pub mod product;
pub mod scope;
pub mod text;
pub mod vector;

pub use cluster::{ClusterAssigner, ClusterConfig};
pub use encoder::{EncoderConfig, FeatureEncoder, NumericStats, ScopedEncoding, TextConfig};
pub use ensemble::{CatalogScorer, ClassifierEnsemble, MemberSpec, ScorerTrainer};
pub use error::{Error, Result};
pub use index::{Metric, Neighbor, NeighborIndex};
pub use product::{Attributes, Product, ProductId, ProfileQuery};
pub use scope::Scope;
pub use text::TextVocabulary;
pub use vector::Vector;
