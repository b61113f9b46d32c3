//! # blendrec
//!
//! A hybrid recommendation engine. Several independent models score a shared
//! feature space and their candidate sets are fused by weighted voting.
//!
//! ## Models
//!
//! - **Nearest neighbors**: exact cosine or Euclidean scan over the encoded catalog
//! - **Classifier ensemble**: kernel, naive Bayes and forest members that rank
//!   every catalog item as its own class
//! - **Clusters**: K-Means membership of the query
//!
//! ## Quick Start
//!
//! ### As a CLI
//!
//! ```bash
//! blendrec --catalog products.json item 42 -k 5
//! blendrec --catalog products.json --history users.json user ada
//! blendrec --catalog products.json profile --price 120 --rating 4.2 --category Laptops
//! ```
//!
//! ### As a Library
//!
//! ```rust
//! use blendrec::prelude::*;
//!
//! let engine = Engine::new(EngineConfig::default()).unwrap();
//! engine
//!     .fit(vec![
//!         Product::new(1u64, "X").with_price(100.0).with_rating(4.5),
//!         Product::new(2u64, "X").with_price(105.0).with_rating(4.4),
//!         Product::new(3u64, "Y").with_price(900.0).with_rating(2.0),
//!     ])
//!     .unwrap();
//!
//! let mut history = MemoryHistory::new();
//! history.like("ada", 1u64);
//!
//! let picks = engine.recommend_for_user(&history, "ada", 5).unwrap();
//! assert_eq!(picks.ids(), vec![&ProductId::from(2u64)]);
//! ```
//!
//! ## Crate Structure
//!
//! - [`blendrec-core`](blendrec_core) - Vectors, products, encoder, neighbor index, ensemble, clusters
//! - [`blendrec-fusion`](blendrec_fusion) - Fusion weights, weighted-vote aggregation, candidate filtering
//! - [`blendrec-engine`](blendrec_engine) - Snapshot lifecycle, stores, recommendation operations

// Re-export core types
pub use blendrec_core::{
    Attributes, ClassifierEnsemble, ClusterAssigner, ClusterConfig, EncoderConfig, Error,
    FeatureEncoder, MemberSpec, Metric, NeighborIndex, Product, ProductId, ProfileQuery, Result,
    Scope, TextConfig, Vector,
};

// Re-export fusion
pub use blendrec_fusion::{
    CandidateFilter, Diagnostic, FusionWeights, ModelVotes, Recommendation, Recommendations,
    ScoreAggregator, ScoredCandidate, Signal,
};

// Re-export engine
pub use blendrec_engine::{
    CatalogStore, Engine, EngineConfig, HistoryStore, JsonCatalogStore, JsonHistoryStore,
    MemoryCatalog, MemoryHistory, Snapshot, State,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        CatalogStore, Diagnostic, Engine, EngineConfig, Error, HistoryStore, MemberSpec,
        MemoryCatalog, MemoryHistory, Metric, Product, ProductId, ProfileQuery, Recommendations,
        Result, Signal, State,
    };
}
