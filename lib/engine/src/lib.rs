//! # blendrec Engine
//!
//! Serves recommendations from an immutable fitted [`Snapshot`].
//!
//! ## Lifecycle
//!
//! ```text
//! Unfitted ──fit──► Fitting ──ok──► Fitted ──mark_stale──► Stale
//!                      │                ▲                     │
//!                      └─err─► (prior)  └────────fit──────────┘
//! ```
//!
//! Only a fitted snapshot serves queries. A refit builds a new snapshot off to
//! the side; in-flight queries keep the `Arc` they already hold.
//!
//! ## Example
//!
//! ```rust
//! use blendrec_core::{Product, ProductId};
//! use blendrec_engine::{Engine, EngineConfig};
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
//! let similar = engine.recommend_for_item(&ProductId::from(1u64), 2).unwrap();
//! assert_eq!(similar.len(), 2);
//! ```

pub mod config;
pub mod engine;
pub mod lifecycle;
pub mod profile;
pub mod recommend;
pub mod snapshot;
pub mod stores;
pub mod variants;

pub use config::EngineConfig;
pub use engine::Engine;
pub use lifecycle::{Lifecycle, State};
pub use profile::{preference_vector, resolve_history, Preference, ResolvedHistory};
pub use snapshot::Snapshot;
pub use stores::{
    CatalogStore, HistoryStore, JsonCatalogStore, JsonHistoryStore, MemoryCatalog, MemoryHistory,
    UserHistory,
};
pub use variants::{ModelVariant, ScopedNeighbors, VariantContext};
