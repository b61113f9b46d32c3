//! # blendrec Fusion
//!
//! Combines the candidate sets of independent models into one ranking.
//!
//! ## Pipeline
//!
//! ```text
//! model votes ──► ScoreAggregator::fuse ──► CandidateFilter::apply ──► top-K
//!                  (flat weight per vote)     (self / history removed)
//!                                                   │
//!                                          empty ───┴──► fallback_sample
//! ```
//!
//! ## Example
//!
//! ```rust
//! use blendrec_fusion::{CandidateFilter, FusionWeights, ModelVotes, ScoreAggregator};
//!
//! let weights = FusionWeights::defaults(&["kernel"]).unwrap();
//! let aggregator = ScoreAggregator::new(weights);
//!
//! let ranked = aggregator.fuse(&[
//!     ModelVotes::new("neighbor", [0, 1, 2]),
//!     ModelVotes::new("kernel", [1]),
//! ]);
//! let top = CandidateFilter::new([0]).apply(ranked, 2);
//! assert_eq!(top[0].position, 1);
//! ```

pub mod aggregate;
pub mod explain;
pub mod filter;
pub mod weights;

pub use aggregate::{ModelVotes, ScoreAggregator, ScoredCandidate};
pub use explain::{Diagnostic, Recommendation, Recommendations, Signal};
pub use filter::{fallback_sample, CandidateFilter, EffectiveScope};
pub use weights::{FusionWeights, WeightError, CLUSTER_MODEL, NEIGHBOR_MODEL};
