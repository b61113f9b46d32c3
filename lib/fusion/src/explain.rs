//! Recommendation results with per-model contributions
//!
//! Non-fatal conditions met while serving a request are reported as
//! [`Diagnostic`]s next to the ranked items instead of failing the request.

use crate::aggregate::ScoredCandidate;
use blendrec_core::{Product, ProductId};
use serde::Serialize;
use std::collections::BTreeMap;

/// One recommended item
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub id: ProductId,
    /// Combined (fused) score; 0.0 for fallback samples
    pub score: f32,
    /// Weight contributed by each model that voted for the item
    pub contributions: BTreeMap<String, f32>,
}

impl Recommendation {
    pub fn from_scored(candidate: ScoredCandidate, catalog: &[Product]) -> Option<Self> {
        catalog.get(candidate.position).map(|product| Self {
            id: product.id.clone(),
            score: candidate.combined,
            contributions: candidate.contributions,
        })
    }

    /// An item picked by the fallback sampler
    pub fn sampled(id: ProductId) -> Self {
        Self {
            id,
            score: 0.0,
            contributions: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A referenced id is not part of the active snapshot
    LookupWarning { id: ProductId },
    /// The category scope had no eligible items; the full catalog was searched
    ScopeWidened { category: String },
    /// A model failed for this request and did not vote
    ModelOmitted { model: String, reason: String },
    /// No scored candidate survived filtering; items were sampled from the pool
    FallbackSampled { pool: usize, sampled: usize },
}

/// Whether the request carried usable input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    Present,
    /// The user had no resolvable liked or viewed items
    NoSignal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendations {
    pub items: Vec<Recommendation>,
    pub signal: Signal,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

impl Recommendations {
    pub fn new(items: Vec<Recommendation>, diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            items,
            signal: Signal::Present,
            diagnostics,
        }
    }

    /// Empty, well-formed response for a requester without usable history
    pub fn no_signal(diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            items: Vec::new(),
            signal: Signal::NoSignal,
            diagnostics,
        }
    }

    pub fn is_no_signal(&self) -> bool {
        self.signal == Signal::NoSignal
    }

    pub fn ids(&self) -> Vec<&ProductId> {
        self.items.iter().map(|r| &r.id).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn was_widened(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::ScopeWidened { .. }))
    }

    pub fn was_sampled(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::FallbackSampled { .. }))
    }

    pub fn omitted_models(&self) -> Vec<&str> {
        self.diagnostics
            .iter()
            .filter_map(|d| match d {
                Diagnostic::ModelOmitted { model, .. } => Some(model.as_str()),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_scored() {
        let catalog = vec![Product::new(7u64, "X"), Product::new("b", "Y")];
        let candidate = ScoredCandidate {
            position: 1,
            contributions: BTreeMap::from([("neighbor".to_string(), 0.3)]),
            combined: 0.3,
        };
        let rec = Recommendation::from_scored(candidate.clone(), &catalog).unwrap();
        assert_eq!(rec.id, ProductId::from("b"));
        assert_eq!(rec.score, 0.3);

        let out_of_range = ScoredCandidate { position: 5, ..candidate };
        assert!(Recommendation::from_scored(out_of_range, &catalog).is_none());
    }

    #[test]
    fn test_serialization_shape() {
        let response = Recommendations::new(
            vec![Recommendation::sampled(ProductId::from(3u64))],
            vec![Diagnostic::FallbackSampled { pool: 4, sampled: 1 }],
        );
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["items"][0]["id"], 3);
        assert_eq!(json["signal"], "present");
        assert_eq!(json["diagnostics"][0]["kind"], "fallback_sampled");
        assert!(response.was_sampled());
        assert!(!response.was_widened());
    }

    #[test]
    fn test_no_signal() {
        let response = Recommendations::no_signal(vec![Diagnostic::LookupWarning {
            id: ProductId::from("gone"),
        }]);
        assert!(response.is_no_signal());
        assert!(response.is_empty());
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["signal"], "no_signal");
    }
}
