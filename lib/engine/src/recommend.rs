//! Recommendation operations
//!
//! Read path: encode the query, let every active model vote within the request
//! scope (in parallel), fuse the votes, remove exclusions, and sample from the
//! remaining pool if nothing survived.

use crate::engine::Engine;
use crate::profile::{preference_vector, resolve_history};
use crate::snapshot::Snapshot;
use crate::stores::HistoryStore;
use crate::variants::{ModelVariant, ScopedNeighbors, VariantContext};
use ahash::AHashMap;
use blendrec_core::{NeighborIndex, ProductId, ProfileQuery, Result, Scope, ScopedEncoding, Vector};
use blendrec_fusion::{
    fallback_sample, CandidateFilter, Diagnostic, ModelVotes, Recommendation, Recommendations,
    CLUSTER_MODEL, NEIGHBOR_MODEL,
};
use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Encodes the request's query with a category-scoped encoder.
/// Receives the scoped encoding and the catalog positions it covers.
type ScopedQuery<'a> = dyn Fn(&ScopedEncoding, &[usize]) -> Option<Vector> + 'a;

struct RankRequest<'a> {
    query: &'a Vector,
    category: Option<&'a str>,
    exclusions: &'a [usize],
    scoped_query: Option<&'a ScopedQuery<'a>>,
    k: usize,
    /// Overrides the configured fallback seed
    seed: Option<u64>,
}

impl Engine {
    /// Items similar to `id`; the item itself is never returned.
    ///
    /// An id missing from the snapshot yields an empty no-signal response with a
    /// lookup warning.
    pub fn recommend_for_item(&self, id: &ProductId, k: usize) -> Result<Recommendations> {
        self.recommend_for_item_seeded(id, k, None)
    }

    /// [`recommend_for_item`](Self::recommend_for_item) with the fallback
    /// sampling seed overridden for this request
    pub fn recommend_for_item_seeded(&self, id: &ProductId, k: usize, seed: Option<u64>) -> Result<Recommendations> {
        let snapshot = self.snapshot()?;
        let Some(position) = snapshot.position_of(id) else {
            warn!("item {} is not in snapshot generation {}", id, snapshot.generation());
            return Ok(Recommendations::no_signal(vec![Diagnostic::LookupWarning {
                id: id.clone(),
            }]));
        };
        let Some(query) = snapshot.vector(position) else {
            return Ok(Recommendations::no_signal(Vec::new()));
        };

        let mut diagnostics = Vec::new();
        let items = self.rank(
            &snapshot,
            RankRequest {
                query,
                category: None,
                exclusions: &[position],
                scoped_query: None,
                k,
                seed,
            },
            &mut diagnostics,
        );
        Ok(Recommendations::new(items, diagnostics))
    }

    /// Personalized recommendations from a user's liked and viewed items
    pub fn recommend_for_user(&self, history: &dyn HistoryStore, user: &str, k: usize) -> Result<Recommendations> {
        self.recommend_for_user_seeded(history, user, k, None)
    }

    pub fn recommend_for_user_seeded(
        &self,
        history: &dyn HistoryStore,
        user: &str,
        k: usize,
        seed: Option<u64>,
    ) -> Result<Recommendations> {
        let liked = history.liked_of(user)?;
        let viewed = history.viewed_of(user)?;
        self.recommend_for_history_seeded(&liked, &viewed, k, seed)
    }

    /// Personalized recommendations from explicit history.
    ///
    /// The query is the mean encoding of the resolved items in their dominant
    /// category, the request is scoped to that category, and every resolved
    /// item is excluded from the result.
    pub fn recommend_for_history(&self, liked: &[ProductId], viewed: &[ProductId], k: usize) -> Result<Recommendations> {
        self.recommend_for_history_seeded(liked, viewed, k, None)
    }

    pub fn recommend_for_history_seeded(
        &self,
        liked: &[ProductId],
        viewed: &[ProductId],
        k: usize,
        seed: Option<u64>,
    ) -> Result<Recommendations> {
        let snapshot = self.snapshot()?;
        let resolved = resolve_history(&snapshot, liked, viewed);

        let mut diagnostics: Vec<Diagnostic> = resolved
            .missing
            .iter()
            .map(|id| {
                warn!("history item {} is not in snapshot generation {}", id, snapshot.generation());
                Diagnostic::LookupWarning { id: id.clone() }
            })
            .collect();

        let Some(preference) = preference_vector(&snapshot, &resolved.positions) else {
            debug!("no resolvable history, returning no-signal result");
            return Ok(Recommendations::no_signal(diagnostics));
        };

        let scoped_query = |scoped: &ScopedEncoding, covered: &[usize]| {
            let local = preference
                .positions
                .iter()
                .filter_map(|p| covered.binary_search(p).ok())
                .filter_map(|i| scoped.vectors.get(i));
            Vector::mean(local)
        };

        let items = self.rank(
            &snapshot,
            RankRequest {
                query: &preference.vector,
                category: Some(preference.category.as_str()),
                exclusions: &resolved.positions,
                scoped_query: Some(&scoped_query),
                k,
                seed,
            },
            &mut diagnostics,
        );
        Ok(Recommendations::new(items, diagnostics))
    }

    /// Items matching free-form attributes; scoped to the category when one is given
    pub fn recommend_for_profile(&self, query: &ProfileQuery, k: usize) -> Result<Recommendations> {
        self.recommend_for_profile_seeded(query, k, None)
    }

    pub fn recommend_for_profile_seeded(&self, query: &ProfileQuery, k: usize, seed: Option<u64>) -> Result<Recommendations> {
        query.validate()?;
        let snapshot = self.snapshot()?;
        let attributes = query.attributes();
        let vector = snapshot.encoder().encode(&attributes);

        let scoped_query =
            |scoped: &ScopedEncoding, _: &[usize]| Some(scoped.encoder.encode(&attributes));

        let mut diagnostics = Vec::new();
        let items = self.rank(
            &snapshot,
            RankRequest {
                query: &vector,
                category: query.category.as_deref(),
                exclusions: &[],
                scoped_query: Some(&scoped_query),
                k,
                seed,
            },
            &mut diagnostics,
        );
        Ok(Recommendations::new(items, diagnostics))
    }

    /// Cluster chosen by majority vote of every model, then up to `k` of its members.
    ///
    /// The neighbor index votes the label of the nearest item, each ensemble
    /// member the label of its top item, and the cluster assigner its predicted
    /// label. Ties go to the label voted first. Clusters larger than `k` are
    /// sampled under `seed` (or the configured fallback seed).
    pub fn recommend_by_consensus(&self, query: &ProfileQuery, k: usize, seed: Option<u64>) -> Result<Recommendations> {
        query.validate()?;
        let snapshot = self.snapshot()?;
        let vector = snapshot.encoder().encode(&query.attributes());
        let clusters = snapshot.clusters();
        let ensemble = snapshot.ensemble();

        let mut diagnostics = Vec::new();
        let mut ballots: Vec<(String, usize)> = Vec::with_capacity(ensemble.len() + 2);

        if let Some(label) = snapshot
            .index()
            .query(&vector, 1)?
            .first()
            .and_then(|n| clusters.label_of(n.position))
        {
            ballots.push((NEIGHBOR_MODEL.to_string(), label));
        }
        for member in 0..ensemble.len() {
            let name = ensemble.member_name(member).unwrap_or("unknown").to_string();
            match ensemble.top(member, &vector, 1, &Scope::Full) {
                Ok(top) => {
                    if let Some(label) = top.first().and_then(|(p, _)| clusters.label_of(*p)) {
                        ballots.push((name, label));
                    }
                }
                Err(e) => {
                    warn!("model {} omitted from consensus: {}", name, e);
                    diagnostics.push(Diagnostic::ModelOmitted {
                        model: name,
                        reason: e.to_string(),
                    });
                }
            }
        }
        ballots.push((CLUSTER_MODEL.to_string(), clusters.predict(&vector)?));

        let Some(label) = majority(&ballots) else {
            return Ok(Recommendations::new(Vec::new(), diagnostics));
        };
        let voters: Vec<&str> = ballots
            .iter()
            .filter(|(_, l)| *l == label)
            .map(|(model, _)| model.as_str())
            .collect();
        let share = 1.0 / ballots.len() as f32;
        let contributions: BTreeMap<String, f32> =
            voters.iter().map(|model| (model.to_string(), share)).collect();
        let score = share * voters.len() as f32;
        debug!("consensus label {} with {} of {} votes", label, voters.len(), ballots.len());

        let chosen = if clusters.cluster_size(label) <= k {
            clusters.members_of(label, k)
        } else {
            let members = clusters.members_of(label, usize::MAX);
            fallback_sample(&members, k, seed.or(snapshot.config().fallback_seed))
        };

        let items = chosen
            .into_iter()
            .filter_map(|p| snapshot.product(p))
            .map(|product| Recommendation {
                id: product.id.clone(),
                score,
                contributions: contributions.clone(),
            })
            .collect();
        Ok(Recommendations::new(items, diagnostics))
    }

    fn rank(&self, snapshot: &Snapshot, request: RankRequest<'_>, diagnostics: &mut Vec<Diagnostic>) -> Vec<Recommendation> {
        if request.k == 0 {
            return Vec::new();
        }
        let catalog_len = snapshot.len();
        let filter = CandidateFilter::new(request.exclusions.iter().copied());

        let requested = match request.category {
            Some(category) => Scope::subset(snapshot.category_positions(category), catalog_len),
            None => Scope::Full,
        };
        let effective = filter.effective_scope(requested, catalog_len);
        if effective.widened {
            if let Some(category) = request.category {
                debug!("category {} has no eligible items, searching full catalog", category);
                diagnostics.push(Diagnostic::ScopeWidened {
                    category: category.to_string(),
                });
            }
        }

        let aggregator = snapshot.aggregator();
        let weights = aggregator.weights();
        let scoped = match (&effective.scope, request.scoped_query) {
            (Scope::Subset { positions, .. }, Some(encode)) if weights.is_active(NEIGHBOR_MODEL) => {
                scoped_neighbors(snapshot, positions, encode)
            }
            _ => None,
        };

        let ctx = VariantContext {
            snapshot,
            query: request.query,
            scope: &effective.scope,
            limit: snapshot.config().candidates_per_model.max(request.k) + filter.exclusion_count(),
            scoped_neighbors: scoped.as_ref(),
        };
        let variants = ModelVariant::active(snapshot, weights);
        let outcomes: Vec<(ModelVariant, Result<ModelVotes>)> = variants
            .par_iter()
            .map(|variant| (*variant, variant.candidates(&ctx)))
            .collect();

        let mut votes = Vec::with_capacity(outcomes.len());
        for (variant, outcome) in outcomes {
            match outcome {
                Ok(v) => votes.push(v),
                Err(e) => {
                    let model = variant.name(snapshot).to_string();
                    warn!("model {} omitted: {}", model, e);
                    diagnostics.push(Diagnostic::ModelOmitted {
                        model,
                        reason: e.to_string(),
                    });
                }
            }
        }

        let kept = filter.apply(aggregator.fuse(&votes), request.k);
        if !kept.is_empty() {
            return kept
                .into_iter()
                .filter_map(|c| Recommendation::from_scored(c, snapshot.catalog()))
                .collect();
        }

        let pool = filter.remaining_pool(&effective.scope, catalog_len);
        let seed = request.seed.or(snapshot.config().fallback_seed);
        let sampled = fallback_sample(&pool, request.k, seed);
        debug!("no scored candidates, sampled {} of {} pooled items", sampled.len(), pool.len());
        diagnostics.push(Diagnostic::FallbackSampled {
            pool: pool.len(),
            sampled: sampled.len(),
        });
        sampled
            .into_iter()
            .filter_map(|p| snapshot.product(p))
            .map(|product| Recommendation::sampled(product.id.clone()))
            .collect()
    }
}

fn scoped_neighbors(snapshot: &Snapshot, positions: &[usize], encode: &ScopedQuery<'_>) -> Option<ScopedNeighbors> {
    let scoped = match snapshot.encode_scope(positions) {
        Ok(scoped) => scoped,
        Err(e) => {
            warn!("category-scoped encoding failed, using catalog encoding: {}", e);
            return None;
        }
    };
    let query = encode(&scoped, positions)?;
    match NeighborIndex::build(scoped.vectors, snapshot.config().metric) {
        Ok(index) => Some(ScopedNeighbors {
            positions: positions.to_vec(),
            index,
            query,
        }),
        Err(e) => {
            warn!("category-scoped index failed, using catalog index: {}", e);
            None
        }
    }
}

/// Most voted label; ties go to the label whose first vote came earliest
fn majority(ballots: &[(String, usize)]) -> Option<usize> {
    let mut tally: AHashMap<usize, (usize, usize)> = AHashMap::new();
    for (order, (_, label)) in ballots.iter().enumerate() {
        tally.entry(*label).or_insert((0, order)).0 += 1;
    }
    tally
        .into_iter()
        .min_by_key(|(_, (count, first))| (std::cmp::Reverse(*count), *first))
        .map(|(label, _)| label)
}
