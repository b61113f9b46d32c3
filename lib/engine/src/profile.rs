//! Preference derivation for the user-history path

use crate::snapshot::Snapshot;
use ahash::AHashMap;
use blendrec_core::{ProductId, Vector};

/// History ids mapped onto catalog positions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedHistory {
    /// Liked then viewed positions, first occurrence kept
    pub positions: Vec<usize>,
    /// Ids absent from the snapshot
    pub missing: Vec<ProductId>,
}

/// The dominant-category preference of a user
#[derive(Debug, Clone, PartialEq)]
pub struct Preference {
    pub category: String,
    /// Resolved positions in `category`, in history order
    pub positions: Vec<usize>,
    /// Mean catalog-wide encoding of `positions`
    pub vector: Vector,
}

pub fn resolve_history(snapshot: &Snapshot, liked: &[ProductId], viewed: &[ProductId]) -> ResolvedHistory {
    let mut resolved = ResolvedHistory::default();
    for id in liked.iter().chain(viewed) {
        match snapshot.position_of(id) {
            Some(position) => {
                if !resolved.positions.contains(&position) {
                    resolved.positions.push(position);
                }
            }
            None => {
                if !resolved.missing.contains(id) {
                    resolved.missing.push(id.clone());
                }
            }
        }
    }
    resolved
}

/// Mean vector of the resolved items in their most frequent category.
///
/// Category ties go to the category seen first in the catalog. Returns `None`
/// when nothing was resolved.
pub fn preference_vector(snapshot: &Snapshot, resolved: &[usize]) -> Option<Preference> {
    let mut counts: AHashMap<&str, usize> = AHashMap::new();
    for product in resolved.iter().filter_map(|&p| snapshot.product(p)) {
        *counts.entry(product.category.as_str()).or_insert(0) += 1;
    }

    let encoder = snapshot.encoder();
    let category = counts
        .into_iter()
        .min_by_key(|(category, count)| {
            (
                std::cmp::Reverse(*count),
                encoder.category_slot(category).unwrap_or(usize::MAX),
            )
        })
        .map(|(category, _)| category.to_string())?;

    let positions: Vec<usize> = resolved
        .iter()
        .copied()
        .filter(|&p| snapshot.product(p).is_some_and(|item| item.category == category))
        .collect();
    let vector = Vector::mean(positions.iter().filter_map(|&p| snapshot.vector(p)))?;

    Some(Preference {
        category,
        positions,
        vector,
    })
}
