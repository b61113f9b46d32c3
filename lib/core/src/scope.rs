/// The set of catalog positions a request may rank
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Every catalog position
    Full,
    /// An explicit subset, ascending
    Subset { positions: Vec<usize>, mask: Vec<bool> },
}

impl Scope {
    /// Build a subset scope over a catalog of `catalog_len` items.
    /// Out-of-range positions are dropped; order and duplicates are normalized.
    pub fn subset(mut positions: Vec<usize>, catalog_len: usize) -> Self {
        positions.retain(|&p| p < catalog_len);
        positions.sort_unstable();
        positions.dedup();
        let mut mask = vec![false; catalog_len];
        for &p in &positions {
            mask[p] = true;
        }
        Scope::Subset { positions, mask }
    }

    #[inline]
    pub fn contains(&self, position: usize) -> bool {
        match self {
            Scope::Full => true,
            Scope::Subset { mask, .. } => mask.get(position).copied().unwrap_or(false),
        }
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        matches!(self, Scope::Full)
    }

    /// Number of positions in scope for a catalog of `catalog_len` items
    pub fn len(&self, catalog_len: usize) -> usize {
        match self {
            Scope::Full => catalog_len,
            Scope::Subset { positions, .. } => positions.len(),
        }
    }

    pub fn is_empty(&self, catalog_len: usize) -> bool {
        self.len(catalog_len) == 0
    }

    /// Positions in ascending order
    pub fn positions(&self, catalog_len: usize) -> Vec<usize> {
        match self {
            Scope::Full => (0..catalog_len).collect(),
            Scope::Subset { positions, .. } => positions.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subset_normalizes() {
        let scope = Scope::subset(vec![4, 1, 1, 9], 5);
        assert_eq!(scope.positions(5), vec![1, 4]);
        assert!(scope.contains(4));
        assert!(!scope.contains(9));
        assert_eq!(scope.len(5), 2);
    }

    #[test]
    fn test_full_scope() {
        let scope = Scope::Full;
        assert!(scope.contains(100));
        assert_eq!(scope.positions(3), vec![0, 1, 2]);
        assert!(Scope::subset(vec![], 3).is_empty(3));
    }
}
