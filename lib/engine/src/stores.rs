//! External collaborators
//!
//! The engine reads the catalog once per fit and a user's history once per
//! request. In-memory and JSON-file implementations are provided.

use ahash::AHashMap;
use blendrec_core::{Error, Product, ProductId, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Source of the catalog. Iteration order becomes catalog position.
pub trait CatalogStore: Send + Sync {
    fn fetch_all(&self) -> Result<Vec<Product>>;
}

/// Source of per-user interaction history
pub trait HistoryStore: Send + Sync {
    fn liked_of(&self, user: &str) -> Result<Vec<ProductId>>;

    /// Viewed ids, most recent last
    fn viewed_of(&self, user: &str) -> Result<Vec<ProductId>>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    products: Vec<Product>,
}

impl MemoryCatalog {
    pub fn new(products: Vec<Product>) -> Self {
        Self { products }
    }
}

impl CatalogStore for MemoryCatalog {
    fn fetch_all(&self) -> Result<Vec<Product>> {
        Ok(self.products.clone())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserHistory {
    #[serde(default)]
    pub liked: Vec<ProductId>,
    #[serde(default)]
    pub viewed: Vec<ProductId>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryHistory {
    users: AHashMap<String, UserHistory>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a like; liking twice has no effect
    pub fn like(&mut self, user: &str, id: impl Into<ProductId>) {
        let id = id.into();
        let history = self.users.entry(user.to_string()).or_default();
        if !history.liked.contains(&id) {
            history.liked.push(id);
        }
    }

    pub fn view(&mut self, user: &str, id: impl Into<ProductId>) {
        self.users
            .entry(user.to_string())
            .or_default()
            .viewed
            .push(id.into());
    }
}

impl HistoryStore for MemoryHistory {
    fn liked_of(&self, user: &str) -> Result<Vec<ProductId>> {
        Ok(self.users.get(user).map(|h| h.liked.clone()).unwrap_or_default())
    }

    fn viewed_of(&self, user: &str) -> Result<Vec<ProductId>> {
        Ok(self.users.get(user).map(|h| h.viewed.clone()).unwrap_or_default())
    }
}

/// Catalog read from a JSON array of products; the file is re-read on every fetch
#[derive(Debug, Clone)]
pub struct JsonCatalogStore {
    path: PathBuf,
}

impl JsonCatalogStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CatalogStore for JsonCatalogStore {
    fn fetch_all(&self) -> Result<Vec<Product>> {
        let file = File::open(&self.path)
            .map_err(|e| Error::Store(format!("cannot open {}: {}", self.path.display(), e)))?;
        let products: Vec<Product> = serde_json::from_reader(BufReader::new(file))?;
        Ok(products)
    }
}

/// History read once from `{"<user>": {"liked": [...], "viewed": [...]}}`
#[derive(Debug, Clone, Default)]
pub struct JsonHistoryStore {
    inner: MemoryHistory,
}

impl JsonHistoryStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| Error::Store(format!("cannot open {}: {}", path.display(), e)))?;
        let users: HashMap<String, UserHistory> = serde_json::from_reader(BufReader::new(file))?;
        Ok(Self {
            inner: MemoryHistory {
                users: users.into_iter().collect(),
            },
        })
    }
}

impl HistoryStore for JsonHistoryStore {
    fn liked_of(&self, user: &str) -> Result<Vec<ProductId>> {
        self.inner.liked_of(user)
    }

    fn viewed_of(&self, user: &str) -> Result<Vec<ProductId>> {
        self.inner.viewed_of(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_memory_history() {
        let mut history = MemoryHistory::new();
        history.like("ada", 1u64);
        history.like("ada", 1u64);
        history.view("ada", 3u64);
        history.view("ada", 3u64);

        assert_eq!(history.liked_of("ada").unwrap(), vec![ProductId::from(1u64)]);
        assert_eq!(history.viewed_of("ada").unwrap().len(), 2);
        assert!(history.liked_of("nobody").unwrap().is_empty());
    }

    #[test]
    fn test_json_catalog_store() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"id": 1, "name": "Laptop A", "category": "Laptops", "price": 999.0, "rating": 4.5}},
                {{"id": "sku-2", "title": "Mouse", "category": "Accessories", "image": "m.png"}}
            ]"#
        )
        .unwrap();

        let store = JsonCatalogStore::new(file.path());
        let products = store.fetch_all().unwrap();
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].id, ProductId::from(1u64));
        assert_eq!(products[0].title, "Laptop A");
        assert_eq!(products[1].id, ProductId::from("sku-2"));
        assert_eq!(products[1].price, None);
        assert_eq!(products[1].image.as_deref(), Some("m.png"));
    }

    #[test]
    fn test_json_history_store() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"ada": {{"liked": [1, 2], "viewed": ["sku-9"]}}, "bob": {{}}}}"#).unwrap();

        let store = JsonHistoryStore::open(file.path()).unwrap();
        assert_eq!(store.liked_of("ada").unwrap().len(), 2);
        assert_eq!(store.viewed_of("ada").unwrap(), vec![ProductId::from("sku-9")]);
        assert!(store.liked_of("bob").unwrap().is_empty());
    }

    #[test]
    fn test_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("catalog.json");
        assert!(matches!(
            JsonCatalogStore::new(&missing).fetch_all(),
            Err(Error::Store(_))
        ));
        assert!(matches!(JsonHistoryStore::open(&missing), Err(Error::Store(_))));
    }
}
