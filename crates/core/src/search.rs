//! Free-text product search with an optional external vector index.
//!
//! The vector index is an integration seam only; embedding and ranking live behind
//! [`VectorIndex`]. Any index error or timeout degrades to catalog substring search.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

use crate::catalog::Catalog;
use crate::domain::product::{Category, Product};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexRecord {
    pub key: String,
    pub text: String,
    pub metadata: BTreeMap<String, String>,
}

impl IndexRecord {
    pub fn from_product(product: &Product) -> Self {
        let mut metadata = BTreeMap::new();
        metadata.insert("part_number".to_string(), product.part_number.0.clone());
        metadata.insert("category".to_string(), product.category.as_str().to_string());
        metadata.insert("name".to_string(), product.name.clone());
        Self {
            key: product.part_number.0.clone(),
            text: format!("{} {}", product.name, product.description),
            metadata,
        }
    }
}

/// Equality filter on a single metadata field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MetadataFilter {
    pub field: String,
    pub value: String,
}

impl MetadataFilter {
    pub fn category(category: Category) -> Self {
        Self { field: "category".to_string(), value: category.as_str().to_string() }
    }

    pub fn accepts(&self, record: &IndexRecord) -> bool {
        record.metadata.get(&self.field).is_some_and(|value| value == &self.value)
    }
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("vector index unavailable: {0}")]
    Unavailable(String),
    #[error("vector index query failed: {0}")]
    Query(String),
    #[error("vector index timed out after {0:?}")]
    Timeout(Duration),
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn add(&self, records: Vec<IndexRecord>) -> Result<(), SearchError>;

    /// Ranked best-first.
    async fn query(
        &self,
        text: &str,
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<IndexRecord>, SearchError>;

    async fn get(&self, key: &str) -> Result<Option<IndexRecord>, SearchError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchBackend {
    Vector,
    Substring,
}

impl SearchBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vector => "vector",
            Self::Substring => "substring",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SearchOutcome {
    pub products: Vec<Product>,
    pub backend: SearchBackend,
}

#[derive(Clone)]
pub struct SearchService {
    catalog: Arc<Catalog>,
    index: Option<Arc<dyn VectorIndex>>,
    timeout: Duration,
}

impl SearchService {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog, index: None, timeout: Duration::from_secs(5) }
    }

    pub fn with_index(mut self, index: Arc<dyn VectorIndex>, timeout: Duration) -> Self {
        self.index = Some(index);
        self.timeout = timeout;
        self
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn has_index(&self) -> bool {
        self.index.is_some()
    }

    /// Pushes every catalog product into the configured index.
    pub async fn index_catalog(&self) -> Result<usize, SearchError> {
        let Some(index) = &self.index else {
            return Ok(0);
        };
        let records =
            self.catalog.products().iter().map(IndexRecord::from_product).collect::<Vec<_>>();
        let count = records.len();
        index.add(records).await?;
        Ok(count)
    }

    pub async fn search(
        &self,
        query: &str,
        category: Option<Category>,
        limit: usize,
    ) -> SearchOutcome {
        if let Some(index) = &self.index {
            if !query.trim().is_empty() {
                match self.vector_search(index.as_ref(), query, category, limit).await {
                    Ok(products) => {
                        return SearchOutcome { products, backend: SearchBackend::Vector };
                    }
                    Err(error) => {
                        warn!(
                            event_name = "search.vector.degraded",
                            error = %error,
                            "vector search failed, falling back to substring search"
                        );
                    }
                }
            }
        }

        SearchOutcome {
            products: self.catalog.search(query, category, limit),
            backend: SearchBackend::Substring,
        }
    }

    async fn vector_search(
        &self,
        index: &dyn VectorIndex,
        query: &str,
        category: Option<Category>,
        limit: usize,
    ) -> Result<Vec<Product>, SearchError> {
        let filter = category.map(MetadataFilter::category);
        let records = tokio::time::timeout(self.timeout, index.query(query, limit, filter.as_ref()))
            .await
            .map_err(|_| SearchError::Timeout(self.timeout))??;

        Ok(records
            .iter()
            .filter_map(|record| self.catalog.get(&record.key))
            .filter(|product| category.map_or(true, |wanted| product.category == wanted))
            .take(limit)
            .cloned()
            .collect())
    }
}
