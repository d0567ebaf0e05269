//! Read-only product catalog and troubleshooting guide store.
//!
//! The catalog is loaded once at startup (from JSON files or the builtin seed data) and
//! shared behind an `Arc` for the lifetime of the process. Every lookup is infallible:
//! misses are reported through `Option`s and `found`/`compatible` flags.

pub mod troubleshoot;

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::CatalogConfig;
use crate::domain::product::{Category, PartNumber, Product};
use crate::domain::troubleshooting::TroubleshootingGuide;

pub use troubleshoot::{IssuePattern, TroubleshootingReport, ISSUE_PATTERNS};

const BUILTIN_PRODUCTS: &str = include_str!("../../data/products.json");
const BUILTIN_GUIDES: &str = include_str!("../../data/troubleshooting.json");

pub const DEFAULT_GUIDE_LIMIT: usize = 3;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("could not read catalog file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse {source_name}: {source}")]
    Parse { source_name: String, source: serde_json::Error },
    #[error("invalid part number `{0}` (expected `PS` followed by digits)")]
    InvalidPartNumber(String),
    #[error("duplicate part number `{0}`")]
    DuplicatePartNumber(String),
    #[error("part `{part_number}` has a negative price")]
    NegativePrice { part_number: String },
    #[error("part `{part_number}` is missing `{field}`")]
    MissingField { part_number: String, field: &'static str },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CompatibilityReport {
    pub part_number: String,
    pub model_number: String,
    pub compatible: bool,
    pub compatible_models: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<Product>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ModelParts {
    pub model_number: String,
    pub parts: Vec<Product>,
    pub count: usize,
}

#[derive(Clone, Debug, Default)]
pub struct Catalog {
    products: Vec<Product>,
    by_part_number: HashMap<String, usize>,
    guides: Vec<TroubleshootingGuide>,
}

#[derive(Deserialize)]
struct ProductRecord {
    part_number: String,
    name: String,
    description: String,
    price: Decimal,
    category: Category,
    #[serde(default)]
    compatibility: Vec<String>,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    installation_guide_url: Option<String>,
    #[serde(default)]
    installation_steps: Option<Vec<String>>,
}

impl Catalog {
    pub fn new(
        products: Vec<Product>,
        guides: Vec<TroubleshootingGuide>,
    ) -> Result<Self, CatalogError> {
        let mut normalized = Vec::with_capacity(products.len());
        let mut by_part_number = HashMap::with_capacity(products.len());

        for mut product in products {
            let part_number = PartNumber::parse(product.part_number.as_str())
                .ok_or_else(|| CatalogError::InvalidPartNumber(product.part_number.0.clone()))?;
            product.part_number = part_number;

            if product.name.trim().is_empty() {
                return Err(CatalogError::MissingField {
                    part_number: product.part_number.0.clone(),
                    field: "name",
                });
            }
            if product.price.is_sign_negative() && !product.price.is_zero() {
                return Err(CatalogError::NegativePrice { part_number: product.part_number.0 });
            }

            product.compatibility = product
                .compatibility
                .into_iter()
                .map(|model| model.trim().to_string())
                .filter(|model| !model.is_empty())
                .collect();

            let key = product.part_number.0.clone();
            if by_part_number.insert(key.clone(), normalized.len()).is_some() {
                return Err(CatalogError::DuplicatePartNumber(key));
            }
            normalized.push(product);
        }

        Ok(Self { products: normalized, by_part_number, guides })
    }

    /// Seed catalog compiled into the binary.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json(BUILTIN_PRODUCTS, BUILTIN_GUIDES)
    }

    pub fn from_json(products_json: &str, guides_json: &str) -> Result<Self, CatalogError> {
        let records: Vec<ProductRecord> =
            serde_json::from_str(products_json).map_err(|source| CatalogError::Parse {
                source_name: "product catalog".to_string(),
                source,
            })?;
        let guides: Vec<TroubleshootingGuide> =
            serde_json::from_str(guides_json).map_err(|source| CatalogError::Parse {
                source_name: "troubleshooting guides".to_string(),
                source,
            })?;

        let products = records
            .into_iter()
            .map(|record| Product {
                part_number: PartNumber(record.part_number),
                name: record.name,
                description: record.description,
                price: record.price,
                category: record.category,
                compatibility: record.compatibility,
                image_url: record.image_url,
                installation_guide_url: record.installation_guide_url,
                installation_steps: record.installation_steps,
            })
            .collect();

        Self::new(products, guides)
    }

    /// Loads from the configured paths, falling back to the builtin seed data for any
    /// path that is not set.
    pub fn load(config: &CatalogConfig) -> Result<Self, CatalogError> {
        let products_json = match &config.products_path {
            Some(path) => read_file(path)?,
            None => BUILTIN_PRODUCTS.to_string(),
        };
        let guides_json = match &config.guides_path {
            Some(path) => read_file(path)?,
            None => BUILTIN_GUIDES.to_string(),
        };

        let catalog = Self::from_json(&products_json, &guides_json)?;
        tracing::info!(
            event_name = "catalog.loaded",
            correlation_id = "bootstrap",
            products = catalog.len(),
            guides = catalog.guides.len(),
            "catalog loaded"
        );
        Ok(catalog)
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn guides(&self) -> &[TroubleshootingGuide] {
        &self.guides
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn get(&self, part_number: &str) -> Option<&Product> {
        let key = part_number.trim().to_ascii_uppercase();
        self.by_part_number.get(&key).map(|index| &self.products[*index])
    }

    pub fn check_compatibility(
        &self,
        part_number: &str,
        model_number: &str,
    ) -> CompatibilityReport {
        let model_number = model_number.trim().to_string();
        match self.get(part_number) {
            Some(product) => CompatibilityReport {
                part_number: product.part_number.0.clone(),
                compatible: product.fits_model(&model_number),
                compatible_models: product.compatibility.clone(),
                model_number,
                product: Some(product.clone()),
            },
            None => CompatibilityReport {
                part_number: part_number.trim().to_ascii_uppercase(),
                model_number,
                compatible: false,
                compatible_models: Vec::new(),
                product: None,
            },
        }
    }

    pub fn find_parts_for_model(&self, model_number: &str) -> ModelParts {
        let parts = self
            .products
            .iter()
            .filter(|product| product.fits_model(model_number))
            .cloned()
            .collect::<Vec<_>>();

        ModelParts {
            model_number: model_number.trim().to_ascii_uppercase(),
            count: parts.len(),
            parts,
        }
    }

    /// Case-insensitive substring search over name, description and part number, in
    /// catalog order. An empty query matches every product in the category.
    pub fn search(&self, query: &str, category: Option<Category>, limit: usize) -> Vec<Product> {
        let needle = query.trim().to_lowercase();
        self.products
            .iter()
            .filter(|product| product.matches_text(&needle))
            .filter(|product| category.map_or(true, |wanted| product.category == wanted))
            .take(limit)
            .cloned()
            .collect()
    }

    /// Ranks guides by how many significant problem words they mention.
    pub fn search_guides(
        &self,
        problem: &str,
        brand: Option<&str>,
        limit: usize,
    ) -> Vec<TroubleshootingGuide> {
        let terms = significant_terms(problem);
        if terms.is_empty() {
            return Vec::new();
        }

        let mut scored = self
            .guides
            .iter()
            .filter(|guide| {
                brand.map_or(true, |wanted| guide.brand.eq_ignore_ascii_case(wanted.trim()))
            })
            .filter_map(|guide| {
                let text = guide.searchable_text();
                let score = terms.iter().filter(|term| text.contains(term.as_str())).count();
                (score > 0).then_some((score, guide))
            })
            .collect::<Vec<_>>();

        // stable: equal scores keep file order
        scored.sort_by(|left, right| right.0.cmp(&left.0));
        scored.into_iter().take(limit).map(|(_, guide)| guide.clone()).collect()
    }
}

fn read_file(path: &Path) -> Result<String, CatalogError> {
    fs::read_to_string(path)
        .map_err(|source| CatalogError::ReadFile { path: path.to_path_buf(), source })
}

const GUIDE_STOPWORDS: [&str; 14] = [
    "the", "and", "not", "my", "is", "with", "for", "won't", "isn't", "does", "doesn't", "what",
    "how", "can",
];

fn significant_terms(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    text.to_lowercase()
        .split(|character: char| !character.is_alphanumeric() && character != '\'')
        .filter(|word| word.len() >= 3 && !GUIDE_STOPWORDS.contains(word))
        .filter(|word| seen.insert(word.to_string()))
        .map(str::to_string)
        .collect()
}
