use partsdesk_core::domain::product::Category;
use serde::Serialize;

use crate::commands::{load_catalog, load_config, CommandResult};

const COMMAND: &str = "catalog";

#[derive(Debug, Serialize)]
struct CategoryCount {
    category: &'static str,
    products: usize,
}

#[derive(Debug, Serialize)]
struct ProductRow {
    part_number: String,
    name: String,
    category: &'static str,
    price: String,
    compatible_models: usize,
}

#[derive(Debug, Serialize)]
struct CatalogSummary {
    products: usize,
    guides: usize,
    categories: Vec<CategoryCount>,
    items: Vec<ProductRow>,
}

pub fn run() -> CommandResult {
    let config = match load_config(COMMAND) {
        Ok(config) => config,
        Err(result) => return result,
    };
    let catalog = match load_catalog(COMMAND, &config) {
        Ok(catalog) => catalog,
        Err(result) => return result,
    };

    let categories = Category::ALL
        .iter()
        .map(|category| CategoryCount {
            category: category.as_str(),
            products: catalog
                .products()
                .iter()
                .filter(|product| product.category == *category)
                .count(),
        })
        .collect::<Vec<_>>();

    let items = catalog
        .products()
        .iter()
        .map(|product| ProductRow {
            part_number: product.part_number.as_str().to_string(),
            name: product.name.clone(),
            category: product.category.as_str(),
            price: product.price_label(),
            compatible_models: product.compatibility.len(),
        })
        .collect();

    let breakdown = categories
        .iter()
        .map(|count| format!("{} {}", count.products, count.category))
        .collect::<Vec<_>>()
        .join(", ");
    let message = format!(
        "catalog: {} products ({breakdown}), {} troubleshooting guides",
        catalog.len(),
        catalog.guides().len()
    );

    let summary = CatalogSummary {
        products: catalog.len(),
        guides: catalog.guides().len(),
        categories,
        items,
    };
    CommandResult::success_with_data(COMMAND, message, serde_json::to_value(&summary).ok())
}
