use partsdesk_core::catalog::DEFAULT_GUIDE_LIMIT;
use partsdesk_core::domain::product::{Category, Product};
use partsdesk_core::search::SearchService;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::llm::ToolSchema;

pub const DEFAULT_SEARCH_LIMIT: usize = 5;
pub const MAX_SEARCH_LIMIT: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ToolKind {
    SearchProducts,
    GetProductByPartNumber,
    CheckCompatibility,
    GetInstallationInstructions,
    SearchTroubleshooting,
    FindPartsForModel,
}

impl ToolKind {
    pub const ALL: [ToolKind; 6] = [
        ToolKind::SearchProducts,
        ToolKind::GetProductByPartNumber,
        ToolKind::CheckCompatibility,
        ToolKind::GetInstallationInstructions,
        ToolKind::SearchTroubleshooting,
        ToolKind::FindPartsForModel,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::SearchProducts => "search_products",
            Self::GetProductByPartNumber => "get_product_by_part_number",
            Self::CheckCompatibility => "check_compatibility",
            Self::GetInstallationInstructions => "get_installation_instructions",
            Self::SearchTroubleshooting => "search_troubleshooting",
            Self::FindPartsForModel => "find_parts_for_model",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name.trim())
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::SearchProducts => {
                "Search for refrigerator or dishwasher parts by description, part number, or category"
            }
            Self::GetProductByPartNumber => {
                "Get detailed information about a specific part by its part number"
            }
            Self::CheckCompatibility => {
                "Check if a part is compatible with a specific appliance model"
            }
            Self::GetInstallationInstructions => {
                "Get installation instructions for a specific part"
            }
            Self::SearchTroubleshooting => {
                "Search for troubleshooting guides for common appliance problems"
            }
            Self::FindPartsForModel => "List every catalog part that fits an appliance model",
        }
    }

    pub fn parameters(&self) -> Value {
        match self {
            Self::SearchProducts => json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Search query (e.g., 'ice maker', 'door seal', 'PS11752778')"
                    },
                    "category": {
                        "type": "string",
                        "enum": ["refrigerator", "dishwasher", "all"],
                        "description": "Filter by category"
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Maximum number of results (default: 5)"
                    }
                },
                "required": ["query"]
            }),
            Self::GetProductByPartNumber | Self::GetInstallationInstructions => json!({
                "type": "object",
                "properties": {
                    "part_number": {
                        "type": "string",
                        "description": "The part number (e.g., PS11752778)"
                    }
                },
                "required": ["part_number"]
            }),
            Self::CheckCompatibility => json!({
                "type": "object",
                "properties": {
                    "part_number": { "type": "string", "description": "The part number to check" },
                    "model_number": { "type": "string", "description": "The appliance model number" }
                },
                "required": ["part_number", "model_number"]
            }),
            Self::SearchTroubleshooting => json!({
                "type": "object",
                "properties": {
                    "problem": {
                        "type": "string",
                        "description": "Description of the problem (e.g., 'ice maker not working')"
                    },
                    "brand": { "type": "string", "description": "Appliance brand (optional)" }
                },
                "required": ["problem"]
            }),
            Self::FindPartsForModel => json!({
                "type": "object",
                "properties": {
                    "model_number": {
                        "type": "string",
                        "description": "The appliance model number (e.g., WDT780SAEM1)"
                    }
                },
                "required": ["model_number"]
            }),
        }
    }

    pub fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name(),
            description: self.description(),
            parameters: self.parameters(),
        }
    }

    pub fn schemas() -> Vec<ToolSchema> {
        Self::ALL.iter().map(ToolKind::schema).collect()
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error("invalid arguments for `{tool}`: {reason}")]
    InvalidArguments { tool: &'static str, reason: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ToolInvocation {
    SearchProducts { query: String, category: Option<Category>, limit: usize },
    GetProductByPartNumber { part_number: String },
    CheckCompatibility { part_number: String, model_number: String },
    GetInstallationInstructions { part_number: String },
    SearchTroubleshooting { problem: String, brand: Option<String> },
    FindPartsForModel { model_number: String },
}

#[derive(Deserialize)]
struct SearchArgs {
    query: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    limit: Option<usize>,
}

#[derive(Deserialize)]
struct PartArgs {
    part_number: String,
}

#[derive(Deserialize)]
struct CompatibilityArgs {
    part_number: String,
    model_number: String,
}

#[derive(Deserialize)]
struct TroubleshootingArgs {
    problem: String,
    #[serde(default)]
    brand: Option<String>,
}

#[derive(Deserialize)]
struct ModelArgs {
    model_number: String,
}

impl ToolInvocation {
    /// Every `(name, arguments)` pair maps to an invocation or a `ToolError`.
    pub fn parse(name: &str, arguments: &str) -> Result<Self, ToolError> {
        let kind =
            ToolKind::from_name(name).ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        let arguments = if arguments.trim().is_empty() { "{}" } else { arguments };

        match kind {
            ToolKind::SearchProducts => {
                let args: SearchArgs = decode(kind, arguments)?;
                let category = match args.category.as_deref().map(str::trim) {
                    None | Some("") | Some("all") => None,
                    Some(raw) => Some(raw.parse::<Category>().map_err(|reason| {
                        ToolError::InvalidArguments { tool: kind.name(), reason }
                    })?),
                };
                let limit = args.limit.unwrap_or(DEFAULT_SEARCH_LIMIT).clamp(1, MAX_SEARCH_LIMIT);
                Ok(Self::SearchProducts { query: args.query, category, limit })
            }
            ToolKind::GetProductByPartNumber => {
                let args: PartArgs = decode(kind, arguments)?;
                Ok(Self::GetProductByPartNumber { part_number: required(kind, args.part_number)? })
            }
            ToolKind::CheckCompatibility => {
                let args: CompatibilityArgs = decode(kind, arguments)?;
                Ok(Self::CheckCompatibility {
                    part_number: required(kind, args.part_number)?,
                    model_number: required(kind, args.model_number)?,
                })
            }
            ToolKind::GetInstallationInstructions => {
                let args: PartArgs = decode(kind, arguments)?;
                Ok(Self::GetInstallationInstructions {
                    part_number: required(kind, args.part_number)?,
                })
            }
            ToolKind::SearchTroubleshooting => {
                let args: TroubleshootingArgs = decode(kind, arguments)?;
                Ok(Self::SearchTroubleshooting {
                    problem: required(kind, args.problem)?,
                    brand: args
                        .brand
                        .map(|brand| brand.trim().to_string())
                        .filter(|brand| !brand.is_empty()),
                })
            }
            ToolKind::FindPartsForModel => {
                let args: ModelArgs = decode(kind, arguments)?;
                Ok(Self::FindPartsForModel { model_number: required(kind, args.model_number)? })
            }
        }
    }

    pub fn kind(&self) -> ToolKind {
        match self {
            Self::SearchProducts { .. } => ToolKind::SearchProducts,
            Self::GetProductByPartNumber { .. } => ToolKind::GetProductByPartNumber,
            Self::CheckCompatibility { .. } => ToolKind::CheckCompatibility,
            Self::GetInstallationInstructions { .. } => ToolKind::GetInstallationInstructions,
            Self::SearchTroubleshooting { .. } => ToolKind::SearchTroubleshooting,
            Self::FindPartsForModel { .. } => ToolKind::FindPartsForModel,
        }
    }
}

fn decode<T: for<'de> Deserialize<'de>>(kind: ToolKind, arguments: &str) -> Result<T, ToolError> {
    serde_json::from_str(arguments).map_err(|error| ToolError::InvalidArguments {
        tool: kind.name(),
        reason: error.to_string(),
    })
}

fn required(kind: ToolKind, value: String) -> Result<String, ToolError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ToolError::InvalidArguments {
            tool: kind.name(),
            reason: "required argument is blank".to_string(),
        });
    }
    Ok(trimmed.to_string())
}

/// JSON payload handed back to the model plus any products it surfaced.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolOutput {
    pub payload: Value,
    pub products: Vec<Product>,
}

impl ToolOutput {
    fn error(message: impl Into<String>) -> Self {
        Self { payload: json!({ "error": message.into() }), products: Vec::new() }
    }

    pub fn is_error(&self) -> bool {
        self.payload.get("error").is_some()
    }
}

#[derive(Clone)]
pub struct ToolExecutor {
    search: SearchService,
}

impl ToolExecutor {
    pub fn new(search: SearchService) -> Self {
        Self { search }
    }

    /// Parses and runs one model-requested call; failures become error payloads.
    pub async fn dispatch(&self, name: &str, arguments: &str) -> ToolOutput {
        match ToolInvocation::parse(name, arguments) {
            Ok(invocation) => self.execute(&invocation).await,
            Err(error) => {
                tracing::warn!(
                    event_name = "agent.tool.rejected",
                    tool = name,
                    error = %error,
                    "tool call rejected"
                );
                ToolOutput::error(error.to_string())
            }
        }
    }

    pub async fn execute(&self, invocation: &ToolInvocation) -> ToolOutput {
        let catalog = self.search.catalog();
        match invocation {
            ToolInvocation::SearchProducts { query, category, limit } => {
                let outcome = self.search.search(query, *category, *limit).await;
                ToolOutput {
                    payload: json!({
                        "products": &outcome.products,
                        "count": outcome.products.len()
                    }),
                    products: outcome.products,
                }
            }
            ToolInvocation::GetProductByPartNumber { part_number } => {
                match catalog.get(part_number) {
                    Some(product) => ToolOutput {
                        payload: json!({ "product": product }),
                        products: vec![product.clone()],
                    },
                    None => ToolOutput::error(format!(
                        "Product with part number {part_number} not found"
                    )),
                }
            }
            ToolInvocation::CheckCompatibility { part_number, model_number } => {
                let report = catalog.check_compatibility(part_number, model_number);
                ToolOutput {
                    payload: json!({
                        "compatible": report.compatible,
                        "part_number": &report.part_number,
                        "model_number": &report.model_number,
                        "compatible_models": &report.compatible_models,
                    }),
                    products: report.product.into_iter().collect(),
                }
            }
            ToolInvocation::GetInstallationInstructions { part_number } => {
                match catalog.get(part_number).filter(|product| {
                    product.installation_guide_url.is_some()
                        || !product.installation_steps().is_empty()
                }) {
                    Some(product) => {
                        let instructions = if product.installation_steps().is_empty() {
                            json!("Visit the installation guide URL for detailed instructions.")
                        } else {
                            json!(product.installation_steps())
                        };
                        ToolOutput {
                            payload: json!({
                                "part_number": &product.part_number,
                                "installation_url": &product.installation_guide_url,
                                "instructions": instructions,
                            }),
                            products: vec![product.clone()],
                        }
                    }
                    None => ToolOutput {
                        payload: json!({
                            "error": format!("Installation instructions not available for {part_number}"),
                            "suggestion": "Video installation guides are available on the product page.",
                        }),
                        products: Vec::new(),
                    },
                }
            }
            ToolInvocation::SearchTroubleshooting { problem, brand } => {
                let guides = catalog.search_guides(problem, brand.as_deref(), DEFAULT_GUIDE_LIMIT);
                ToolOutput {
                    payload: json!({ "guides": &guides, "count": guides.len() }),
                    products: Vec::new(),
                }
            }
            ToolInvocation::FindPartsForModel { model_number } => {
                let result = catalog.find_parts_for_model(model_number);
                ToolOutput {
                    payload: json!({
                        "model_number": &result.model_number,
                        "parts": &result.parts,
                        "count": result.count,
                    }),
                    products: result.parts,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use partsdesk_core::catalog::Catalog;
    use partsdesk_core::domain::product::Category;
    use partsdesk_core::search::SearchService;

    use super::{ToolError, ToolExecutor, ToolInvocation, ToolKind};

    fn executor() -> ToolExecutor {
        let catalog = Arc::new(Catalog::builtin().expect("builtin catalog"));
        ToolExecutor::new(SearchService::new(catalog))
    }

    #[test]
    fn every_tool_name_round_trips() {
        for kind in ToolKind::ALL {
            assert_eq!(ToolKind::from_name(kind.name()), Some(kind));
            assert_eq!(kind.schema().parameters["type"], "object");
        }
        assert_eq!(ToolKind::schemas().len(), 6);
    }

    #[test]
    fn parse_applies_defaults_and_category_all() {
        let arguments = r#"{"query":"ice maker","category":"all"}"#;
        let invocation = ToolInvocation::parse("search_products", arguments).expect("valid search");
        assert_eq!(
            invocation,
            ToolInvocation::SearchProducts {
                query: "ice maker".to_string(),
                category: None,
                limit: 5
            }
        );

        let filtered = ToolInvocation::parse(
            "search_products",
            r#"{"query":"gasket","category":"dishwasher","limit":50}"#,
        )
        .expect("valid search");
        assert_eq!(
            filtered,
            ToolInvocation::SearchProducts {
                query: "gasket".to_string(),
                category: Some(Category::Dishwasher),
                limit: 10
            }
        );
    }

    #[test]
    fn parse_rejects_unknown_names_and_bad_arguments() {
        assert_eq!(
            ToolInvocation::parse("delete_catalog", "{}"),
            Err(ToolError::UnknownTool("delete_catalog".to_string()))
        );
        assert!(matches!(
            ToolInvocation::parse("check_compatibility", r#"{"part_number":"PS11752778"}"#),
            Err(ToolError::InvalidArguments { tool: "check_compatibility", .. })
        ));
        assert!(matches!(
            ToolInvocation::parse("get_product_by_part_number", "not json"),
            Err(ToolError::InvalidArguments { .. })
        ));
        assert!(matches!(
            ToolInvocation::parse("search_products", r#"{"query":"x","category":"oven"}"#),
            Err(ToolError::InvalidArguments { .. })
        ));
    }

    #[tokio::test]
    async fn dispatch_returns_error_payload_for_bad_calls() {
        let output =
            executor().dispatch("get_product_by_part_number", r#"{"part_number":" "}"#).await;
        assert!(output.is_error());
        assert!(output.products.is_empty());

        let unknown = executor().dispatch("weather", "{}").await;
        assert_eq!(unknown.payload["error"], "Unknown tool: weather");
    }

    #[tokio::test]
    async fn product_lookup_surfaces_the_product() {
        let output = executor()
            .dispatch("get_product_by_part_number", r#"{"part_number":"ps11752778"}"#)
            .await;
        assert_eq!(output.payload["product"]["part_number"], "PS11752778");
        assert_eq!(output.products.len(), 1);

        let missing = executor()
            .dispatch("get_product_by_part_number", r#"{"part_number":"PS00000001"}"#)
            .await;
        assert_eq!(missing.payload["error"], "Product with part number PS00000001 not found");
    }

    #[tokio::test]
    async fn compatibility_payload_lists_models() {
        let output = executor()
            .dispatch(
                "check_compatibility",
                r#"{"part_number":"PS11752778","model_number":"wdt780saem1"}"#,
            )
            .await;
        assert_eq!(output.payload["compatible"], true);
        assert!(output.payload["compatible_models"]
            .as_array()
            .is_some_and(|models| !models.is_empty()));
    }

    #[tokio::test]
    async fn installation_and_troubleshooting_payloads() {
        let install = executor()
            .dispatch("get_installation_instructions", r#"{"part_number":"PS11752778"}"#)
            .await;
        assert!(install.payload["instructions"].is_array());
        assert!(install.payload["installation_url"].is_string());

        let missing = executor()
            .dispatch("get_installation_instructions", r#"{"part_number":"PS99999999"}"#)
            .await;
        assert!(missing.is_error());
        assert!(missing.payload["suggestion"].is_string());

        let guides = executor()
            .dispatch(
                "search_troubleshooting",
                r#"{"problem":"ice maker not working","brand":"Whirlpool"}"#,
            )
            .await;
        assert!(guides.payload["count"].as_u64().is_some_and(|count| count >= 1));
    }

    #[tokio::test]
    async fn parts_for_model_payload_counts_parts() {
        let output =
            executor().dispatch("find_parts_for_model", r#"{"model_number":"WDF520PADM7"}"#).await;
        let count = output.payload["count"].as_u64().expect("count");
        assert_eq!(count as usize, output.products.len());
        assert!(count > 0);
    }
}
