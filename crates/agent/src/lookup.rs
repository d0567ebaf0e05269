use partsdesk_core::catalog::{
    CompatibilityReport, ModelParts, TroubleshootingReport, DEFAULT_GUIDE_LIMIT,
};
use partsdesk_core::domain::intent::{EntityKind, Intent, IntentType};
use partsdesk_core::domain::product::{Category, Product};
use partsdesk_core::domain::troubleshooting::TroubleshootingGuide;
use partsdesk_core::search::SearchService;

/// Upper bound on search hits kept for display and the "...and N more" notice.
pub const SEARCH_FETCH_LIMIT: usize = 25;

const FILLER_WORDS: [&str; 30] = [
    "a", "an", "the", "i", "me", "my", "for", "find", "search", "show", "looking", "look", "need",
    "want", "get", "some", "any", "do", "you", "have", "please", "can", "could", "is", "are",
    "there", "what", "which", "parts", "part",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Greeting {
    Hello,
    Hi,
    Help,
    Thanks,
    Bye,
}

impl Greeting {
    const WORDS: [(&'static str, Greeting); 8] = [
        ("hello", Greeting::Hello),
        ("hi", Greeting::Hi),
        ("hey", Greeting::Hi),
        ("help", Greeting::Help),
        ("thanks", Greeting::Thanks),
        ("thank", Greeting::Thanks),
        ("bye", Greeting::Bye),
        ("goodbye", Greeting::Bye),
    ];

    /// First greeting keyword (in table order) present as a whole word.
    pub fn detect(message: &str) -> Option<Self> {
        let words = words(message);
        Self::WORDS
            .iter()
            .find(|(keyword, _)| words.iter().any(|word| word == keyword))
            .map(|(_, greeting)| *greeting)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClarificationTopic {
    InstallationPart,
    CompatibilityDetails,
    SearchQuery,
}

/// Structured outcome of resolving one message against the catalog.
#[derive(Clone, Debug, PartialEq)]
pub enum LookupResult {
    ProductInfo { product: Product },
    ProductNotFound { part_number: String },
    Installation { product: Product },
    Compatibility { report: CompatibilityReport, product: Product },
    ModelsForPart { product: Product },
    PartsForModel(ModelParts),
    SearchResults { query: String, category: Option<Category>, products: Vec<Product> },
    Troubleshooting { report: TroubleshootingReport, guides: Vec<TroubleshootingGuide> },
    OrderSupport,
    General(Option<Greeting>),
    Clarification(ClarificationTopic),
    OutOfScope,
    ToolFailure { tool: String, detail: String },
}

impl LookupResult {
    pub fn response_type(&self) -> &'static str {
        match self {
            Self::ProductInfo { .. } => "product_info",
            Self::ProductNotFound { .. } => "product_not_found",
            Self::Installation { .. } => "installation",
            Self::Compatibility { .. } => "compatibility",
            Self::ModelsForPart { .. } => "models_for_part",
            Self::PartsForModel(_) => "parts_for_model",
            Self::SearchResults { .. } => "search_results",
            Self::Troubleshooting { .. } => "troubleshooting",
            Self::OrderSupport => "order_support",
            Self::General(_) => "general",
            Self::Clarification(_) => "clarification",
            Self::OutOfScope => "out_of_scope",
            Self::ToolFailure { .. } => "tool_failure",
        }
    }

    /// Products worth showing alongside the reply, best first.
    pub fn products(&self) -> Vec<Product> {
        match self {
            Self::ProductInfo { product }
            | Self::Installation { product }
            | Self::Compatibility { product, .. }
            | Self::ModelsForPart { product } => vec![product.clone()],
            Self::PartsForModel(result) => result.parts.clone(),
            Self::SearchResults { products, .. } => products.clone(),
            Self::Troubleshooting { report, .. } => report.related_parts.clone(),
            Self::ProductNotFound { .. }
            | Self::OrderSupport
            | Self::General(_)
            | Self::Clarification(_)
            | Self::OutOfScope
            | Self::ToolFailure { .. } => Vec::new(),
        }
    }
}

#[derive(Clone)]
pub struct ProductLookup {
    search: SearchService,
}

impl ProductLookup {
    pub fn new(search: SearchService) -> Self {
        Self { search }
    }

    pub fn search_service(&self) -> &SearchService {
        &self.search
    }

    pub async fn resolve(&self, message: &str, intent: &Intent) -> LookupResult {
        let part_number = intent.entity(EntityKind::PartNumber);
        let model_number = intent.entity(EntityKind::ModelNumber);

        match intent.intent_type {
            IntentType::Installation => match part_number {
                Some(part_number) => self.installation(part_number),
                None => LookupResult::Clarification(ClarificationTopic::InstallationPart),
            },
            IntentType::Compatibility => match (part_number, model_number) {
                (Some(part_number), Some(model_number)) => {
                    self.compatibility(part_number, model_number)
                }
                (None, Some(model_number)) => self.parts_for_model(model_number),
                (Some(part_number), None) => self.models_for_part(part_number),
                (None, None) => {
                    LookupResult::Clarification(ClarificationTopic::CompatibilityDetails)
                }
            },
            IntentType::Troubleshooting => self.troubleshoot(message, intent),
            IntentType::ProductInfo => match part_number {
                Some(part_number) => self.product_info(part_number),
                None => self.search_text(message).await,
            },
            IntentType::OrderSupport => LookupResult::OrderSupport,
            IntentType::OutOfScope => LookupResult::OutOfScope,
            IntentType::General => {
                if let Some(greeting) = Greeting::detect(message) {
                    LookupResult::General(Some(greeting))
                } else if let Some(part_number) = part_number {
                    self.product_info(part_number)
                } else if let Some(model_number) = model_number {
                    self.parts_for_model(model_number)
                } else {
                    self.search_text(message).await
                }
            }
        }
    }

    fn product_info(&self, part_number: &str) -> LookupResult {
        match self.search.catalog().get(part_number) {
            Some(product) => LookupResult::ProductInfo { product: product.clone() },
            None => not_found(part_number),
        }
    }

    fn installation(&self, part_number: &str) -> LookupResult {
        match self.search.catalog().get(part_number) {
            Some(product) => LookupResult::Installation { product: product.clone() },
            None => not_found(part_number),
        }
    }

    fn compatibility(&self, part_number: &str, model_number: &str) -> LookupResult {
        let report = self.search.catalog().check_compatibility(part_number, model_number);
        match report.product.clone() {
            Some(product) => LookupResult::Compatibility { report, product },
            None => not_found(part_number),
        }
    }

    fn models_for_part(&self, part_number: &str) -> LookupResult {
        match self.search.catalog().get(part_number) {
            Some(product) => LookupResult::ModelsForPart { product: product.clone() },
            None => not_found(part_number),
        }
    }

    fn parts_for_model(&self, model_number: &str) -> LookupResult {
        LookupResult::PartsForModel(self.search.catalog().find_parts_for_model(model_number))
    }

    fn troubleshoot(&self, message: &str, intent: &Intent) -> LookupResult {
        let catalog = self.search.catalog();
        let report = catalog.diagnose(message, intent.entity(EntityKind::ModelNumber));
        let problem = intent.entity(EntityKind::Issue).unwrap_or(message);
        let guides =
            catalog.search_guides(problem, intent.entity(EntityKind::Brand), DEFAULT_GUIDE_LIMIT);
        LookupResult::Troubleshooting { report, guides }
    }

    async fn search_text(&self, message: &str) -> LookupResult {
        let (query, category) = normalize_query(message);
        if query.is_empty() && category.is_none() {
            return LookupResult::Clarification(ClarificationTopic::SearchQuery);
        }

        let outcome = self.search.search(&query, category, SEARCH_FETCH_LIMIT).await;
        tracing::debug!(
            event_name = "agent.lookup.search",
            backend = outcome.backend.as_str(),
            hits = outcome.products.len(),
            "catalog search completed"
        );
        LookupResult::SearchResults { query, category, products: outcome.products }
    }
}

fn not_found(part_number: &str) -> LookupResult {
    LookupResult::ProductNotFound { part_number: part_number.trim().to_ascii_uppercase() }
}

fn words(message: &str) -> Vec<String> {
    message
        .to_lowercase()
        .split(|character: char| {
            !character.is_alphanumeric() && character != '\'' && character != '.'
        })
        .map(|word| word.trim_matches(|character| character == '.' || character == '\''))
        .filter(|word| !word.is_empty())
        .map(str::to_string)
        .collect()
}

/// Strips filler words and lifts appliance words into a category filter.
pub fn normalize_query(message: &str) -> (String, Option<Category>) {
    let mut category = None;
    let mut kept = Vec::new();

    for word in words(message) {
        if let Ok(parsed) = word.parse::<Category>() {
            category.get_or_insert(parsed);
            continue;
        }
        if FILLER_WORDS.contains(&word.as_str()) {
            continue;
        }
        kept.push(word);
    }

    (kept.join(" "), category)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use partsdesk_core::catalog::Catalog;
    use partsdesk_core::domain::intent::{Entities, Intent, IntentType};
    use partsdesk_core::domain::product::Category;
    use partsdesk_core::search::SearchService;

    use super::{normalize_query, ClarificationTopic, Greeting, LookupResult, ProductLookup};

    fn lookup() -> ProductLookup {
        let catalog = Arc::new(Catalog::builtin().expect("builtin catalog"));
        ProductLookup::new(SearchService::new(catalog))
    }

    fn intent(intent_type: IntentType, entities: &[(&str, &str)]) -> Intent {
        let entities = entities
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<Entities>();
        Intent::new(intent_type, 0.8, entities)
    }

    #[tokio::test]
    async fn installation_without_part_asks_for_one() {
        let result =
            lookup().resolve("how do I install it", &intent(IntentType::Installation, &[])).await;
        assert_eq!(result, LookupResult::Clarification(ClarificationTopic::InstallationPart));
    }

    #[tokio::test]
    async fn compatibility_dispatch_covers_every_entity_combination() {
        let lookup = lookup();
        let both = intent(
            IntentType::Compatibility,
            &[("part_number", "PS11752778"), ("model_number", "WDT780SAEM1")],
        );
        assert_eq!(lookup.resolve("", &both).await.response_type(), "compatibility");

        let model_only = intent(IntentType::Compatibility, &[("model_number", "WDF520PADM7")]);
        assert_eq!(lookup.resolve("", &model_only).await.response_type(), "parts_for_model");

        let part_only = intent(IntentType::Compatibility, &[("part_number", "PS11752778")]);
        assert_eq!(lookup.resolve("", &part_only).await.response_type(), "models_for_part");

        let neither = intent(IntentType::Compatibility, &[]);
        assert_eq!(
            lookup.resolve("does it fit", &neither).await,
            LookupResult::Clarification(ClarificationTopic::CompatibilityDetails)
        );

        let unknown = intent(
            IntentType::Compatibility,
            &[("part_number", "PS00000000"), ("model_number", "WDT780SAEM1")],
        );
        assert_eq!(lookup.resolve("", &unknown).await.response_type(), "product_not_found");
    }

    #[tokio::test]
    async fn troubleshooting_includes_diagnosis_and_guides() {
        let result = lookup()
            .resolve(
                "My ice maker is not working",
                &intent(IntentType::Troubleshooting, &[("issue", "ice maker is not working")]),
            )
            .await;
        let LookupResult::Troubleshooting { report, guides } = result else {
            panic!("expected troubleshooting result");
        };
        assert!(report.issue_detected);
        assert!(report.related_parts.iter().all(|part| part.category == Category::Refrigerator));
        assert_eq!(
            guides.first().map(|guide| guide.problem.as_str()),
            Some("Ice maker not working")
        );
    }

    #[tokio::test]
    async fn general_intent_routes_by_entities() {
        let lookup = lookup();
        assert_eq!(
            lookup.resolve("hello!", &intent(IntentType::General, &[])).await,
            LookupResult::General(Some(Greeting::Hello))
        );

        let part = intent(IntentType::General, &[("part_number", "PS11752778")]);
        assert_eq!(lookup.resolve("PS11752778", &part).await.response_type(), "product_info");

        let model = intent(IntentType::General, &[("model_number", "WDF520PADM7")]);
        assert_eq!(lookup.resolve("WDF520PADM7", &model).await.response_type(), "parts_for_model");
    }

    #[tokio::test]
    async fn general_search_with_no_hits_is_empty_search_result() {
        let result =
            lookup().resolve("find purple widget", &intent(IntentType::General, &[])).await;
        assert_eq!(
            result,
            LookupResult::SearchResults {
                query: "purple widget".to_string(),
                category: None,
                products: Vec::new()
            }
        );
    }

    #[tokio::test]
    async fn product_info_without_part_searches_with_category() {
        let result = lookup()
            .resolve("dishwasher gasket", &intent(IntentType::ProductInfo, &[]))
            .await;
        let LookupResult::SearchResults { query, category, products } = result else {
            panic!("expected search results");
        };
        assert_eq!(query, "gasket");
        assert_eq!(category, Some(Category::Dishwasher));
        assert_eq!(products.len(), 1);
    }

    #[test]
    fn query_normalization_and_greetings() {
        assert_eq!(
            normalize_query("Can you find me a fridge water filter?"),
            ("water filter".to_string(), Some(Category::Refrigerator))
        );
        assert_eq!(normalize_query("show me parts"), (String::new(), None));
        assert_eq!(Greeting::detect("Hi there"), Some(Greeting::Hi));
        assert_eq!(Greeting::detect("thanks, that helps"), Some(Greeting::Thanks));
        assert_eq!(Greeting::detect("this fits my dishwasher"), None);
    }
}
