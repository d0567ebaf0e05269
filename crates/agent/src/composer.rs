use partsdesk_core::domain::conversation::MAX_SUGGESTED_ACTIONS;
use partsdesk_core::domain::intent::{Intent, IntentType};
use partsdesk_core::domain::product::{Category, Product};

use crate::lookup::{ClarificationTopic, Greeting, LookupResult};

pub const OUT_OF_SCOPE_MESSAGE: &str = "I apologize, but I can only help with questions about refrigerator and dishwasher parts. Is there anything related to these appliances I can help you with?";

pub const SAFETY_NOTE: &str = "**Safety first:** unplug the appliance and shut off its water supply before you start.";

const INCOMPATIBLE_MODELS_CAP: usize = 8;
const CATEGORY_GROUP_CAP: usize = 5;
const MODEL_ENUMERATION_CAP: usize = 10;
const SEARCH_RESULTS_CAP: usize = 5;

#[derive(Clone, Debug, PartialEq)]
pub struct ComposedResponse {
    pub message: String,
    pub products: Vec<Product>,
    pub suggested_actions: Vec<String>,
}

/// Blank-line separated sections, the layout every reply uses.
#[derive(Default)]
struct ReplyBuilder {
    sections: Vec<String>,
}

impl ReplyBuilder {
    fn paragraph(mut self, text: impl Into<String>) -> Self {
        self.sections.push(text.into());
        self
    }

    fn numbered<S: AsRef<str>>(mut self, items: &[S]) -> Self {
        if !items.is_empty() {
            let lines = items
                .iter()
                .enumerate()
                .map(|(index, item)| format!("{}. {}", index + 1, item.as_ref()))
                .collect::<Vec<_>>();
            self.sections.push(lines.join("\n"));
        }
        self
    }

    fn bullets<S: AsRef<str>>(mut self, items: &[S], cap: usize) -> Self {
        if !items.is_empty() {
            let mut lines = items
                .iter()
                .take(cap)
                .map(|item| format!("• {}", item.as_ref()))
                .collect::<Vec<_>>();
            if items.len() > cap {
                lines.push(format!("...and {} more", items.len() - cap));
            }
            self.sections.push(lines.join("\n"));
        }
        self
    }

    fn build(self) -> String {
        self.sections.join("\n\n")
    }
}

fn product_label(product: &Product) -> String {
    format!("**{}** (**{}**)", product.name, product.part_number)
}

fn product_line(product: &Product) -> String {
    format!("{} - **{}**", product_label(product), product.price_label())
}

fn bold_models(models: &[String]) -> Vec<String> {
    models.iter().map(|model| format!("**{model}**")).collect()
}

fn plural(count: usize, singular: &str) -> String {
    if count == 1 {
        format!("{count} {singular}")
    } else {
        format!("{count} {singular}s")
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ResponseComposer;

impl ResponseComposer {
    pub fn new() -> Self {
        Self
    }

    pub fn compose(&self, intent: &Intent, result: &LookupResult) -> ComposedResponse {
        let products = result.products();
        ComposedResponse {
            message: render(result),
            suggested_actions: suggested_actions(intent, &products),
            products,
        }
    }
}

/// Up to three follow-up prompts, chosen by intent and whether products were found.
pub fn suggested_actions(intent: &Intent, products: &[Product]) -> Vec<String> {
    let actions: &[&str] = match intent.intent_type {
        IntentType::ProductInfo if !products.is_empty() => {
            &["View product details", "Check compatibility", "Add to cart"]
        }
        IntentType::Compatibility => &["View compatible models", "Find alternative parts"],
        IntentType::Installation => {
            &["Watch installation video", "Download PDF guide", "View required tools"]
        }
        IntentType::Troubleshooting => {
            &["See common solutions", "Order replacement part", "Contact support"]
        }
        IntentType::OrderSupport => &["Track order", "Contact customer service"],
        IntentType::OutOfScope => &["Browse refrigerator parts", "Browse dishwasher parts"],
        _ => &["Browse parts catalog", "Talk to support"],
    };

    actions.iter().take(MAX_SUGGESTED_ACTIONS).map(|action| action.to_string()).collect()
}

fn render(result: &LookupResult) -> String {
    match result {
        LookupResult::ProductInfo { product } => product_info(product),
        LookupResult::ProductNotFound { part_number } => format!(
            "I couldn't find part **{part_number}** in our catalog. Please double-check the part number, or tell me your appliance's model number and I'll look up parts that fit."
        ),
        LookupResult::Installation { product } => installation(product),
        LookupResult::Compatibility { report, product } => {
            if report.compatible {
                ReplyBuilder::default()
                    .paragraph(format!(
                        "Yes! The {} is compatible with your **{}** model.",
                        product_label(product),
                        report.model_number
                    ))
                    .paragraph(format!("Price: **{}**", product.price_label()))
                    .build()
            } else {
                let reply = ReplyBuilder::default().paragraph(format!(
                    "No, the {} is not listed as compatible with model **{}**.",
                    product_label(product),
                    report.model_number
                ));
                if report.compatible_models.is_empty() {
                    reply.paragraph("This part has no listed compatible models.").build()
                } else {
                    reply
                        .paragraph("It fits these models:")
                        .bullets(&bold_models(&report.compatible_models), INCOMPATIBLE_MODELS_CAP)
                        .paragraph("If your model isn't listed, I can look up parts that fit it instead.")
                        .build()
                }
            }
        }
        LookupResult::ModelsForPart { product } => {
            if product.compatibility.is_empty() {
                format!(
                    "I don't have compatibility data for {} yet. Please contact support to confirm it fits your appliance.",
                    product_label(product)
                )
            } else {
                ReplyBuilder::default()
                    .paragraph(format!(
                        "The {} fits {}:",
                        product_label(product),
                        plural(product.compatibility.len(), "model")
                    ))
                    .bullets(&bold_models(&product.compatibility), MODEL_ENUMERATION_CAP)
                    .paragraph("Share your model number and I'll confirm the fit.")
                    .build()
            }
        }
        LookupResult::PartsForModel(result) => {
            if result.parts.is_empty() {
                return format!(
                    "I couldn't find any parts for model **{}** in our catalog. Please check the model number on the appliance's rating label.",
                    result.model_number
                );
            }
            let mut reply = ReplyBuilder::default().paragraph(format!(
                "I found {} for model **{}**:",
                plural(result.count, "part"),
                result.model_number
            ));
            for category in Category::ALL {
                let lines = result
                    .parts
                    .iter()
                    .filter(|part| part.category == category)
                    .map(product_line)
                    .collect::<Vec<_>>();
                if !lines.is_empty() {
                    reply = reply
                        .paragraph(format!("{} parts:", category.display_name()))
                        .bullets(&lines, CATEGORY_GROUP_CAP);
                }
            }
            reply.build()
        }
        LookupResult::SearchResults { query, category, products } => {
            let label = match (query.is_empty(), category) {
                (true, Some(category)) => format!("{} parts", category.as_str()),
                _ => query.clone(),
            };
            if products.is_empty() {
                return format!(
                    "No matches found for \"{label}\". Try a part number, a model number, or a simpler description like \"ice maker\" or \"door gasket\"."
                );
            }
            let lines = products.iter().map(product_line).collect::<Vec<_>>();
            ReplyBuilder::default()
                .paragraph(format!(
                    "I found {} matching \"{label}\":",
                    plural(products.len(), "part")
                ))
                .bullets(&lines, SEARCH_RESULTS_CAP)
                .build()
        }
        LookupResult::Troubleshooting { report, guides } => {
            let guide_lines = guides
                .iter()
                .map(|guide| {
                    format!(
                        "**{}** ({}, {}): {}",
                        guide.problem, guide.brand, guide.difficulty, guide.solution
                    )
                })
                .collect::<Vec<_>>();

            if !report.issue_detected {
                if guide_lines.is_empty() {
                    return "I couldn't match that to a known refrigerator or dishwasher problem. Could you describe the symptom in a bit more detail, for example \"ice maker not making ice\" or \"dishwasher not draining\"?".to_string();
                }
                return ReplyBuilder::default()
                    .paragraph("Here are some troubleshooting guides that may help:")
                    .bullets(&guide_lines, guide_lines.len())
                    .build();
            }

            let appliance = report.category.map_or("appliance", |category| category.as_str());
            let issue = report.issue_type.as_deref().unwrap_or("unknown");
            let mut reply = ReplyBuilder::default().paragraph(format!(
                "Troubleshooting your {appliance} (**{issue}**): {}",
                report.diagnosis.as_deref().unwrap_or_default()
            ));
            if !report.steps.is_empty() {
                reply = reply.paragraph("Try these steps:").numbered(&report.steps);
            }

            if !report.related_parts.is_empty() {
                let heading = match &report.model_number {
                    Some(model) => format!("Parts that commonly fix this for model **{model}**:"),
                    None => "Parts that commonly fix this:".to_string(),
                };
                let lines = report.related_parts.iter().map(product_line).collect::<Vec<_>>();
                reply = reply.paragraph(heading).bullets(&lines, CATEGORY_GROUP_CAP);
            } else if let Some(model) = &report.model_number {
                reply = reply.paragraph(format!(
                    "None of the usual replacement parts are listed for model **{model}**."
                ));
            }

            if !guide_lines.is_empty() {
                reply = reply.paragraph("Related guides:").bullets(&guide_lines, guide_lines.len());
            }
            reply.build()
        }
        LookupResult::OrderSupport => {
            "For order status, returns, or shipping questions, please contact customer service with your order number handy. In the meantime I can help you find parts, check compatibility, or walk through an installation.".to_string()
        }
        LookupResult::General(greeting) => general(*greeting),
        LookupResult::Clarification(topic) => match topic {
            ClarificationTopic::InstallationPart => {
                "I can help with installation! Which part are you installing? Please share the part number (it starts with PS, for example PS11752778).".to_string()
            }
            ClarificationTopic::CompatibilityDetails => {
                "To check compatibility I need the part number (like PS11752778) and your appliance's model number (like WDT780SAEM1). Which ones do you have?".to_string()
            }
            ClarificationTopic::SearchQuery => {
                "What part are you looking for? You can describe it (for example \"water filter\") or give me a part or model number.".to_string()
            }
        },
        LookupResult::OutOfScope => OUT_OF_SCOPE_MESSAGE.to_string(),
        LookupResult::ToolFailure { tool, detail } => format!(
            "Sorry, I ran into a problem while running the {tool} lookup ({detail}). Please try again in a moment, or contact support if it keeps happening."
        ),
    }
}

fn product_info(product: &Product) -> String {
    let mut reply = ReplyBuilder::default()
        .paragraph(format!("{} - **{}**", product_label(product), product.price_label()))
        .paragraph(product.description.clone());
    if !product.compatibility.is_empty() {
        reply = reply
            .paragraph(format!("Fits {}:", plural(product.compatibility.len(), "model")))
            .bullets(&bold_models(&product.compatibility), INCOMPATIBLE_MODELS_CAP);
    }
    if !product.installation_steps().is_empty() {
        reply = reply.paragraph("Installation instructions are available for this part. Just ask!");
    }
    reply.build()
}

fn installation(product: &Product) -> String {
    let steps = product.installation_steps();
    if steps.is_empty() {
        let mut reply = ReplyBuilder::default().paragraph(format!(
            "I don't have step-by-step instructions for the {} yet. Video installation guides are available on the product page.",
            product_label(product)
        ));
        if let Some(url) = &product.installation_guide_url {
            reply = reply.paragraph(format!("Guide: {url}"));
        }
        return reply.build();
    }

    let mut reply = ReplyBuilder::default()
        .paragraph(format!("Here's how to install the {}:", product_label(product)))
        .numbered(steps);
    if let Some(url) = &product.installation_guide_url {
        reply = reply.paragraph(format!("Video guide: {url}"));
    }
    reply.paragraph(SAFETY_NOTE).build()
}

fn general(greeting: Option<Greeting>) -> String {
    match greeting {
        Some(Greeting::Hello) => {
            "Hello! I'm your parts assistant. I can help you with refrigerator and dishwasher parts. What can I help you with today?".to_string()
        }
        Some(Greeting::Hi) => {
            "Hi there! I'm here to help with refrigerator and dishwasher parts. How can I assist you?".to_string()
        }
        Some(Greeting::Help) => ReplyBuilder::default()
            .paragraph("I can help you with:")
            .bullets(
                &[
                    "Finding parts for your appliances",
                    "Checking compatibility",
                    "Installation instructions",
                    "Troubleshooting issues",
                ],
                4,
            )
            .paragraph("What would you like help with?")
            .build(),
        Some(Greeting::Thanks) => {
            "You're welcome! Feel free to ask if you need anything else!".to_string()
        }
        Some(Greeting::Bye) => {
            "Goodbye! Feel free to come back if you need help with any refrigerator or dishwasher parts!".to_string()
        }
        None => ReplyBuilder::default()
            .paragraph("I'd be happy to help! Could you please provide more details about what you're looking for? For example:")
            .bullets(
                &[
                    "Part installation help",
                    "Compatibility checking",
                    "Troubleshooting an issue",
                    "Finding a specific part",
                ],
                4,
            )
            .build(),
    }
}
