use std::sync::{Arc, LazyLock};
use std::time::Duration;

use anyhow::{anyhow, Result};
use partsdesk_core::domain::intent::{Entities, Intent, IntentType};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::extract::EntityExtractor;
use crate::llm::{CompletionRequest, LlmClient, LlmMessage};

const CLASSIFIER_TEMPERATURE: f32 = 0.3;
const CLASSIFIER_MAX_TOKENS: u32 = 200;

const CLASSIFIER_PROMPT: &str = r#"You are an intent classifier for a refrigerator and dishwasher parts e-commerce site.
Classify the user's message into one of these intents:
- installation: User wants installation instructions
- compatibility: User wants to check if a part works with their appliance
- troubleshooting: User has a problem and needs help fixing it
- product_info: User wants information about a product
- order_support: User has questions about ordering, shipping, or returns
- general: General questions about parts or appliances
- out_of_scope: Question is not related to refrigerator/dishwasher parts

Also extract any entities like:
- part_number: Part numbers (e.g., PS11752778)
- model_number: Appliance model numbers (e.g., WDT780SAEM1)
- brand: Brand name (e.g., Whirlpool, GE)
- issue: Description of the problem

Respond ONLY with valid JSON in this format:
{
    "intent": "intent_type",
    "confidence": 0.85,
    "entities": {
        "part_number": "PS11752778",
        "model_number": "WDT780SAEM1"
    }
}"#;

struct IntentRule {
    intent_type: IntentType,
    patterns: Vec<Regex>,
}

// Declaration order doubles as the tie-break order.
static INTENT_RULES: LazyLock<Vec<IntentRule>> = LazyLock::new(|| {
    let rule = |intent_type, patterns: &[&str]| IntentRule {
        intent_type,
        patterns: patterns
            .iter()
            .map(|pattern| Regex::new(pattern).expect("intent pattern is valid"))
            .collect(),
    };

    vec![
        rule(
            IntentType::Installation,
            &[
                r"\b(install|installation|installing|how to install|setup|set up|mount|attach|replace|replacing)\b",
                r"\b(step by step|instructions|guide)\b",
            ],
        ),
        rule(
            IntentType::Compatibility,
            &[
                r"\b(compatible|compatibility|work with|fit|fits|match)\b",
                r"\b(model|appliance) (number|#)?\s*[a-z0-9]+\b",
            ],
        ),
        rule(
            IntentType::Troubleshooting,
            &[
                r"\b(fix|repair|not working|broken|problem|issue|trouble|leaking|not draining|not cooling|not cleaning|not drying)\b",
                r"\b(won't|doesn't|can't|stopped)\b",
            ],
        ),
        rule(
            IntentType::ProductInfo,
            &[
                r"\b(price|cost|how much|specifications|specs|details)\b",
                r"\b(part number|part #|ps\d+)\b",
            ],
        ),
        rule(
            IntentType::OrderSupport,
            &[
                r"\b(order|purchase|buy|shipping|delivery|return|refund)\b",
                r"\b(track|status|when will)\b",
            ],
        ),
    ]
});

/// Per-category pattern hit counts for a message, in declaration order.
pub fn score_message(message: &str) -> Vec<(IntentType, u32)> {
    let lowered = message.to_lowercase();
    INTENT_RULES
        .iter()
        .map(|rule| {
            let score = rule.patterns.iter().filter(|pattern| pattern.is_match(&lowered)).count();
            (rule.intent_type, score as u32)
        })
        .collect()
}

pub fn confidence_for_score(score: u32) -> f64 {
    f64::from((70 + 10 * score).min(95)) / 100.0
}

fn pick_intent(scores: &[(IntentType, u32)]) -> Option<(IntentType, u32)> {
    let mut best: Option<(IntentType, u32)> = None;
    for &(intent_type, score) in scores {
        if score > 0 && best.map_or(true, |(_, best_score)| score > best_score) {
            best = Some((intent_type, score));
        }
    }

    // "replace" or "installing" must not read as a repair or fit question.
    let Some(installation) = scored(scores, IntentType::Installation) else {
        return best;
    };
    if scored(scores, IntentType::Compatibility).is_some() {
        return Some(installation);
    }
    match best {
        Some((IntentType::Troubleshooting, _)) => Some(installation),
        best => best,
    }
}

fn scored(scores: &[(IntentType, u32)], wanted: IntentType) -> Option<(IntentType, u32)> {
    scores.iter().find(|(intent_type, score)| *intent_type == wanted && *score > 0).copied()
}

#[derive(Clone)]
pub struct IntentClassifier {
    extractor: EntityExtractor,
    llm: Option<Arc<dyn LlmClient>>,
    timeout: Duration,
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl IntentClassifier {
    pub fn new() -> Self {
        Self { extractor: EntityExtractor::new(), llm: None, timeout: Duration::from_secs(30) }
    }

    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>, timeout: Duration) -> Self {
        self.llm = Some(llm);
        self.timeout = timeout;
        self
    }

    pub fn has_llm(&self) -> bool {
        self.llm.is_some()
    }

    /// Pattern-only classification; `None` when no rule matched.
    pub fn classify_rules(&self, message: &str) -> Option<Intent> {
        let (intent_type, score) = pick_intent(&score_message(message))?;
        let entities = self.extractor.extract(message, intent_type);
        Some(Intent::new(intent_type, confidence_for_score(score), entities))
    }

    pub async fn classify(&self, message: &str) -> Intent {
        if let Some(intent) = self.classify_rules(message) {
            info!(
                event_name = "agent.intent.classified",
                source = "rules",
                intent = intent.intent_type.as_str(),
                confidence = intent.confidence,
                "intent classified"
            );
            return intent;
        }

        match self.classify_with_llm(message).await {
            Ok(intent) => {
                info!(
                    event_name = "agent.intent.classified",
                    source = "llm",
                    intent = intent.intent_type.as_str(),
                    confidence = intent.confidence,
                    "intent classified"
                );
                intent
            }
            Err(error) => {
                if self.llm.is_some() {
                    warn!(
                        event_name = "agent.intent.llm_failed",
                        error = %error,
                        "llm classification failed, using general intent"
                    );
                }
                Intent::fallback(self.extractor.extract(message, IntentType::General))
            }
        }
    }

    async fn classify_with_llm(&self, message: &str) -> Result<Intent> {
        let llm = self.llm.as_ref().ok_or_else(|| anyhow!("no llm client configured"))?;
        let request = CompletionRequest {
            messages: vec![LlmMessage::system(CLASSIFIER_PROMPT), LlmMessage::user(message)],
            temperature: CLASSIFIER_TEMPERATURE,
            max_tokens: CLASSIFIER_MAX_TOKENS,
            tools: Vec::new(),
        };

        let completion = tokio::time::timeout(self.timeout, llm.chat_completion(request))
            .await
            .map_err(|_| anyhow!("llm classification timed out after {:?}", self.timeout))??;
        let content = completion
            .text_content()
            .ok_or_else(|| anyhow!("llm returned an empty classification"))?;
        let parsed = parse_classification(content)?;

        let mut entities = self.extractor.extract(message, parsed.intent_type);
        entities.extend(parsed.entities);
        Ok(Intent::new(parsed.intent_type, parsed.confidence, entities))
    }
}

#[derive(Debug, PartialEq)]
struct LlmClassification {
    intent_type: IntentType,
    confidence: f64,
    entities: Entities,
}

#[derive(Deserialize)]
struct RawClassification {
    intent: String,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    entities: serde_json::Map<String, Value>,
}

fn parse_classification(content: &str) -> Result<LlmClassification> {
    let raw: RawClassification = serde_json::from_str(strip_code_fence(content))
        .map_err(|error| anyhow!("classification is not valid JSON: {error}"))?;
    let intent_type = raw.intent.parse::<IntentType>().map_err(|error| anyhow!(error))?;

    let entities = raw
        .entities
        .into_iter()
        .filter_map(|(key, value)| {
            let value = match value {
                Value::String(text) => text,
                Value::Null => return None,
                other => other.to_string(),
            };
            let value = value.trim().to_string();
            (!value.is_empty()).then_some((key, value))
        })
        .collect();

    Ok(LlmClassification { intent_type, confidence: raw.confidence.unwrap_or(0.5), entities })
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}
