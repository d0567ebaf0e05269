use partsdesk_core::domain::intent::{EntityKind, Intent, IntentType};

use crate::composer::OUT_OF_SCOPE_MESSAGE;

const OTHER_APPLIANCES: [&str; 10] = [
    "washer",
    "washing machine",
    "dryer",
    "oven",
    "microwave",
    "stove",
    "cooktop",
    "range hood",
    "furnace",
    "air conditioner",
];

const SUPPORTED_APPLIANCES: [&str; 5] =
    ["refrigerator", "fridge", "freezer", "dishwasher", "ice maker"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScopeDecision {
    Allow,
    Decline { reason_code: &'static str, user_message: String, suggested_actions: Vec<String> },
}

impl ScopeDecision {
    fn decline(reason_code: &'static str) -> Self {
        Self::Decline {
            reason_code,
            user_message: OUT_OF_SCOPE_MESSAGE.to_string(),
            suggested_actions: vec![
                "Browse refrigerator parts".to_string(),
                "Browse dishwasher parts".to_string(),
            ],
        }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScopeGuard {
    pub decline_other_appliances: bool,
}

impl Default for ScopeGuard {
    fn default() -> Self {
        Self { decline_other_appliances: true }
    }
}

impl ScopeGuard {
    pub fn evaluate(&self, intent: &Intent, message: &str) -> ScopeDecision {
        if intent.intent_type == IntentType::OutOfScope {
            return ScopeDecision::decline("out_of_scope_intent");
        }
        if self.decline_other_appliances
            && !names_catalog_identifier(intent)
            && mentions_only_other_appliances(message)
        {
            return ScopeDecision::decline("unsupported_appliance");
        }
        ScopeDecision::Allow
    }
}

// A part or model number anchors the question to the catalog whatever else it mentions.
fn names_catalog_identifier(intent: &Intent) -> bool {
    intent.entity(EntityKind::PartNumber).is_some()
        || intent.entity(EntityKind::ModelNumber).is_some()
}

/// True when the message names an appliance we don't stock and none that we do.
/// Single words match whole tokens so "dishwasher" never counts as "washer".
fn mentions_only_other_appliances(message: &str) -> bool {
    let lowered = message.to_lowercase();
    let tokens = lowered
        .split(|character: char| !character.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .collect::<Vec<_>>();
    let mentions = |phrase: &str| {
        if phrase.contains(' ') {
            lowered.contains(phrase)
        } else {
            tokens.iter().any(|token| *token == phrase || token.strip_suffix('s') == Some(phrase))
        }
    };

    OTHER_APPLIANCES.iter().any(|phrase| mentions(phrase))
        && !SUPPORTED_APPLIANCES.iter().any(|phrase| mentions(phrase))
}
