use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentType {
    Installation,
    Compatibility,
    Troubleshooting,
    ProductInfo,
    OrderSupport,
    General,
    OutOfScope,
}

impl IntentType {
    pub const ALL: [IntentType; 7] = [
        IntentType::Installation,
        IntentType::Compatibility,
        IntentType::Troubleshooting,
        IntentType::ProductInfo,
        IntentType::OrderSupport,
        IntentType::General,
        IntentType::OutOfScope,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Installation => "installation",
            Self::Compatibility => "compatibility",
            Self::Troubleshooting => "troubleshooting",
            Self::ProductInfo => "product_info",
            Self::OrderSupport => "order_support",
            Self::General => "general",
            Self::OutOfScope => "out_of_scope",
        }
    }
}

impl fmt::Display for IntentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IntentType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|intent| intent.as_str() == normalized)
            .ok_or_else(|| format!("unknown intent `{normalized}`"))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    PartNumber,
    ModelNumber,
    Brand,
    Issue,
}

impl EntityKind {
    pub fn key(&self) -> &'static str {
        match self {
            Self::PartNumber => "part_number",
            Self::ModelNumber => "model_number",
            Self::Brand => "brand",
            Self::Issue => "issue",
        }
    }
}

pub type Entities = BTreeMap<String, String>;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    pub intent_type: IntentType,
    pub confidence: f64,
    #[serde(default)]
    pub entities: Entities,
}

impl Intent {
    pub fn new(intent_type: IntentType, confidence: f64, entities: Entities) -> Self {
        Self { intent_type, confidence: confidence.clamp(0.0, 1.0), entities }
    }

    /// Low-confidence `general` result used whenever classification cannot be trusted.
    pub fn fallback(entities: Entities) -> Self {
        Self::new(IntentType::General, 0.5, entities)
    }

    pub fn entity(&self, kind: EntityKind) -> Option<&str> {
        self.entities.get(kind.key()).map(String::as_str).filter(|value| !value.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::{EntityKind, Entities, Intent, IntentType};

    #[test]
    fn intent_type_round_trips_through_wire_names() {
        for intent in IntentType::ALL {
            assert_eq!(intent.as_str().parse::<IntentType>(), Ok(intent));
        }
        assert!("refund".parse::<IntentType>().is_err());
    }

    #[test]
    fn confidence_is_clamped_and_blank_entities_are_ignored() {
        let mut entities = Entities::new();
        entities.insert("part_number".to_string(), "PS11752778".to_string());
        entities.insert("model_number".to_string(), "  ".to_string());

        let intent = Intent::new(IntentType::ProductInfo, 1.4, entities);
        assert_eq!(intent.confidence, 1.0);
        assert_eq!(intent.entity(EntityKind::PartNumber), Some("PS11752778"));
        assert_eq!(intent.entity(EntityKind::ModelNumber), None);
    }
}
