use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartNumber(pub String);

impl PartNumber {
    /// Normalizes `raw` into the canonical `PS` + digits form.
    pub fn parse(raw: &str) -> Option<Self> {
        let canonical = raw.trim().to_ascii_uppercase();
        let digits = canonical.strip_prefix("PS")?;
        if digits.is_empty() || !digits.chars().all(|character| character.is_ascii_digit()) {
            return None;
        }
        Some(Self(canonical))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PartNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Refrigerator,
    Dishwasher,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Refrigerator, Category::Dishwasher];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Refrigerator => "refrigerator",
            Self::Dishwasher => "dishwasher",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Refrigerator => "Refrigerator",
            Self::Dishwasher => "Dishwasher",
        }
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "refrigerator" | "fridge" => Ok(Self::Refrigerator),
            "dishwasher" => Ok(Self::Dishwasher),
            other => Err(format!("unknown category `{other}` (expected refrigerator|dishwasher)")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub part_number: PartNumber,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub category: Category,
    #[serde(default)]
    pub compatibility: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installation_guide_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installation_steps: Option<Vec<String>>,
}

impl Product {
    pub fn fits_model(&self, model_number: &str) -> bool {
        let wanted = model_number.trim();
        self.compatibility.iter().any(|model| model.eq_ignore_ascii_case(wanted))
    }

    pub fn installation_steps(&self) -> &[String] {
        self.installation_steps.as_deref().unwrap_or_default()
    }

    /// `$124.99` style price label.
    pub fn price_label(&self) -> String {
        format!("${:.2}", self.price)
    }

    pub fn matches_text(&self, needle_lowercase: &str) -> bool {
        self.name.to_lowercase().contains(needle_lowercase)
            || self.description.to_lowercase().contains(needle_lowercase)
            || self.part_number.as_str().to_lowercase().contains(needle_lowercase)
    }
}
