use std::sync::LazyLock;

use partsdesk_core::domain::intent::{Entities, EntityKind, IntentType};
use partsdesk_core::domain::product::PartNumber;
use regex::Regex;

static PART_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)PS\d{8,}").expect("part number pattern is valid"));

// Tried in order; the first pattern with a usable candidate wins.
static MODEL_NUMBER_RES: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        Regex::new(r"(?i)\b[A-Z]{3}\d{3}[A-Z0-9]{4,}\b").expect("model pattern is valid"),
        Regex::new(r"\b\d{3}\.\d{8}\b").expect("model pattern is valid"),
        Regex::new(r"(?i)\b[A-Z]{2,}\d{4}[A-Z0-9]*\b").expect("model pattern is valid"),
    ]
});

static ISSUE_RES: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    [
        Regex::new(
            r"(ice maker|water dispenser|compressor|door|seal).*(not working|broken|stopped|won't)",
        )
        .expect("issue pattern is valid"),
        Regex::new(
            r"(not working|broken|stopped|won't).*(ice maker|water dispenser|compressor|door|seal)",
        )
        .expect("issue pattern is valid"),
    ]
});

/// Checked as plain substrings, so `ge` also matches inside words like `fridge`.
pub const BRANDS: [&str; 8] =
    ["whirlpool", "ge", "samsung", "lg", "frigidaire", "kenmore", "bosch", "kitchenaid"];

#[derive(Clone, Copy, Debug, Default)]
pub struct EntityExtractor;

impl EntityExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, text: &str, intent_type: IntentType) -> Entities {
        let mut entities = Entities::new();

        if let Some(part_number) = extract_part_number(text) {
            entities.insert(EntityKind::PartNumber.key().to_string(), part_number);
        }
        if let Some(model_number) = extract_model_number(text) {
            entities.insert(EntityKind::ModelNumber.key().to_string(), model_number);
        }
        if let Some(brand) = extract_brand(text) {
            entities.insert(EntityKind::Brand.key().to_string(), brand);
        }
        if intent_type == IntentType::Troubleshooting {
            if let Some(issue) = extract_issue(text) {
                entities.insert(EntityKind::Issue.key().to_string(), issue);
            }
        }

        entities
    }
}

pub fn extract_part_number(text: &str) -> Option<String> {
    PART_NUMBER_RE.find(text).map(|found| found.as_str().to_ascii_uppercase())
}

pub fn extract_model_number(text: &str) -> Option<String> {
    MODEL_NUMBER_RES.iter().find_map(|pattern| {
        pattern
            .find_iter(text)
            .map(|found| found.as_str().to_ascii_uppercase())
            .find(|candidate| PartNumber::parse(candidate).is_none())
    })
}

pub fn extract_brand(text: &str) -> Option<String> {
    let lowered = text.to_lowercase();
    BRANDS.iter().find(|brand| lowered.contains(*brand)).map(|brand| capitalize(brand))
}

pub fn extract_issue(text: &str) -> Option<String> {
    let lowered = text.to_lowercase();
    ISSUE_RES
        .iter()
        .find_map(|pattern| pattern.find(&lowered))
        .map(|found| found.as_str().to_string())
}

fn capitalize(word: &str) -> String {
    let mut characters = word.chars();
    match characters.next() {
        Some(first) => first.to_uppercase().chain(characters).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use partsdesk_core::domain::intent::IntentType;

    use super::{
        extract_brand, extract_issue, extract_model_number, extract_part_number, EntityExtractor,
    };

    #[test]
    fn part_number_is_uppercased_wherever_it_appears() {
        assert_eq!(extract_part_number("need ps11752778 asap"), Some("PS11752778".to_string()));
        assert_eq!(extract_part_number("(PS11752778)"), Some("PS11752778".to_string()));
        assert_eq!(extract_part_number("item#PS117527789!"), Some("PS117527789".to_string()));
        assert_eq!(extract_part_number("PS1175"), None);
    }

    #[test]
    fn model_patterns_are_tried_in_order() {
        assert_eq!(
            extract_model_number("does it fit wdt780saem1?"),
            Some("WDT780SAEM1".to_string())
        );
        assert_eq!(
            extract_model_number("my kenmore 665.13732K601"),
            None,
            "dotted pattern requires exactly eight trailing digits"
        );
        assert_eq!(
            extract_model_number("kenmore model 665.13732601"),
            Some("665.13732601".to_string())
        );
        assert_eq!(extract_model_number("GE model GSS2500"), Some("GSS2500".to_string()));
    }

    #[test]
    fn part_numbers_are_not_reported_as_models() {
        assert_eq!(extract_model_number("Is PS11752778 in stock?"), None);
        assert_eq!(
            extract_model_number("Is PS11752778 compatible with WDT780SAEM1?"),
            Some("WDT780SAEM1".to_string())
        );
    }

    #[test]
    fn brand_match_is_substring_based() {
        assert_eq!(extract_brand("My Whirlpool fridge"), Some("Whirlpool".to_string()));
        assert_eq!(extract_brand("kitchenaid dishwasher"), Some("Kitchenaid".to_string()));
        // `ge` is listed before `samsung` and matches inside `fridge`.
        assert_eq!(extract_brand("samsung fridge"), Some("Ge".to_string()));
        assert_eq!(extract_brand("my dishwasher"), None);
    }

    #[test]
    fn issue_matches_either_word_order() {
        assert_eq!(
            extract_issue("My ice maker is not working"),
            Some("ice maker is not working".to_string())
        );
        assert_eq!(
            extract_issue("it stopped and the door seal is torn"),
            Some("stopped and the door seal".to_string())
        );
        assert_eq!(extract_issue("the dishwasher is loud"), None);
    }

    #[test]
    fn issue_is_only_extracted_for_troubleshooting() {
        let extractor = EntityExtractor::new();
        let message = "Whirlpool ice maker is broken, part PS11752778";

        let troubleshooting = extractor.extract(message, IntentType::Troubleshooting);
        assert_eq!(troubleshooting.get("issue").map(String::as_str), Some("ice maker is broken"));
        assert_eq!(troubleshooting.get("brand").map(String::as_str), Some("Whirlpool"));
        assert_eq!(troubleshooting.get("part_number").map(String::as_str), Some("PS11752778"));

        let product_info = extractor.extract(message, IntentType::ProductInfo);
        assert!(!product_info.contains_key("issue"));
    }

    #[test]
    fn handles_common_customer_phrases() {
        struct Case {
            text: &'static str,
            part: Option<&'static str>,
            model: Option<&'static str>,
        }

        let cases = vec![
            Case {
                text: "How can I install part number PS11752778?",
                part: Some("PS11752778"),
                model: None,
            },
            Case {
                text: "Is this part compatible with my WDT780SAEM1 model?",
                part: None,
                model: Some("WDT780SAEM1"),
            },
            Case {
                text: "ps11757302 for wrs325sdhz",
                part: Some("PS11757302"),
                model: Some("WRS325SDHZ"),
            },
            Case { text: "price of PS11701542", part: Some("PS11701542"), model: None },
            Case { text: "parts for model MFI2570FEZ", part: None, model: Some("MFI2570FEZ") },
            Case { text: "my fridge is warm", part: None, model: None },
            Case { text: "what fits WDT750SAHZ0?", part: None, model: Some("WDT750SAHZ0") },
            Case { text: "order status for PS11750093", part: Some("PS11750093"), model: None },
        ];

        let extractor = EntityExtractor::new();
        for (index, case) in cases.iter().enumerate() {
            let entities = extractor.extract(case.text, IntentType::General);
            assert_eq!(
                entities.get("part_number").map(String::as_str),
                case.part,
                "case {index} part number: {}",
                case.text
            );
            assert_eq!(
                entities.get("model_number").map(String::as_str),
                case.model,
                "case {index} model number: {}",
                case.text
            );
        }
    }
}
