use serde::Serialize;

use crate::catalog::Catalog;
use crate::domain::product::{Category, Product};

pub const MAX_RELATED_PARTS: usize = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IssuePattern {
    pub keywords: &'static [&'static str],
    pub category: Category,
    pub issue_type: &'static str,
    pub diagnosis: &'static str,
    pub steps: &'static [&'static str],
    pub common_parts: &'static [&'static str],
}

impl IssuePattern {
    fn matches(&self, message_lowercase: &str) -> bool {
        self.keywords.iter().any(|keyword| message_lowercase.contains(keyword))
    }
}

/// Checked in order; the first pattern with a keyword in the message wins.
pub static ISSUE_PATTERNS: &[IssuePattern] = &[
    IssuePattern {
        keywords: &["ice maker", "no ice", "not making ice", "ice not"],
        category: Category::Refrigerator,
        issue_type: "ice maker",
        diagnosis: "Ice maker problems usually come from a blocked water supply, a failed water inlet valve, or a worn ice maker assembly.",
        steps: &[
            "Make sure the ice maker is switched on and the shut-off arm is down.",
            "Check that the freezer is between 0 and 5 degrees Fahrenheit.",
            "Confirm the household water supply valve is fully open.",
            "Inspect the fill tube for ice blockages and thaw it if needed.",
            "Replace the water inlet valve or ice maker assembly if ice still does not form.",
        ],
        common_parts: &["ice maker", "water inlet valve", "fill tube"],
    },
    IssuePattern {
        keywords: &["water dispenser", "dispenser"],
        category: Category::Refrigerator,
        issue_type: "water dispenser",
        diagnosis: "A dispenser that will not pour is most often caused by a clogged filter or a failed water inlet valve.",
        steps: &[
            "Replace the water filter if it is older than six months.",
            "Check the supply line behind the refrigerator for kinks.",
            "Test the water inlet valve for continuity.",
        ],
        common_parts: &["water filter", "water inlet valve"],
    },
    IssuePattern {
        keywords: &["not cooling", "warm", "not cold", "too warm"],
        category: Category::Refrigerator,
        issue_type: "not cooling",
        diagnosis: "Cooling problems are usually airflow problems: dirty condenser coils, a failed fan motor, or a faulty defrost component.",
        steps: &[
            "Clean the condenser coils underneath or behind the refrigerator.",
            "Listen for the evaporator fan inside the freezer when the door switch is pressed.",
            "Check that the condenser fan spins freely.",
            "Look for heavy frost on the evaporator cover, which points to a defrost failure.",
        ],
        common_parts: &["fan motor", "defrost thermostat"],
    },
    IssuePattern {
        keywords: &["door seal", "gasket", "seal"],
        category: Category::Refrigerator,
        issue_type: "door seal",
        diagnosis: "A worn or torn door gasket lets warm air in and causes frost and condensation.",
        steps: &[
            "Close the door on a sheet of paper and try to pull it out.",
            "Clean the gasket with warm soapy water.",
            "Replace the gasket if the paper slides out easily or the gasket is torn.",
        ],
        common_parts: &["door gasket"],
    },
    IssuePattern {
        keywords: &["not draining", "won't drain", "standing water", "drain"],
        category: Category::Dishwasher,
        issue_type: "not draining",
        diagnosis: "Standing water is usually caused by a clogged filter, a kinked drain hose, or a failed drain pump.",
        steps: &[
            "Remove and clean the filter at the bottom of the tub.",
            "Check the drain hose for kinks or clogs.",
            "Listen for the drain pump running at the end of the cycle.",
            "Replace the drain pump if it hums but does not move water.",
        ],
        common_parts: &["drain pump", "drain hose"],
    },
    IssuePattern {
        keywords: &["not cleaning", "dirty dishes", "still dirty", "spots"],
        category: Category::Dishwasher,
        issue_type: "not cleaning",
        diagnosis: "Poor wash results usually come from blocked spray arms or a weak wash pump.",
        steps: &[
            "Clear debris from the spray arm holes.",
            "Make sure the spray arms spin freely by hand.",
            "Check that the water entering the tub is hot.",
            "Replace a cracked spray arm or a weak wash pump motor.",
        ],
        common_parts: &["spray arm", "wash pump motor"],
    },
    IssuePattern {
        keywords: &["not drying", "wet dishes", "won't dry"],
        category: Category::Dishwasher,
        issue_type: "not drying",
        diagnosis: "Dishes that stay wet usually point to a failed heating element.",
        steps: &[
            "Make sure the heated dry option is selected.",
            "Inspect the heating element for breaks or blisters.",
            "Test the heating element for continuity and replace it if it reads open.",
        ],
        common_parts: &["heating element"],
    },
    IssuePattern {
        keywords: &["dishwasher leak", "dishwasher is leaking", "dishwasher leaking"],
        category: Category::Dishwasher,
        issue_type: "dishwasher leak",
        diagnosis: "Dishwasher leaks usually come from a worn door gasket or a loose water inlet valve connection.",
        steps: &[
            "Inspect the door gasket for tears or food debris.",
            "Check the water inlet valve connection under the kick plate.",
            "Make sure the dishwasher is level so water does not pool at the door.",
        ],
        common_parts: &["door gasket", "water inlet valve"],
    },
    IssuePattern {
        keywords: &["leak", "leaking", "puddle"],
        category: Category::Refrigerator,
        issue_type: "leak",
        diagnosis: "Refrigerator leaks are usually caused by a cracked fill tube, a loose supply line, or a failing water inlet valve.",
        steps: &[
            "Check the supply line connection behind the refrigerator.",
            "Inspect the ice maker fill tube for cracks.",
            "Look for drips around the water inlet valve.",
        ],
        common_parts: &["water inlet valve", "fill tube", "water filter"],
    },
    IssuePattern {
        keywords: &["noise", "noisy", "loud", "buzzing", "rattling"],
        category: Category::Refrigerator,
        issue_type: "noisy",
        diagnosis: "Loud buzzing or rattling usually comes from a fan motor with worn bearings or a blade hitting ice.",
        steps: &[
            "Open the freezer and listen for the evaporator fan.",
            "Check the condenser fan blade for debris.",
            "Replace any fan motor that squeals or runs unevenly.",
        ],
        common_parts: &["fan motor"],
    },
];

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TroubleshootingReport {
    pub issue_detected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnosis: Option<String>,
    pub steps: Vec<String>,
    pub related_parts: Vec<Product>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_number: Option<String>,
}

impl TroubleshootingReport {
    fn undetected(model_number: Option<String>) -> Self {
        Self {
            issue_detected: false,
            issue_type: None,
            category: None,
            diagnosis: None,
            steps: Vec::new(),
            related_parts: Vec::new(),
            model_number,
        }
    }
}

pub fn match_issue(message: &str) -> Option<&'static IssuePattern> {
    let lowered = message.to_lowercase();
    ISSUE_PATTERNS.iter().find(|pattern| pattern.matches(&lowered))
}

impl Catalog {
    pub fn diagnose(&self, message: &str, model_number: Option<&str>) -> TroubleshootingReport {
        let model_number = model_number.map(str::trim).filter(|model| !model.is_empty());
        let Some(pattern) = match_issue(message) else {
            return TroubleshootingReport::undetected(model_number.map(str::to_string));
        };

        let related_parts = self
            .products()
            .iter()
            .filter(|product| product.category == pattern.category)
            .filter(|product| {
                let name = product.name.to_lowercase();
                pattern.common_parts.iter().any(|common| name.contains(common))
            })
            .filter(|product| model_number.map_or(true, |model| product.fits_model(model)))
            .take(MAX_RELATED_PARTS)
            .cloned()
            .collect();

        TroubleshootingReport {
            issue_detected: true,
            issue_type: Some(pattern.issue_type.to_string()),
            category: Some(pattern.category),
            diagnosis: Some(pattern.diagnosis.to_string()),
            steps: pattern.steps.iter().map(|step| step.to_string()).collect(),
            related_parts,
            model_number: model_number.map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{match_issue, MAX_RELATED_PARTS};
    use crate::catalog::Catalog;
    use crate::domain::product::Category;

    #[test]
    fn ice_maker_issue_only_pulls_refrigerator_parts() {
        let catalog = Catalog::builtin().expect("builtin catalog");
        let report = catalog.diagnose("My ice maker is not working", None);

        assert!(report.issue_detected);
        assert_eq!(report.issue_type.as_deref(), Some("ice maker"));
        assert!(!report.steps.is_empty());
        assert!(!report.related_parts.is_empty());
        assert!(report.related_parts.len() <= MAX_RELATED_PARTS);
        assert!(report.related_parts.iter().all(|part| part.category == Category::Refrigerator));
        assert!(report.related_parts.iter().all(|part| !part.name.starts_with("Dishwasher")));
    }

    #[test]
    fn model_number_narrows_related_parts() {
        let catalog = Catalog::builtin().expect("builtin catalog");
        let report = catalog.diagnose("dishwasher not draining", Some("WDF520PADM7"));

        assert_eq!(report.issue_type.as_deref(), Some("not draining"));
        assert_eq!(report.model_number.as_deref(), Some("WDF520PADM7"));
        assert!(report.related_parts.iter().all(|part| part.fits_model("WDF520PADM7")));
    }

    #[test]
    fn first_pattern_in_table_order_wins() {
        let pattern = match_issue("ice maker is leaking and noisy").expect("pattern");
        assert_eq!(pattern.issue_type, "ice maker");

        let leak = match_issue("my dishwasher is leaking").expect("pattern");
        assert_eq!(leak.issue_type, "dishwasher leak");
    }

    #[test]
    fn unmatched_message_reports_no_issue() {
        let catalog = Catalog::builtin().expect("builtin catalog");
        let report = catalog.diagnose("the light flickers", None);

        assert!(!report.issue_detected);
        assert!(report.related_parts.is_empty());
        assert!(report.steps.is_empty());
    }
}
