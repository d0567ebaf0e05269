use serde::{Deserialize, Serialize};

use crate::domain::product::PartNumber;

/// A curated repair article, searched by the `search_troubleshooting` tool.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TroubleshootingGuide {
    pub problem: String,
    pub solution: String,
    pub brand: String,
    pub appliance: String,
    #[serde(default)]
    pub common_parts: Vec<PartNumber>,
    pub difficulty: String,
}

impl TroubleshootingGuide {
    pub fn searchable_text(&self) -> String {
        format!("{} {}", self.problem, self.solution).to_lowercase()
    }
}
