use std::sync::Arc;
use std::time::Duration;

use partsdesk_agent::{IntentClassifier, OpenAiCompatibleClient};
use partsdesk_core::domain::conversation::ChatRequest;

use crate::commands::{block_on, load_config, CommandResult, EXIT_CONFIG, EXIT_VALIDATION};

const COMMAND: &str = "classify";

pub fn run(message: &str) -> CommandResult {
    if let Err(error) = ChatRequest::new(message).validate() {
        return CommandResult::failure(COMMAND, "validation", error.to_string(), EXIT_VALIDATION);
    }

    let config = match load_config(COMMAND) {
        Ok(config) => config,
        Err(result) => return result,
    };

    let mut classifier = IntentClassifier::new();
    if config.llm.enabled {
        match OpenAiCompatibleClient::from_config(&config.llm) {
            Ok(client) => {
                classifier = classifier
                    .with_llm(Arc::new(client), Duration::from_secs(config.llm.timeout_secs));
            }
            Err(error) => {
                return CommandResult::failure(COMMAND, "llm_client", error.to_string(), EXIT_CONFIG)
            }
        }
    }

    let intent = match block_on(COMMAND, classifier.classify(message)) {
        Ok(intent) => intent,
        Err(result) => return result,
    };

    let summary = format!("{} ({:.2})", intent.intent_type.as_str(), intent.confidence);
    CommandResult::success_with_data(COMMAND, summary, serde_json::to_value(&intent).ok())
}
