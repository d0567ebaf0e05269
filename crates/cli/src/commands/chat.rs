use partsdesk_core::domain::conversation::ChatRequest;

use crate::commands::{block_on, build_runtime, load_config, CommandResult, EXIT_VALIDATION};

const COMMAND: &str = "chat";

pub fn run(message: &str, conversation_id: Option<&str>) -> CommandResult {
    let request = match conversation_id {
        Some(id) => ChatRequest::in_conversation(message, id),
        None => ChatRequest::new(message),
    };
    if let Err(error) = request.validate() {
        return CommandResult::failure(COMMAND, "validation", error.to_string(), EXIT_VALIDATION);
    }

    let config = match load_config(COMMAND) {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match build_runtime(COMMAND, &config) {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let response = match block_on(COMMAND, runtime.handle_message(request)) {
        Ok(Ok(response)) => response,
        Ok(Err(error)) => {
            return CommandResult::failure(COMMAND, "validation", error.to_string(), EXIT_VALIDATION)
        }
        Err(result) => return result,
    };

    let message = response.message.clone();
    CommandResult::success_with_data(COMMAND, message, serde_json::to_value(&response).ok())
}
