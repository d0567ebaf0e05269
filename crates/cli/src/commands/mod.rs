pub mod catalog;
pub mod chat;
pub mod classify;
pub mod config;
pub mod doctor;
pub mod smoke;

use std::sync::Arc;

use partsdesk_agent::{AgentRuntime, ConversationStore, OpenAiCompatibleClient, RuntimeSettings};
use partsdesk_core::catalog::Catalog;
use partsdesk_core::config::{AppConfig, LoadOptions};
use partsdesk_core::search::SearchService;
use serde::Serialize;
use serde_json::Value;

pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_CATALOG: u8 = 3;
pub const EXIT_VALIDATION: u8 = 4;
pub const EXIT_SMOKE: u8 = 6;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::success_with_data(command, message, None)
    }

    pub fn success_with_data(
        command: &str,
        message: impl Into<String>,
        data: Option<Value>,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

pub(crate) fn load_config(command: &str) -> Result<AppConfig, CommandResult> {
    AppConfig::load(LoadOptions::default()).map_err(|error| {
        CommandResult::failure(command, "config_validation", error.to_string(), EXIT_CONFIG)
    })
}

pub(crate) fn load_catalog(
    command: &str,
    config: &AppConfig,
) -> Result<Arc<Catalog>, CommandResult> {
    Catalog::load(&config.catalog).map(Arc::new).map_err(|error| {
        CommandResult::failure(command, "catalog_load", error.to_string(), EXIT_CATALOG)
    })
}

/// Builds the same runtime the server bootstraps, minus the HTTP surface.
pub(crate) fn build_runtime(
    command: &str,
    config: &AppConfig,
) -> Result<AgentRuntime, CommandResult> {
    let catalog = load_catalog(command, config)?;
    let conversations =
        Arc::new(ConversationStore::with_capacity(config.conversation.max_conversations));
    let runtime =
        AgentRuntime::new(SearchService::new(catalog), RuntimeSettings::from_config(config))
            .with_conversation_store(conversations);

    if !config.llm.enabled {
        return Ok(runtime);
    }

    let client = OpenAiCompatibleClient::from_config(&config.llm).map_err(|error| {
        CommandResult::failure(command, "llm_client", error.to_string(), EXIT_CONFIG)
    })?;
    Ok(runtime.with_llm(Arc::new(client)))
}

pub(crate) fn block_on<F: std::future::Future>(
    command: &str,
    future: F,
) -> Result<F::Output, CommandResult> {
    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build();
    let runtime = runtime.map_err(|error| {
        CommandResult::failure(
            command,
            "async_runtime",
            format!("failed to initialize async runtime: {error}"),
            1,
        )
    })?;
    Ok(runtime.block_on(future))
}
