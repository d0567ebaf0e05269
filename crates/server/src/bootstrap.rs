use std::sync::Arc;

use partsdesk_agent::{AgentRuntime, ConversationStore, OpenAiCompatibleClient, RuntimeSettings};
use partsdesk_core::catalog::{Catalog, CatalogError};
use partsdesk_core::config::{AppConfig, ConfigError};
use partsdesk_core::search::SearchService;
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub runtime: Arc<AgentRuntime>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("catalog load failed: {0}")]
    Catalog(#[from] CatalogError),
    #[error("llm client setup failed: {0}")]
    LlmClient(String),
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let catalog = Arc::new(Catalog::load(&config.catalog)?);

    let conversations =
        Arc::new(ConversationStore::with_capacity(config.conversation.max_conversations));
    let mut runtime =
        AgentRuntime::new(SearchService::new(catalog), RuntimeSettings::from_config(&config))
            .with_conversation_store(conversations);

    if config.llm.enabled {
        let client = OpenAiCompatibleClient::from_config(&config.llm)
            .map_err(|error| BootstrapError::LlmClient(error.to_string()))?;
        runtime = runtime.with_llm(Arc::new(client));
        info!(
            event_name = "system.bootstrap.llm_configured",
            correlation_id = "bootstrap",
            provider = config.llm.provider.as_str(),
            model = %config.llm.model,
            mode = config.agent.mode.as_str(),
            "llm client configured"
        );
    }

    Ok(Application { config, runtime: Arc::new(runtime) })
}
