use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub catalog: CatalogConfig,
    pub llm: LlmConfig,
    pub agent: AgentConfig,
    pub conversation: ConversationConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CatalogConfig {
    pub products_path: Option<PathBuf>,
    pub guides_path: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub enabled: bool,
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AgentConfig {
    pub mode: AgentMode,
    pub context_window: usize,
    pub max_products: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConversationConfig {
    /// Zero keeps every conversation.
    pub max_conversations: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
    pub cors_origins: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "openrouter")]
    OpenRouter,
    Ollama,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::OpenRouter => "openrouter",
            Self::Ollama => "ollama",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.openai.com/v1",
            Self::OpenRouter => "https://openrouter.ai/api/v1",
            Self::Ollama => "http://localhost:11434/v1",
        }
    }

    pub fn requires_api_key(&self) -> bool {
        !matches!(self, Self::Ollama)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentMode {
    /// Deterministic classify, look up, compose pipeline.
    Rules,
    /// LLM tool calling, degrading to `Rules` on any failure.
    Llm,
}

impl AgentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rules => "rules",
            Self::Llm => "llm",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub llm_enabled: Option<bool>,
    pub llm_provider: Option<LlmProvider>,
    pub llm_model: Option<String>,
    pub agent_mode: Option<AgentMode>,
    pub products_path: Option<PathBuf>,
    pub guides_path: Option<PathBuf>,
    pub server_port: Option<u16>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            catalog: CatalogConfig::default(),
            llm: LlmConfig {
                enabled: false,
                provider: LlmProvider::Ollama,
                api_key: None,
                base_url: None,
                model: "llama3.1".to_string(),
                timeout_secs: 30,
                temperature: 0.7,
                max_tokens: 1000,
            },
            agent: AgentConfig { mode: AgentMode::Rules, context_window: 10, max_products: 5 },
            conversation: ConversationConfig { max_conversations: 1000 },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8000,
                graceful_shutdown_secs: 15,
                cors_origins: vec!["http://localhost:3000".to_string()],
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl LlmConfig {
    /// Explicit base URL, or the provider's public endpoint.
    pub fn effective_base_url(&self) -> String {
        self.base_url
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| self.provider.default_base_url())
            .trim_end_matches('/')
            .to_string()
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "openrouter" => Ok(Self::OpenRouter),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected openai|openrouter|ollama)"
            ))),
        }
    }
}

impl std::str::FromStr for AgentMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "rules" => Ok(Self::Rules),
            "llm" => Ok(Self::Llm),
            other => Err(ConfigError::Validation(format!(
                "unsupported agent mode `{other}` (expected rules|llm)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("partsdesk.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(catalog) = patch.catalog {
            if let Some(products_path) = catalog.products_path {
                self.catalog.products_path = Some(products_path);
            }
            if let Some(guides_path) = catalog.guides_path {
                self.catalog.guides_path = Some(guides_path);
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(enabled) = llm.enabled {
                self.llm.enabled = enabled;
            }
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(llm_api_key_value) = llm.api_key {
                self.llm.api_key = Some(secret_value(llm_api_key_value));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = Some(base_url);
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
            if let Some(temperature) = llm.temperature {
                self.llm.temperature = temperature;
            }
            if let Some(max_tokens) = llm.max_tokens {
                self.llm.max_tokens = max_tokens;
            }
        }

        if let Some(agent) = patch.agent {
            if let Some(mode) = agent.mode {
                self.agent.mode = mode;
            }
            if let Some(context_window) = agent.context_window {
                self.agent.context_window = context_window;
            }
            if let Some(max_products) = agent.max_products {
                self.agent.max_products = max_products;
            }
        }

        if let Some(conversation) = patch.conversation {
            if let Some(max_conversations) = conversation.max_conversations {
                self.conversation.max_conversations = max_conversations;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
            if let Some(cors_origins) = server.cors_origins {
                self.server.cors_origins = cors_origins;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("PARTSDESK_CATALOG_PRODUCTS_PATH") {
            self.catalog.products_path = Some(PathBuf::from(value));
        }
        if let Some(value) = read_env("PARTSDESK_CATALOG_GUIDES_PATH") {
            self.catalog.guides_path = Some(PathBuf::from(value));
        }

        if let Some(value) = read_env("PARTSDESK_LLM_ENABLED") {
            self.llm.enabled = parse_bool("PARTSDESK_LLM_ENABLED", &value)?;
        }
        if let Some(value) = read_env("PARTSDESK_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        if let Some(value) = read_env("PARTSDESK_LLM_API_KEY") {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("PARTSDESK_LLM_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = read_env("PARTSDESK_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("PARTSDESK_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("PARTSDESK_LLM_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("PARTSDESK_LLM_TEMPERATURE") {
            self.llm.temperature = parse_f32("PARTSDESK_LLM_TEMPERATURE", &value)?;
        }
        if let Some(value) = read_env("PARTSDESK_LLM_MAX_TOKENS") {
            self.llm.max_tokens = parse_u32("PARTSDESK_LLM_MAX_TOKENS", &value)?;
        }

        if let Some(value) = read_env("PARTSDESK_AGENT_MODE") {
            self.agent.mode = value.parse()?;
        }
        if let Some(value) = read_env("PARTSDESK_AGENT_CONTEXT_WINDOW") {
            self.agent.context_window = parse_usize("PARTSDESK_AGENT_CONTEXT_WINDOW", &value)?;
        }
        if let Some(value) = read_env("PARTSDESK_AGENT_MAX_PRODUCTS") {
            self.agent.max_products = parse_usize("PARTSDESK_AGENT_MAX_PRODUCTS", &value)?;
        }

        if let Some(value) = read_env("PARTSDESK_CONVERSATION_MAX_CONVERSATIONS") {
            self.conversation.max_conversations =
                parse_usize("PARTSDESK_CONVERSATION_MAX_CONVERSATIONS", &value)?;
        }

        if let Some(value) = read_env("PARTSDESK_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("PARTSDESK_SERVER_PORT") {
            self.server.port = parse_u16("PARTSDESK_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("PARTSDESK_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("PARTSDESK_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }
        if let Some(value) = read_env("PARTSDESK_SERVER_CORS_ORIGINS") {
            self.server.cors_origins = value
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(str::to_string)
                .collect();
        }

        let log_level =
            read_env("PARTSDESK_LOGGING_LEVEL").or_else(|| read_env("PARTSDESK_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("PARTSDESK_LOGGING_FORMAT").or_else(|| read_env("PARTSDESK_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(enabled) = overrides.llm_enabled {
            self.llm.enabled = enabled;
        }
        if let Some(llm_provider) = overrides.llm_provider {
            self.llm.provider = llm_provider;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(agent_mode) = overrides.agent_mode {
            self.agent.mode = agent_mode;
        }
        if let Some(products_path) = overrides.products_path {
            self.catalog.products_path = Some(products_path);
        }
        if let Some(guides_path) = overrides.guides_path {
            self.catalog.guides_path = Some(guides_path);
        }
        if let Some(port) = overrides.server_port {
            self.server.port = port;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_llm(&self.llm)?;
        validate_agent(&self.agent, &self.llm)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("partsdesk.toml"), PathBuf::from("config/partsdesk.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if !(0.0..=2.0).contains(&llm.temperature) {
        return Err(ConfigError::Validation(
            "llm.temperature must be in range 0.0..=2.0".to_string(),
        ));
    }

    if llm.max_tokens == 0 {
        return Err(ConfigError::Validation(
            "llm.max_tokens must be greater than zero".to_string(),
        ));
    }

    if let Some(base_url) = &llm.base_url {
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::Validation(
                "llm.base_url must start with http:// or https://".to_string(),
            ));
        }
    }

    if llm.enabled && llm.provider.requires_api_key() {
        let missing = llm
            .api_key
            .as_ref()
            .map(|value| value.expose_secret().trim().is_empty())
            .unwrap_or(true);
        if missing {
            return Err(ConfigError::Validation(format!(
                "llm.api_key is required when llm.enabled is true for the {} provider",
                llm.provider.as_str()
            )));
        }
    }

    Ok(())
}

fn validate_agent(agent: &AgentConfig, llm: &LlmConfig) -> Result<(), ConfigError> {
    if agent.context_window == 0 {
        return Err(ConfigError::Validation(
            "agent.context_window must be greater than zero".to_string(),
        ));
    }

    if agent.max_products == 0 || agent.max_products > 5 {
        return Err(ConfigError::Validation(
            "agent.max_products must be in range 1..=5".to_string(),
        ));
    }

    if agent.mode == AgentMode::Llm && !llm.enabled {
        return Err(ConfigError::Validation(
            "agent.mode = \"llm\" requires llm.enabled = true".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn invalid_override(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() }
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| invalid_override(key, value))
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| invalid_override(key, value))
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| invalid_override(key, value))
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| invalid_override(key, value))
}

fn parse_f32(key: &str, value: &str) -> Result<f32, ConfigError> {
    value.parse::<f32>().map_err(|_| invalid_override(key, value))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| invalid_override(key, value))
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    catalog: Option<CatalogPatch>,
    llm: Option<LlmPatch>,
    agent: Option<AgentPatch>,
    conversation: Option<ConversationPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct CatalogPatch {
    products_path: Option<PathBuf>,
    guides_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    enabled: Option<bool>,
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct AgentPatch {
    mode: Option<AgentMode>,
    context_window: Option<usize>,
    max_products: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct ConversationPatch {
    max_conversations: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
    cors_origins: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{
        AgentMode, AppConfig, ConfigError, ConfigOverrides, LlmProvider, LoadOptions, LogFormat,
    };

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_run_rules_mode_without_llm() -> Result<(), String> {
        let config = AppConfig::default();
        config.validate().map_err(|err| err.to_string())?;

        ensure(config.agent.mode == AgentMode::Rules, "default mode should be rules")?;
        ensure(!config.llm.enabled, "llm should be disabled by default")?;
        ensure(config.agent.context_window == 10, "default context window should be 10")?;
        ensure(config.catalog.products_path.is_none(), "builtin catalog should be the default")?;
        ensure(
            config.llm.effective_base_url() == "http://localhost:11434/v1",
            "ollama base url should be used when none is configured",
        )
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_PARTSDESK_API_KEY", "sk-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("partsdesk.toml");
            fs::write(
                &path,
                r#"
[llm]
enabled = true
provider = "openrouter"
api_key = "${TEST_PARTSDESK_API_KEY}"
model = "deepseek/deepseek-chat"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.llm.provider == LlmProvider::OpenRouter,
                "provider should be openrouter",
            )?;
            ensure(
                config.llm.api_key.as_ref().map(|key| key.expose_secret() == "sk-from-env")
                    == Some(true),
                "api key should be loaded from environment",
            )?;
            ensure(
                config.llm.effective_base_url() == "https://openrouter.ai/api/v1",
                "openrouter endpoint should be used by default",
            )
        })();

        clear_vars(&["TEST_PARTSDESK_API_KEY"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("PARTSDESK_LOG_LEVEL", "warn");
        env::set_var("PARTSDESK_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )
        })();

        clear_vars(&["PARTSDESK_LOG_LEVEL", "PARTSDESK_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("PARTSDESK_SERVER_PORT", "9100");
        env::set_var("PARTSDESK_AGENT_CONTEXT_WINDOW", "6");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("partsdesk.toml");
            fs::write(
                &path,
                r#"
[catalog]
products_path = "from-file.json"

[server]
port = 9000

[agent]
context_window = 4

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    products_path: Some(PathBuf::from("from-override.json")),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.catalog.products_path == Some(PathBuf::from("from-override.json")),
                "override products path should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(config.server.port == 9100, "env port should win over file")?;
            ensure(config.agent.context_window == 6, "env context window should win over file")
        })();

        clear_vars(&["PARTSDESK_SERVER_PORT", "PARTSDESK_AGENT_CONTEXT_WINDOW"]);
        result
    }

    #[test]
    fn invalid_env_override_is_reported_with_key() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("PARTSDESK_CONVERSATION_MAX_CONVERSATIONS", "lots");

        let result = (|| -> Result<(), String> {
            match AppConfig::load(LoadOptions::default()) {
                Err(ConfigError::InvalidEnvOverride { key, .. }) => ensure(
                    key == "PARTSDESK_CONVERSATION_MAX_CONVERSATIONS",
                    "error should name the env var",
                ),
                Err(other) => Err(format!("unexpected error: {other}")),
                Ok(_) => Err("expected invalid override error".to_string()),
            }
        })();

        clear_vars(&["PARTSDESK_CONVERSATION_MAX_CONVERSATIONS"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("PARTSDESK_LLM_ENABLED", "true");
        env::set_var("PARTSDESK_LLM_PROVIDER", "openai");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("llm.api_key")
            );
            ensure(has_message, "validation failure should mention llm.api_key")
        })();

        clear_vars(&["PARTSDESK_LLM_ENABLED", "PARTSDESK_LLM_PROVIDER"]);
        result
    }

    #[test]
    fn llm_mode_requires_enabled_llm() {
        let mut config = AppConfig::default();
        config.agent.mode = AgentMode::Llm;

        let error = config.validate().expect_err("llm mode without llm should fail");
        assert!(error.to_string().contains("agent.mode"));
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("PARTSDESK_LLM_API_KEY", "sk-secret-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(!debug.contains("sk-secret-value"), "debug output should not contain api key")?;
            ensure(
                matches!(config.logging.format, LogFormat::Compact),
                "default logging format should be compact",
            )
        })();

        clear_vars(&["PARTSDESK_LLM_API_KEY"]);
        result
    }
}
