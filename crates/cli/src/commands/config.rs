use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use partsdesk_core::config::{AppConfig, LoadOptions};
use secrecy::{ExposeSecret, SecretString};
use toml::Value;

use crate::commands::{CommandResult, EXIT_CONFIG};

struct Field {
    key: &'static str,
    env_keys: &'static [&'static str],
    value: String,
}

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            let message = error.to_string();
            return CommandResult::failure("config", "config_validation", message, EXIT_CONFIG);
        }
    };

    let file_path = detect_config_path();
    let file_doc = load_config_file_doc(file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in fields(&config) {
        let source = field_source(&field, file_doc.as_ref(), file_path.as_deref());
        lines.push(format!("- {} = {} (source: {source})", field.key, field.value));
    }
    CommandResult { exit_code: 0, output: lines.join("\n") }
}

fn fields(config: &AppConfig) -> Vec<Field> {
    let path_or_builtin = |path: &Option<PathBuf>| {
        path.as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "<builtin>".to_string())
    };

    vec![
        Field {
            key: "catalog.products_path",
            env_keys: &["PARTSDESK_CATALOG_PRODUCTS_PATH"],
            value: path_or_builtin(&config.catalog.products_path),
        },
        Field {
            key: "catalog.guides_path",
            env_keys: &["PARTSDESK_CATALOG_GUIDES_PATH"],
            value: path_or_builtin(&config.catalog.guides_path),
        },
        Field {
            key: "llm.enabled",
            env_keys: &["PARTSDESK_LLM_ENABLED"],
            value: config.llm.enabled.to_string(),
        },
        Field {
            key: "llm.provider",
            env_keys: &["PARTSDESK_LLM_PROVIDER"],
            value: config.llm.provider.as_str().to_string(),
        },
        Field {
            key: "llm.model",
            env_keys: &["PARTSDESK_LLM_MODEL"],
            value: config.llm.model.clone(),
        },
        Field {
            key: "llm.base_url",
            env_keys: &["PARTSDESK_LLM_BASE_URL"],
            value: config.llm.base_url.clone().unwrap_or_else(|| "<unset>".to_string()),
        },
        Field {
            key: "llm.api_key",
            env_keys: &["PARTSDESK_LLM_API_KEY"],
            value: config
                .llm
                .api_key
                .as_ref()
                .map(redact_key)
                .unwrap_or_else(|| "<unset>".to_string()),
        },
        Field {
            key: "llm.timeout_secs",
            env_keys: &["PARTSDESK_LLM_TIMEOUT_SECS"],
            value: config.llm.timeout_secs.to_string(),
        },
        Field {
            key: "agent.mode",
            env_keys: &["PARTSDESK_AGENT_MODE"],
            value: config.agent.mode.as_str().to_string(),
        },
        Field {
            key: "agent.context_window",
            env_keys: &["PARTSDESK_AGENT_CONTEXT_WINDOW"],
            value: config.agent.context_window.to_string(),
        },
        Field {
            key: "agent.max_products",
            env_keys: &["PARTSDESK_AGENT_MAX_PRODUCTS"],
            value: config.agent.max_products.to_string(),
        },
        Field {
            key: "conversation.max_conversations",
            env_keys: &["PARTSDESK_CONVERSATION_MAX_CONVERSATIONS"],
            value: config.conversation.max_conversations.to_string(),
        },
        Field {
            key: "server.bind_address",
            env_keys: &["PARTSDESK_SERVER_BIND_ADDRESS"],
            value: config.server.bind_address.clone(),
        },
        Field {
            key: "server.port",
            env_keys: &["PARTSDESK_SERVER_PORT"],
            value: config.server.port.to_string(),
        },
        Field {
            key: "logging.level",
            env_keys: &["PARTSDESK_LOGGING_LEVEL", "PARTSDESK_LOG_LEVEL"],
            value: config.logging.level.clone(),
        },
        Field {
            key: "logging.format",
            env_keys: &["PARTSDESK_LOGGING_FORMAT", "PARTSDESK_LOG_FORMAT"],
            value: format!("{:?}", config.logging.format).to_lowercase(),
        },
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("partsdesk.toml"), PathBuf::from("config/partsdesk.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let raw = fs::read_to_string(path?).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(field: &Field, file_doc: Option<&Value>, file_path: Option<&Path>) -> String {
    if let Some(env_key) = field.env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if file_doc.is_some_and(|doc| contains_path(doc, field.key)) {
        let file_path = file_path
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "config file".to_string());
        return format!("file ({file_path})");
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn redact_key(key: &SecretString) -> String {
    let trimmed = key.expose_secret().trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    match trimmed.split_once('-') {
        Some((prefix, _)) => format!("{prefix}-***"),
        None => "<redacted>".to_string(),
    }
}
