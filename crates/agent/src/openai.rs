//! OpenAI-compatible chat-completions client.
//!
//! The same wire format is served by OpenAI, OpenRouter and Ollama's `/v1` endpoint, so a
//! single client covers every configured provider. Requests are not retried here.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use partsdesk_core::config::LlmConfig;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::llm::{
    Completion, CompletionRequest, FinishReason, LlmClient, LlmMessage, LlmRole, ToolCall,
};

#[derive(Clone)]
pub struct OpenAiCompatibleClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<SecretString>,
    model: String,
    provider: &'static str,
}

impl OpenAiCompatibleClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build HTTP client for LLM provider")?;

        Ok(Self {
            client,
            base_url: config.effective_base_url(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            provider: config.provider.as_str(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    pub(crate) fn build_body(&self, request: &CompletionRequest) -> Value {
        let mut body = json!({
            "model": &self.model,
            "messages": request.messages.iter().map(WireMessage::from).collect::<Vec<_>>(),
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        });

        if !request.tools.is_empty() {
            body["tools"] = request
                .tools
                .iter()
                .map(|tool| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": tool.name,
                            "description": tool.description,
                            "parameters": &tool.parameters,
                        }
                    })
                })
                .collect();
            body["tool_choice"] = json!("auto");
        }

        body
    }
}

pub(crate) fn parse_response(raw: &str) -> Result<Completion> {
    let response: ApiResponse = serde_json::from_str(raw)
        .map_err(|error| anyhow!("failed to parse LLM response: {error}"))?;
    let choice =
        response.choices.into_iter().next().ok_or_else(|| anyhow!("LLM returned no choices"))?;

    let tool_calls = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|call| ToolCall {
            id: call.id,
            name: call.function.name,
            arguments: call.function.arguments,
        })
        .collect();

    Ok(Completion {
        content: choice.message.content,
        tool_calls,
        finish_reason: FinishReason::parse(choice.finish_reason.as_deref()),
    })
}

#[async_trait]
impl LlmClient for OpenAiCompatibleClient {
    async fn chat_completion(&self, request: CompletionRequest) -> Result<Completion> {
        let mut call = self.client.post(self.endpoint()).json(&self.build_body(&request));
        if let Some(api_key) = &self.api_key {
            call = call.bearer_auth(api_key.expose_secret());
        }

        let response =
            call.send().await.with_context(|| format!("{} request failed", self.provider))?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("{} API error {}: {}", self.provider, status, truncate(&body, 500)));
        }

        let text = response.text().await?;
        tracing::debug!(
            event_name = "agent.llm.response",
            provider = self.provider,
            bytes = text.len(),
            "llm response received"
        );
        parse_response(&text)
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn provider_name(&self) -> &str {
        self.provider
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: LlmRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<WireToolCall<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

impl<'a> From<&'a LlmMessage> for WireMessage<'a> {
    fn from(message: &'a LlmMessage) -> Self {
        Self {
            role: message.role,
            content: message.content.as_deref(),
            tool_calls: message
                .tool_calls
                .iter()
                .map(|call| WireToolCall {
                    id: &call.id,
                    kind: "function",
                    function: WireFunction { name: &call.name, arguments: &call.arguments },
                })
                .collect(),
            tool_call_id: message.tool_call_id.as_deref(),
            name: message.name.as_deref(),
        }
    }
}

#[derive(Serialize)]
struct WireToolCall<'a> {
    id: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunction<'a>,
}

#[derive(Serialize)]
struct WireFunction<'a> {
    name: &'a str,
    arguments: &'a str,
}

#[derive(Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
}

#[derive(Deserialize)]
struct ApiChoice {
    message: ApiMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ApiMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ApiToolCall>>,
}

#[derive(Deserialize)]
struct ApiToolCall {
    id: String,
    function: ApiFunction,
}

#[derive(Deserialize)]
struct ApiFunction {
    name: String,
    arguments: String,
}
