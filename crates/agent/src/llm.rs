use anyhow::Result;
use async_trait::async_trait;
use partsdesk_core::domain::conversation::{ChatMessage, Role};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmRole {
    System,
    User,
    Assistant,
    Tool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    /// JSON-encoded argument object, exactly as the model produced it.
    pub arguments: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LlmMessage {
    pub role: LlmRole,
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub tool_call_id: Option<String>,
    pub name: Option<String>,
}

impl LlmMessage {
    fn plain(role: LlmRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
            name: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(LlmRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(LlmRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(LlmRole::Assistant, content)
    }

    pub fn assistant_tool_calls(content: Option<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self { role: LlmRole::Assistant, content, tool_calls, tool_call_id: None, name: None }
    }

    pub fn tool_result(
        tool_call_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            role: LlmRole::Tool,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
            name: Some(name.into()),
        }
    }
}

impl From<&ChatMessage> for LlmMessage {
    fn from(message: &ChatMessage) -> Self {
        let role = match message.role {
            Role::User => LlmRole::User,
            Role::Assistant => LlmRole::Assistant,
            Role::System => LlmRole::System,
        };
        Self::plain(role, message.content.clone())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ToolSchema {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CompletionRequest {
    pub messages: Vec<LlmMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub tools: Vec<ToolSchema>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    ToolCalls,
    Length,
    Other(String),
}

impl FinishReason {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("stop") | None => Self::Stop,
            Some("tool_calls") | Some("function_call") => Self::ToolCalls,
            Some("length") => Self::Length,
            Some(other) => Self::Other(other.to_string()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Completion {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub finish_reason: FinishReason,
}

impl Completion {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            tool_calls: Vec::new(),
            finish_reason: FinishReason::Stop,
        }
    }

    pub fn tools(tool_calls: Vec<ToolCall>) -> Self {
        Self { content: None, tool_calls, finish_reason: FinishReason::ToolCalls }
    }

    /// Trimmed assistant text, if any was produced.
    pub fn text_content(&self) -> Option<&str> {
        self.content.as_deref().map(str::trim).filter(|content| !content.is_empty())
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn chat_completion(&self, request: CompletionRequest) -> Result<Completion>;

    fn model_name(&self) -> &str;

    fn provider_name(&self) -> &str;
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use anyhow::{anyhow, Result};
    use async_trait::async_trait;

    use super::{Completion, CompletionRequest, LlmClient};

    /// Replays queued completions in order and records every request it receives.
    #[derive(Default)]
    pub(crate) struct ScriptedLlm {
        replies: Mutex<VecDeque<Result<Completion, String>>>,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedLlm {
        pub(crate) fn new(replies: Vec<Result<Completion, String>>) -> Self {
            Self { replies: Mutex::new(replies.into()), requests: Mutex::new(Vec::new()) }
        }

        pub(crate) fn repeating_text(text: &str, times: usize) -> Self {
            Self::new((0..times).map(|_| Ok(Completion::text(text))).collect())
        }

        pub(crate) fn requests(&self) -> Vec<CompletionRequest> {
            self.requests.lock().map(|requests| requests.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn chat_completion(&self, request: CompletionRequest) -> Result<Completion> {
            if let Ok(mut requests) = self.requests.lock() {
                requests.push(request);
            }
            let next = self
                .replies
                .lock()
                .map_err(|_| anyhow!("scripted llm lock poisoned"))?
                .pop_front()
                .ok_or_else(|| anyhow!("scripted llm has no more replies"))?;
            next.map_err(|message| anyhow!(message))
        }

        fn model_name(&self) -> &str {
            "scripted"
        }

        fn provider_name(&self) -> &str {
            "test"
        }
    }
}

#[cfg(test)]
mod tests {
    use partsdesk_core::domain::conversation::ChatMessage;

    use super::{Completion, FinishReason, LlmMessage, LlmRole};

    #[test]
    fn finish_reason_maps_wire_values() {
        assert_eq!(FinishReason::parse(Some("tool_calls")), FinishReason::ToolCalls);
        assert_eq!(FinishReason::parse(Some("length")), FinishReason::Length);
        assert_eq!(FinishReason::parse(None), FinishReason::Stop);
        assert_eq!(
            FinishReason::parse(Some("content_filter")),
            FinishReason::Other("content_filter".to_string())
        );
    }

    #[test]
    fn chat_history_converts_role_and_content() {
        let message = LlmMessage::from(&ChatMessage::assistant("Yes! It fits."));
        assert_eq!(message.role, LlmRole::Assistant);
        assert_eq!(message.content.as_deref(), Some("Yes! It fits."));
        assert!(message.tool_calls.is_empty());
    }

    #[test]
    fn blank_completion_text_is_treated_as_missing() {
        assert_eq!(Completion::text("  \n").text_content(), None);
        assert_eq!(Completion::text(" hi ").text_content(), Some("hi"));
    }
}
