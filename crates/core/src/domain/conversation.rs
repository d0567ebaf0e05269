use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::intent::Intent;
use crate::domain::product::Product;

pub const MAX_MESSAGE_CHARS: usize = 2000;
pub const MAX_RESPONSE_PRODUCTS: usize = 5;
pub const MAX_SUGGESTED_ACTIONS: usize = 3;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into(), timestamp: Some(Utc::now()) }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into(), timestamp: Some(Utc::now()) }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into(), timestamp: Some(Utc::now()) }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("message must not be empty")]
    EmptyMessage,
    #[error("message is {length} characters long (maximum {max})")]
    MessageTooLong { length: usize, max: usize },
    #[error("conversation_id must not be blank")]
    BlankConversationId,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub user_context: Option<Map<String, Value>>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), ..Self::default() }
    }

    pub fn in_conversation(message: impl Into<String>, conversation_id: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            conversation_id: Some(conversation_id.into()),
            user_context: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.message.trim().is_empty() {
            return Err(ValidationError::EmptyMessage);
        }

        let length = self.message.chars().count();
        if length > MAX_MESSAGE_CHARS {
            return Err(ValidationError::MessageTooLong { length, max: MAX_MESSAGE_CHARS });
        }

        if matches!(&self.conversation_id, Some(id) if id.trim().is_empty()) {
            return Err(ValidationError::BlankConversationId);
        }

        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentResponse {
    pub message: String,
    pub products: Vec<Product>,
    pub intent: Intent,
    pub suggested_actions: Vec<String>,
    pub conversation_id: ConversationId,
}

impl AgentResponse {
    pub fn new(
        message: String,
        mut products: Vec<Product>,
        intent: Intent,
        mut suggested_actions: Vec<String>,
        conversation_id: ConversationId,
    ) -> Self {
        products.truncate(MAX_RESPONSE_PRODUCTS);
        suggested_actions.truncate(MAX_SUGGESTED_ACTIONS);
        Self { message, products, intent, suggested_actions, conversation_id }
    }
}

#[cfg(test)]
mod tests {
    use super::{ChatRequest, ValidationError, MAX_MESSAGE_CHARS};

    #[test]
    fn validate_rejects_empty_and_whitespace_messages() {
        assert_eq!(ChatRequest::new("").validate(), Err(ValidationError::EmptyMessage));
        assert_eq!(ChatRequest::new("   \n").validate(), Err(ValidationError::EmptyMessage));
    }

    #[test]
    fn validate_counts_characters_not_bytes() {
        let at_limit = "é".repeat(MAX_MESSAGE_CHARS);
        assert_eq!(ChatRequest::new(at_limit).validate(), Ok(()));

        let over_limit = "a".repeat(MAX_MESSAGE_CHARS + 1);
        assert_eq!(
            ChatRequest::new(over_limit).validate(),
            Err(ValidationError::MessageTooLong {
                length: MAX_MESSAGE_CHARS + 1,
                max: MAX_MESSAGE_CHARS
            })
        );
    }

    #[test]
    fn validate_rejects_blank_conversation_id() {
        let request = ChatRequest::in_conversation("hello", " ");
        assert_eq!(request.validate(), Err(ValidationError::BlankConversationId));
    }
}
