//! In-memory conversation history keyed by conversation id.
//!
//! The store is bounded by `conversation.max_conversations` (0 = unbounded). When a new
//! conversation would exceed the bound, an [`EvictionPolicy`] picks which one to drop.

use std::collections::HashMap;

use partsdesk_core::domain::conversation::{ChatMessage, ConversationId, Role};
use tokio::sync::RwLock;

/// What eviction policies see about each stored conversation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConversationSummary {
    pub id: ConversationId,
    /// Monotonic store tick of the last append; larger is more recent.
    pub last_touched: u64,
    pub messages: usize,
}

pub trait EvictionPolicy: Send + Sync {
    fn select_victim(&self, conversations: &[ConversationSummary]) -> Option<ConversationId>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct LeastRecentlyUsed;

impl EvictionPolicy for LeastRecentlyUsed {
    fn select_victim(&self, conversations: &[ConversationSummary]) -> Option<ConversationId> {
        conversations
            .iter()
            .min_by_key(|conversation| conversation.last_touched)
            .map(|conversation| conversation.id.clone())
    }
}

struct Conversation {
    messages: Vec<ChatMessage>,
    last_touched: u64,
}

#[derive(Default)]
struct StoreState {
    conversations: HashMap<ConversationId, Conversation>,
    tick: u64,
}

pub struct ConversationStore {
    state: RwLock<StoreState>,
    capacity: Option<usize>,
    policy: Box<dyn EvictionPolicy>,
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl ConversationStore {
    pub fn unbounded() -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            capacity: None,
            policy: Box::new(LeastRecentlyUsed),
        }
    }

    /// `max_conversations == 0` means unbounded.
    pub fn with_capacity(max_conversations: usize) -> Self {
        Self { capacity: (max_conversations > 0).then_some(max_conversations), ..Self::unbounded() }
    }

    pub fn with_policy(mut self, policy: impl EvictionPolicy + 'static) -> Self {
        self.policy = Box::new(policy);
        self
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub async fn append(&self, id: &ConversationId, message: ChatMessage) {
        let mut state = self.state.write().await;
        state.tick += 1;
        let tick = state.tick;

        if !state.conversations.contains_key(id) {
            self.make_room(&mut state);
        }

        let conversation = state
            .conversations
            .entry(id.clone())
            .or_insert_with(|| Conversation { messages: Vec::new(), last_touched: tick });
        conversation.messages.push(message);
        conversation.last_touched = tick;
    }

    fn make_room(&self, state: &mut StoreState) {
        let Some(capacity) = self.capacity else {
            return;
        };

        while state.conversations.len() >= capacity {
            let summaries = state
                .conversations
                .iter()
                .map(|(id, conversation)| ConversationSummary {
                    id: id.clone(),
                    last_touched: conversation.last_touched,
                    messages: conversation.messages.len(),
                })
                .collect::<Vec<_>>();

            let Some(victim) = self.policy.select_victim(&summaries) else {
                break;
            };
            if state.conversations.remove(&victim).is_none() {
                break;
            }
            tracing::debug!(
                event_name = "agent.conversation.evicted",
                correlation_id = %victim.as_str(),
                "conversation evicted to stay within capacity"
            );
        }
    }

    /// Full history, oldest first; empty for unknown ids.
    pub async fn history(&self, id: &ConversationId) -> Vec<ChatMessage> {
        let state = self.state.read().await;
        state
            .conversations
            .get(id)
            .map(|conversation| conversation.messages.clone())
            .unwrap_or_default()
    }

    /// The most recent `window` non-system messages, oldest first.
    pub async fn context_window(&self, id: &ConversationId, window: usize) -> Vec<ChatMessage> {
        let state = self.state.read().await;
        let Some(conversation) = state.conversations.get(id) else {
            return Vec::new();
        };

        let mut recent = conversation
            .messages
            .iter()
            .rev()
            .filter(|message| message.role != Role::System)
            .take(window)
            .cloned()
            .collect::<Vec<_>>();
        recent.reverse();
        recent
    }

    /// Returns whether anything was removed.
    pub async fn clear(&self, id: &ConversationId) -> bool {
        self.state.write().await.conversations.remove(id).is_some()
    }

    pub async fn contains(&self, id: &ConversationId) -> bool {
        self.state.read().await.conversations.contains_key(id)
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.conversations.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
