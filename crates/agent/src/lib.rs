//! Agent runtime for the parts support assistant.
//!
//! Each chat message flows through a fixed pipeline:
//! 1. **Classification** (`classifier`, `extract`) - regex rules first, LLM fallback
//! 2. **Scope check** (`guardrails`) - decline anything that isn't about refrigerator or
//!    dishwasher parts
//! 3. **Lookup** (`lookup`) - resolve the intent against the catalog
//! 4. **Composition** (`composer`) - render text and suggested actions
//!
//! With `agent.mode = "llm"` step 3 and 4 are replaced by an LLM tool-calling loop
//! (`llm`, `openai`, `tools`) that degrades back to the rules pipeline on any failure.
//! Conversation history lives in `conversation`; `runtime` wires it all together.
//!
//! The LLM never invents catalog facts: prices, compatibility and steps always come
//! from tool results or the catalog itself.

pub mod classifier;
pub mod composer;
pub mod conversation;
pub mod extract;
pub mod guardrails;
pub mod llm;
pub mod lookup;
pub mod openai;
pub mod runtime;
pub mod tools;

pub use classifier::IntentClassifier;
pub use conversation::{ConversationStore, EvictionPolicy, LeastRecentlyUsed};
pub use llm::LlmClient;
pub use openai::OpenAiCompatibleClient;
pub use runtime::{AgentRuntime, RuntimeSettings};
