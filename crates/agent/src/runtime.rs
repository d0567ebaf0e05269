use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use partsdesk_core::config::{AgentMode, AppConfig};
use partsdesk_core::domain::conversation::{
    AgentResponse, ChatMessage, ChatRequest, ConversationId, ValidationError,
};
use partsdesk_core::domain::intent::{Intent, IntentType};
use partsdesk_core::domain::product::Product;
use partsdesk_core::search::SearchService;
use tracing::{debug, info, warn};

use crate::classifier::IntentClassifier;
use crate::composer::{suggested_actions, ComposedResponse, ResponseComposer};
use crate::conversation::ConversationStore;
use crate::guardrails::{ScopeDecision, ScopeGuard};
use crate::llm::{Completion, CompletionRequest, LlmClient, LlmMessage, ToolSchema};
use crate::lookup::{LookupResult, ProductLookup};
use crate::tools::{ToolExecutor, ToolKind};

pub const SYSTEM_PROMPT: &str = "You are a helpful customer service agent for an online appliance parts store that specializes in refrigerator and dishwasher parts.

Your responsibilities:
1. Help customers find the right parts for their appliances
2. Provide installation instructions and troubleshooting guidance
3. Check part compatibility with specific appliance models
4. Answer questions about products, pricing, and ordering

Important guidelines:
- ONLY discuss refrigerator and dishwasher parts. Politely decline questions about other appliances or unrelated topics.
- Be concise but informative. Use numbered lists (1., 2., 3.) for sequential steps.
- Use bullet points (starting with -) for non-sequential items.
- Always verify part numbers and model numbers when provided.
- When showing products, mention the part number, name, and price.
- For compatibility questions, always verify using the check_compatibility tool.
- If you don't have information, be honest and suggest contacting customer service.

Formatting:
- Use **bold** sparingly, for part numbers and important warnings only.
- Keep paragraphs short and put a blank line between sections.
- Give the direct answer first and next steps at the end.";

#[derive(Clone, Debug, PartialEq)]
pub struct RuntimeSettings {
    pub mode: AgentMode,
    pub context_window: usize,
    pub max_products: usize,
    pub temperature: f32,
    pub max_tokens: u32,
    pub llm_timeout: Duration,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl RuntimeSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            mode: config.agent.mode,
            context_window: config.agent.context_window,
            max_products: config.agent.max_products,
            temperature: config.llm.temperature,
            max_tokens: config.llm.max_tokens,
            llm_timeout: Duration::from_secs(config.llm.timeout_secs),
        }
    }
}

pub struct AgentRuntime {
    classifier: IntentClassifier,
    lookup: ProductLookup,
    composer: ResponseComposer,
    guard: ScopeGuard,
    tools: ToolExecutor,
    conversations: Arc<ConversationStore>,
    llm: Option<Arc<dyn LlmClient>>,
    settings: RuntimeSettings,
}

impl AgentRuntime {
    pub fn new(search: SearchService, settings: RuntimeSettings) -> Self {
        Self {
            classifier: IntentClassifier::new(),
            lookup: ProductLookup::new(search.clone()),
            composer: ResponseComposer::new(),
            guard: ScopeGuard::default(),
            tools: ToolExecutor::new(search),
            conversations: Arc::new(ConversationStore::unbounded()),
            llm: None,
            settings,
        }
    }

    /// Used for intent fallback always, and for replies when `mode = llm`.
    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.classifier = self.classifier.with_llm(Arc::clone(&llm), self.settings.llm_timeout);
        self.llm = Some(llm);
        self
    }

    pub fn with_conversation_store(mut self, conversations: Arc<ConversationStore>) -> Self {
        self.conversations = conversations;
        self
    }

    pub fn with_scope_guard(mut self, guard: ScopeGuard) -> Self {
        self.guard = guard;
        self
    }

    pub fn settings(&self) -> &RuntimeSettings {
        &self.settings
    }

    pub fn search(&self) -> &SearchService {
        self.lookup.search_service()
    }

    pub fn llm(&self) -> Option<&Arc<dyn LlmClient>> {
        self.llm.as_ref()
    }

    pub fn conversations(&self) -> &Arc<ConversationStore> {
        &self.conversations
    }

    pub async fn handle_message(
        &self,
        request: ChatRequest,
    ) -> Result<AgentResponse, ValidationError> {
        request.validate()?;

        let conversation_id = request
            .conversation_id
            .as_deref()
            .map(str::trim)
            .map(|id| ConversationId(id.to_string()))
            .unwrap_or_else(ConversationId::generate);
        let correlation_id = conversation_id.as_str();
        let message = request.message.as_str();

        if let Some(user_context) = &request.user_context {
            debug!(
                event_name = "agent.request.user_context",
                correlation_id,
                keys = ?user_context.keys().collect::<Vec<_>>(),
                "user context attached to request"
            );
        }

        let mut intent = self.classifier.classify(message).await;
        self.conversations.append(&conversation_id, ChatMessage::user(message)).await;

        let composed = match self.guard.evaluate(&intent, message) {
            ScopeDecision::Decline { reason_code, user_message, suggested_actions } => {
                if intent.intent_type != IntentType::OutOfScope {
                    intent = Intent::new(IntentType::OutOfScope, 0.9, intent.entities.clone());
                }
                info!(
                    event_name = "agent.scope.declined",
                    correlation_id,
                    reason_code,
                    "request declined"
                );
                ComposedResponse { message: user_message, products: Vec::new(), suggested_actions }
            }
            ScopeDecision::Allow => self.respond(&conversation_id, message, &intent).await,
        };

        let products = distinct_products(composed.products, self.settings.max_products);
        self.conversations
            .append(&conversation_id, ChatMessage::assistant(&composed.message))
            .await;

        info!(
            event_name = "agent.response.composed",
            correlation_id,
            intent = intent.intent_type.as_str(),
            products = products.len(),
            "response composed"
        );
        Ok(AgentResponse::new(
            composed.message,
            products,
            intent,
            composed.suggested_actions,
            conversation_id,
        ))
    }

    pub async fn clear_conversation(&self, conversation_id: &str) -> bool {
        self.conversations.clear(&ConversationId(conversation_id.trim().to_string())).await
    }

    pub async fn history(&self, conversation_id: &str) -> Vec<ChatMessage> {
        self.conversations.history(&ConversationId(conversation_id.trim().to_string())).await
    }

    async fn respond(
        &self,
        conversation_id: &ConversationId,
        message: &str,
        intent: &Intent,
    ) -> ComposedResponse {
        if let (AgentMode::Llm, Some(llm)) = (self.settings.mode, &self.llm) {
            match self.respond_with_llm(llm.as_ref(), conversation_id, intent).await {
                Ok(composed) => return composed,
                Err(error) => warn!(
                    event_name = "agent.llm.degraded",
                    correlation_id = conversation_id.as_str(),
                    error = %error,
                    "llm reply failed, falling back to rules pipeline"
                ),
            }
        }
        self.respond_with_rules(message, intent).await
    }

    async fn respond_with_rules(&self, message: &str, intent: &Intent) -> ComposedResponse {
        let result = self.lookup.resolve(message, intent).await;
        debug!(
            event_name = "agent.lookup.resolved",
            response_type = result.response_type(),
            "lookup resolved"
        );
        self.composer.compose(intent, &result)
    }

    async fn respond_with_llm(
        &self,
        llm: &dyn LlmClient,
        conversation_id: &ConversationId,
        intent: &Intent,
    ) -> Result<ComposedResponse> {
        let mut messages = vec![LlmMessage::system(SYSTEM_PROMPT)];
        messages.extend(
            self.conversations
                .context_window(conversation_id, self.settings.context_window)
                .await
                .iter()
                .map(LlmMessage::from),
        );

        let first = self.complete(llm, messages.clone(), ToolKind::schemas()).await?;
        if first.tool_calls.is_empty() {
            let text = first.text_content().ok_or_else(|| anyhow!("llm returned an empty reply"))?;
            return Ok(ComposedResponse {
                message: text.to_string(),
                products: Vec::new(),
                suggested_actions: suggested_actions(intent, &[]),
            });
        }

        messages.push(LlmMessage::assistant_tool_calls(
            first.content.clone(),
            first.tool_calls.clone(),
        ));
        let mut products = Vec::new();
        let mut failures = Vec::new();
        for call in &first.tool_calls {
            let output = self.tools.dispatch(&call.name, &call.arguments).await;
            debug!(
                event_name = "agent.tool.executed",
                correlation_id = conversation_id.as_str(),
                tool = call.name.as_str(),
                failed = output.is_error(),
                "tool call executed"
            );
            if output.is_error() {
                let detail =
                    output.payload["error"].as_str().unwrap_or("unknown error").to_string();
                failures.push((call.name.clone(), detail));
            }
            products.extend(output.products);
            messages.push(LlmMessage::tool_result(
                &call.id,
                &call.name,
                output.payload.to_string(),
            ));
        }

        let reply = self.complete(llm, messages, Vec::new()).await.and_then(|completion| {
            completion
                .text_content()
                .map(str::to_string)
                .ok_or_else(|| anyhow!("llm returned an empty reply after tool calls"))
        });

        match reply {
            Ok(text) => Ok(ComposedResponse {
                message: text,
                suggested_actions: suggested_actions(intent, &products),
                products,
            }),
            Err(_) if failures.len() == first.tool_calls.len() => {
                let (tool, detail) = failures.swap_remove(0);
                Ok(self.composer.compose(intent, &LookupResult::ToolFailure { tool, detail }))
            }
            Err(error) => Err(error),
        }
    }

    async fn complete(
        &self,
        llm: &dyn LlmClient,
        messages: Vec<LlmMessage>,
        tools: Vec<ToolSchema>,
    ) -> Result<Completion> {
        let request = CompletionRequest {
            messages,
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
            tools,
        };
        tokio::time::timeout(self.settings.llm_timeout, llm.chat_completion(request))
            .await
            .map_err(|_| anyhow!("llm call timed out after {:?}", self.settings.llm_timeout))?
    }
}

/// First occurrence of each part number, capped at `max`.
fn distinct_products(products: Vec<Product>, max: usize) -> Vec<Product> {
    let mut seen = HashSet::new();
    products
        .into_iter()
        .filter(|product| seen.insert(product.part_number.clone()))
        .take(max)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use partsdesk_core::catalog::Catalog;
    use partsdesk_core::config::AgentMode;
    use partsdesk_core::domain::conversation::{ChatRequest, Role, ValidationError};
    use partsdesk_core::domain::intent::IntentType;
    use partsdesk_core::search::SearchService;

    use super::{AgentRuntime, RuntimeSettings};
    use crate::composer::{OUT_OF_SCOPE_MESSAGE, SAFETY_NOTE};
    use crate::llm::testing::ScriptedLlm;
    use crate::llm::{Completion, LlmRole, ToolCall};

    fn runtime(mode: AgentMode) -> AgentRuntime {
        let catalog = Arc::new(Catalog::builtin().expect("builtin catalog"));
        let settings = RuntimeSettings { mode, ..RuntimeSettings::default() };
        AgentRuntime::new(SearchService::new(catalog), settings)
    }

    fn call(id: &str, name: &str, arguments: &str) -> ToolCall {
        ToolCall { id: id.to_string(), name: name.to_string(), arguments: arguments.to_string() }
    }

    #[tokio::test]
    async fn installation_question_gets_steps_and_safety_note() {
        let response = runtime(AgentMode::Rules)
            .handle_message(ChatRequest::new("How can I install PS11752778?"))
            .await
            .expect("valid request");

        assert_eq!(response.intent.intent_type, IntentType::Installation);
        assert_eq!(
            response.intent.entities.get("part_number").map(String::as_str),
            Some("PS11752778")
        );
        assert!(response.message.contains("\n1. "));
        assert!(response.message.ends_with(SAFETY_NOTE));
        assert_eq!(response.products.len(), 1);
        assert_eq!(response.suggested_actions[0], "Watch installation video");
    }

    #[tokio::test]
    async fn compatibility_question_answers_yes() {
        let response = runtime(AgentMode::Rules)
            .handle_message(ChatRequest::new("Is PS11752778 compatible with WDT780SAEM1?"))
            .await
            .expect("valid request");

        assert_eq!(response.intent.intent_type, IntentType::Compatibility);
        assert!(response.message.starts_with("Yes!"));
    }

    #[tokio::test]
    async fn unmatched_search_reports_no_matches() {
        let response = runtime(AgentMode::Rules)
            .handle_message(ChatRequest::new("find purple widget"))
            .await
            .expect("valid request");

        assert_eq!(response.intent.intent_type, IntentType::General);
        assert_eq!(response.intent.confidence, 0.5);
        assert!(response.message.starts_with("No matches found"));
        assert!(response.products.is_empty());
    }

    #[tokio::test]
    async fn other_appliances_are_declined_as_out_of_scope() {
        let response = runtime(AgentMode::Rules)
            .handle_message(ChatRequest::new("My washing machine is leaking"))
            .await
            .expect("valid request");

        assert_eq!(response.intent.intent_type, IntentType::OutOfScope);
        assert_eq!(response.message, OUT_OF_SCOPE_MESSAGE);
        assert_eq!(
            response.suggested_actions,
            vec!["Browse refrigerator parts", "Browse dishwasher parts"]
        );
    }

    #[tokio::test]
    async fn catalog_question_mentioning_another_appliance_is_answered() {
        let response = runtime(AgentMode::Rules)
            .handle_message(ChatRequest::new(
                "Is PS11752778 compatible with WDT780SAEM1? It's the unit next to my oven",
            ))
            .await
            .expect("valid request");

        assert_eq!(response.intent.intent_type, IntentType::Compatibility);
        assert!(response.message.starts_with("Yes!"));
    }

    #[tokio::test]
    async fn invalid_requests_are_rejected_before_the_pipeline() {
        let runtime = runtime(AgentMode::Rules);
        assert_eq!(
            runtime.handle_message(ChatRequest::new("  ")).await,
            Err(ValidationError::EmptyMessage)
        );
        assert!(runtime.conversations().is_empty().await);
    }

    #[tokio::test]
    async fn conversation_id_is_reused_and_history_recorded() {
        let runtime = runtime(AgentMode::Rules);
        let first = runtime.handle_message(ChatRequest::new("hello")).await.expect("first turn");
        let id = first.conversation_id.as_str().to_string();
        assert!(!id.is_empty());

        let second = runtime
            .handle_message(ChatRequest::in_conversation("What is the price of PS11752778?", &id))
            .await
            .expect("second turn");
        assert_eq!(second.conversation_id.as_str(), id);

        let history = runtime.history(&id).await;
        assert_eq!(history.len(), 4);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[1].role, Role::Assistant);

        assert!(runtime.clear_conversation(&id).await);
        assert!(runtime.history(&id).await.is_empty());
    }

    #[tokio::test]
    async fn llm_mode_runs_tools_then_final_completion() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            Ok(Completion::tools(vec![call(
                "call_1",
                "check_compatibility",
                r#"{"part_number":"PS11752778","model_number":"WDT780SAEM1"}"#,
            )])),
            Ok(Completion::text("Yes! That ice maker fits your WDT780SAEM1.")),
        ]));
        let runtime = runtime(AgentMode::Llm).with_llm(llm.clone());

        let response = runtime
            .handle_message(ChatRequest::new("Is PS11752778 compatible with WDT780SAEM1?"))
            .await
            .expect("valid request");

        assert_eq!(response.message, "Yes! That ice maker fits your WDT780SAEM1.");
        assert_eq!(response.products.len(), 1);
        assert_eq!(
            response.suggested_actions,
            vec!["View compatible models", "Find alternative parts"]
        );

        let requests = llm.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].tools.len(), 6);
        assert!(requests[1].tools.is_empty());
        let tool_message = requests[1].messages.last().expect("tool result");
        assert_eq!(tool_message.role, LlmRole::Tool);
        assert_eq!(tool_message.tool_call_id.as_deref(), Some("call_1"));
    }

    #[tokio::test]
    async fn llm_failure_degrades_to_rules() {
        let llm = Arc::new(ScriptedLlm::new(vec![Err("provider unavailable".to_string())]));
        let runtime = runtime(AgentMode::Llm).with_llm(llm);

        let response = runtime
            .handle_message(ChatRequest::new("Is PS11752778 compatible with WDT780SAEM1?"))
            .await
            .expect("valid request");
        assert!(response.message.starts_with("Yes!"));
    }

    #[tokio::test]
    async fn failed_tools_without_final_reply_explain_the_failure() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            Ok(Completion::tools(vec![call(
                "call_1",
                "get_product_by_part_number",
                r#"{"part_number":"PS00000000"}"#,
            )])),
            Err("provider unavailable".to_string()),
        ]));
        let runtime = runtime(AgentMode::Llm).with_llm(llm);

        let response = runtime
            .handle_message(ChatRequest::new("What is the price of PS00000000?"))
            .await
            .expect("valid request");
        assert!(response.message.starts_with(
            "Sorry, I ran into a problem while running the get_product_by_part_number lookup"
        ));
        assert!(response.products.is_empty());
    }

    #[tokio::test]
    async fn llm_sees_system_prompt_plus_latest_ten_messages() {
        let llm = Arc::new(ScriptedLlm::repeating_text("Here you go.", 15));
        let runtime = runtime(AgentMode::Llm).with_llm(llm.clone());

        let mut conversation_id = None;
        for _ in 0..15 {
            let request = match &conversation_id {
                Some(id) => ChatRequest::in_conversation("How do I install PS11752778?", id),
                None => ChatRequest::new("How do I install PS11752778?"),
            };
            let response = runtime.handle_message(request).await.expect("valid request");
            conversation_id = Some(response.conversation_id.as_str().to_string());
        }

        let requests = llm.requests();
        assert_eq!(requests.len(), 15);
        let last = requests.last().expect("last request");
        assert_eq!(last.messages.len(), 11);
        assert_eq!(last.messages[0].role, LlmRole::System);
        assert!(last.messages[1..].iter().all(|message| message.role != LlmRole::System));
        assert_eq!(last.messages[10].role, LlmRole::User);
    }

    #[test]
    fn duplicate_products_are_collapsed_and_capped() {
        let catalog = Catalog::builtin().expect("builtin catalog");
        let product = catalog.get("PS11752778").cloned().expect("product");
        let others = catalog.products().iter().take(6).cloned();
        let products = std::iter::once(product.clone()).chain(others).collect::<Vec<_>>();

        let distinct = super::distinct_products(products, 5);
        assert_eq!(distinct.len(), 5);
        assert_eq!(distinct.iter().filter(|p| p.part_number == product.part_number).count(), 1);
    }
}
