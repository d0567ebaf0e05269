use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use partsdesk_agent::AgentRuntime;
use partsdesk_core::domain::conversation::{AgentResponse, ChatMessage, ChatRequest};
use partsdesk_core::errors::ApplicationError;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::health;

pub const SERVICE_NAME: &str = "partsdesk";

#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<AgentRuntime>,
}

#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: Option<AgentResponse>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ClearQuery {
    pub conversation_id: String,
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub success: bool,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ConversationHistory {
    pub conversation_id: String,
    pub messages: Vec<ChatMessage>,
}

pub fn router(runtime: Arc<AgentRuntime>, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health::health))
        .route("/api/chat", post(chat))
        .route("/api/conversation/clear", post(clear_conversation))
        .route("/api/conversation/{conversation_id}", get(get_conversation))
        .with_state(AppState { runtime })
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.iter().any(|origin| origin.trim() == "*") {
        return layer.allow_origin(Any);
    }

    let allowed = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
            Ok(value) => Some(value),
            Err(error) => {
                warn!(
                    event_name = "system.server.cors_origin_invalid",
                    correlation_id = "bootstrap",
                    origin = %origin,
                    error = %error,
                    "ignoring invalid CORS origin"
                );
                None
            }
        })
        .collect::<Vec<_>>();
    layer.allow_origin(allowed)
}

pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        status: "online",
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now().to_rfc3339(),
    })
}

pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> (StatusCode, Json<ChatResponse>) {
    let correlation_id = request.conversation_id.clone().unwrap_or_else(|| "new".to_string());
    match state.runtime.handle_message(request).await {
        Ok(response) => (
            StatusCode::OK,
            Json(ChatResponse { response: Some(response), success: true, error: None }),
        ),
        Err(error) => {
            let error = ApplicationError::from(error).into_interface(correlation_id);
            warn!(
                event_name = "system.server.chat_rejected",
                correlation_id = error.correlation_id(),
                error = %error,
                "chat request rejected"
            );
            (
                StatusCode::BAD_REQUEST,
                Json(ChatResponse {
                    response: None,
                    success: false,
                    error: Some(error.client_detail()),
                }),
            )
        }
    }
}

pub async fn clear_conversation(
    State(state): State<AppState>,
    Query(query): Query<ClearQuery>,
) -> Json<ClearResponse> {
    state.runtime.clear_conversation(&query.conversation_id).await;
    Json(ClearResponse { success: true, message: "Conversation cleared" })
}

pub async fn get_conversation(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
) -> Json<ConversationHistory> {
    let messages = state.runtime.history(&conversation_id).await;
    Json(ConversationHistory { conversation_id, messages })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        extract::{Path, Query, State},
        http::{Request, StatusCode},
        Json,
    };
    use partsdesk_agent::{AgentRuntime, RuntimeSettings};
    use partsdesk_core::catalog::Catalog;
    use partsdesk_core::domain::conversation::ChatRequest;
    use partsdesk_core::search::SearchService;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::{chat, clear_conversation, get_conversation, router, AppState, ClearQuery};

    fn runtime() -> Arc<AgentRuntime> {
        let catalog = Arc::new(Catalog::builtin().expect("builtin catalog"));
        Arc::new(AgentRuntime::new(SearchService::new(catalog), RuntimeSettings::default()))
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), 1024 * 1024).await.expect("body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn chat_returns_agent_response() {
        let state = AppState { runtime: runtime() };
        let (status, Json(payload)) =
            chat(State(state), Json(ChatRequest::new("How can I install PS11752778?"))).await;

        assert_eq!(status, StatusCode::OK);
        assert!(payload.success);
        let response = payload.response.expect("agent response");
        assert_eq!(response.intent.intent_type.as_str(), "installation");
        assert!(response.message.contains("1. "));
    }

    #[tokio::test]
    async fn chat_rejects_empty_message_with_bad_request() {
        let state = AppState { runtime: runtime() };
        let (status, Json(payload)) = chat(State(state), Json(ChatRequest::new("   "))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!payload.success);
        assert!(payload.response.is_none());
        assert_eq!(payload.error.as_deref(), Some("message must not be empty"));
    }

    #[tokio::test]
    async fn conversation_history_and_clear() {
        let runtime = runtime();
        let state = AppState { runtime: Arc::clone(&runtime) };
        let (_, Json(payload)) =
            chat(State(state.clone()), Json(ChatRequest::new("hello"))).await;
        let id = payload.response.expect("response").conversation_id.as_str().to_string();

        let Json(history) = get_conversation(State(state.clone()), Path(id.clone())).await;
        assert_eq!(history.messages.len(), 2);

        let query = Query(ClearQuery { conversation_id: id.clone() });
        let Json(cleared) = clear_conversation(State(state.clone()), query).await;
        assert!(cleared.success);

        let Json(history) = get_conversation(State(state), Path(id)).await;
        assert!(history.messages.is_empty());
    }

    #[tokio::test]
    async fn router_serves_root_and_chat_over_http() {
        let app = router(runtime(), &["http://localhost:3000".to_string()]);

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "online");

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/chat")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"message":"find purple widget"}"#))
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["response"]["intent"]["intent_type"], "general");
        assert_eq!(body["response"]["products"].as_array().map(Vec::len), Some(0));
    }

    #[tokio::test]
    async fn router_clear_uses_query_parameter_and_unknown_history_is_empty() {
        let app = router(runtime(), &["*".to_string()]);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/conversation/clear?conversation_id=abc")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["message"], "Conversation cleared");

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/conversation/abc")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        let body = json_body(response).await;
        assert_eq!(body["conversation_id"], "abc");
        assert_eq!(body["messages"].as_array().map(Vec::len), Some(0));
    }
}
