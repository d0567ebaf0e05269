use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use partsdesk_agent::AgentRuntime;
use serde::Serialize;

use crate::routes::{AppState, SERVICE_NAME};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub catalog: HealthCheck,
    pub llm: HealthCheck,
    pub checked_at: String,
}

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let catalog = catalog_check(&state.runtime);
    let ready = catalog.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: format!("{SERVICE_NAME} runtime initialized"),
        },
        catalog,
        llm: llm_check(&state.runtime),
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

fn catalog_check(runtime: &AgentRuntime) -> HealthCheck {
    let catalog = runtime.search().catalog();
    if catalog.is_empty() {
        HealthCheck { status: "degraded", detail: "catalog has no products".to_string() }
    } else {
        HealthCheck {
            status: "ready",
            detail: format!(
                "{} products, {} troubleshooting guides",
                catalog.len(),
                catalog.guides().len()
            ),
        }
    }
}

// Configuration only; the provider is not called from a health check.
fn llm_check(runtime: &AgentRuntime) -> HealthCheck {
    match runtime.llm() {
        Some(llm) => HealthCheck {
            status: "configured",
            detail: format!(
                "{} / {} (mode {})",
                llm.provider_name(),
                llm.model_name(),
                runtime.settings().mode.as_str()
            ),
        },
        None => HealthCheck { status: "disabled", detail: "rules pipeline only".to_string() },
    }
}
