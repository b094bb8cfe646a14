//! # HTTP API
//!
//! Routes for the synchronous front door plus its OpenAPI document.
//!
//! A2A discovery and JSON-RPC are served by radkit's runtime (`influenxers a2a`).

pub mod agent;

use axum::{
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use influenxers_core::TaskRunner;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

/// Application state
pub struct AppState {
    pub runner: Arc<dyn TaskRunner>,
}

pub type SharedState = Arc<AppState>;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Influenxers API",
        version = "1.0.0",
        description = "Influencer video marketing agent"
    ),
    paths(agent::run_agent),
    components(schemas(agent::AgentRequest, agent::AgentResponse)),
    tags((name = "agent", description = "Run tasks through the agent"))
)]
struct ApiDoc;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/agent", post(agent::run_agent))
        .route("/health", get(health))
        .route("/api/v1/openapi.json", get(serve_openapi))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

async fn serve_openapi() -> impl IntoResponse {
    let spec = ApiDoc::openapi().to_json().unwrap_or_default();
    ([(header::CONTENT_TYPE, "application/json")], spec)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_documents_agent_route() {
        let spec = ApiDoc::openapi().to_json().unwrap();
        assert!(spec.contains("\"/agent\""));
        assert!(spec.contains("AgentRequest"));
    }
}
