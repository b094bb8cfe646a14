//! # Agent API
//!
//! The synchronous front door: one task in, one result out.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::api::SharedState;

/// Task submitted to the agent
#[derive(Debug, Deserialize, ToSchema)]
pub struct AgentRequest {
    /// Natural-language task, e.g. "Analyze the style of @creator"
    pub input: String,
}

/// Either the agent's output or the error that stopped it. Never both.
#[derive(Debug, Serialize, ToSchema, PartialEq, Eq)]
#[serde(untagged)]
pub enum AgentResponse {
    Output { output: String },
    Error { error: String },
}

impl AgentResponse {
    fn from_result(result: anyhow::Result<String>) -> Self {
        match result {
            Ok(output) => AgentResponse::Output { output },
            Err(e) => AgentResponse::Error {
                error: e.to_string(),
            },
        }
    }
}

/// Run a task through the agent
#[utoipa::path(
    post,
    path = "/agent",
    tag = "agent",
    request_body = AgentRequest,
    responses(
        (status = 200, description = "Agent output, or the error as a string", body = AgentResponse)
    )
)]
pub async fn run_agent(
    State(state): State<SharedState>,
    request: Result<Json<AgentRequest>, JsonRejection>,
) -> Json<AgentResponse> {
    let Json(request) = match request {
        Ok(request) => request,
        Err(rejection) => {
            warn!(error = %rejection, "rejected agent request");
            return Json(AgentResponse::Error {
                error: rejection.body_text(),
            });
        }
    };

    if request.input.trim().is_empty() {
        return Json(AgentResponse::Error {
            error: "input must not be empty".to_string(),
        });
    }

    info!(chars = request.input.len(), "agent request");
    let response = AgentResponse::from_result(state.runner.run(&request.input).await);
    if let AgentResponse::Error { error } = &response {
        warn!(%error, "agent request failed");
    }
    Json(response)
}
