//! HTTP Handlers

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use agent_core::{AgentError, ThreadId};
use portfolio_tools::{PortfolioError, tool_surface};

use crate::state::AppState;

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub variant: String,
    pub provider: String,
    pub provider_connected: bool,
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub message: String,
    pub user_id: String,
    #[serde(default)]
    pub thread_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub thread_id: String,
    pub response: Value,
    pub tool_calls: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, code: &str, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            code: code.into(),
        }),
    )
}

impl From<PortfolioError> for ErrorResponse {
    fn from(err: PortfolioError) -> Self {
        let error = match &err {
            PortfolioError::Agent(inner) => inner.user_message(),
            other => other.to_string(),
        };
        Self {
            error,
            code: error_code(&err).into(),
        }
    }
}

fn error_code(err: &PortfolioError) -> &'static str {
    match err {
        PortfolioError::Agent(AgentError::Timeout(_)) => "TIMEOUT",
        PortfolioError::Agent(AgentError::MaxIterations(_) | AgentError::Schema(_)) => "NO_ANSWER",
        PortfolioError::Agent(AgentError::RateLimited(_)) => "RATE_LIMITED",
        PortfolioError::Agent(AgentError::ThreadOwnership(_)) => "THREAD_CONFLICT",
        PortfolioError::Config(_) | PortfolioError::Agent(AgentError::Config(_)) => "CONFIG_ERROR",
        _ => "AGENT_ERROR",
    }
}

fn error_status(err: &PortfolioError) -> StatusCode {
    match error_code(err) {
        "TIMEOUT" => StatusCode::GATEWAY_TIMEOUT,
        "RATE_LIMITED" => StatusCode::TOO_MANY_REQUESTS,
        "THREAD_CONFLICT" => StatusCode::CONFLICT,
        "CONFIG_ERROR" => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_GATEWAY,
    }
}

// ============================================================================
// Router
// ============================================================================

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/tools", get(list_tools))
        .route("/api/ask", post(ask_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let provider_connected = state.provider.health_check().await.unwrap_or(false);

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        variant: state.variant.to_string(),
        provider: state.provider.name().to_string(),
        provider_connected,
    })
}

/// Tool surface and answer schema of the running variant
pub async fn list_tools(State(state): State<AppState>) -> Json<Value> {
    Json(tool_surface(state.variant))
}

/// One conversational turn
pub async fn ask_handler(
    State(state): State<AppState>,
    Json(payload): Json<AskRequest>,
) -> Result<Json<AskResponse>, ApiError> {
    if payload.message.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "EMPTY_MESSAGE", "message must not be empty"));
    }

    let thread_id = payload
        .thread_id
        .map_or_else(ThreadId::new, ThreadId::from_string);

    let output = state
        .advisor
        .ask(&payload.user_id, &thread_id, &payload.message)
        .await
        .map_err(|e| {
            tracing::error!(thread = %thread_id, error = %e, "ask failed");
            let status = error_status(&e);
            (status, Json(ErrorResponse::from(e)))
        })?;

    Ok(Json(AskResponse {
        thread_id: output.thread_id.to_string(),
        response: output.value,
        tool_calls: output.tool_calls,
    }))
}
