mod exam;
mod form;
mod medication;
mod questions;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::agents::{AgentError, Agents};
use crate::middleware::{enforce_rate_limit, request_id, require_auth, AuthState, RateLimitState};

/// Request bytes allowed on top of the file cap for multipart framing.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub(crate) const API_KEY_MESSAGE: &str =
    "API key for Gemini not configured correctly. Please check the server configuration.";
pub(crate) const MODEL_UNAVAILABLE_MESSAGE: &str =
    "The AI model is not available. Please check the server logs for details.";

#[derive(Clone)]
pub struct AppState {
    pub agents: Agents,
    /// Largest exam upload accepted, in bytes.
    pub max_upload_bytes: usize,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct WelcomeData {
    message: &'static str,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct ModelsData {
    models: Vec<String>,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "validation_error" => StatusCode::BAD_REQUEST,
            "payload_too_large" => StatusCode::PAYLOAD_TOO_LARGE,
            "unprocessable_document" => StatusCode::UNPROCESSABLE_ENTITY,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

/// Maps an agent failure to a 500, rewriting key and model problems into
/// messages a client can act on.
pub(super) fn map_agent_error(request_id: String, context: &str, error: &AgentError) -> ApiError {
    tracing::error!(error = %error, context, "agent request failed");
    let message = if error.is_api_key_problem() {
        API_KEY_MESSAGE.to_owned()
    } else if error.is_model_unavailable() {
        MODEL_UNAVAILABLE_MESSAGE.to_owned()
    } else {
        format!("{context}: {error}")
    };
    ApiError::new(request_id, "upstream_error", message)
}

/// Rejects blank required fields with a `validation_error`.
pub(super) fn require_field<'a>(
    request_id: &str,
    name: &str,
    value: &'a str,
) -> Result<&'a str, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::new(
            request_id,
            "validation_error",
            format!("{name} must not be empty"),
        ));
    }
    Ok(trimmed)
}

fn build_cors(allowed_origin: HeaderValue) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(allowed_origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

fn medication_router(rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route(
            "/api/agents/medication-info",
            post(medication::medication_info),
        )
        .route(
            "/api/agents/medication-prices",
            post(medication::medication_prices),
        )
        .layer(axum::middleware::from_fn_with_state(
            rate_limit,
            enforce_rate_limit,
        ))
}

fn protected_router(
    auth: AuthState,
    rate_limit: RateLimitState,
    max_upload_bytes: usize,
) -> Router<AppState> {
    Router::new()
        .route(
            "/api/agents/analyze-exam",
            post(exam::analyze_exam).layer(DefaultBodyLimit::max(
                max_upload_bytes.saturating_add(MULTIPART_OVERHEAD_BYTES),
            )),
        )
        .route("/api/agents/exam-question", post(exam::exam_question))
        .route(
            "/api/agents/general-question",
            post(questions::general_question),
        )
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    rate_limit,
                    enforce_rate_limit,
                ))
                .layer(axum::middleware::from_fn_with_state(auth, require_auth)),
        )
}

pub fn build_app(
    state: AppState,
    auth: AuthState,
    rate_limit: RateLimitState,
    cors_origin: HeaderValue,
) -> Router {
    let public_routes = Router::new()
        .route("/", get(root))
        .route("/api/health", get(health))
        .route("/api/models", get(list_models));

    // Anonymous medication lookups must not drain the window of
    // authenticated routes.
    let medication_rate_limit = rate_limit.fresh_window();
    let max_upload_bytes = state.max_upload_bytes;
    Router::new()
        .merge(public_routes)
        .merge(medication_router(medication_rate_limit))
        .merge(protected_router(auth, rate_limit, max_upload_bytes))
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(request_id))
                .layer(TraceLayer::new_for_http())
                .layer(build_cors(cors_origin)),
        )
        .with_state(state)
}

async fn root() -> impl IntoResponse {
    Json(WelcomeData {
        message: "Welcome to Exam Mine API",
    })
}

async fn health() -> impl IntoResponse {
    Json(HealthData { status: "ok" })
}

async fn list_models(State(state): State<AppState>) -> impl IntoResponse {
    Json(ModelsData {
        models: state.agents.available_models().await,
    })
}

pub fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::new(120, Duration::from_secs(60))
}

#[cfg(test)]
mod test_support;
