mod rate_limit;

use std::env;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::extract::{Json, Path as AxumPath, Query, State};
use axum::http::{header, HeaderName, Method, Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{body::Body, Router};
use sage_agents::TutorAgent;
use sage_calc::{evaluate, format_number, EvalError};
use sage_constants::{format_constant, ConstantsTable};
use sage_core::ChatInput;
use sage_llm::{Generator, TextGenerator};
use sage_observability::AppMetrics;
use sage_storage::Store;
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

pub use crate::rate_limit::ClientRateLimiter;

#[derive(Clone)]
pub struct ApiState {
    pub agent: Arc<TutorAgent<Generator, Store>>,
    pub metrics: Arc<AppMetrics>,
    pub constants: ConstantsTable,
    pub api_key: String,
    pub limiter: ClientRateLimiter,
    pub model_name: String,
}

pub async fn build_app() -> Result<Router> {
    let metrics = AppMetrics::shared();

    let generator = Generator::from_env()?;
    let model_name = generator.model_name().to_string();

    let constants = match env::var("SAGE_CONSTANTS_PATH") {
        Ok(path) => ConstantsTable::from_json_file(&path)?,
        Err(_) => ConstantsTable::builtin(),
    };

    let store = if let Ok(database_url) = env::var("SAGE_DATABASE_URL") {
        Store::sqlite(&database_url).await?
    } else {
        Store::memory()
    };

    let agent = Arc::new(TutorAgent::new(
        Arc::new(generator),
        constants.clone(),
        Arc::new(store),
        metrics.clone(),
    ));

    let api_key = env::var("SAGE_API_KEY").unwrap_or_else(|_| "dev-sage-key".to_string());
    let rate_limit_window = Duration::from_secs(
        env::var("SAGE_API_RATE_LIMIT_WINDOW_SECONDS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(60),
    );
    let rate_limit_max = env::var("SAGE_API_RATE_LIMIT_MAX")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(80);

    let state = ApiState {
        agent,
        metrics,
        constants,
        api_key,
        limiter: ClientRateLimiter::new(rate_limit_window, rate_limit_max),
        model_name,
    };

    Ok(build_router(state))
}

pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/chat", post(chat))
        .route("/v1/eval", post(eval))
        .route("/v1/constants", get(constants_list))
        .route("/v1/constants/:name", get(constant_get))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE, HeaderName::from_static("x-api-key")]),
        )
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(64 * 1024))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api_key_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .with_state(state)
}

fn is_public_endpoint(path: &str) -> bool {
    path == "/health"
}

async fn api_key_middleware(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS || is_public_endpoint(request.uri().path()) {
        return next.run(request).await;
    }

    let header_key = request
        .headers()
        .get("x-api-key")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    if header_key != state.api_key {
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({
                "error": "unauthorized",
                "message": "missing or invalid x-api-key"
            })),
        )
            .into_response();
    }

    next.run(request).await
}

async fn rate_limit_middleware(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let client = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .unwrap_or("local")
        .trim()
        .to_string();

    if !state.limiter.allow(&client) {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(serde_json::json!({
                "error": "rate_limited",
                "message": "too many requests, slow down"
            })),
        )
            .into_response();
    }

    next.run(request).await
}

async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "ok",
            "timestamp_utc": chrono::Utc::now().to_rfc3339(),
            "model": state.model_name,
            "metrics": state.metrics.snapshot(),
        })),
    )
}

#[derive(Debug, Clone, Deserialize)]
struct ChatRequest {
    session_id: Option<String>,
    text: String,
    user_id: Option<String>,
}

async fn chat(
    State(state): State<ApiState>,
    Json(request): Json<ChatRequest>,
) -> impl IntoResponse {
    let reply = state
        .agent
        .handle_chat(ChatInput {
            session_id: request.session_id,
            text: request.text,
            user_id: request.user_id,
        })
        .await;

    (StatusCode::OK, Json(reply))
}

#[derive(Debug, Clone, Deserialize)]
struct EvalRequest {
    expression: String,
}

async fn eval(
    State(_state): State<ApiState>,
    Json(request): Json<EvalRequest>,
) -> impl IntoResponse {
    match evaluate(&request.expression) {
        Ok(value) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "expression": request.expression,
                "value": value,
                "rendered": format_number(value),
            })),
        ),
        Err(error) => {
            let code = match error {
                EvalError::InvalidExpression(_) => "invalid_expression",
                EvalError::DivisionByZero => "division_by_zero",
                EvalError::NegativeSqrt => "negative_sqrt",
            };
            (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({
                    "error": code,
                    "message": error.to_string(),
                })),
            )
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ConstantsQuery {
    search: Option<String>,
}

async fn constants_list(
    State(state): State<ApiState>,
    Query(query): Query<ConstantsQuery>,
) -> impl IntoResponse {
    let records = match query.search.as_deref() {
        Some(keyword) => state.constants.search(keyword),
        None => state
            .constants
            .names()
            .into_iter()
            .filter_map(|name| {
                state
                    .constants
                    .get(&name)
                    .cloned()
                    .map(|record| (name, record))
            })
            .collect(),
    };

    let payload = records
        .into_iter()
        .map(|(name, record)| {
            serde_json::json!({
                "name": name,
                "formatted": format_constant(&name, &record),
                "value": record.value,
                "unit": record.unit,
                "symbol": record.symbol,
            })
        })
        .collect::<Vec<_>>();

    (StatusCode::OK, Json(serde_json::json!({ "constants": payload })))
}

async fn constant_get(
    State(state): State<ApiState>,
    AxumPath(name): AxumPath<String>,
) -> impl IntoResponse {
    match state.constants.get(&name) {
        Some(record) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "name": name,
                "formatted": format_constant(&name.trim().to_lowercase().replace(' ', "_"), record),
                "value": record.value,
                "unit": record.unit,
                "symbol": record.symbol,
            })),
        )
            .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({
                "error": "unknown_constant",
                "message": format!("no constant named {name}"),
            })),
        )
            .into_response(),
    }
}
