use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use sage_agents::TutorAgent;
use sage_api::{build_router, ApiState};
use sage_constants::ConstantsTable;
use sage_llm::{Generator, ScriptedGenerator, TextGenerator};
use sage_observability::AppMetrics;
use sage_storage::Store;
use serde_json::json;
use tower::ServiceExt;

const API_KEY: &str = "test-sage-key";

fn app_with_replies(replies: &[&str]) -> Router {
    app_with(replies, 1000)
}

fn app_with(replies: &[&str], rate_limit_max: usize) -> Router {
    let metrics = AppMetrics::shared();
    let generator = Generator::Scripted(ScriptedGenerator::with_replies(replies.iter().copied()));
    let model_name = generator.model_name().to_string();
    let constants = ConstantsTable::builtin();

    let agent = Arc::new(TutorAgent::new(
        Arc::new(generator),
        constants.clone(),
        Arc::new(Store::memory()),
        metrics.clone(),
    ));

    build_router(ApiState {
        agent,
        metrics,
        constants,
        api_key: API_KEY.to_string(),
        limiter: sage_api::ClientRateLimiter::new(Duration::from_secs(60), rate_limit_max),
        model_name,
    })
}

fn post_json(uri: &str, body: serde_json::Value, with_key: bool) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if with_key {
        builder = builder.header("x-api-key", API_KEY);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let app = app_with_replies(&[]);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let parsed = body_json(response).await;
    assert_eq!(parsed.get("status").and_then(|v| v.as_str()), Some("ok"));
}

#[tokio::test]
async fn chat_requires_api_key() {
    let app = app_with_replies(&[]);

    let response = app
        .oneshot(post_json("/v1/chat", json!({ "text": "hello" }), false))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn math_chat_is_labeled_and_grounded() {
    let app = app_with_replies(&["Multiply the tens first, then adjust."]);

    let response = app
        .oneshot(post_json(
            "/v1/chat",
            json!({ "text": "Calculate 15 * 23" }),
            true,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let parsed = body_json(response).await;
    let reply_text = parsed
        .get("reply_text")
        .and_then(|v| v.as_str())
        .expect("reply_text should be present");

    assert!(reply_text.contains("Mathematics Help"));
    assert!(reply_text.contains("15 * 23 = 345"));
    assert_eq!(
        parsed.get("subject").and_then(|v| v.as_str()),
        Some("math")
    );
}

#[tokio::test]
async fn empty_chat_prompts_for_input_without_generation() {
    // Zero scripted replies: a generation call would surface as an apology.
    let app = app_with_replies(&[]);

    let response = app
        .oneshot(post_json("/v1/chat", json!({ "text": "   " }), true))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let parsed = body_json(response).await;
    let reply_text = parsed.get("reply_text").and_then(|v| v.as_str()).unwrap();
    assert!(reply_text.starts_with("Please ask me a question"));
}

#[tokio::test]
async fn eval_returns_value_and_typed_errors() {
    let app = app_with_replies(&[]);

    let ok = app
        .clone()
        .oneshot(post_json("/v1/eval", json!({ "expression": "2+2" }), true))
        .await
        .unwrap();
    assert_eq!(ok.status(), StatusCode::OK);
    let parsed = body_json(ok).await;
    assert_eq!(parsed.get("rendered").and_then(|v| v.as_str()), Some("4"));

    let sqrt = app
        .clone()
        .oneshot(post_json("/v1/eval", json!({ "expression": "√9" }), true))
        .await
        .unwrap();
    assert_eq!(sqrt.status(), StatusCode::OK);
    let parsed = body_json(sqrt).await;
    assert_eq!(parsed.get("rendered").and_then(|v| v.as_str()), Some("3"));

    let division = app
        .clone()
        .oneshot(post_json("/v1/eval", json!({ "expression": "10/0" }), true))
        .await
        .unwrap();
    assert_eq!(division.status(), StatusCode::BAD_REQUEST);
    let parsed = body_json(division).await;
    assert_eq!(
        parsed.get("error").and_then(|v| v.as_str()),
        Some("division_by_zero")
    );

    let injection = app
        .oneshot(post_json(
            "/v1/eval",
            json!({ "expression": "2;import os" }),
            true,
        ))
        .await
        .unwrap();
    assert_eq!(injection.status(), StatusCode::BAD_REQUEST);
    let parsed = body_json(injection).await;
    assert_eq!(
        parsed.get("error").and_then(|v| v.as_str()),
        Some("invalid_expression")
    );
}

#[tokio::test]
async fn constants_lookup_formats_records() {
    let app = app_with_replies(&[]);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/v1/constants/speed_of_light")
                .header("x-api-key", API_KEY)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let parsed = body_json(response).await;
    assert_eq!(
        parsed.get("formatted").and_then(|v| v.as_str()),
        Some("Speed Of Light: 299792458 m/s (Symbol: c)")
    );
}

#[tokio::test]
async fn unknown_constant_is_not_found() {
    let app = app_with_replies(&[]);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/v1/constants/warp_factor")
                .header("x-api-key", API_KEY)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn rate_limit_rejects_after_the_cap() {
    let app = app_with(&[], 1);

    let first = app
        .clone()
        .oneshot(post_json("/v1/eval", json!({ "expression": "1+1" }), true))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .oneshot(post_json("/v1/eval", json!({ "expression": "1+1" }), true))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
}
