//! Router harness shared by the integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{HeaderMap, Request, StatusCode},
    Router,
};
use serde_json::Value as JsonValue;
use ticketbridge_api::{
    build_router, ApiConfig, AppState, AuthConfig, CacheConfig, InMemoryHelpdesk,
};
use ticketbridge_core::{Clock, ManualClock};
use ticketbridge_test_utils::sign_body;
use tower::ServiceExt;

pub const TOKEN: &str = "integration-test-token";
pub const WEBHOOK_SECRET: &str = "integration-webhook-secret";
pub const HELPDESK_URL: &str = "http://helpdesk.test";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub helpdesk: Arc<InMemoryHelpdesk>,
    pub clock: Arc<ManualClock>,
}

fn build(auth: AuthConfig) -> TestApp {
    let clock = Arc::new(ManualClock::default());
    let helpdesk = Arc::new(InMemoryHelpdesk::new(HELPDESK_URL, clock.clone()));
    let api_config = ApiConfig {
        rate_limit_enabled: false,
        ..ApiConfig::default()
    };
    let state = AppState::new(
        api_config,
        auth,
        CacheConfig::default(),
        helpdesk.clone(),
        clock.clone(),
    );

    TestApp {
        router: build_router(state.clone(), true),
        state,
        helpdesk,
        clock,
    }
}

/// App authenticating with `x-auth-token: TOKEN`.
pub fn shared_secret_app() -> TestApp {
    build(AuthConfig::shared_secret(TOKEN))
}

/// App verifying HMAC signatures made with `WEBHOOK_SECRET`.
pub fn signed_webhook_app() -> TestApp {
    build(AuthConfig::signed_webhook(WEBHOOK_SECRET))
}

pub fn post_json(uri: &str) -> axum::http::request::Builder {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
}

/// Authorized JSON POST with an optional idempotency key.
pub fn authed_post(
    uri: &str,
    body: &JsonValue,
    idempotency_key: Option<&str>,
) -> Result<Request<Body>, String> {
    let mut builder = post_json(uri).header("x-auth-token", TOKEN);
    if let Some(key) = idempotency_key {
        builder = builder.header("idempotency-key", key);
    }
    builder
        .body(Body::from(body.to_string()))
        .map_err(|e| e.to_string())
}

/// JSON POST signed the way a webhook sender signs it.
pub fn signed_post(app: &TestApp, uri: &str, body: &JsonValue) -> Result<Request<Body>, String> {
    let raw = body.to_string();
    let timestamp = app.clock.now_epoch_secs().to_string();
    let signature = sign_body(WEBHOOK_SECRET, &timestamp, raw.as_bytes());

    post_json(uri)
        .header("x-timestamp", timestamp)
        .header("x-signature", signature)
        .body(Body::from(raw))
        .map_err(|e| e.to_string())
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: JsonValue,
    pub raw: Vec<u8>,
}

pub async fn send(router: &Router, request: Request<Body>) -> Result<TestResponse, String> {
    let response = router
        .clone()
        .oneshot(request)
        .await
        .map_err(|e| e.to_string())?;

    let status = response.status();
    let headers = response.headers().clone();
    let raw = to_bytes(response.into_body(), usize::MAX)
        .await
        .map_err(|e| e.to_string())?
        .to_vec();
    let body = if raw.is_empty() {
        JsonValue::Null
    } else {
        serde_json::from_slice(&raw).unwrap_or(JsonValue::Null)
    };

    Ok(TestResponse {
        status,
        headers,
        body,
        raw,
    })
}
