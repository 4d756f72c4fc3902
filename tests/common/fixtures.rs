//! Mock vendor API fixtures.
//!
//! Factory functions for the vendor's response bodies and helpers that
//! mount a complete credential scenario onto a wiremock server. Mocks
//! match on the bearer token, so one server can serve many credentials
//! with different behaviors.

#![allow(dead_code)] // not every test file uses every helper

use std::time::Duration;

use chrono::{TimeDelta, Utc};
use serde_json::{Value, json};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use keyvet::core::{Evaluator, RetryPolicy, VendorClient};
use keyvet::storage::config::default_desired_models;

/// The exact quota message the vendor currently emits.
pub const QUOTA_MESSAGE: &str =
    "You exceeded your current quota, please check your plan and billing details.";

/// The exact invalid-key message the vendor currently emits.
pub const INVALID_KEY_MESSAGE: &str = "Incorrect API key provided: sk-abc***. \
     You can find your API key at https://platform.openai.com/account/api-keys.";

// =============================================================================
// Response Bodies
// =============================================================================

/// A `/v1/models` listing body.
pub fn models_body(ids: &[&str]) -> Value {
    let data: Vec<Value> = ids
        .iter()
        .map(|id| json!({"id": id, "object": "model", "owned_by": "openai"}))
        .collect();
    json!({"object": "list", "data": data})
}

/// A `/dashboard/billing/subscription` body.
pub fn subscription_body(
    plan: &str,
    hard_limit_usd: f64,
    access_until: i64,
    canceled_at: Option<i64>,
) -> Value {
    json!({
        "object": "billing_subscription",
        "has_payment_method": plan == "payg",
        "canceled": canceled_at.is_some(),
        "canceled_at": canceled_at,
        "access_until": access_until,
        "soft_limit_usd": hard_limit_usd / 2.0,
        "hard_limit_usd": hard_limit_usd,
        "system_hard_limit_usd": hard_limit_usd,
        "plan": {"title": "Plan", "id": plan},
        "account_name": "Fixture Org",
        "billing_address": null
    })
}

/// A `/dashboard/billing/usage` body. `total_usage` is in cents.
pub fn usage_body(total_usage_cents: f64) -> Value {
    json!({"object": "list", "total_usage": total_usage_cents})
}

/// The vendor's standard error envelope.
pub fn error_body(message: &str, error_type: &str) -> Value {
    json!({
        "error": {
            "message": message,
            "type": error_type,
            "param": null,
            "code": null
        }
    })
}

/// A minimal successful chat-completion body. Content is irrelevant: the
/// liveness probe discards it.
pub fn completion_body() -> Value {
    json!({
        "id": "chatcmpl-fixture",
        "object": "chat.completion",
        "choices": [{"index": 0, "message": {"role": "assistant", "content": "!"}}]
    })
}

// =============================================================================
// Timestamps
// =============================================================================

/// A unix timestamp `days` in the future.
pub fn future_ts(days: i64) -> i64 {
    (Utc::now() + TimeDelta::days(days)).timestamp()
}

/// A unix timestamp `days` in the past.
pub fn past_ts(days: i64) -> i64 {
    (Utc::now() - TimeDelta::days(days)).timestamp()
}

// =============================================================================
// Mock Mounting
// =============================================================================

fn bearer(key: &str) -> String {
    format!("Bearer {key}")
}

/// Mount a `/v1/models` response for one credential.
pub async fn mount_models(server: &MockServer, key: &str, ids: &[&str]) {
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .and(header("Authorization", bearer(key).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(models_body(ids)))
        .mount(server)
        .await;
}

/// Mount a subscription response for one credential.
pub async fn mount_subscription(server: &MockServer, key: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path("/dashboard/billing/subscription"))
        .and(header("Authorization", bearer(key).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Mount a usage response for one credential.
pub async fn mount_usage(server: &MockServer, key: &str, total_usage_cents: f64) {
    Mock::given(method("GET"))
        .and(path("/dashboard/billing/usage"))
        .and(header("Authorization", bearer(key).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(usage_body(total_usage_cents)))
        .mount(server)
        .await;
}

/// Mount a successful liveness response for one credential.
pub async fn mount_liveness_ok(server: &MockServer, key: &str) {
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("Authorization", bearer(key).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body()))
        .mount(server)
        .await;
}

/// Mount a failing liveness response for one credential.
pub async fn mount_liveness_error(
    server: &MockServer,
    key: &str,
    status: u16,
    message: &str,
    error_type: &str,
) {
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("Authorization", bearer(key).as_str()))
        .respond_with(ResponseTemplate::new(status).set_body_json(error_body(message, error_type)))
        .mount(server)
        .await;
}

/// Mount the full happy path for one credential: models, subscription,
/// usage, and a succeeding liveness probe.
pub async fn mount_valid_key(
    server: &MockServer,
    key: &str,
    ids: &[&str],
    plan: &str,
    hard_limit_usd: f64,
    total_usage_cents: f64,
) {
    mount_models(server, key, ids).await;
    mount_subscription(
        server,
        key,
        subscription_body(plan, hard_limit_usd, future_ts(90), None),
    )
    .await;
    mount_usage(server, key, total_usage_cents).await;
    mount_liveness_ok(server, key).await;
}

// =============================================================================
// Client Factories
// =============================================================================

/// A vendor client against the mock server with zero retry backoff so
/// transient paths stay fast under test.
pub fn test_client(server: &MockServer) -> VendorClient {
    VendorClient::new(
        &server.uri(),
        Duration::from_secs(5),
        RetryPolicy {
            attempts: 3,
            backoff: Duration::ZERO,
        },
    )
    .expect("client build")
}

/// An evaluator over [`test_client`] with the default desired models.
pub fn test_evaluator(server: &MockServer) -> Evaluator {
    Evaluator::new(test_client(server), default_desired_models())
}
