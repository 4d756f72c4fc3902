//! Integration tests for the batch coordinator and aggregation over a
//! mixed population of credentials.

mod common;

use std::sync::Arc;

use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::fixtures::{
    INVALID_KEY_MESSAGE, QUOTA_MESSAGE, error_body, future_ts, mount_liveness_error,
    mount_subscription, mount_usage, mount_valid_key, subscription_body, test_evaluator,
};
use keyvet::core::aggregate::{BucketKind, aggregate};
use keyvet::core::models::KeyStatus;
use keyvet::core::{Evaluator, check_keys};
use keyvet::render::render_transcript;

async fn mount_bad_key(server: &MockServer, key: &str) {
    Mock::given(method("GET"))
        .and(path("/dashboard/billing/subscription"))
        .and(header("Authorization", format!("Bearer {key}").as_str()))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(error_body(
                INVALID_KEY_MESSAGE,
                "invalid_request_error",
            )),
        )
        .mount(server)
        .await;
}

async fn mount_quota_key(server: &MockServer, key: &str) {
    common::fixtures::mount_models(server, key, &["gpt-3.5-turbo", "gpt-4"]).await;
    mount_subscription(server, key, subscription_body("payg", 120.0, future_ts(30), None)).await;
    mount_usage(server, key, 12_000.0).await;
    mount_liveness_error(server, key, 429, QUOTA_MESSAGE, "insufficient_quota").await;
}

#[tokio::test]
async fn results_preserve_input_order() {
    let server = MockServer::start().await;
    mount_valid_key(&server, "sk-first", &["gpt-4"], "payg", 120.0, 0.0).await;
    mount_bad_key(&server, "sk-second").await;
    mount_valid_key(&server, "sk-third", &["gpt-3.5-turbo"], "free", 18.0, 0.0).await;

    let credentials = vec![
        "sk-first".to_string(),
        "sk-second".to_string(),
        "sk-third".to_string(),
    ];
    let evaluator = Arc::new(test_evaluator(&server));
    let outcomes = check_keys(&evaluator, &credentials, 2).await;

    assert_eq!(outcomes.len(), credentials.len());
    let returned: Vec<&str> = outcomes.iter().map(|o| o.credential.as_str()).collect();
    assert_eq!(returned, vec!["sk-first", "sk-second", "sk-third"]);

    assert_eq!(outcomes[0].status, KeyStatus::Valid);
    assert_eq!(outcomes[1].status, KeyStatus::ExpiredOrRevoked);
    assert_eq!(outcomes[2].status, KeyStatus::Valid);
}

#[tokio::test]
async fn one_transcript_block_per_credential() {
    let server = MockServer::start().await;
    mount_valid_key(&server, "sk-a", &["gpt-4"], "payg", 120.0, 0.0).await;
    mount_bad_key(&server, "sk-b").await;
    mount_quota_key(&server, "sk-c").await;

    let credentials = vec!["sk-a".to_string(), "sk-b".to_string(), "sk-c".to_string()];
    let evaluator = Arc::new(test_evaluator(&server));
    let outcomes = check_keys(&evaluator, &credentials, 8).await;
    let report = aggregate(&outcomes);
    let transcript = render_transcript(&outcomes, &report, false);

    assert_eq!(transcript.matches("API Key ").count(), credentials.len());
    for number in 1..=credentials.len() {
        assert!(transcript.contains(&format!("API Key {number}:")));
    }
    assert!(transcript.contains("Quota exceeded for this key"));
    assert!(transcript.contains("This key is invalid or revoked"));
}

#[tokio::test]
async fn worker_cap_of_one_still_completes_every_credential() {
    let server = MockServer::start().await;
    for key in ["sk-q1", "sk-q2", "sk-q3", "sk-q4", "sk-q5"] {
        mount_valid_key(&server, key, &["gpt-3.5-turbo"], "payg", 20.0, 0.0).await;
    }

    let credentials: Vec<String> = (1..=5).map(|n| format!("sk-q{n}")).collect();
    let evaluator = Arc::new(test_evaluator(&server));
    let outcomes = check_keys(&evaluator, &credentials, 1).await;

    assert_eq!(outcomes.len(), 5);
    assert!(outcomes.iter().all(|o| o.status == KeyStatus::Valid));
}

#[tokio::test]
async fn mixed_batch_buckets_and_totals() {
    let server = MockServer::start().await;
    mount_valid_key(
        &server,
        "sk-gpt4",
        &["gpt-3.5-turbo", "gpt-4"],
        "payg",
        120.0,
        500.0,
    )
    .await;
    mount_valid_key(&server, "sk-turbo", &["gpt-3.5-turbo"], "free", 18.0, 0.0).await;
    mount_quota_key(&server, "sk-quota").await;
    mount_bad_key(&server, "sk-dead").await;

    let credentials = vec![
        "sk-gpt4".to_string(),
        "sk-turbo".to_string(),
        "sk-quota".to_string(),
        "sk-dead".to_string(),
    ];
    let evaluator = Arc::new(test_evaluator(&server));
    let outcomes = check_keys(&evaluator, &credentials, 4).await;
    let report = aggregate(&outcomes);

    assert!(report.buckets[&BucketKind::WorkingTier2].contains("sk-gpt4"));
    assert!(report.buckets[&BucketKind::WorkingBaselineOnly].contains("sk-turbo"));
    assert!(report.buckets[&BucketKind::ExhaustedTier2].contains("sk-quota"));
    for members in report.buckets.values() {
        assert!(!members.contains("sk-dead"));
    }

    // 120 - 5 from sk-gpt4, 18 - 0 from sk-turbo.
    assert!((report.total_available_usd - 133.0).abs() < 1e-9);
}

#[tokio::test]
async fn duplicate_credentials_evaluate_twice_but_bucket_once() {
    let server = MockServer::start().await;
    mount_valid_key(&server, "sk-dup", &["gpt-4"], "payg", 120.0, 0.0).await;

    let credentials = vec!["sk-dup".to_string(), "sk-dup".to_string()];
    let evaluator = Arc::new(test_evaluator(&server));
    let outcomes = check_keys(&evaluator, &credentials, 2).await;
    let report = aggregate(&outcomes);

    // Two transcript blocks, one bucket member.
    assert_eq!(outcomes.len(), 2);
    assert_eq!(report.buckets[&BucketKind::WorkingTier2].len(), 1);
    assert!((report.total_available_usd - 120.0).abs() < 1e-9);
}

#[tokio::test]
async fn unmounted_credential_degrades_to_unexpected_not_abort() {
    let server = MockServer::start().await;
    mount_valid_key(&server, "sk-good", &["gpt-4"], "payg", 120.0, 0.0).await;
    // "sk-ghost" has no mocks at all; wiremock answers 404.

    let credentials = vec!["sk-good".to_string(), "sk-ghost".to_string()];
    let evaluator = Arc::new(test_evaluator(&server));
    let outcomes = check_keys(&evaluator, &credentials, 2).await;

    assert_eq!(outcomes[0].status, KeyStatus::Valid);
    assert_eq!(outcomes[1].status, KeyStatus::UnexpectedError);
    assert!(!outcomes[1].unexpected_errors.is_empty());
}

#[tokio::test]
async fn dead_server_degrades_every_credential_to_unexpected() {
    let server = MockServer::start().await;
    let uri = server.uri();
    drop(server);

    let evaluator = Arc::new(Evaluator::new(
        keyvet::core::VendorClient::new(
            &uri,
            std::time::Duration::from_secs(2),
            keyvet::core::RetryPolicy {
                attempts: 1,
                backoff: std::time::Duration::ZERO,
            },
        )
        .expect("client build"),
        keyvet::storage::config::default_desired_models(),
    ));

    let credentials = vec!["sk-one".to_string(), "sk-two".to_string()];
    let outcomes = check_keys(&evaluator, &credentials, 2).await;

    assert_eq!(outcomes.len(), 2);
    for outcome in &outcomes {
        assert_eq!(outcome.status, KeyStatus::UnexpectedError);
        assert!(!outcome.unexpected_errors.is_empty());
    }
}
