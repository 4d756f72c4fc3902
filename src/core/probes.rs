//! Remote probe set against the vendor REST API.
//!
//! Three independent probes per credential:
//! - capability: `GET /v1/models`, intersected with the desired allowlist
//! - billing: `GET /dashboard/billing/subscription` plus
//!   `GET /dashboard/billing/usage`, folded into one [`BillingInfo`]
//! - liveness: a minimal `POST /v1/chat/completions` whose response body is
//!   discarded — only the vendor's enforcement error matters
//!
//! Each probe is independently retried; transient failures back off, auth
//! and other 4xx failures abort immediately.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::http::{self, build_client, error_from_response, map_transport_error, RetryPolicy};
use super::models::{BillingInfo, PlanKind};
use crate::error::{KeyvetError, Result};
use crate::util::format::mask_key;

/// Production API base.
pub const DEFAULT_API_BASE: &str = "https://api.openai.com";

/// How far back the usage window reaches.
const USAGE_WINDOW_DAYS: i64 = 99;

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

#[derive(Debug, Deserialize)]
struct SubscriptionResponse {
    #[serde(default)]
    soft_limit_usd: f64,
    #[serde(default)]
    hard_limit_usd: f64,
    #[serde(default)]
    system_hard_limit_usd: f64,
    /// Unix timestamp, fractional seconds allowed.
    #[serde(default)]
    access_until: f64,
    #[serde(default)]
    plan: Option<SubscriptionPlan>,
    #[serde(default)]
    account_name: Option<String>,
    #[serde(default)]
    canceled_at: Option<f64>,
    #[serde(default)]
    billing_address: Option<BillingAddress>,
}

#[derive(Debug, Deserialize)]
struct SubscriptionPlan {
    #[serde(default)]
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BillingAddress {
    #[serde(default)]
    line1: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    country: Option<String>,
}

impl BillingAddress {
    fn render(&self) -> Option<String> {
        let parts: Vec<&str> = [
            self.line1.as_deref(),
            self.city.as_deref(),
            self.country.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }
}

#[derive(Debug, Deserialize)]
struct UsageResponse {
    /// Cumulative usage over the window, in cents.
    #[serde(default)]
    total_usage: f64,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: [CompletionMessage<'a>; 1],
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct CompletionMessage<'a> {
    role: &'a str,
    content: &'a str,
}

// =============================================================================
// Vendor Client
// =============================================================================

/// HTTP client for the three vendor probes, shared across the whole batch.
#[derive(Debug, Clone)]
pub struct VendorClient {
    client: Client,
    api_base: String,
    retry: RetryPolicy,
    timeout: Duration,
}

impl VendorClient {
    /// Build a client against `api_base` (no trailing slash required).
    ///
    /// # Errors
    ///
    /// Returns error if the underlying HTTP client cannot be constructed.
    pub fn new(api_base: &str, timeout: Duration, retry: RetryPolicy) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            api_base: api_base.trim_end_matches('/').to_string(),
            retry,
            timeout,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.api_base)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        credential: &str,
        path: &str,
        query: Vec<(String, String)>,
    ) -> Result<T> {
        let response = self
            .client
            .get(self.url(path))
            .bearer_auth(credential)
            .query(&query)
            .send()
            .await
            .map_err(|e| map_transport_error(&e, self.timeout))?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| KeyvetError::ParseResponse(e.to_string()))
    }

    /// Capability probe: all model ids the credential can access.
    ///
    /// # Errors
    ///
    /// Returns `Auth` if the credential is rejected outright, `Transient`
    /// after the retry budget is spent, `ParseResponse` on a malformed body.
    pub async fn list_model_ids(&self, credential: &str) -> Result<Vec<String>> {
        tracing::debug!(key = %mask_key(credential), "Listing models");
        let list: ModelList = http::with_retry(self.retry, "models", || {
            self.get_json(credential, "/v1/models", Vec::new())
        })
        .await?;
        Ok(list.data.into_iter().map(|m| m.id).collect())
    }

    /// Billing probe: subscription limits plus the usage total, fetched
    /// exactly once per evaluation and folded into one record.
    ///
    /// # Errors
    ///
    /// Same failure modes as the capability probe; a non-2xx on either of
    /// the two underlying requests fails the probe as a whole.
    pub async fn billing_snapshot(
        &self,
        credential: &str,
        now: DateTime<Utc>,
    ) -> Result<BillingInfo> {
        tracing::debug!(key = %mask_key(credential), "Fetching billing subscription");
        let subscription: SubscriptionResponse =
            http::with_retry(self.retry, "subscription", || {
                self.get_json(credential, "/dashboard/billing/subscription", Vec::new())
            })
            .await?;

        let start = (now - TimeDelta::days(USAGE_WINDOW_DAYS))
            .format("%Y-%m-%d")
            .to_string();
        let end = (now + TimeDelta::days(1)).format("%Y-%m-%d").to_string();

        tracing::debug!(key = %mask_key(credential), %start, %end, "Fetching billing usage");
        let usage: UsageResponse = http::with_retry(self.retry, "usage", || {
            self.get_json(
                credential,
                "/dashboard/billing/usage",
                vec![
                    ("start_date".to_string(), start.clone()),
                    ("end_date".to_string(), end.clone()),
                ],
            )
        })
        .await?;

        let plan = subscription
            .plan
            .and_then(|p| p.id)
            .map_or(PlanKind::Other("unknown".to_string()), |id| {
                PlanKind::from_id(&id)
            });

        Ok(BillingInfo {
            plan,
            soft_limit_usd: subscription.soft_limit_usd,
            hard_limit_usd: subscription.hard_limit_usd,
            system_hard_limit_usd: subscription.system_hard_limit_usd,
            access_until: timestamp_to_datetime(subscription.access_until),
            organization: subscription.account_name,
            billing_address: subscription
                .billing_address
                .as_ref()
                .and_then(BillingAddress::render),
            canceled_at: subscription.canceled_at.map(timestamp_to_datetime),
            // The usage endpoint reports cents.
            total_usage_usd: usage.total_usage / 100.0,
        })
    }

    /// Liveness probe: the smallest possible generative request. The
    /// response content is discarded — the call exists purely to provoke
    /// the vendor's quota/account-state enforcement.
    ///
    /// # Errors
    ///
    /// Returns the enforcement failure with the vendor's message preserved
    /// for classification.
    pub async fn liveness_check(&self, credential: &str) -> Result<()> {
        tracing::debug!(key = %mask_key(credential), "Running liveness probe");
        http::with_retry(self.retry, "liveness", || self.liveness_once(credential)).await
    }

    async fn liveness_once(&self, credential: &str) -> Result<()> {
        let request = CompletionRequest {
            model: "gpt-3.5-turbo",
            messages: [CompletionMessage {
                role: "user",
                content: "hi",
            }],
            max_tokens: 1,
        };

        let response = self
            .client
            .post(self.url("/v1/chat/completions"))
            .bearer_auth(credential)
            .json(&request)
            .send()
            .await
            .map_err(|e| map_transport_error(&e, self.timeout))?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        Ok(())
    }
}

#[allow(clippy::cast_possible_truncation)] // unix seconds fit i64
fn timestamp_to_datetime(secs: f64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs as i64, 0).unwrap_or_else(Utc::now)
}
