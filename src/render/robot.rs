//! JSON output for machine consumers.
//!
//! Wraps the outcome list and aggregate report in a versioned envelope so
//! downstream tooling can detect schema drift.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::aggregate::{AggregateReport, BucketKind};
use crate::core::models::{CapabilityTier, KeyOutcome};
use crate::error::Result;

/// Top-level JSON envelope.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RobotOutput<T> {
    pub schema_version: String,
    pub generated_at: DateTime<Utc>,
    pub command: String,
    pub data: T,
}

impl<T> RobotOutput<T> {
    /// Create a new envelope.
    pub fn new(command: impl Into<String>, data: T) -> Self {
        Self {
            schema_version: "keyvet.v1".to_string(),
            generated_at: Utc::now(),
            command: command.into(),
            data,
        }
    }
}

/// Serializable payload for the `check` command.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckPayload {
    pub outcomes: Vec<KeyOutcome>,
    pub buckets: BTreeMap<BucketKind, Vec<String>>,
    pub limit_tiers: Vec<LimitTierGroup>,
    pub total_available_usd: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unexpected_errors: Vec<UnexpectedEntry>,
}

/// One limit-tier group with its members in insertion order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitTierGroup {
    pub limit_usd: u64,
    pub tier: CapabilityTier,
    pub members: Vec<String>,
}

/// One captured unexpected error.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnexpectedEntry {
    pub credential: String,
    pub message: String,
}

impl CheckPayload {
    /// Build the payload from the outcome list and its aggregate report.
    #[must_use]
    pub fn new(outcomes: Vec<KeyOutcome>, report: &AggregateReport) -> Self {
        let buckets = report
            .buckets
            .iter()
            .map(|(kind, members)| (*kind, members.iter().cloned().collect()))
            .collect();

        let limit_tiers = report
            .limit_tiers
            .iter()
            .map(|(tier, members)| LimitTierGroup {
                limit_usd: tier.limit_usd,
                tier: tier.tier,
                members: members.clone(),
            })
            .collect();

        let unexpected_errors = report
            .unexpected
            .iter()
            .map(|(credential, message)| UnexpectedEntry {
                credential: credential.clone(),
                message: message.clone(),
            })
            .collect();

        Self {
            outcomes,
            buckets,
            limit_tiers,
            total_available_usd: report.total_available_usd,
            unexpected_errors,
        }
    }
}

/// Render an envelope as compact JSON.
///
/// # Errors
///
/// Returns error if serialization fails.
pub fn render_json<T: Serialize>(output: &RobotOutput<T>) -> Result<String> {
    Ok(serde_json::to_string(output)?)
}

/// Render an envelope as pretty-printed JSON.
///
/// # Errors
///
/// Returns error if serialization fails.
pub fn render_json_pretty<T: Serialize>(output: &RobotOutput<T>) -> Result<String> {
    Ok(serde_json::to_string_pretty(output)?)
}
