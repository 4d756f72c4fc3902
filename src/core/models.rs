//! Core data models for credential evaluation.
//!
//! These types carry everything the aggregator and renderers need: one
//! immutable [`KeyOutcome`] per credential per batch run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tolerance before usage overshoot marks a credential as glitched, in USD.
pub const GLITCH_TOLERANCE_USD: f64 = 10.0;

// =============================================================================
// Capability Flags
// =============================================================================

/// Which desired model tiers a credential can access.
///
/// Each flag is derived independently from raw model-id membership, so the
/// flags can look inconsistent (e.g. extended without tier-2) whenever the
/// vendor reports inconsistent data. No implication is enforced.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityFlags {
    /// Any baseline (`gpt-3.5-turbo*`) model available.
    pub baseline: bool,
    /// Any tier-2 (`gpt-4*`, non-32k) model available.
    pub tier2: bool,
    /// Any tier-2 extended-context (`gpt-4-32k*`) model available.
    pub tier2_extended: bool,
}

impl CapabilityFlags {
    /// Derive flags from the vendor's model ids intersected with the
    /// desired-model allowlist.
    #[must_use]
    pub fn from_model_ids<S: AsRef<str>>(available: &[S], desired: &[String]) -> Self {
        let matched: Vec<&str> = available
            .iter()
            .map(AsRef::as_ref)
            .filter(|id| desired.iter().any(|d| d == id))
            .collect();

        Self {
            baseline: matched.iter().any(|id| id.starts_with("gpt-3.5-turbo")),
            tier2: matched
                .iter()
                .any(|id| id.starts_with("gpt-4") && !id.starts_with("gpt-4-32k")),
            tier2_extended: matched.iter().any(|id| id.starts_with("gpt-4-32k")),
        }
    }

    /// True if any desired model is available.
    #[must_use]
    pub const fn any(self) -> bool {
        self.baseline || self.tier2 || self.tier2_extended
    }

    /// The highest capability tier the flags grant, if any.
    #[must_use]
    pub const fn highest_tier(self) -> Option<CapabilityTier> {
        if self.tier2_extended {
            Some(CapabilityTier::Tier2Extended)
        } else if self.tier2 {
            Some(CapabilityTier::Tier2)
        } else if self.baseline {
            Some(CapabilityTier::Baseline)
        } else {
            None
        }
    }
}

/// Named capability tiers, ordered from lowest to highest.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum CapabilityTier {
    Baseline,
    Tier2,
    Tier2Extended,
}

impl CapabilityTier {
    /// Short label used in file headers and limit-tier keys.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Baseline => "baseline",
            Self::Tier2 => "tier-2",
            Self::Tier2Extended => "tier-2-32k",
        }
    }
}

impl std::fmt::Display for CapabilityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

// =============================================================================
// Billing
// =============================================================================

/// Billing plan reported by the subscription endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlanKind {
    Free,
    PayAsYouGo,
    Other(String),
}

impl PlanKind {
    /// Parse the vendor's plan id.
    #[must_use]
    pub fn from_id(id: &str) -> Self {
        match id {
            "free" => Self::Free,
            "payg" => Self::PayAsYouGo,
            other => Self::Other(other.to_string()),
        }
    }

    /// Display label for the transcript.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Free => "free",
            Self::PayAsYouGo => "payg",
            Self::Other(id) => id,
        }
    }
}

/// Subscription limits and usage for one credential, fetched once per
/// evaluation and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingInfo {
    pub plan: PlanKind,
    pub soft_limit_usd: f64,
    pub hard_limit_usd: f64,
    pub system_hard_limit_usd: f64,
    pub access_until: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_address: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub canceled_at: Option<DateTime<Utc>>,

    pub total_usage_usd: f64,
}

impl BillingInfo {
    /// Remaining spendable balance, floored at zero.
    #[must_use]
    pub fn available_balance_usd(&self) -> f64 {
        (self.hard_limit_usd - self.total_usage_usd).max(0.0)
    }

    /// Heuristic anomaly check: expired access on a non-pay-as-you-go plan,
    /// or usage overshooting the hard limit past the tolerance. Glitched
    /// credentials still validate; the flag is informational.
    #[must_use]
    pub fn is_glitched(&self, now: DateTime<Utc>) -> bool {
        let access_expired = self.plan != PlanKind::PayAsYouGo && now > self.access_until;
        let usage_exceeded =
            self.total_usage_usd > self.hard_limit_usd + GLITCH_TOLERANCE_USD;
        access_expired || usage_exceeded
    }
}

// =============================================================================
// Outcome
// =============================================================================

/// Final classification of one credential. Mutually exclusive for
/// bucketing purposes; selected by the first matching signal in the
/// priority order of the classification table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum KeyStatus {
    Valid,
    ExpiredOrRevoked,
    QuotaExceeded,
    AccountDeactivated,
    AccountNotActive,
    OrganizationRequired,
    Canceled,
    UnexpectedError,
}

impl KeyStatus {
    /// Transcript annotation for this status. `Valid` has none — the
    /// billing fields are its success tail.
    #[must_use]
    pub const fn transcript_line(self) -> Option<&'static str> {
        match self {
            Self::Valid => None,
            Self::ExpiredOrRevoked => Some("This key is invalid or revoked"),
            Self::QuotaExceeded => Some("Quota exceeded for this key"),
            Self::AccountDeactivated => Some("This key's account has been deactivated"),
            Self::AccountNotActive => Some("This key's account is not active"),
            Self::OrganizationRequired => {
                Some("This key requires membership of an organization")
            }
            Self::Canceled => Some("Billing for this key has been canceled"),
            Self::UnexpectedError => Some("Unexpected error while checking this key"),
        }
    }
}

/// The result of evaluating one credential.
///
/// Created once per credential per batch run, immutable after
/// construction, and owned by the aggregator after the evaluator returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyOutcome {
    /// The credential exactly as supplied.
    pub credential: String,

    pub status: KeyStatus,

    /// Model ids that survived the desired-model intersection, in vendor
    /// order. Present only if the capability probe succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub models: Option<Vec<String>>,

    /// Present only if the capability probe succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<CapabilityFlags>,

    /// Present only if the billing probe succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing: Option<BillingInfo>,

    /// Billing/expiry anomaly flag. Only ever set on `Valid` outcomes.
    pub glitched: bool,

    /// Unexpected-error messages captured verbatim during evaluation.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unexpected_errors: Vec<String>,
}

impl KeyOutcome {
    /// An outcome shell with nothing but the credential and a status.
    #[must_use]
    pub fn bare(credential: impl Into<String>, status: KeyStatus) -> Self {
        Self {
            credential: credential.into(),
            status,
            models: None,
            capabilities: None,
            billing: None,
            glitched: false,
            unexpected_errors: Vec::new(),
        }
    }

    /// Capability flags, defaulting to none-available when the probe failed.
    #[must_use]
    pub fn flags(&self) -> CapabilityFlags {
        self.capabilities.unwrap_or_default()
    }
}
