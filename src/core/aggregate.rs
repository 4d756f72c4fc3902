//! Outcome aggregation.
//!
//! Runs strictly after the batch join, single-threaded over the collected
//! outcome list, so the bucket sets need no synchronization. Buckets are
//! derived by testing predicates over each outcome; membership is
//! deduplicated by exact credential string.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::models::{CapabilityTier, KeyOutcome, KeyStatus};

// =============================================================================
// Buckets
// =============================================================================

/// The named bucket families: capability × quota state, plus the glitch
/// bucket.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum BucketKind {
    WorkingBaselineOnly,
    WorkingTier2,
    WorkingTier2Extended,
    ExhaustedBaselineOnly,
    ExhaustedTier2,
    ExhaustedTier2Extended,
    Glitched,
}

impl BucketKind {
    /// All buckets, in display order.
    pub const ALL: [Self; 7] = [
        Self::WorkingTier2,
        Self::WorkingTier2Extended,
        Self::WorkingBaselineOnly,
        Self::ExhaustedTier2,
        Self::ExhaustedTier2Extended,
        Self::ExhaustedBaselineOnly,
        Self::Glitched,
    ];

    /// Human label used in transcript summaries and file headers.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::WorkingBaselineOnly => "working baseline-only keys",
            Self::WorkingTier2 => "working tier-2 keys",
            Self::WorkingTier2Extended => "working tier-2-32k keys",
            Self::ExhaustedBaselineOnly => "quota-exhausted baseline-only keys",
            Self::ExhaustedTier2 => "quota-exhausted tier-2 keys",
            Self::ExhaustedTier2Extended => "quota-exhausted tier-2-32k keys",
            Self::Glitched => "possibly glitched keys",
        }
    }

    /// File stem for the per-bucket result file.
    #[must_use]
    pub const fn file_stem(self) -> &'static str {
        match self {
            Self::WorkingBaselineOnly => "working_baseline_only",
            Self::WorkingTier2 => "working_tier2",
            Self::WorkingTier2Extended => "working_tier2_32k",
            Self::ExhaustedBaselineOnly => "exhausted_baseline_only",
            Self::ExhaustedTier2 => "exhausted_tier2",
            Self::ExhaustedTier2Extended => "exhausted_tier2_32k",
            Self::Glitched => "glitched",
        }
    }

    /// Membership predicate.
    ///
    /// The tier-2 and tier-2-32k predicates intentionally test their flag
    /// alone, so a tier-2-32k credential lands in both buckets. Only
    /// "baseline-only" excludes the higher tiers.
    #[must_use]
    pub fn matches(self, outcome: &KeyOutcome) -> bool {
        let flags = outcome.flags();
        let baseline_only = flags.baseline && !flags.tier2 && !flags.tier2_extended;

        match self {
            Self::WorkingBaselineOnly => outcome.status == KeyStatus::Valid && baseline_only,
            Self::WorkingTier2 => outcome.status == KeyStatus::Valid && flags.tier2,
            Self::WorkingTier2Extended => {
                outcome.status == KeyStatus::Valid && flags.tier2_extended
            }
            Self::ExhaustedBaselineOnly => {
                outcome.status == KeyStatus::QuotaExceeded && baseline_only
            }
            Self::ExhaustedTier2 => outcome.status == KeyStatus::QuotaExceeded && flags.tier2,
            Self::ExhaustedTier2Extended => {
                outcome.status == KeyStatus::QuotaExceeded && flags.tier2_extended
            }
            Self::Glitched => outcome.glitched,
        }
    }
}

// =============================================================================
// Limit Tiers
// =============================================================================

/// Composite key for the billing-tier analysis: a rounded hard-limit
/// amount and the credential's capability level. A credential belongs to
/// exactly one limit tier, chosen by its own limit and capability.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub struct LimitTier {
    pub limit_usd: u64,
    pub tier: CapabilityTier,
}

impl LimitTier {
    /// Header form used in the limit-tier result file, e.g. `120/tier-2`.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}/{}", self.limit_usd, self.tier.label())
    }
}

// =============================================================================
// Aggregate Report
// =============================================================================

/// Everything the renderers and file writers consume.
#[derive(Debug, Clone)]
pub struct AggregateReport {
    /// Deduplicated members per bucket. Deterministic iteration order.
    pub buckets: BTreeMap<BucketKind, BTreeSet<String>>,
    /// Valid credentials grouped by limit tier, ascending by key;
    /// insertion order preserved within a tier.
    pub limit_tiers: BTreeMap<LimitTier, Vec<String>>,
    /// Sum of available balances over distinct valid credentials.
    pub total_available_usd: f64,
    /// Every captured unexpected error: (credential, verbatim message).
    pub unexpected: Vec<(String, String)>,
}

/// Partition the complete outcome list into the report.
///
/// Pure over its input: re-running aggregation over the same outcome list
/// produces identical bucket contents.
#[must_use]
pub fn aggregate(outcomes: &[KeyOutcome]) -> AggregateReport {
    let mut buckets: BTreeMap<BucketKind, BTreeSet<String>> = BucketKind::ALL
        .iter()
        .map(|kind| (*kind, BTreeSet::new()))
        .collect();
    let mut limit_tiers: BTreeMap<LimitTier, Vec<String>> = BTreeMap::new();
    let mut seen_valid: BTreeSet<&str> = BTreeSet::new();
    let mut total_available_usd = 0.0;
    let mut unexpected = Vec::new();

    for outcome in outcomes {
        for kind in BucketKind::ALL {
            if kind.matches(outcome)
                && let Some(members) = buckets.get_mut(&kind)
            {
                members.insert(outcome.credential.clone());
            }
        }

        if outcome.status == KeyStatus::Valid
            && let Some(billing) = &outcome.billing
            && seen_valid.insert(&outcome.credential)
        {
            total_available_usd += billing.available_balance_usd();

            if let Some(tier) = outcome.flags().highest_tier() {
                let key = LimitTier {
                    limit_usd: round_limit(billing.hard_limit_usd),
                    tier,
                };
                let members = limit_tiers.entry(key).or_default();
                if !members.contains(&outcome.credential) {
                    members.push(outcome.credential.clone());
                }
            }
        }

        for message in &outcome.unexpected_errors {
            unexpected.push((outcome.credential.clone(), message.clone()));
        }
    }

    AggregateReport {
        buckets,
        limit_tiers,
        total_available_usd,
        unexpected,
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // clamped first
fn round_limit(limit_usd: f64) -> u64 {
    limit_usd.round().max(0.0) as u64
}
