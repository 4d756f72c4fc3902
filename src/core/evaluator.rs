//! Per-credential evaluation.
//!
//! [`Evaluator::evaluate`] runs the three probes for one credential and
//! folds the results into exactly one [`KeyOutcome`]. It never fails past
//! its own boundary: every probe failure is classified, and anything
//! unanticipated is captured under `UnexpectedError` with the raw message
//! preserved.

use chrono::Utc;

use super::classify::{classify_auth_failure, classify_failure};
use super::models::{CapabilityFlags, KeyOutcome, KeyStatus};
use super::probes::VendorClient;
use crate::error::KeyvetError;
use crate::util::format::mask_key;

/// Evaluates credentials against the vendor.
#[derive(Debug, Clone)]
pub struct Evaluator {
    vendor: VendorClient,
    desired_models: Vec<String>,
}

impl Evaluator {
    #[must_use]
    pub fn new(vendor: VendorClient, desired_models: Vec<String>) -> Self {
        Self {
            vendor,
            desired_models,
        }
    }

    /// Evaluate one credential.
    ///
    /// Probe order matters: the billing endpoint can succeed for
    /// credentials that are effectively unusable, so the final status is
    /// driven by the liveness probe's enforcement error, not by billing
    /// HTTP status alone.
    pub async fn evaluate(&self, credential: &str) -> KeyOutcome {
        let now = Utc::now();
        let mut outcome = KeyOutcome::bare(credential, KeyStatus::Valid);

        // Billing first: an auth rejection here means the credential is
        // dead and the remaining probes are pointless.
        let billing = match self.vendor.billing_snapshot(credential, now).await {
            Ok(billing) => billing,
            Err(e @ KeyvetError::Auth { .. }) => {
                let message = e.vendor_message().unwrap_or_default();
                outcome.status = classify_auth_failure(message);
                tracing::info!(
                    key = %mask_key(credential),
                    status = ?outcome.status,
                    "Billing probe rejected credential"
                );
                return outcome;
            }
            Err(e) => {
                outcome.status = KeyStatus::UnexpectedError;
                outcome.unexpected_errors.push(e.to_string());
                tracing::warn!(
                    key = %mask_key(credential),
                    error = %e,
                    "Billing probe failed unexpectedly"
                );
                return outcome;
            }
        };

        // Capability probe. A failure here is not fatal: capability absence
        // is itself meaningful and renders as "no desired models available".
        match self.vendor.list_model_ids(credential).await {
            Ok(ids) => {
                let flags = CapabilityFlags::from_model_ids(&ids, &self.desired_models);
                let matched: Vec<String> = ids
                    .into_iter()
                    .filter(|id| self.desired_models.contains(id))
                    .collect();
                outcome.capabilities = Some(flags);
                outcome.models = Some(matched);
            }
            Err(e) => {
                tracing::debug!(
                    key = %mask_key(credential),
                    error = %e,
                    "Capability probe failed; recording no desired models"
                );
            }
        }

        // Liveness probe: the only signal that reliably surfaces quota and
        // account-state enforcement.
        let canceled = billing.canceled_at.is_some();
        match self.vendor.liveness_check(credential).await {
            Ok(()) => {
                outcome.status = KeyStatus::Valid;
                outcome.glitched = billing.is_glitched(now);
            }
            Err(e) => {
                let message = e
                    .vendor_message()
                    .map_or_else(|| e.to_string(), ToString::to_string);
                outcome.status = classify_failure(&message, canceled);
                if outcome.status == KeyStatus::UnexpectedError {
                    outcome.unexpected_errors.push(message);
                }
            }
        }

        outcome.billing = Some(billing);
        tracing::info!(
            key = %mask_key(credential),
            status = ?outcome.status,
            glitched = outcome.glitched,
            "Classified credential"
        );
        outcome
    }
}
