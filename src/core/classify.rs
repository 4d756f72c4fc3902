//! Vendor error-message classification.
//!
//! The vendor attaches no structured code to account-state failures, so the
//! liveness probe's error text is the only reliable signal. Classification
//! is a priority-ordered substring match over that text. This is a known
//! fragility: a silent change to the vendor's wording breaks classification,
//! which is why the tests pin the exact strings.

use super::models::KeyStatus;

const QUOTA_EXCEEDED: &str = "exceeded your current quota";
const ACCOUNT_NOT_ACTIVE: &str = "account is not active";
const ORGANIZATION_REQUIRED: &str = "must be a member of an organization";
const ACCOUNT_DEACTIVATED: &str = "deactivated account";
const INCORRECT_KEY: &str = "incorrect api key";

/// Classify a probe failure message.
///
/// `canceled` is whether the billing probe reported a cancellation
/// timestamp: a quota-exceeded message on a canceled account classifies as
/// `Canceled`, never `QuotaExceeded`. First match in priority order wins;
/// anything unrecognized is `UnexpectedError` and the caller keeps the
/// message verbatim.
#[must_use]
pub fn classify_failure(message: &str, canceled: bool) -> KeyStatus {
    let lowered = message.to_lowercase();

    if lowered.contains(QUOTA_EXCEEDED) {
        if canceled {
            KeyStatus::Canceled
        } else {
            KeyStatus::QuotaExceeded
        }
    } else if lowered.contains(ACCOUNT_NOT_ACTIVE) {
        KeyStatus::AccountNotActive
    } else if lowered.contains(ORGANIZATION_REQUIRED) {
        KeyStatus::OrganizationRequired
    } else if lowered.contains(ACCOUNT_DEACTIVATED) {
        KeyStatus::AccountDeactivated
    } else if lowered.contains(INCORRECT_KEY) {
        KeyStatus::ExpiredOrRevoked
    } else {
        KeyStatus::UnexpectedError
    }
}

/// Classify a billing-probe auth rejection.
///
/// An auth failure on the billing endpoint means the credential is dead;
/// the message may still match a more specific pattern, otherwise it
/// degrades to `ExpiredOrRevoked` rather than `UnexpectedError`.
#[must_use]
pub fn classify_auth_failure(message: &str) -> KeyStatus {
    match classify_failure(message, false) {
        KeyStatus::UnexpectedError => KeyStatus::ExpiredOrRevoked,
        status => status,
    }
}
