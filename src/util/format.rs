//! Formatting utilities.

use chrono::{DateTime, Utc};

/// Format a USD amount.
#[must_use]
pub fn format_usd(value: f64) -> String {
    format!("${value:.2}")
}

/// Format a timestamp for the transcript.
#[must_use]
pub fn format_timestamp(value: DateTime<Utc>) -> String {
    value.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Mask a credential for log output: prefix kept, middle elided, last four
/// characters kept. The full credential never reaches the logs.
#[must_use]
pub fn mask_key(credential: &str) -> String {
    let chars: Vec<char> = credential.chars().collect();
    if chars.len() <= 8 {
        return "***".to_string();
    }
    let prefix: String = chars[..3].iter().collect();
    let suffix: String = chars[chars.len() - 4..].iter().collect();
    format!("{prefix}…{suffix}")
}
