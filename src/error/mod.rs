//! Error types for keyvet.
//!
//! Uses `thiserror` for structured error types that map to exit codes.
//!
//! ## Error Taxonomy
//!
//! Probe-level failures fall into five categories:
//! - **Auth**: the vendor rejected the credential outright (401/403)
//! - **Transient**: server overload, 5xx, 429, connect failures, timeouts
//! - **Api**: any other non-2xx vendor response
//! - **Parse**: a response body that does not match the expected shape
//! - **Internal**: I/O, config, or unclassified errors
//!
//! Only transient errors are retried. Every probe failure carries the
//! vendor's message text verbatim so the evaluator can classify it against
//! the known-message table — the vendor has no structured error code for
//! account state, so the raw text is the signal.

use thiserror::Error;

// =============================================================================
// Exit Codes
// =============================================================================

/// Process exit codes for the keyvet binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Success
    Success = 0,
    /// Unexpected failure
    GeneralError = 1,
    /// Config/parse errors, unusable input
    ParseError = 3,
    /// Timeout
    Timeout = 4,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

/// Main error type for keyvet operations.
#[derive(Error, Debug)]
pub enum KeyvetError {
    // ==========================================================================
    // Vendor probe errors
    // ==========================================================================
    /// The vendor rejected the credential (401/403). Never retried.
    #[error("credential rejected: {message}")]
    Auth {
        message: String,
    },

    /// Server-side overload: 429, 5xx. Retried with backoff.
    #[error("transient vendor error: {message}")]
    Transient {
        status: Option<u16>,
        message: String,
    },

    /// Any other non-2xx vendor response. Not retried.
    #[error("vendor API error (HTTP {status}): {message}")]
    Api {
        status: u16,
        message: String,
    },

    /// Response body did not match the expected shape.
    #[error("failed to parse response: {0}")]
    ParseResponse(String),

    // ==========================================================================
    // Network errors
    // ==========================================================================
    /// Request timed out.
    #[error("request timeout after {0} seconds")]
    Timeout(u64),

    /// Connection-level failure (DNS, refused, reset).
    #[error("network error: {0}")]
    Network(String),

    // ==========================================================================
    // Configuration / input errors
    // ==========================================================================
    /// Configuration error (bad config file, invalid flag combination).
    #[error("configuration error: {0}")]
    Config(String),

    /// The credential list was empty or unreadable.
    #[error("invalid input: {0}")]
    Input(String),

    // ==========================================================================
    // I/O errors
    // ==========================================================================
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ==========================================================================
    // Generic wrapper
    // ==========================================================================
    /// Catch-all for other errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl KeyvetError {
    /// Map error to exit code.
    #[must_use]
    pub const fn exit_code(&self) -> ExitCode {
        match self {
            Self::Config(_) | Self::Input(_) | Self::ParseResponse(_) => ExitCode::ParseError,
            Self::Timeout(_) => ExitCode::Timeout,
            Self::Auth { .. }
            | Self::Transient { .. }
            | Self::Api { .. }
            | Self::Network(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::Other(_) => ExitCode::GeneralError,
        }
    }

    /// Returns whether the error is potentially recoverable by retrying.
    ///
    /// Retryable errors are exactly the transient class: 429, 5xx,
    /// connect-level failures, and timeouts. Auth rejections and other
    /// 4xx responses abort immediately.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transient { .. } | Self::Timeout(_) | Self::Network(_)
        )
    }

    /// The vendor-supplied message text, when this error carries one.
    ///
    /// Used by the classification table; the full `Display` output is the
    /// fallback for variants without an embedded vendor message.
    #[must_use]
    pub fn vendor_message(&self) -> Option<&str> {
        match self {
            Self::Auth { message }
            | Self::Transient { message, .. }
            | Self::Api { message, .. } => Some(message),
            _ => None,
        }
    }
}

/// Result type alias for keyvet operations.
pub type Result<T> = std::result::Result<T, KeyvetError>;

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors() {
        assert!(KeyvetError::Timeout(30).is_retryable());
        assert!(KeyvetError::Network("reset".to_string()).is_retryable());
        assert!(
            KeyvetError::Transient {
                status: Some(429),
                message: "overloaded".to_string(),
            }
            .is_retryable()
        );
        assert!(
            KeyvetError::Transient {
                status: Some(503),
                message: "unavailable".to_string(),
            }
            .is_retryable()
        );
    }

    #[test]
    fn non_retryable_errors() {
        assert!(
            !KeyvetError::Auth {
                message: "Incorrect API key provided".to_string(),
            }
            .is_retryable()
        );
        assert!(
            !KeyvetError::Api {
                status: 404,
                message: "not found".to_string(),
            }
            .is_retryable()
        );
        assert!(!KeyvetError::Config("bad".to_string()).is_retryable());
        assert!(!KeyvetError::ParseResponse("shape".to_string()).is_retryable());
    }

    #[test]
    fn vendor_message_extraction() {
        let err = KeyvetError::Auth {
            message: "Incorrect API key provided".to_string(),
        };
        assert_eq!(err.vendor_message(), Some("Incorrect API key provided"));

        let err = KeyvetError::Transient {
            status: Some(429),
            message: "You exceeded your current quota".to_string(),
        };
        assert_eq!(
            err.vendor_message(),
            Some("You exceeded your current quota")
        );

        assert_eq!(KeyvetError::Timeout(30).vendor_message(), None);
    }

    #[test]
    fn exit_codes_are_correct() {
        assert_eq!(
            KeyvetError::Config("bad".to_string()).exit_code(),
            ExitCode::ParseError
        );
        assert_eq!(
            KeyvetError::Input("empty".to_string()).exit_code(),
            ExitCode::ParseError
        );
        assert_eq!(KeyvetError::Timeout(30).exit_code(), ExitCode::Timeout);
        assert_eq!(
            KeyvetError::Network("down".to_string()).exit_code(),
            ExitCode::GeneralError
        );
        assert_eq!(i32::from(ExitCode::Success), 0);
    }
}
