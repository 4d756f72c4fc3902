//! HTTP client utilities.
//!
//! Provides a shared HTTP client for all vendor probes, maps vendor
//! responses onto the error taxonomy, and implements the bounded retry
//! loop for transient failures.

use std::future::Future;
use std::time::Duration;

use reqwest::{Client, ClientBuilder, Response};
use serde::Deserialize;

use crate::error::{KeyvetError, Result};

/// Default timeout for HTTP requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default retry attempts per probe.
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;

/// Default backoff between retry attempts.
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(5);

/// Build a configured HTTP client.
///
/// # Errors
///
/// Returns error if client construction fails.
pub fn build_client(timeout: Duration) -> Result<Client> {
    ClientBuilder::new()
        .timeout(timeout)
        .user_agent(format!("keyvet/{}", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| KeyvetError::Network(e.to_string()))
}

// =============================================================================
// Retry Policy
// =============================================================================

/// Fixed-backoff retry policy for transient probe failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub attempts: u32,
    /// Delay between attempts.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_RETRY_ATTEMPTS,
            backoff: DEFAULT_RETRY_BACKOFF,
        }
    }
}

/// Run `op` up to `policy.attempts` times, sleeping `policy.backoff`
/// between attempts. Only retryable errors re-enter the loop; everything
/// else aborts immediately. The last error is returned as-is so its vendor
/// message stays available for classification.
pub async fn with_retry<T, F, Fut>(policy: RetryPolicy, label: &str, op: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = policy.attempts.max(1);
    let mut last_err = None;

    for attempt in 1..=attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < attempts => {
                tracing::warn!(
                    probe = label,
                    attempt,
                    error = %e,
                    "Transient failure, retrying after backoff"
                );
                tokio::time::sleep(policy.backoff).await;
                last_err = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    // Unreachable in practice: the loop always returns. Kept total for the
    // attempts == 0 clamp.
    Err(last_err.unwrap_or_else(|| KeyvetError::Network(format!("{label}: no attempts made"))))
}

// =============================================================================
// Vendor Error Mapping
// =============================================================================

/// Standard error envelope in vendor error bodies.
#[derive(Debug, Deserialize)]
struct VendorErrorBody {
    #[serde(default)]
    error: Option<VendorErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct VendorErrorDetail {
    #[serde(default)]
    message: Option<String>,
}

/// Map a reqwest transport error onto the taxonomy.
pub(crate) fn map_transport_error(e: &reqwest::Error, timeout: Duration) -> KeyvetError {
    if e.is_timeout() {
        KeyvetError::Timeout(timeout.as_secs())
    } else {
        KeyvetError::Network(e.to_string())
    }
}

/// Turn a non-2xx vendor response into the matching error variant,
/// preserving the vendor's message text.
pub(crate) async fn error_from_response(response: Response) -> KeyvetError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    let message = serde_json::from_str::<VendorErrorBody>(&body)
        .ok()
        .and_then(|b| b.error)
        .and_then(|e| e.message)
        .unwrap_or_else(|| {
            if body.is_empty() {
                format!("HTTP {status}")
            } else {
                body.clone()
            }
        });

    match status.as_u16() {
        401 | 403 => KeyvetError::Auth { message },
        429 => KeyvetError::Transient {
            status: Some(429),
            message,
        },
        s if s >= 500 => KeyvetError::Transient {
            status: Some(s),
            message,
        },
        s => KeyvetError::Api { status: s, message },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn retry_gives_up_after_attempts() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy {
            attempts: 3,
            backoff: Duration::ZERO,
        };

        let result: Result<()> = tokio_test::block_on(with_retry(policy, "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(KeyvetError::Transient {
                    status: Some(503),
                    message: "unavailable".to_string(),
                })
            }
        }));

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retry_stops_on_non_retryable() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy {
            attempts: 3,
            backoff: Duration::ZERO,
        };

        let result: Result<()> = with_retry(policy, "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(KeyvetError::Auth {
                    message: "Incorrect API key provided".to_string(),
                })
            }
        })
        .await;

        assert!(matches!(result, Err(KeyvetError::Auth { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retry_succeeds_mid_sequence() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy {
            attempts: 3,
            backoff: Duration::ZERO,
        };

        let result = with_retry(policy, "test", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 1 {
                    Err(KeyvetError::Transient {
                        status: Some(500),
                        message: "server error".to_string(),
                    })
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn retry_preserves_last_vendor_message() {
        let policy = RetryPolicy {
            attempts: 2,
            backoff: Duration::ZERO,
        };

        let result: Result<()> = with_retry(policy, "liveness", || async {
            Err(KeyvetError::Transient {
                status: Some(429),
                message: "You exceeded your current quota".to_string(),
            })
        })
        .await;

        let err = result.unwrap_err();
        assert_eq!(
            err.vendor_message(),
            Some("You exceeded your current quota")
        );
    }
}
