//! Batch coordinator.
//!
//! Fans every credential out to its own evaluation task, bounded by a
//! worker cap, and collects outcomes in submission order once all tasks
//! have completed. A task that dies (a bug, not a classified outcome) is
//! converted into an `UnexpectedError` outcome instead of aborting the
//! batch — its siblings keep running.

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Semaphore;

use super::classify::classify_failure;
use super::evaluator::Evaluator;
use super::models::{KeyOutcome, KeyStatus};

/// Default worker cap for concurrent evaluations.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Evaluate every credential, at most `concurrency` in flight at a time.
///
/// The returned vector matches the input order exactly; there is no
/// progressive output — this is a batch join, not a stream.
pub async fn check_keys(
    evaluator: &Arc<Evaluator>,
    credentials: &[String],
    concurrency: usize,
) -> Vec<KeyOutcome> {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));

    let handles: Vec<_> = credentials
        .iter()
        .map(|credential| {
            let evaluator = Arc::clone(evaluator);
            let semaphore = Arc::clone(&semaphore);
            let credential = credential.clone();
            tokio::spawn(async move {
                // The semaphore is never closed; a failed acquire only
                // drops the cap for this task.
                let _permit = semaphore.acquire_owned().await.ok();
                evaluator.evaluate(&credential).await
            })
        })
        .collect();

    let results = join_all(handles).await;

    results
        .into_iter()
        .zip(credentials)
        .map(|(result, credential)| {
            result.unwrap_or_else(|e| {
                let message = panic_message(e);
                tracing::error!(
                    error = %message,
                    "Evaluation task died; folding into outcome"
                );
                // The same pattern table the evaluator uses, applied to the
                // raised error's message.
                let status = classify_failure(&message, false);
                let mut outcome = KeyOutcome::bare(credential.clone(), status);
                if status == KeyStatus::UnexpectedError {
                    outcome.unexpected_errors.push(message);
                }
                outcome
            })
        })
        .collect()
}

/// Extract a human-readable message from a dead task.
fn panic_message(e: tokio::task::JoinError) -> String {
    if e.is_panic() {
        match e.into_panic().downcast::<String>() {
            Ok(s) => *s,
            Err(payload) => payload
                .downcast::<&str>()
                .map_or_else(|_| "evaluation task panicked".to_string(), |s| (*s).to_string()),
        }
    } else {
        e.to_string()
    }
}
