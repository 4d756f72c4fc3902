//! Human-readable transcript.
//!
//! One block per credential, numbered from 1 in input order, followed by
//! the bucket summaries and the grand-total balance line. Color is applied
//! here and nowhere else; with `color = false` the output is plain text.

use std::fmt::Write as _;

use colored::Colorize;

use crate::core::aggregate::{AggregateReport, BucketKind};
use crate::core::models::{KeyOutcome, KeyStatus};
use crate::util::format::{format_timestamp, format_usd};

/// Render the full transcript.
#[must_use]
pub fn render_transcript(
    outcomes: &[KeyOutcome],
    report: &AggregateReport,
    color: bool,
) -> String {
    let mut out = String::new();

    for (idx, outcome) in outcomes.iter().enumerate() {
        render_block(&mut out, idx + 1, outcome, color);
        out.push('\n');
    }

    render_summary(&mut out, report);
    out
}

fn render_block(out: &mut String, number: usize, outcome: &KeyOutcome, color: bool) {
    let _ = writeln!(out, "API Key {number}:");
    let _ = writeln!(out, "{}", outcome.credential);

    if outcome.glitched {
        let banner = "**!!!Possibly Glitched Key!!!**";
        if color {
            let _ = writeln!(out, "{}", banner.red().blink());
        } else {
            let _ = writeln!(out, "{banner}");
        }
    }

    match outcome.models.as_deref() {
        Some([]) | None => {
            let _ = writeln!(out, "  No desired models available.");
        }
        Some(models) => {
            for model in models {
                let _ = writeln!(out, "  - {model}");
            }
        }
    }

    if let Some(billing) = &outcome.billing {
        let _ = writeln!(
            out,
            "  Access valid until: {}",
            format_timestamp(billing.access_until)
        );
        let _ = writeln!(out, "  Plan: {}", billing.plan.label());
        if let Some(organization) = &billing.organization {
            let _ = writeln!(out, "  Organization: {organization}");
        }
        if let Some(address) = &billing.billing_address {
            let _ = writeln!(out, "  Billing address: {address}");
        }
        if let Some(canceled_at) = billing.canceled_at {
            let _ = writeln!(out, "  Canceled at: {}", format_timestamp(canceled_at));
        }
        let _ = writeln!(out, "  Soft limit USD: {}", format_usd(billing.soft_limit_usd));
        let _ = writeln!(out, "  Hard limit USD: {}", format_usd(billing.hard_limit_usd));
        let _ = writeln!(
            out,
            "  System hard limit USD: {}",
            format_usd(billing.system_hard_limit_usd)
        );
        let _ = writeln!(
            out,
            "  Total usage USD: {}",
            format_usd(billing.total_usage_usd)
        );
    }

    if let Some(line) = outcome.status.transcript_line() {
        let annotated = if outcome.status == KeyStatus::UnexpectedError {
            match outcome.unexpected_errors.first() {
                Some(message) => format!("{line}: {message}"),
                None => line.to_string(),
            }
        } else {
            line.to_string()
        };

        if color {
            let _ = writeln!(out, "  {}", annotated.red());
        } else {
            let _ = writeln!(out, "  {annotated}");
        }
    }
}

fn render_summary(out: &mut String, report: &AggregateReport) {
    for kind in BucketKind::ALL {
        let Some(members) = report.buckets.get(&kind) else {
            continue;
        };
        let _ = writeln!(out, "Number of {}: {}", kind.label(), members.len());
        for member in members {
            let _ = writeln!(out, "  - {member}");
        }
        out.push('\n');
    }

    let _ = writeln!(
        out,
        "Total available balance: {}",
        format_usd(report.total_available_usd)
    );
}
