//! Check command implementation.

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use crate::cli::args::{CheckArgs, OutputFormat};
use crate::core::aggregate::aggregate;
use crate::core::batch::check_keys;
use crate::core::evaluator::Evaluator;
use crate::core::probes::VendorClient;
use crate::error::{KeyvetError, Result};
use crate::render::robot::{self, CheckPayload, RobotOutput};
use crate::render::{render_transcript, write_report_files};
use crate::storage::config::ResolvedConfig;

/// Execute the check command.
///
/// # Errors
///
/// Returns error for unusable configuration or input, or when the result
/// files cannot be written. Per-credential failures never surface here —
/// they are classified into outcomes.
pub async fn execute(
    args: &CheckArgs,
    format: OutputFormat,
    pretty: bool,
    no_color: bool,
) -> Result<()> {
    let config = ResolvedConfig::resolve(args)?;

    let credentials = read_credentials(args.input.as_deref())?;
    if credentials.is_empty() {
        return Err(KeyvetError::Input("no credentials provided".to_string()));
    }

    tracing::info!(
        count = credentials.len(),
        concurrency = config.concurrency,
        api_base = %config.api_base,
        "Starting batch check"
    );

    let vendor = VendorClient::new(&config.api_base, config.timeout, config.retry)?;
    let evaluator = Arc::new(Evaluator::new(vendor, config.desired_models.clone()));

    let outcomes = check_keys(&evaluator, &credentials, config.concurrency).await;
    let report = aggregate(&outcomes);

    match format {
        OutputFormat::Human => {
            println!("{}", render_transcript(&outcomes, &report, !no_color));
        }
        OutputFormat::Json => {
            let payload = CheckPayload::new(outcomes, &report);
            let output = RobotOutput::new("check", payload);
            let rendered = if pretty {
                robot::render_json_pretty(&output)?
            } else {
                robot::render_json(&output)?
            };
            println!("{rendered}");
        }
    }

    if !args.no_files {
        write_report_files(&config.output_dir, &report)?;
    }

    Ok(())
}

/// Read the credential list from a file or stdin: one per line,
/// whitespace-trimmed, blanks skipped, order preserved.
fn read_credentials(input: Option<&Path>) -> Result<Vec<String>> {
    let content = match input {
        Some(path) => std::fs::read_to_string(path).map_err(|e| {
            KeyvetError::Input(format!("cannot read {}: {e}", path.display()))
        })?,
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ToString::to_string)
        .collect())
}
