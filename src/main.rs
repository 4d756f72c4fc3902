//! keyvet - batch validator for OpenAI API credentials.
//!
//! CLI entry point.

#![forbid(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

use clap::Parser;
use std::process::ExitCode;

use keyvet::cli::{Cli, Commands};
use keyvet::core::logging;
use keyvet::storage::config::no_color_requested;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = cli
        .log_level
        .as_deref()
        .and_then(logging::LogLevel::from_arg)
        .or_else(|| logging::parse_log_level_from_env().map(logging::LogLevel::from_tracing_level))
        .unwrap_or_default();
    let log_format = if cli.json_output {
        logging::LogFormat::Json
    } else {
        logging::parse_log_format_from_env().unwrap_or_default()
    };
    let log_file = logging::parse_log_file_from_env();
    logging::init(log_level, log_format, log_file, cli.verbose);

    let result = run(cli).await;

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("Error: {e}");
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

async fn run(cli: Cli) -> keyvet::Result<()> {
    let format = cli.effective_format();
    let pretty = cli.pretty;
    let no_color = no_color_requested(cli.no_color);

    match cli.command {
        None => {
            print_quickstart();
            Ok(())
        }
        Some(Commands::Check(args)) => {
            keyvet::cli::check::execute(&args, format, pretty, no_color).await
        }
    }
}

/// Print quickstart help when no command is given.
fn print_quickstart() {
    println!(
        r#"keyvet - batch validator for OpenAI API credentials

Classify a batch of API keys by capability, quota state, and billing
status, and write categorized result files.

USAGE:
    keyvet [OPTIONS] <COMMAND>

COMMANDS:
    check           Check a batch of credentials

QUICK START:
    keyvet check --input keys.txt          # one key per line
    cat keys.txt | keyvet check            # same, from stdin
    keyvet check -i keys.txt --json        # JSON envelope output
    keyvet check -i keys.txt --no-files    # transcript only

For more help: keyvet --help
"#
    );
}
