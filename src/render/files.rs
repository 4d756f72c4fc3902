//! Categorized result files.
//!
//! One flat file per bucket family, a limit-tier file grouping valid
//! credentials under a composite key sorted ascending, and an error log
//! enumerating every unexpected error. All plain text, newline-joined.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::aggregate::{AggregateReport, BucketKind};
use crate::error::Result;

/// Name of the limit-tier grouping file.
pub const LIMIT_TIERS_FILE: &str = "limit_tiers.txt";

/// Name of the unexpected-error log.
pub const ERROR_LOG_FILE: &str = "unexpected_errors.log";

/// Write all result files into `dir`, creating it if needed.
///
/// Bucket files are written even when empty so a rerun always overwrites
/// stale results. The error log is only written when there is something to
/// report.
///
/// # Errors
///
/// Returns an I/O error if the directory or any file cannot be written.
pub fn write_report_files(dir: &Path, report: &AggregateReport) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let mut written = Vec::new();

    for kind in BucketKind::ALL {
        let Some(members) = report.buckets.get(&kind) else {
            continue;
        };

        let mut content = format!("{} ({})\n", kind.label(), members.len());
        for member in members {
            let _ = writeln!(content, "{member}");
        }

        let path = dir.join(format!("{}.txt", kind.file_stem()));
        fs::write(&path, content)?;
        written.push(path);
    }

    let mut tiers = String::new();
    for (tier, members) in &report.limit_tiers {
        let _ = writeln!(tiers, "== {} ==", tier.key());
        for member in members {
            let _ = writeln!(tiers, "{member}");
        }
        tiers.push('\n');
    }
    let tiers_path = dir.join(LIMIT_TIERS_FILE);
    fs::write(&tiers_path, tiers)?;
    written.push(tiers_path);

    if !report.unexpected.is_empty() {
        let mut log = String::new();
        for (credential, message) in &report.unexpected {
            let _ = writeln!(log, "{credential}: {message}");
        }
        let log_path = dir.join(ERROR_LOG_FILE);
        fs::write(&log_path, log)?;
        written.push(log_path);
    }

    tracing::info!(dir = %dir.display(), files = written.len(), "Wrote result files");
    Ok(written)
}
