//! Shared display helpers for tool outcomes.
//!
//! Used by every `tools` subcommand so results read the same whether they
//! come from a single operation or a batch.

use crate::install::{OperationResult, Outcome};
use crate::registry::ToolRecord;
use crate::ui::{SpinnerHandle, UserInterface};
use crate::update::BatchSummary;

const SHORT_SHA_LEN: usize = 7;

/// Abbreviate full commit hashes; other versions are returned unchanged.
pub fn short_version(version: &str) -> &str {
    let is_sha = version.len() == 40 && version.chars().all(|c| c.is_ascii_hexdigit());
    if is_sha {
        &version[..SHORT_SHA_LEN]
    } else {
        version
    }
}

fn version_of(value: &Option<String>) -> &str {
    value.as_deref().map(short_version).unwrap_or("?")
}

/// One-line description of an operation result.
pub fn outcome_line(result: &OperationResult) -> String {
    let name = &result.name;
    match result.outcome {
        Outcome::Installed => format!("{} {} installed", name, version_of(&result.version)),
        Outcome::Updated => format!(
            "{} updated {} -> {}",
            name,
            version_of(&result.previous_version),
            version_of(&result.version)
        ),
        Outcome::UpToDate => format!("{} {} is up to date", name, version_of(&result.version)),
        Outcome::Removed => format!("{} {} removed", name, version_of(&result.previous_version)),
        Outcome::Failed => format!(
            "{} failed: {}",
            name,
            result.error_detail.as_deref().unwrap_or("unknown error")
        ),
    }
}

/// Finish a spinner with the result of the operation it tracked.
pub fn finish_spinner(spinner: &mut dyn SpinnerHandle, result: &OperationResult) {
    let line = outcome_line(result);
    match result.outcome {
        Outcome::Failed => spinner.finish_error(&line),
        Outcome::UpToDate => spinner.finish_warning(&line),
        _ => spinner.finish_success(&line),
    }
}

/// Print where a tool's artifact lives and its checksum. Verbose mode only.
pub fn show_detail(ui: &mut dyn UserInterface, record: &ToolRecord) {
    if !ui.output_mode().shows_detail() {
        return;
    }
    let theme = ui.theme().clone();
    let path = record.artifact_path().display().to_string();
    ui.message(&format!("  {}", theme.format_key_value("Path", &path, 8)));
    if let Some(checksum) = &record.checksum {
        ui.message(&format!("  {}", theme.format_key_value("Checksum", checksum, 8)));
    }
}

/// Print a result line, styled by outcome.
pub fn show_outcome(ui: &mut dyn UserInterface, result: &OperationResult) {
    let line = format!("  {}", outcome_line(result));
    match result.outcome {
        Outcome::Failed => ui.error(&line),
        Outcome::UpToDate => ui.message(&line),
        _ => ui.success(&line),
    }
}

/// Print the totals line of a batch.
pub fn show_summary(ui: &mut dyn UserInterface, summary: &BatchSummary) {
    let mut parts = Vec::new();
    for (count, label) in [
        (summary.installed, "installed"),
        (summary.updated, "updated"),
        (summary.up_to_date, "up to date"),
        (summary.removed, "removed"),
        (summary.failed, "failed"),
    ] {
        if count > 0 {
            parts.push(format!("{} {}", count, label));
        }
    }

    let line = format!("{} tools: {}", summary.total, parts.join(", "));
    if summary.has_failures() {
        ui.warning(&line);
        ui.show_hint(&format!(
            "Failed: {}. Retry one with 'xe tools update NAME'",
            summary.failed_names.join(", ")
        ));
    } else {
        ui.success(&line);
    }
}
