//! Batch result aggregation.

use serde::Serialize;

use crate::install::{OperationResult, Outcome};

/// Counts per outcome for a batch of operations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub installed: usize,
    pub updated: usize,
    pub up_to_date: usize,
    pub removed: usize,
    pub failed: usize,
    pub failed_names: Vec<String>,
}

impl BatchSummary {
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// Process exit code for the batch.
    pub fn exit_code(&self) -> i32 {
        if self.has_failures() {
            1
        } else {
            0
        }
    }
}

/// Aggregate per-tool results.
pub fn summarize(results: &[OperationResult]) -> BatchSummary {
    results
        .iter()
        .fold(BatchSummary::default(), |mut summary, result| {
            summary.total += 1;
            match result.outcome {
                Outcome::Installed => summary.installed += 1,
                Outcome::Updated => summary.updated += 1,
                Outcome::UpToDate => summary.up_to_date += 1,
                Outcome::Removed => summary.removed += 1,
                Outcome::Failed => {
                    summary.failed += 1;
                    summary.failed_names.push(result.name.clone());
                }
            }
            summary
        })
}
