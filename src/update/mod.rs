//! Checking and updating installed tools.

pub mod coordinator;
pub mod summary;

pub use coordinator::{CheckReport, UpdateCoordinator};
pub use summary::{summarize, BatchSummary};
