//! Configuration: file locations and the key/value settings store.
//!
//! The install engine only needs `download_dir`; the remaining keys
//! configure the GitHub fetcher and batch parallelism.

pub mod paths;
pub mod store;

pub use paths::AppPaths;
pub use store::{Config, ValueSource, KNOWN_KEYS};
