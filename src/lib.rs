//! xecli - install, check and update the tools an organisation publishes.
//!
//! Every repository of the configured GitHub organisation is a tool. Tools
//! are installed from their latest release (or a branch), recorded in a
//! local registry, and later checked and updated against upstream.
//!
//! # Modules
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`config`] - Data directory layout and key/value settings
//! - [`error`] - Error types and result aliases
//! - [`fetch`] - Remote metadata and archive downloads
//! - [`install`] - All-or-nothing install and removal of one tool
//! - [`manager`] - The [`ToolManager`](manager::ToolManager) facade
//! - [`registry`] - Durable record of installed tools
//! - [`ui`] - Spinners, tables and terminal output
//! - [`update`] - Checks and batch updates
//! - [`version`] - Version identifier comparison
//!
//! # Example
//!
//! ```
//! use xecli::version::{compare, VersionStatus};
//!
//! assert_eq!(compare("1.2.0", "1.10.0"), VersionStatus::Outdated);
//! assert_eq!(compare("v2.0.0", "2.0.0"), VersionStatus::UpToDate);
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod install;
pub mod manager;
pub mod registry;
pub mod ui;
pub mod update;
pub mod version;

pub use error::{Result, XeError};
