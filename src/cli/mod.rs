//! Command-line interface for xecli.
//!
//! - [`args`] - Argument definitions using clap derive macros
//! - [`commands`] - Command implementations

pub mod args;
pub mod commands;

pub use args::{Cli, Commands, ConfigArgs, ToolsArgs, ToolsCommand};
pub use commands::{Command, CommandDispatcher, CommandResult};
