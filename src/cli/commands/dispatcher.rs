//! Command dispatching.
//!
//! This module provides the core command infrastructure:
//! - [`Command`] trait for implementing commands
//! - [`CommandResult`] for uniform result reporting
//! - [`CommandDispatcher`] for routing CLI subcommands

use crate::cli::args::{Cli, Commands};
use crate::config::{AppPaths, Config};
use crate::error::Result;
use crate::ui::UserInterface;

/// Trait for command implementations.
///
/// Each CLI subcommand implements this trait to provide its execution logic.
pub trait Command {
    /// Execute the command.
    ///
    /// # Arguments
    ///
    /// * `ui` - User interface for displaying output
    ///
    /// # Returns
    ///
    /// A [`CommandResult`] indicating success/failure and exit code.
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult>;
}

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult {
    /// Whether the command succeeded.
    pub success: bool,

    /// Exit code to use (0 for success, non-zero for failure).
    pub exit_code: i32,
}

impl CommandResult {
    /// Create a successful result.
    pub fn success() -> Self {
        Self {
            success: true,
            exit_code: 0,
        }
    }

    /// Create a failure result.
    pub fn failure(exit_code: i32) -> Self {
        Self {
            success: false,
            exit_code,
        }
    }

    /// Success unless `failed`, in which case exit code 1.
    pub fn from_failed(failed: bool) -> Self {
        if failed {
            Self::failure(1)
        } else {
            Self::success()
        }
    }
}

/// Dispatches CLI commands to their implementations.
pub struct CommandDispatcher {
    paths: AppPaths,
    timeout: Option<u64>,
}

impl CommandDispatcher {
    /// Create a new dispatcher for the given data directory.
    pub fn new(paths: AppPaths) -> Self {
        Self {
            paths,
            timeout: None,
        }
    }

    /// Override the configured network timeout.
    pub fn with_timeout(mut self, secs: Option<u64>) -> Self {
        self.timeout = secs;
        self
    }

    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    /// Load configuration with command-line overrides applied.
    pub fn load_config(&self) -> Result<Config> {
        let config = Config::load(&self.paths)?;
        match self.timeout {
            Some(secs) => config.with_override("timeout_secs", &secs.to_string()),
            None => Ok(config),
        }
    }

    /// Dispatch and execute a command.
    pub fn dispatch(&self, cli: &Cli, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        match &cli.command {
            Commands::Setup => {
                let cmd = super::setup::SetupCommand::new(self.load_config()?);
                cmd.execute(ui)
            }
            Commands::Tools(args) => {
                let cmd =
                    super::tools::ToolsCommand::new(self.load_config()?, args.command.clone());
                cmd.execute(ui)
            }
            Commands::Config(args) => {
                let cmd =
                    super::config::ConfigCommand::new(self.load_config()?, args.command.clone());
                cmd.execute(ui)
            }
            Commands::Completions(args) => {
                let cmd = super::completions::CompletionsCommand::new(args.clone());
                cmd.execute(ui)
            }
        }
    }
}
