//! CLI argument definitions.
//!
//! This module defines all CLI arguments using clap's derive macros.
//! The main entry point is the [`Cli`] struct.

use clap::{ArgGroup, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// xe - install, check and update xEclipsity tools.
#[derive(Debug, Parser)]
#[command(name = "xe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Data directory (registry, config, log and installed tools)
    #[arg(long, global = true, env = "XECLI_HOME", value_name = "DIR")]
    pub home: Option<PathBuf>,

    /// Show verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Network timeout in seconds (overrides the timeout_secs setting)
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create the data directory, registry and log file
    Setup,

    /// Install, check, update and remove tools
    Tools(ToolsArgs),

    /// Show or change settings
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Arguments for the `tools` command.
#[derive(Debug, Clone, clap::Args)]
pub struct ToolsArgs {
    #[command(subcommand)]
    pub command: ToolsCommand,
}

/// Tool lifecycle subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum ToolsCommand {
    /// List installed tools
    List(ListArgs),

    /// Install a tool, or reinstall it if already present
    Install(InstallArgs),

    /// Compare installed versions against the latest available
    Check(CheckArgs),

    /// Update a tool, or every installed tool with --all
    Update(UpdateArgs),

    /// Remove an installed tool
    Remove(RemoveArgs),
}

/// Arguments for `tools list`.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct ListArgs {
    /// List tools that can be installed instead
    #[arg(long)]
    pub available: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `tools install`.
#[derive(Debug, Clone, clap::Args)]
pub struct InstallArgs {
    /// Tool (repository) name
    pub name: String,

    /// Install from a branch instead of the latest release
    #[arg(short, long)]
    pub branch: Option<String>,
}

/// Arguments for `tools check`.
///
/// Without a name or `--all`, every installed tool is checked.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct CheckArgs {
    /// Tool to check
    #[arg(conflicts_with = "all")]
    pub name: Option<String>,

    /// Check every installed tool
    #[arg(long)]
    pub all: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `tools update`.
#[derive(Debug, Clone, Default, clap::Args)]
#[command(group(ArgGroup::new("target").required(true).args(["name", "all"])))]
pub struct UpdateArgs {
    /// Tool to update
    pub name: Option<String>,

    /// Update every installed tool
    #[arg(long)]
    pub all: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `tools remove`.
#[derive(Debug, Clone, clap::Args)]
pub struct RemoveArgs {
    /// Tool to remove
    pub name: String,
}

/// Arguments for the `config` command.
#[derive(Debug, Clone, clap::Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: Option<ConfigCommand>,
}

/// Settings subcommands. Defaults to `list`.
#[derive(Debug, Clone, Subcommand)]
pub enum ConfigCommand {
    /// Show every setting with its source
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print one setting
    Get { key: String },

    /// Store a setting in the config file
    Set { key: String, value: String },

    /// Remove a setting from the config file
    Unset { key: String },
}

/// Arguments for the `completions` command.
#[derive(Debug, Clone, clap::Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
