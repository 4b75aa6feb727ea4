//! Shell completions generation.
//!
//! The `xe completions` command generates shell completion scripts.

use std::io::Write;

use crate::cli::args::{Cli, CompletionsArgs};
use crate::ui::UserInterface;
use clap::CommandFactory;
use clap_complete::Shell;

use super::dispatcher::{Command, CommandResult};

const BIN_NAME: &str = "xe";

/// The completions command implementation.
pub struct CompletionsCommand {
    args: CompletionsArgs,
}

impl CompletionsCommand {
    /// Create a new completions command.
    pub fn new(args: CompletionsArgs) -> Self {
        Self { args }
    }
}

/// Write the completion script for `shell` to `out`.
pub fn write_completions(shell: Shell, out: &mut dyn Write) {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, BIN_NAME, out);
}

impl Command for CompletionsCommand {
    fn execute(&self, _ui: &mut dyn UserInterface) -> crate::error::Result<CommandResult> {
        write_completions(self.args.shell, &mut std::io::stdout());
        Ok(CommandResult::success())
    }
}
