//! Tools command implementation.
//!
//! `xe tools list|install|check|update|remove`. Every subcommand opens a
//! [`ToolManager`]; a corrupt registry stops the command before anything
//! is touched.

use std::sync::Arc;

use anyhow::Context;
use serde::Serialize;

use crate::cli::args::{
    CheckArgs, InstallArgs, ListArgs, RemoveArgs, ToolsCommand as Action, UpdateArgs,
};
use crate::config::Config;
use crate::error::{Result, XeError};
use crate::fetch::Fetcher;
use crate::install::{OperationResult, Outcome};
use crate::manager::ToolManager;
use crate::registry::ToolRecord;
use crate::ui::{Table, UserInterface, XeTheme};
use crate::update::{summarize, BatchSummary, CheckReport};
use crate::version::VersionStatus;

use super::dispatcher::{Command, CommandResult};
use super::display;

/// The tools command implementation.
pub struct ToolsCommand {
    config: Config,
    action: Action,
    fetcher: Option<Arc<dyn Fetcher>>,
}

impl ToolsCommand {
    /// Create a tools command backed by the GitHub API.
    pub fn new(config: Config, action: Action) -> Self {
        Self {
            config,
            action,
            fetcher: None,
        }
    }

    /// Use a custom fetcher instead of the GitHub API.
    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    fn open_manager(&self) -> Result<ToolManager> {
        match &self.fetcher {
            Some(fetcher) => ToolManager::with_fetcher(&self.config, Arc::clone(fetcher)),
            None => ToolManager::open(&self.config),
        }
    }

    fn list(
        &self,
        manager: &ToolManager,
        args: &ListArgs,
        ui: &mut dyn UserInterface,
    ) -> Result<CommandResult> {
        if args.available {
            return self.list_available(manager, args, ui);
        }

        let records = manager.list_tools();
        if args.json {
            ui.data(&to_json(&records)?);
            return Ok(CommandResult::success());
        }

        if records.is_empty() {
            ui.message("No tools installed");
            ui.show_hint("Run 'xe tools list --available' to see what can be installed");
            return Ok(CommandResult::success());
        }

        ui.data(&installed_table(&records).render());
        Ok(CommandResult::success())
    }

    fn list_available(
        &self,
        manager: &ToolManager,
        args: &ListArgs,
        ui: &mut dyn UserInterface,
    ) -> Result<CommandResult> {
        let mut spinner = ui.start_spinner("Fetching available tools");
        let tools = match manager.available_tools() {
            Ok(tools) => {
                spinner.finish_success(&format!("{} tools available", tools.len()));
                tools
            }
            Err(e) => {
                spinner.finish_error(&format!("Could not list tools: {}", e));
                return Ok(CommandResult::failure(1));
            }
        };

        if args.json {
            ui.data(&to_json(&tools)?);
            return Ok(CommandResult::success());
        }

        let mut table = Table::new(&["Name", "Description"]);
        for tool in &tools {
            table.add_row([tool.name.as_str(), tool.description.as_deref().unwrap_or("")]);
        }
        if !table.is_empty() {
            ui.data(&table.render());
        }
        Ok(CommandResult::success())
    }

    fn install(
        &self,
        manager: &ToolManager,
        args: &InstallArgs,
        ui: &mut dyn UserInterface,
    ) -> CommandResult {
        let target = match &args.branch {
            Some(branch) => format!("{} ({})", args.name, branch),
            None => args.name.clone(),
        };
        let mut spinner = ui.start_spinner(&format!("Installing {}", target));
        let result = manager.install_tool(&args.name, args.branch.as_deref());
        display::finish_spinner(spinner.as_mut(), &result);
        show_installed_detail(manager, &result, ui);

        CommandResult::from_failed(result.is_failed())
    }

    fn check(
        &self,
        manager: &ToolManager,
        args: &CheckArgs,
        ui: &mut dyn UserInterface,
    ) -> Result<CommandResult> {
        let reports: Vec<CheckReport> = match &args.name {
            Some(name) => match manager.check_tool(name) {
                Ok(report) => vec![report],
                Err(e @ XeError::NotInstalled { .. }) => {
                    ui.error(&e.to_string());
                    ui.show_hint(&format!("Install it with 'xe tools install {}'", name));
                    return Ok(CommandResult::failure(1));
                }
                Err(e) => vec![CheckReport::unknown(name, manager.tool(name).as_ref(), &e)],
            },
            None => {
                let mut spinner = ui.start_spinner("Checking installed tools");
                let reports: Vec<_> = manager.check_all_tools().into_values().collect();
                spinner.finish_success(&format!("Checked {} tools", reports.len()));
                reports
            }
        };

        // One named tool that could not be checked is an error. In a sweep
        // it only degrades to unknown.
        let failed = args.name.is_some() && reports.iter().any(|r| r.error.is_some());

        if args.json {
            ui.data(&to_json(&reports)?);
            return Ok(CommandResult::from_failed(failed));
        }

        if reports.is_empty() {
            ui.message("No tools installed");
            return Ok(CommandResult::success());
        }

        let table = check_table(&reports, ui.theme());
        ui.data(&table.render());

        for report in &reports {
            if let Some(error) = &report.error {
                ui.warning(&format!("{}: {}", report.name, error));
            }
        }

        let outdated = reports
            .iter()
            .filter(|r| r.status == VersionStatus::Outdated)
            .count();
        if outdated > 0 {
            ui.show_hint(&format!(
                "{} outdated. Run 'xe tools update --all' to update",
                outdated
            ));
        }

        Ok(CommandResult::from_failed(failed))
    }

    fn update(
        &self,
        manager: &ToolManager,
        args: &UpdateArgs,
        ui: &mut dyn UserInterface,
    ) -> Result<CommandResult> {
        let results = match &args.name {
            Some(name) => {
                let mut spinner = ui.start_spinner(&format!("Updating {}", name));
                let result = manager.update_tool(name);
                display::finish_spinner(spinner.as_mut(), &result);
                if !args.json {
                    show_installed_detail(manager, &result, ui);
                }
                vec![result]
            }
            None => {
                let mut spinner = ui.start_spinner("Updating installed tools");
                let results = manager.update_all_tools();
                spinner.finish_success(&format!("Processed {} tools", results.len()));
                results
            }
        };

        let summary = summarize(&results);
        if args.json {
            let report = UpdateReport {
                results: &results,
                summary: &summary,
            };
            ui.data(&to_json(&report)?);
        } else if args.name.is_none() {
            if results.is_empty() {
                ui.message("No tools installed");
            } else {
                for result in &results {
                    display::show_outcome(ui, result);
                }
                display::show_summary(ui, &summary);
            }
        }

        Ok(CommandResult::from_failed(summary.has_failures()))
    }

    fn remove(
        &self,
        manager: &ToolManager,
        args: &RemoveArgs,
        ui: &mut dyn UserInterface,
    ) -> CommandResult {
        let mut spinner = ui.start_spinner(&format!("Removing {}", args.name));
        let result = manager.remove_tool(&args.name);
        display::finish_spinner(spinner.as_mut(), &result);
        CommandResult::from_failed(result.is_failed())
    }
}

impl Command for ToolsCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let manager = match self.open_manager() {
            Ok(manager) => manager,
            Err(e @ XeError::CorruptRegistry { .. }) => {
                ui.error(&e.to_string());
                return Ok(CommandResult::failure(1));
            }
            Err(e) => return Err(e),
        };

        for name in &manager.recovery().restored {
            ui.warning(&format!("Restored {} after an interrupted operation", name));
        }

        match &self.action {
            Action::List(args) => self.list(&manager, args, ui),
            Action::Install(args) => Ok(self.install(&manager, args, ui)),
            Action::Check(args) => self.check(&manager, args, ui),
            Action::Update(args) => self.update(&manager, args, ui),
            Action::Remove(args) => Ok(self.remove(&manager, args, ui)),
        }
    }
}

/// JSON shape of `tools update --json`.
#[derive(Serialize)]
struct UpdateReport<'a> {
    results: &'a [OperationResult],
    summary: &'a BatchSummary,
}

fn show_installed_detail(
    manager: &ToolManager,
    result: &OperationResult,
    ui: &mut dyn UserInterface,
) {
    if matches!(result.outcome, Outcome::Installed | Outcome::Updated) {
        if let Some(record) = manager.tool(&result.name) {
            display::show_detail(ui, &record);
        }
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value).context("Failed to serialize output")?)
}

fn installed_table(records: &[ToolRecord]) -> Table {
    let mut table = Table::new(&["Name", "Version", "Branch", "OS", "Installed"]);
    for record in records {
        table.add_row([
            record.name.clone(),
            display::short_version(&record.version).to_string(),
            record.branch_label().to_string(),
            record.os.clone(),
            record.installed_at.format("%Y-%m-%d %H:%M").to_string(),
        ]);
    }
    table
}

fn check_table(reports: &[CheckReport], theme: &XeTheme) -> Table {
    let version = |v: &Option<String>| {
        v.as_deref()
            .map(display::short_version)
            .unwrap_or("-")
            .to_string()
    };

    let mut table = Table::new(&["Name", "Branch", "Installed", "Latest", "Status"]);
    for report in reports {
        table.add_row([
            report.name.clone(),
            report.branch.clone().unwrap_or_else(|| "default".to_string()),
            version(&report.installed),
            version(&report.latest),
            theme.format_status(report.status),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppPaths;
    use crate::fetch::{MockFailure, MockFetcher};
    use crate::ui::{MockUI, OutputMode, SpinnerEnd};
    use tempfile::TempDir;

    struct Fixture {
        _temp: TempDir,
        config: Config,
        fetcher: Arc<MockFetcher>,
    }

    impl Fixture {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            let config = Config::empty(&AppPaths::new(temp.path()));
            Self {
                _temp: temp,
                config,
                fetcher: Arc::new(MockFetcher::new()),
            }
        }

        fn run(&self, args: &[&str]) -> (CommandResult, MockUI) {
            self.run_in(OutputMode::Normal, args)
        }

        fn run_in(&self, mode: OutputMode, args: &[&str]) -> (CommandResult, MockUI) {
            use clap::Parser;

            let argv: Vec<&str> = ["xe", "tools"]
                .into_iter()
                .chain(args.iter().copied())
                .collect();
            let cli = crate::cli::args::Cli::parse_from(argv);
            let action = match cli.command {
                crate::cli::args::Commands::Tools(tools) => tools.command,
                other => panic!("not a tools command: {:?}", other),
            };

            let cmd = ToolsCommand::new(self.config.clone(), action)
                .with_fetcher(self.fetcher.clone() as Arc<dyn Fetcher>);
            let mut ui = MockUI::with_mode(mode);
            let result = cmd.execute(&mut ui).unwrap();
            (result, ui)
        }
    }

    #[test]
    fn list_empty_shows_hint() {
        let fx = Fixture::new();
        let (result, ui) = fx.run(&["list"]);

        assert!(result.success);
        assert!(ui.has_message("No tools installed"));
        assert_eq!(ui.hints().len(), 1);
    }

    #[test]
    fn install_then_list() {
        let fx = Fixture::new();
        fx.fetcher.publish("fd", None, "1.0.0", b"fd");

        let (result, ui) = fx.run(&["install", "fd"]);
        assert!(result.success);
        assert_eq!(
            ui.spinners(),
            [(
                "Installing fd".to_string(),
                SpinnerEnd::Success("fd 1.0.0 installed".to_string())
            )]
        );

        let (_, ui) = fx.run(&["list"]);
        let table = ui.data_output();
        assert!(table.contains("fd"));
        assert!(table.contains("1.0.0"));
        assert!(table.contains(std::env::consts::OS));
    }

    #[test]
    fn install_failure_exits_non_zero() {
        let fx = Fixture::new();
        let (result, ui) = fx.run(&["install", "missing"]);

        assert_eq!(result.exit_code, 1);
        assert!(ui.has_error("missing failed"));
    }

    #[test]
    fn list_json() {
        let fx = Fixture::new();
        fx.fetcher.publish("fd", Some("dev"), "abc123", b"fd");
        fx.run(&["install", "fd", "--branch", "dev"]);

        let (_, ui) = fx.run(&["list", "--json"]);
        let json: serde_json::Value = serde_json::from_str(&ui.data_output()).unwrap();

        assert_eq!(json[0]["name"], "fd");
        assert_eq!(json[0]["branch"], "dev");
        assert_eq!(json[0]["version"], "abc123");
    }

    #[test]
    fn list_available_table() {
        let fx = Fixture::new();
        fx.fetcher.publish("fd", None, "1.0.0", b"fd");
        fx.fetcher.describe("fd", "find files");

        let (result, ui) = fx.run(&["list", "--available"]);

        assert!(result.success);
        assert!(ui.data_output().contains("find files"));
        assert!(ui.has_success("1 tools available"));
    }

    #[test]
    fn check_single_outdated() {
        let fx = Fixture::new();
        fx.fetcher.publish("fd", None, "1.0.0", b"fd");
        fx.run(&["install", "fd"]);
        fx.fetcher.publish("fd", None, "1.2.0", b"fd-new");

        let (result, ui) = fx.run(&["check", "fd"]);

        assert!(result.success);
        assert!(ui.data_output().contains("outdated"));
        assert!(ui.hints().iter().any(|h| h.contains("1 outdated")));
    }

    #[test]
    fn check_unregistered_fails() {
        let fx = Fixture::new();
        let (result, ui) = fx.run(&["check", "fd"]);

        assert_eq!(result.exit_code, 1);
        assert!(ui.has_error("fd is not installed"));
    }

    #[test]
    fn check_single_fetch_failure_fails() {
        let fx = Fixture::new();
        fx.fetcher.publish("fd", None, "1.0.0", b"fd");
        fx.run(&["install", "fd"]);
        fx.fetcher.fail_meta("fd", MockFailure::Timeout);

        let (result, ui) = fx.run(&["check", "fd"]);

        assert_eq!(result.exit_code, 1);
        let table = ui.data_output();
        assert!(table.contains("unknown"));
        assert!(table.contains("1.0.0"));
        assert!(ui.has_warning("Timed out"));
    }

    #[test]
    fn check_single_fetch_failure_json() {
        let fx = Fixture::new();
        fx.fetcher.publish("fd", None, "1.0.0", b"fd");
        fx.run(&["install", "fd"]);
        fx.fetcher.fail_meta("fd", MockFailure::Network);

        let (result, ui) = fx.run(&["check", "fd", "--json"]);
        let json: serde_json::Value = serde_json::from_str(&ui.data_output()).unwrap();

        assert_eq!(result.exit_code, 1);
        assert_eq!(json[0]["status"], "unknown");
        assert_eq!(json[0]["installed"], "1.0.0");
        assert!(json[0]["error"].as_str().unwrap().contains("connection reset"));
    }

    #[test]
    fn verbose_install_shows_path_and_checksum() {
        let fx = Fixture::new();
        fx.fetcher.publish("fd", None, "1.0.0", b"fd");

        let (_, ui) = fx.run_in(OutputMode::Verbose, &["install", "fd"]);
        assert!(ui.messages().iter().any(|m| m.contains("fd-1.0.0.tar.gz")));
        assert!(ui.messages().iter().any(|m| m.contains("sha256:")));

        let (_, ui) = fx.run(&["install", "fd"]);
        assert!(ui.messages().is_empty());
    }

    #[test]
    fn check_all_degrades_to_unknown() {
        let fx = Fixture::new();
        fx.fetcher.publish("fd", None, "1.0.0", b"fd");
        fx.fetcher.publish("bat", None, "0.24.0", b"bat");
        fx.run(&["install", "fd"]);
        fx.run(&["install", "bat"]);
        fx.fetcher.fail_meta("bat", MockFailure::Network);

        let (result, ui) = fx.run(&["check", "--json"]);
        let json: serde_json::Value = serde_json::from_str(&ui.data_output()).unwrap();

        assert!(result.success);
        assert_eq!(json[0]["name"], "bat");
        assert_eq!(json[0]["status"], "unknown");
        assert_eq!(json[1]["status"], "up_to_date");
    }

    #[test]
    fn update_all_reports_each_tool() {
        let fx = Fixture::new();
        for name in ["bat", "fd", "rg"] {
            fx.fetcher.publish(name, None, "1.0.0", name.as_bytes());
            fx.run(&["install", name]);
        }
        fx.fetcher.publish("fd", None, "1.1.0", b"fd-new");
        fx.fetcher.fail_meta("rg", MockFailure::Timeout);

        let (result, ui) = fx.run(&["update", "--all"]);

        assert_eq!(result.exit_code, 1);
        assert!(ui.has_message("bat 1.0.0 is up to date"));
        assert!(ui.has_success("fd updated 1.0.0 -> 1.1.0"));
        assert!(ui.has_error("rg failed"));
        assert!(ui.has_warning("3 tools"));
    }

    #[test]
    fn update_json_includes_summary() {
        let fx = Fixture::new();
        fx.fetcher.publish("fd", None, "1.0.0", b"fd");
        fx.run(&["install", "fd"]);

        let (result, ui) = fx.run(&["update", "fd", "--json"]);
        let json: serde_json::Value = serde_json::from_str(&ui.data_output()).unwrap();

        assert!(result.success);
        assert_eq!(json["results"][0]["outcome"], "up_to_date");
        assert_eq!(json["summary"]["up_to_date"], 1);
    }

    #[test]
    fn remove_unknown_fails() {
        let fx = Fixture::new();
        let (result, ui) = fx.run(&["remove", "fd"]);

        assert_eq!(result.exit_code, 1);
        assert!(ui.has_error("fd is not installed"));
    }

    #[test]
    fn remove_installed() {
        let fx = Fixture::new();
        fx.fetcher.publish("fd", None, "1.0.0", b"fd");
        fx.run(&["install", "fd"]);

        let (result, ui) = fx.run(&["remove", "fd"]);

        assert!(result.success);
        assert!(ui.has_success("fd 1.0.0 removed"));
    }

    #[test]
    fn corrupt_registry_stops_command() {
        let fx = Fixture::new();
        std::fs::write(fx.config.paths().registry_file(), "{ broken").unwrap();
        fx.fetcher.publish("fd", None, "1.0.0", b"fd");

        let (result, ui) = fx.run(&["install", "fd"]);

        assert_eq!(result.exit_code, 1);
        assert!(ui.has_error("corrupt"));
        assert_eq!(fx.fetcher.download_count(), 0);
    }
}
