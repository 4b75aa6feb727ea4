//! Config command implementation.
//!
//! The `xe config` command shows and changes settings in
//! `<base>/config.yml`.

use anyhow::Context;
use serde::Serialize;

use crate::cli::args::ConfigCommand as Action;
use crate::config::Config;
use crate::error::Result;
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandResult};

/// The config command implementation.
pub struct ConfigCommand {
    config: Config,
    action: Action,
}

#[derive(Serialize)]
struct Entry<'a> {
    key: &'a str,
    value: Option<&'a str>,
    source: Option<&'a str>,
}

impl ConfigCommand {
    /// Create a new config command. Without an action, settings are listed.
    pub fn new(config: Config, action: Option<Action>) -> Self {
        Self {
            config,
            action: action.unwrap_or(Action::List { json: false }),
        }
    }

    fn list(&self, json: bool, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let entries = self.config.entries();

        if json {
            let rows: Vec<Entry> = entries
                .iter()
                .map(|(key, resolved)| Entry {
                    key: *key,
                    value: resolved.as_ref().map(|(v, _)| v.as_str()),
                    source: resolved.as_ref().map(|(_, s)| s.label()),
                })
                .collect();
            let text =
                serde_json::to_string_pretty(&rows).context("Failed to serialize settings")?;
            ui.data(&text);
            return Ok(CommandResult::success());
        }

        ui.message(&format!("# {}", self.config.paths().config_file().display()));
        let theme = ui.theme().clone();
        for (key, resolved) in &entries {
            let value = match resolved {
                Some((value, source)) => {
                    let source = format!("({})", source.label());
                    format!("{} {}", value, theme.dim.apply_to(source))
                }
                None => theme.dim.apply_to("(unset)").to_string(),
            };
            ui.data(&theme.format_key_value(key, &value, 14));
        }
        Ok(CommandResult::success())
    }
}

impl Command for ConfigCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        match &self.action {
            Action::List { json } => self.list(*json, ui),
            Action::Get { key } => match self.config.get(key) {
                Some(value) => {
                    ui.data(&value);
                    Ok(CommandResult::success())
                }
                None if key == "download_dir" => {
                    ui.data(&self.config.download_dir().display().to_string());
                    Ok(CommandResult::success())
                }
                None => {
                    ui.error(&format!("'{}' is not set", key));
                    Ok(CommandResult::failure(1))
                }
            },
            Action::Set { key, value } => {
                let mut config = self.config.clone();
                if let Err(e) = config.set(key, value) {
                    ui.error(&e.to_string());
                    return Ok(CommandResult::failure(1));
                }
                config.save()?;
                tracing::info!(%key, %value, "setting saved");
                ui.success(&format!("{} = {}", key, value.trim()));
                Ok(CommandResult::success())
            }
            Action::Unset { key } => {
                let mut config = self.config.clone();
                match config.unset(key) {
                    Ok(true) => {
                        config.save()?;
                        ui.success(&format!("{} unset", key));
                    }
                    Ok(false) => ui.message(&format!("{} was not set in the config file", key)),
                    Err(e) => {
                        ui.error(&e.to_string());
                        return Ok(CommandResult::failure(1));
                    }
                }
                Ok(CommandResult::success())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppPaths;
    use crate::ui::MockUI;
    use std::fs;
    use tempfile::TempDir;

    fn run(temp: &TempDir, action: Option<Action>) -> (CommandResult, MockUI) {
        let paths = AppPaths::new(temp.path());
        let config = Config::load_with_env(&paths, Default::default()).unwrap();
        let cmd = ConfigCommand::new(config, action);
        let mut ui = MockUI::new();
        let result = cmd.execute(&mut ui).unwrap();
        (result, ui)
    }

    #[test]
    fn list_shows_defaults() {
        let temp = TempDir::new().unwrap();
        let (result, ui) = run(&temp, None);

        assert!(result.success);
        let out = ui.data_output();
        assert!(out.contains("xEclipsity (default)"));
        assert!(out.contains("timeout_secs"));
        assert!(ui.has_message("config.yml"));
    }

    #[test]
    fn list_json() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("config.yml"), "jobs: 2\n").unwrap();

        let (_, ui) = run(&temp, Some(Action::List { json: true }));
        let json: serde_json::Value = serde_json::from_str(&ui.data_output()).unwrap();
        let jobs = json
            .as_array()
            .unwrap()
            .iter()
            .find(|e| e["key"] == "jobs")
            .unwrap();

        assert_eq!(jobs["value"], "2");
        assert_eq!(jobs["source"], "file");
    }

    #[test]
    fn set_then_get() {
        let temp = TempDir::new().unwrap();
        let set = Action::Set {
            key: "org".into(),
            value: "acme".into(),
        };
        let (result, ui) = run(&temp, Some(set));
        assert!(result.success);
        assert!(ui.has_success("org = acme"));

        let (result, ui) = run(&temp, Some(Action::Get { key: "org".into() }));
        assert!(result.success);
        assert_eq!(ui.data_output(), "acme");
    }

    #[test]
    fn set_rejects_invalid_value() {
        let temp = TempDir::new().unwrap();
        let set = Action::Set {
            key: "jobs".into(),
            value: "many".into(),
        };
        let (result, ui) = run(&temp, Some(set));

        assert_eq!(result.exit_code, 1);
        assert!(ui.has_error("positive integer"));
        assert!(!temp.path().join("config.yml").exists());
    }

    #[test]
    fn get_download_dir_falls_back_to_default() {
        let temp = TempDir::new().unwrap();
        let get = Action::Get {
            key: "download_dir".into(),
        };
        let (result, ui) = run(&temp, Some(get));

        assert!(result.success);
        assert_eq!(
            ui.data_output(),
            temp.path().join("tools").display().to_string()
        );
    }

    #[test]
    fn get_unknown_key_fails() {
        let temp = TempDir::new().unwrap();
        let (result, ui) = run(&temp, Some(Action::Get { key: "colour".into() }));

        assert_eq!(result.exit_code, 1);
        assert!(ui.has_error("'colour' is not set"));
    }

    #[test]
    fn unset_removes_value() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("config.yml"), "org: acme\n").unwrap();

        let (result, ui) = run(&temp, Some(Action::Unset { key: "org".into() }));
        assert!(result.success);
        assert!(ui.has_success("org unset"));

        let (_, ui) = run(&temp, Some(Action::Get { key: "org".into() }));
        assert_eq!(ui.data_output(), "xEclipsity");
    }
}
