//! Setup command implementation.
//!
//! The `xe setup` command prepares the data directory: an empty registry,
//! the log file and the download directory. Existing files are kept.

use std::fs::{self, OpenOptions};

use crate::config::Config;
use crate::error::{Result, XeError};
use crate::registry::RegistryStore;
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandResult};

/// The setup command implementation.
pub struct SetupCommand {
    config: Config,
}

impl SetupCommand {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl Command for SetupCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let paths = self.config.paths();
        let download_dir = self.config.download_dir();

        fs::create_dir_all(paths.base()).map_err(|e| XeError::disk(paths.base(), e))?;
        fs::create_dir_all(&download_dir).map_err(|e| XeError::disk(&download_dir, e))?;

        let registry_file = paths.registry_file();
        let store = match RegistryStore::open(&registry_file) {
            Ok(store) => store,
            Err(e @ XeError::CorruptRegistry { .. }) => {
                ui.error(&e.to_string());
                return Ok(CommandResult::failure(1));
            }
            Err(e) => return Err(e),
        };
        if !registry_file.exists() {
            store.flush()?;
        }

        let log_file = paths.log_file();
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .map_err(|e| XeError::disk(&log_file, e))?;

        tracing::info!(base = %paths.base().display(), "setup complete");

        ui.show_header("xecli setup");
        let theme = ui.theme().clone();
        let rows = [
            ("Data", paths.base().display().to_string()),
            ("Registry", registry_file.display().to_string()),
            ("Config", paths.config_file().display().to_string()),
            ("Log", log_file.display().to_string()),
            ("Tools", download_dir.display().to_string()),
            (
                "Platform",
                format!("{} ({})", std::env::consts::OS, std::env::consts::ARCH),
            ),
        ];
        for (key, value) in rows {
            ui.message(&theme.format_key_value(key, &value, 10));
        }
        ui.success(&format!("Ready: {} tools installed", store.names().len()));

        Ok(CommandResult::success())
    }
}
