//! xe CLI entry point.

use std::fs;
use std::process::ExitCode;

use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use xecli::cli::{Cli, CommandDispatcher};
use xecli::config::AppPaths;
use xecli::ui::{create_ui, OutputMode};

/// Build a filter for one output.
///
/// Log level is controlled by:
/// 1. `--debug` flag sets level to DEBUG
/// 2. `RUST_LOG` environment variable (if set)
/// 3. `level`
fn filter(debug: bool, level: &str) -> EnvFilter {
    let directives = |level: &str| format!("xecli={level},xe={level}");
    if debug {
        EnvFilter::new(directives("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives(level)))
    }
}

/// Initialize the tracing subscriber.
///
/// Errors go to stderr (warnings too with `--verbose`); the full log is
/// appended to `xecli.log` in the data directory. The returned guard
/// flushes the file on drop.
fn init_tracing(debug: bool, verbose: bool, paths: &AppPaths) -> Option<WorkerGuard> {
    let appender = fs::create_dir_all(paths.log_dir()).ok().and_then(|_| {
        RollingFileAppender::builder()
            .rotation(Rotation::NEVER)
            .filename_prefix(paths.log_file_name())
            .build(paths.log_dir())
            .ok()
    });

    let (file_layer, guard) = match appender {
        Some(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(filter(debug, "info"));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let stderr_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(filter(debug, if verbose { "warn" } else { "error" }));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();

    if guard.is_none() {
        tracing::warn!("log file {} unavailable", paths.log_file().display());
    }
    guard
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.no_color {
        std::env::set_var("NO_COLOR", "1");
    }

    let paths = cli
        .home
        .clone()
        .map(AppPaths::new)
        .unwrap_or_else(AppPaths::discover);
    let _guard = init_tracing(cli.debug, cli.verbose, &paths);

    tracing::debug!("xe starting with args: {:?}", cli);

    let output_mode = OutputMode::from_flags(cli.verbose, cli.quiet);
    let is_interactive = std::env::var_os("CI").is_none();
    let mut ui = create_ui(is_interactive, output_mode);

    let dispatcher = CommandDispatcher::new(paths).with_timeout(cli.timeout);

    match dispatcher.dispatch(&cli, ui.as_mut()) {
        Ok(result) => ExitCode::from(result.exit_code as u8),
        Err(e) => {
            ui.error(&format!("Error: {}", e));
            ExitCode::from(1)
        }
    }
}
