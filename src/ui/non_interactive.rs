//! Plain UI for pipes and CI.

use super::theme::XeTheme;
use super::{OutputMode, SpinnerHandle, UserInterface};

/// UI implementation for non-interactive output.
///
/// Never draws spinners or colors. Spinner results are printed as plain
/// status lines so logs still show what happened.
pub struct NonInteractiveUI {
    mode: OutputMode,
    theme: XeTheme,
}

impl NonInteractiveUI {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            theme: XeTheme::plain(),
        }
    }
}

impl UserInterface for NonInteractiveUI {
    fn output_mode(&self) -> OutputMode {
        self.mode
    }

    fn theme(&self) -> &XeTheme {
        &self.theme
    }

    fn message(&mut self, msg: &str) {
        println!("{}", msg);
    }

    fn success(&mut self, msg: &str) {
        println!("{}", self.theme.format_success(msg));
    }

    fn warning(&mut self, msg: &str) {
        eprintln!("{}", self.theme.format_warning(msg));
    }

    fn error(&mut self, msg: &str) {
        eprintln!("{}", self.theme.format_error(msg));
    }

    fn data(&mut self, text: &str) {
        println!("{}", text);
    }

    fn start_spinner(&mut self, _message: &str) -> Box<dyn SpinnerHandle> {
        Box::new(LineSpinner)
    }

    fn show_header(&mut self, title: &str) {
        if self.mode.shows_chrome() {
            println!("{}", self.theme.format_header(title));
        }
    }

    fn show_hint(&mut self, hint: &str) {
        if self.mode.shows_chrome() {
            println!("  {}", hint);
        }
    }

    fn is_interactive(&self) -> bool {
        false
    }
}

/// Spinner stand-in that prints only the final line, on stderr like a
/// drawn spinner, so stdout stays clean for data.
struct LineSpinner;

impl SpinnerHandle for LineSpinner {
    fn set_message(&mut self, _msg: &str) {}

    fn finish_success(&mut self, msg: &str) {
        eprintln!("✓ {}", msg);
    }

    fn finish_warning(&mut self, msg: &str) {
        eprintln!("⚠ {}", msg);
    }

    fn finish_error(&mut self, msg: &str) {
        eprintln!("✗ {}", msg);
    }
}
