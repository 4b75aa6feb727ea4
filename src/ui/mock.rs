//! Mock UI implementation for testing.
//!
//! `MockUI` implements the `UserInterface` trait and captures all
//! interactions for later assertion.
//!
//! # Example
//!
//! ```
//! use xecli::ui::{MockUI, UserInterface};
//!
//! let mut ui = MockUI::new();
//! ui.message("Checking tools");
//! ui.success("fd installed");
//!
//! assert!(ui.has_message("Checking"));
//! assert!(ui.has_success("fd installed"));
//! ```

use std::sync::{Arc, Mutex, PoisonError};

use super::theme::XeTheme;
use super::{OutputMode, SpinnerHandle, UserInterface};

/// Final state of a spinner started on a [`MockUI`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpinnerEnd {
    Running,
    Success(String),
    Warning(String),
    Error(String),
}

/// Mock UI implementation for testing.
#[derive(Debug)]
pub struct MockUI {
    mode: OutputMode,
    theme: XeTheme,
    messages: Vec<String>,
    successes: Vec<String>,
    warnings: Vec<String>,
    errors: Vec<String>,
    data: Vec<String>,
    headers: Vec<String>,
    hints: Vec<String>,
    spinners: Vec<(String, Arc<Mutex<SpinnerEnd>>)>,
}

impl Default for MockUI {
    fn default() -> Self {
        Self::new()
    }
}

impl MockUI {
    /// Create a new MockUI with Normal output mode.
    pub fn new() -> Self {
        Self::with_mode(OutputMode::Normal)
    }

    /// Create a new MockUI with a specific output mode.
    pub fn with_mode(mode: OutputMode) -> Self {
        Self {
            mode,
            theme: XeTheme::plain(),
            messages: Vec::new(),
            successes: Vec::new(),
            warnings: Vec::new(),
            errors: Vec::new(),
            data: Vec::new(),
            headers: Vec::new(),
            hints: Vec::new(),
            spinners: Vec::new(),
        }
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn successes(&self) -> &[String] {
        &self.successes
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn hints(&self) -> &[String] {
        &self.hints
    }

    /// Everything written with `data`, joined by newlines.
    pub fn data_output(&self) -> String {
        self.data.join("\n")
    }

    /// Spinner start messages with their final state.
    pub fn spinners(&self) -> Vec<(String, SpinnerEnd)> {
        self.spinners
            .iter()
            .map(|(msg, end)| {
                let end = end.lock().unwrap_or_else(PoisonError::into_inner).clone();
                (msg.clone(), end)
            })
            .collect()
    }

    pub fn has_message(&self, msg: &str) -> bool {
        self.messages.iter().any(|m| m.contains(msg))
    }

    pub fn has_success(&self, msg: &str) -> bool {
        self.successes.iter().any(|m| m.contains(msg))
            || self
                .spinners()
                .iter()
                .any(|(_, end)| matches!(end, SpinnerEnd::Success(m) if m.contains(msg)))
    }

    pub fn has_warning(&self, msg: &str) -> bool {
        self.warnings.iter().any(|m| m.contains(msg))
            || self
                .spinners()
                .iter()
                .any(|(_, end)| matches!(end, SpinnerEnd::Warning(m) if m.contains(msg)))
    }

    pub fn has_error(&self, msg: &str) -> bool {
        self.errors.iter().any(|m| m.contains(msg))
            || self
                .spinners()
                .iter()
                .any(|(_, end)| matches!(end, SpinnerEnd::Error(m) if m.contains(msg)))
    }
}

impl UserInterface for MockUI {
    fn output_mode(&self) -> OutputMode {
        self.mode
    }

    fn theme(&self) -> &XeTheme {
        &self.theme
    }

    fn message(&mut self, msg: &str) {
        self.messages.push(msg.to_string());
    }

    fn success(&mut self, msg: &str) {
        self.successes.push(msg.to_string());
    }

    fn warning(&mut self, msg: &str) {
        self.warnings.push(msg.to_string());
    }

    fn error(&mut self, msg: &str) {
        self.errors.push(msg.to_string());
    }

    fn data(&mut self, text: &str) {
        self.data.push(text.to_string());
    }

    fn start_spinner(&mut self, message: &str) -> Box<dyn SpinnerHandle> {
        let end = Arc::new(Mutex::new(SpinnerEnd::Running));
        self.spinners.push((message.to_string(), Arc::clone(&end)));
        Box::new(MockSpinner { end })
    }

    fn show_header(&mut self, title: &str) {
        self.headers.push(title.to_string());
    }

    fn show_hint(&mut self, hint: &str) {
        self.hints.push(hint.to_string());
    }

    fn is_interactive(&self) -> bool {
        false
    }
}

/// Spinner handle returned by [`MockUI`].
pub struct MockSpinner {
    end: Arc<Mutex<SpinnerEnd>>,
}

impl MockSpinner {
    fn set(&self, end: SpinnerEnd) {
        *self.end.lock().unwrap_or_else(PoisonError::into_inner) = end;
    }
}

impl SpinnerHandle for MockSpinner {
    fn set_message(&mut self, _msg: &str) {}

    fn finish_success(&mut self, msg: &str) {
        self.set(SpinnerEnd::Success(msg.to_string()));
    }

    fn finish_warning(&mut self, msg: &str) {
        self.set(SpinnerEnd::Warning(msg.to_string()));
    }

    fn finish_error(&mut self, msg: &str) {
        self.set(SpinnerEnd::Error(msg.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_messages() {
        let mut ui = MockUI::new();
        ui.message("hello");
        ui.warning("careful");
        ui.error("broken");
        ui.data("{\"a\":1}");
        ui.show_header("Tools");
        ui.show_hint("Run xe tools update --all");

        assert!(ui.has_message("hello"));
        assert!(ui.has_warning("careful"));
        assert!(ui.has_error("broken"));
        assert_eq!(ui.data_output(), "{\"a\":1}");
        assert_eq!(ui.headers(), ["Tools"]);
        assert_eq!(ui.hints().len(), 1);
    }

    #[test]
    fn records_spinner_outcome() {
        let mut ui = MockUI::new();
        let mut spinner = ui.start_spinner("Installing fd...");
        spinner.finish_success("fd installed");

        assert_eq!(
            ui.spinners(),
            vec![(
                "Installing fd...".to_string(),
                SpinnerEnd::Success("fd installed".to_string())
            )]
        );
        assert!(ui.has_success("fd installed"));
    }

    #[test]
    fn unfinished_spinner_is_running() {
        let mut ui = MockUI::with_mode(OutputMode::Quiet);
        let _spinner = ui.start_spinner("Checking...");
        assert_eq!(ui.spinners()[0].1, SpinnerEnd::Running);
        assert_eq!(ui.output_mode(), OutputMode::Quiet);
    }
}
