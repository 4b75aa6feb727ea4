//! Visual theme and styling.

use console::Style;

use crate::version::VersionStatus;

/// xecli's visual theme.
#[derive(Debug, Clone)]
pub struct XeTheme {
    /// Success messages and up-to-date tools (green).
    pub success: Style,
    /// Warnings and outdated tools (orange).
    pub warning: Style,
    /// Errors (red bold).
    pub error: Style,
    /// Tool names and running work (cyan).
    pub info: Style,
    /// Secondary text.
    pub dim: Style,
    /// Emphasis.
    pub highlight: Style,
    /// Headers.
    pub header: Style,
    /// Box-drawing borders.
    pub border: Style,
    /// Follow-up hints.
    pub hint: Style,
    /// Keys in key/value listings.
    pub key: Style,
}

impl Default for XeTheme {
    fn default() -> Self {
        Self::new()
    }
}

impl XeTheme {
    /// Create the default theme.
    pub fn new() -> Self {
        Self {
            success: Style::new().green(),
            warning: Style::new().color256(208),
            error: Style::new().red().bold(),
            info: Style::new().cyan(),
            dim: Style::new().dim(),
            highlight: Style::new().bold(),
            header: Style::new().bold().cyan(),
            border: Style::new().dim(),
            hint: Style::new().cyan().dim(),
            key: Style::new().bold(),
        }
    }

    /// Create a theme without colors (for non-TTY or --no-color).
    pub fn plain() -> Self {
        Self {
            success: Style::new(),
            warning: Style::new(),
            error: Style::new(),
            info: Style::new(),
            dim: Style::new(),
            highlight: Style::new(),
            header: Style::new(),
            border: Style::new(),
            hint: Style::new(),
            key: Style::new(),
        }
    }

    /// Pick the colored or plain theme.
    pub fn for_colors(colors: bool) -> Self {
        if colors {
            Self::new()
        } else {
            Self::plain()
        }
    }

    pub fn format_success(&self, msg: &str) -> String {
        self.success.apply_to(format!("✓ {}", msg)).to_string()
    }

    pub fn format_warning(&self, msg: &str) -> String {
        self.warning.apply_to(format!("⚠ {}", msg)).to_string()
    }

    pub fn format_error(&self, msg: &str) -> String {
        self.error.apply_to(format!("✗ {}", msg)).to_string()
    }

    /// Format a no-op result such as an up-to-date tool.
    pub fn format_unchanged(&self, msg: &str) -> String {
        self.dim.apply_to(format!("○ {}", msg)).to_string()
    }

    pub fn format_header(&self, title: &str) -> String {
        format!(
            "{} {}",
            self.header.apply_to("▸"),
            self.highlight.apply_to(title)
        )
    }

    /// Format an aligned `key  value` line.
    pub fn format_key_value(&self, key: &str, value: &str, width: usize) -> String {
        format!(
            "{}  {}",
            self.key.apply_to(format!("{:<width$}", key, width = width)),
            value
        )
    }

    /// Format a version status label in its color.
    pub fn format_status(&self, status: VersionStatus) -> String {
        let style = match status {
            VersionStatus::UpToDate => &self.success,
            VersionStatus::Outdated => &self.warning,
            VersionStatus::Unknown => &self.dim,
        };
        style.apply_to(status.label()).to_string()
    }
}

/// Check if colors should be enabled.
pub fn should_use_colors() -> bool {
    // https://no-color.org/
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }

    console::Term::stdout().is_term()
}
