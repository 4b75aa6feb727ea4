//! Output verbosity.

/// Output verbosity mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Show per-tool detail such as paths and checksums.
    Verbose,
    /// Show progress and status.
    #[default]
    Normal,
    /// Show results and errors only.
    Quiet,
}

impl OutputMode {
    /// Pick a mode from the global CLI flags.
    pub fn from_flags(verbose: bool, quiet: bool) -> Self {
        match (verbose, quiet) {
            (_, true) => Self::Quiet,
            (true, false) => Self::Verbose,
            (false, false) => Self::Normal,
        }
    }

    /// Check if this mode shows per-tool detail.
    pub fn shows_detail(&self) -> bool {
        matches!(self, Self::Verbose)
    }

    /// Check if this mode shows progress spinners.
    pub fn shows_spinners(&self) -> bool {
        matches!(self, Self::Verbose | Self::Normal)
    }

    /// Check if this mode shows headers and hints.
    pub fn shows_chrome(&self) -> bool {
        matches!(self, Self::Verbose | Self::Normal)
    }
}
