//! Progress bars for long sweeps.
//!
//! Bars are drawn on stderr and disappear entirely in quiet mode
//! (`--quiet` or `SERVICECUT_QUIET`) and when stderr is not a terminal, so
//! piped JSON output stays clean.

use indicatif::{ProgressBar, ProgressStyle};

pub const TEMPLATE_SWEEP: &str =
    "{spinner} {msg} [{bar:30}] {pos}/{len} sweep units ({percent}%) - {eta}";

/// Configuration for progress display behavior
#[derive(Debug, Clone, Default)]
pub struct ProgressConfig {
    /// Whether to suppress all progress output
    pub quiet_mode: bool,
}

impl ProgressConfig {
    /// Create progress configuration from environment and CLI arguments
    pub fn from_env(quiet: bool) -> Self {
        let env_quiet = std::env::var("SERVICECUT_QUIET").is_ok();
        Self {
            quiet_mode: quiet || env_quiet,
        }
    }

    /// Determine if progress bars should be displayed
    pub fn should_show_progress(&self) -> bool {
        if self.quiet_mode {
            return false;
        }

        use std::io::IsTerminal;
        std::io::stderr().is_terminal()
    }

    /// A bar of `len` steps, or a hidden one when progress is off.
    pub fn create_bar(&self, len: u64, template: &str) -> ProgressBar {
        if !self.should_show_progress() {
            return ProgressBar::hidden();
        }

        let style = ProgressStyle::default_bar()
            .template(template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░  ");
        ProgressBar::new(len).with_style(style)
    }
}
