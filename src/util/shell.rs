//! Centralized shell output.
//!
//! All user-facing output goes through [`Shell`]:
//! - status lines (`   Compiling src/common`) on stderr
//! - a spinner for the active stage when stderr is a terminal
//! - one JSON [`BuildEvent`] per line on stdout in JSON mode
//!
//! JSON mode is exclusive: no human output is printed while it is active.

use std::fmt::Display;
use std::io::{self, IsTerminal, Write};
use std::sync::Mutex;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::builder::events::{BuildEvent, Stage, StageListener};

/// Shell output mode - Human and Json are mutually exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellMode {
    Human {
        verbosity: Verbosity,
        color: ColorChoice,
    },
    Json,
}

impl Default for ShellMode {
    fn default() -> Self {
        ShellMode::Human {
            verbosity: Verbosity::Normal,
            color: ColorChoice::Auto,
        }
    }
}

/// Output verbosity level (Human mode only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// --quiet: errors only, no spinner
    Quiet,
    #[default]
    Normal,
    /// --verbose: status lines only, no spinner
    Verbose,
}

/// Color output mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorChoice {
    #[default]
    Auto,
    Always,
    Never,
}

impl std::str::FromStr for ColorChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(ColorChoice::Auto),
            "always" => Ok(ColorChoice::Always),
            "never" => Ok(ColorChoice::Never),
            _ => Err(format!(
                "invalid color choice '{}'; expected 'auto', 'always', or 'never'",
                s
            )),
        }
    }
}

/// Status types for output messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    // In-progress statuses (cyan)
    Fetching,
    Configuring,
    Compiling,
    Installing,

    // Success statuses (green)
    Packaged,
    Finished,
    Removed,

    Info,
    Warning,
    Error,
}

impl Status {
    fn as_str(&self) -> &'static str {
        match self {
            Status::Fetching => "Fetching",
            Status::Configuring => "Configuring",
            Status::Compiling => "Compiling",
            Status::Installing => "Installing",
            Status::Packaged => "Packaged",
            Status::Finished => "Finished",
            Status::Removed => "Removed",
            Status::Info => "Info",
            Status::Warning => "Warning",
            Status::Error => "error",
        }
    }

    fn color_code(&self) -> &'static str {
        match self {
            Status::Fetching | Status::Configuring | Status::Compiling | Status::Installing => {
                "\x1b[1;36m"
            }
            Status::Packaged | Status::Finished | Status::Removed => "\x1b[1;32m",
            Status::Info => "\x1b[1;34m",
            Status::Warning => "\x1b[1;33m",
            Status::Error => "\x1b[1;31m",
        }
    }
}

impl From<Stage> for Status {
    fn from(stage: Stage) -> Self {
        match stage {
            Stage::Fetching => Status::Fetching,
            Stage::Configuring => Status::Configuring,
            Stage::Compiling => Status::Compiling,
            Stage::Installing => Status::Installing,
            Stage::Packaged => Status::Packaged,
        }
    }
}

/// Width status labels are right-aligned to.
const STATUS_WIDTH: usize = 12;

/// Central shell for all CLI output.
#[derive(Debug)]
pub struct Shell {
    mode: ShellMode,
    use_color: bool,
    /// Spinner for the active stage, if shown
    spinner: Mutex<Option<ProgressBar>>,
}

impl Shell {
    pub fn new(mode: ShellMode) -> Self {
        let use_color = match &mode {
            ShellMode::Json => false,
            ShellMode::Human { color, .. } => match color {
                ColorChoice::Auto => io::stderr().is_terminal(),
                ColorChoice::Always => true,
                ColorChoice::Never => false,
            },
        };

        Shell {
            mode,
            use_color,
            spinner: Mutex::new(None),
        }
    }

    /// Create a shell from CLI flags. JSON mode takes precedence over
    /// quiet/verbose.
    pub fn from_flags(quiet: bool, verbose: bool, color: ColorChoice, json: bool) -> Self {
        let mode = if json {
            ShellMode::Json
        } else {
            let verbosity = if quiet {
                Verbosity::Quiet
            } else if verbose {
                Verbosity::Verbose
            } else {
                Verbosity::Normal
            };
            ShellMode::Human { verbosity, color }
        };
        Shell::new(mode)
    }

    pub fn mode(&self) -> &ShellMode {
        &self.mode
    }

    pub fn is_quiet(&self) -> bool {
        matches!(
            self.mode,
            ShellMode::Human {
                verbosity: Verbosity::Quiet,
                ..
            }
        )
    }

    pub fn is_verbose(&self) -> bool {
        matches!(
            self.mode,
            ShellMode::Human {
                verbosity: Verbosity::Verbose,
                ..
            }
        )
    }

    pub fn is_json(&self) -> bool {
        matches!(self.mode, ShellMode::Json)
    }

    pub fn use_color(&self) -> bool {
        self.use_color
    }

    /// Print a status message: `{status:>12} {message}`.
    ///
    /// In quiet mode, only Error status is printed. In JSON mode nothing is.
    pub fn status(&self, status: Status, msg: impl Display) {
        if self.is_json() || (self.is_quiet() && status != Status::Error) {
            return;
        }

        let line = format!("{} {}", self.format_status(status), msg);
        match self.spinner.lock().ok().and_then(|s| s.clone()) {
            Some(pb) => pb.println(line),
            None => eprintln!("{}", line),
        }
    }

    pub fn note(&self, msg: impl Display) {
        self.status(Status::Info, msg);
    }

    pub fn warn(&self, msg: impl Display) {
        self.status(Status::Warning, msg);
    }

    /// Print an error. In JSON mode this is a `package-failed` event.
    pub fn error(&self, msg: impl Display, code: Option<String>) {
        self.finish_spinner();
        if self.is_json() {
            self.event(&BuildEvent::PackageFailed {
                message: msg.to_string(),
                code,
            });
        } else {
            self.status(Status::Error, msg);
        }
    }

    /// Print a JSON event to stdout. Ignored in human mode.
    pub fn event(&self, event: &BuildEvent) {
        if !self.is_json() {
            return;
        }
        println!("{}", event.to_json());
        let _ = io::stdout().flush();
    }

    /// Print an arbitrary JSON value to stdout. Ignored in human mode.
    pub fn json_value(&self, value: &serde_json::Value) {
        if !self.is_json() {
            return;
        }
        println!("{}", value);
        let _ = io::stdout().flush();
    }

    /// Show `msg` on the spinner, creating it on first use.
    fn spin(&self, msg: String) {
        if !self.wants_spinner() {
            return;
        }
        let Ok(mut slot) = self.spinner.lock() else {
            return;
        };
        let pb = slot.get_or_insert_with(|| {
            let pb = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
                pb.set_style(style);
            }
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        });
        pb.set_message(msg);
    }

    /// Clear the spinner, if any.
    pub fn finish_spinner(&self) {
        if let Ok(mut slot) = self.spinner.lock() {
            if let Some(pb) = slot.take() {
                pb.finish_and_clear();
            }
        }
    }

    fn wants_spinner(&self) -> bool {
        matches!(
            self.mode,
            ShellMode::Human {
                verbosity: Verbosity::Normal,
                ..
            }
        ) && io::stderr().is_terminal()
    }

    fn format_status(&self, status: Status) -> String {
        let text = status.as_str();
        if self.use_color {
            format!(
                "{}{:>width$}\x1b[0m",
                status.color_code(),
                text,
                width = STATUS_WIDTH
            )
        } else {
            format!("{:>width$}", text, width = STATUS_WIDTH)
        }
    }
}

impl Default for Shell {
    fn default() -> Self {
        Shell::new(ShellMode::default())
    }
}

impl StageListener for Shell {
    fn stage(&self, stage: Stage, detail: &str) {
        if self.is_json() {
            self.event(&BuildEvent::stage(stage, detail));
            return;
        }
        if stage == Stage::Packaged {
            self.finish_spinner();
        } else {
            self.spin(format!("{} {}", stage, detail));
        }
        self.status(stage.into(), detail);
    }
}

/// Format a duration in a human-readable way.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs < 60.0 {
        format!("{:.2}s", secs)
    } else {
        format!("{:.1}m", secs / 60.0)
    }
}
