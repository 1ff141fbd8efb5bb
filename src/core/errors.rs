//! Packaging error types and diagnostics.

use std::fmt;
use std::path::PathBuf;

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::core::settings::{CompilerFamily, Os};
use crate::util::diagnostic::{suggestions, Diagnostic};

/// How an external command finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitInfo {
    /// Exit code, `None` when terminated by a signal
    pub code: Option<i32>,
    /// Last lines of stderr
    pub stderr_tail: String,
}

impl ExitInfo {
    /// Number of stderr lines kept for error messages.
    pub const TAIL_LINES: usize = 20;

    /// Build exit info from a code and the full stderr text.
    pub fn new(code: Option<i32>, stderr: &str) -> Self {
        let lines: Vec<&str> = stderr.lines().collect();
        let start = lines.len().saturating_sub(Self::TAIL_LINES);
        ExitInfo {
            code,
            stderr_tail: lines[start..].join("\n"),
        }
    }
}

impl fmt::Display for ExitInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "exit code {}", code)?,
            None => write!(f, "terminated by signal")?,
        }
        if !self.stderr_tail.is_empty() {
            write!(f, "\n{}", self.stderr_tail)?;
        }
        Ok(())
    }
}

/// Error raised by any stage of a packaging run.
///
/// Every variant aborts the run; none is retried.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum PackageError {
    #[error("invalid value `{value}` for option `{option}` (allowed: {})", .allowed.join(", "))]
    #[diagnostic(code(dockyard::options::invalid_value))]
    InvalidOptionValue {
        option: String,
        value: String,
        allowed: Vec<String>,
    },

    #[error("unknown option `{option}`")]
    #[diagnostic(
        code(dockyard::options::unknown),
        help("run `dockyard options` to list the declared options")
    )]
    UnknownOption { option: String, known: Vec<String> },

    #[error("unsupported platform: compiler `{compiler}` on `{os}`")]
    #[diagnostic(
        code(dockyard::platform::unsupported),
        help("supported: msvc on windows; any compiler on linux or macos")
    )]
    UnsupportedPlatform { os: Os, compiler: CompilerFamily },

    #[error("source for `{name}` {version} is unavailable: {reason}")]
    #[diagnostic(code(dockyard::source::unavailable))]
    SourceUnavailable {
        name: String,
        version: String,
        reason: String,
    },

    #[error("dependency `{requirement}` is unavailable: {reason}")]
    #[diagnostic(
        code(dockyard::deps::unavailable),
        help("install the dependency under the deps prefix or pass --deps-prefix")
    )]
    DependencyUnavailable { requirement: String, reason: String },

    #[error("required tool `{tool}` not found in PATH")]
    #[diagnostic(code(dockyard::build::tool_not_found))]
    ToolNotFound { tool: String },

    #[error("build command `{command}` failed: {exit}")]
    #[diagnostic(
        code(dockyard::build::command_failed),
        help("inspect the working directory, then re-run from a clean state")
    )]
    BuildCommandFailed { command: String, exit: ExitInfo },

    #[error("build stage `{stage}` failed: {exit}")]
    #[diagnostic(
        code(dockyard::build::stage_failed),
        help("inspect the working directory, then re-run from a clean state")
    )]
    BuildStageFailed { stage: String, exit: ExitInfo },

    #[error("no files match mandatory pattern `{pattern}` under {}", .search_root.display())]
    #[diagnostic(
        code(dockyard::package::artifact_not_found),
        help("the upstream build layout may have changed")
    )]
    ArtifactNotFound { pattern: String, search_root: PathBuf },

    #[error("invalid recipe: {0}")]
    #[diagnostic(code(dockyard::recipe::invalid))]
    InvalidRecipe(String),

    #[error("{context}: {source}")]
    #[diagnostic(code(dockyard::io))]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl PackageError {
    /// Wrap an I/O error with a short description of what was attempted.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        PackageError::Io {
            context: context.into(),
            source,
        }
    }

    /// Whether the error happened before anything touched the filesystem.
    pub fn is_preflight(&self) -> bool {
        matches!(
            self,
            PackageError::InvalidOptionValue { .. }
                | PackageError::UnknownOption { .. }
                | PackageError::UnsupportedPlatform { .. }
                | PackageError::InvalidRecipe(_)
        )
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = Diagnostic::error(self.to_string());
        match self {
            PackageError::UnsupportedPlatform { os, compiler } => diag
                .with_context(format!("os = {}, compiler = {}", os, compiler))
                .with_suggestion("Build on windows with msvc, or on linux/macos"),
            PackageError::BuildCommandFailed { .. } | PackageError::BuildStageFailed { .. } => diag
                .with_suggestion(suggestions::BUILD_FAILED)
                .with_suggestion(suggestions::CLEAN_RERUN),
            PackageError::SourceUnavailable { .. } => diag.with_suggestion(suggestions::FETCH_FAILED),
            PackageError::UnknownOption { known, .. } => diag
                .with_context(format!("declared options: {}", known.join(", ")))
                .with_suggestion(suggestions::LIST_OPTIONS),
            PackageError::InvalidOptionValue { .. } => diag.with_suggestion(suggestions::LIST_OPTIONS),
            PackageError::ArtifactNotFound { search_root, .. } => diag
                .with_location(search_root)
                .with_suggestion(suggestions::CLEAN_RERUN),
            _ => diag,
        }
    }
}
