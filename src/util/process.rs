//! Subprocess execution.
//!
//! Build stages never spawn processes directly; they describe a command with
//! [`ProcessBuilder`] and hand it to a [`ProcessExecutor`]. The system
//! implementation runs it through `std::process`, tests substitute a
//! recording mock.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::core::errors::{ExitInfo, PackageError};

/// Builder for subprocess execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<String>,
    env: BTreeMap<String, String>,
    cwd: Option<PathBuf>,
}

impl ProcessBuilder {
    /// Create a new process builder for the given program.
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            env: BTreeMap::new(),
            cwd: None,
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(
            args.into_iter()
                .map(|s| s.as_ref().to_string_lossy().into_owned()),
        );
        self
    }

    /// Set an environment variable.
    pub fn env(mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.env
            .insert(key.as_ref().to_string(), value.as_ref().to_string());
        self
    }

    /// Overlay a whole environment map.
    pub fn envs<'a>(mut self, vars: impl IntoIterator<Item = (&'a String, &'a String)>) -> Self {
        for (k, v) in vars {
            self.env.insert(k.clone(), v.clone());
        }
        self
    }

    /// Set the working directory.
    pub fn cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    pub fn get_program(&self) -> &Path {
        &self.program
    }

    pub fn get_env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    pub fn get_cwd(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd.envs(&self.env);
        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }
        cmd
    }

    /// Display the command for logs and error messages.
    pub fn display_command(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

/// How a finished process exited.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProcessOutcome {
    /// Exit code, `None` when killed by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutcome {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Exit summary kept in error values.
    pub fn exit_info(&self) -> ExitInfo {
        ExitInfo::new(self.code, &self.stderr)
    }
}

/// The process surface used by build stages.
pub trait ProcessExecutor {
    /// Run a command to completion.
    ///
    /// An `Err` means the command could not be started at all; a command that
    /// ran and failed is reported through [`ProcessOutcome::code`].
    fn run(&self, cmd: &ProcessBuilder) -> Result<ProcessOutcome, PackageError>;

    /// Locate a tool the build needs.
    fn locate(&self, tool: &str) -> Option<PathBuf> {
        find_executable(tool)
    }
}

/// Runs commands on the host with `std::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemExecutor;

impl ProcessExecutor for SystemExecutor {
    fn run(&self, cmd: &ProcessBuilder) -> Result<ProcessOutcome, PackageError> {
        tracing::debug!("running `{}`", cmd.display_command());

        let output = cmd
            .build_command()
            .stdin(Stdio::null())
            .output()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => PackageError::ToolNotFound {
                    tool: cmd.get_program().display().to_string(),
                },
                _ => PackageError::io(format!("failed to spawn `{}`", cmd.display_command()), e),
            })?;

        let outcome = ProcessOutcome {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        for line in outcome.stdout.lines() {
            tracing::trace!("{}", line);
        }
        Ok(outcome)
    }
}

/// Find an executable in PATH.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}

/// Check that every tool is available, failing on the first missing one.
pub fn require_tools<'a>(
    executor: &dyn ProcessExecutor,
    tools: impl IntoIterator<Item = &'a String>,
) -> Result<(), PackageError> {
    for tool in tools {
        match executor.locate(tool) {
            Some(path) => tracing::debug!("found `{}` at {}", tool, path.display()),
            None => return Err(PackageError::ToolNotFound { tool: tool.clone() }),
        }
    }
    Ok(())
}
