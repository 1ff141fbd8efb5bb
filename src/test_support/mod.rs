//! Test utilities for dockyard unit tests.
//!
//! [`MockExecutor`] stands in for the host process surface: it records every
//! command, answers with configured outputs and can run a hook per call to
//! simulate the files an install step would produce.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut exec = MockExecutor::succeeding();
//! exec.expect_regex(r"^make$", MockProcessOutput::failure(2, "No rule"));
//! let exec = exec.on_install(fixtures::staged_install_hook(&output_dir));
//! ```

pub mod fixtures;

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Mutex;

use regex::Regex;

use crate::core::errors::PackageError;
use crate::util::process::{ProcessBuilder, ProcessExecutor, ProcessOutcome};

/// Mock process output for testing command execution.
#[derive(Debug, Clone)]
pub struct MockProcessOutput {
    /// Exit status code (0 = success).
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl MockProcessOutput {
    /// Create a successful output with the given stdout.
    pub fn success(stdout: impl Into<String>) -> Self {
        MockProcessOutput {
            status: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Create a failure output with the given stderr and status code.
    pub fn failure(status: i32, stderr: impl Into<String>) -> Self {
        MockProcessOutput {
            status,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    fn to_outcome(&self) -> ProcessOutcome {
        ProcessOutcome {
            code: Some(self.status),
            stdout: self.stdout.clone(),
            stderr: self.stderr.clone(),
        }
    }
}

impl Default for MockProcessOutput {
    fn default() -> Self {
        MockProcessOutput::success("")
    }
}

/// Pattern matched against the displayed command line.
#[derive(Debug, Clone)]
pub struct CommandPattern(Regex);

impl CommandPattern {
    pub fn new(pattern: &str) -> Self {
        CommandPattern(Regex::new(pattern).expect("invalid command pattern"))
    }

    pub fn matches(&self, cmd: &str) -> bool {
        self.0.is_match(cmd)
    }
}

/// One command the mock was asked to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// Program and arguments, space separated
    pub command: String,
    pub cwd: Option<PathBuf>,
    pub env: BTreeMap<String, String>,
}

type Hook = Box<dyn Fn(&ProcessBuilder)>;

/// Commands treated as install steps by [`MockExecutor::on_install`].
const INSTALL_PATTERN: &str = r"(\binstall$|install\.bat)";

/// Recording process executor.
///
/// The first matching expectation decides the output; unmatched commands get
/// the default output. Every tool is found unless removed with
/// [`without_tool`](Self::without_tool).
pub struct MockExecutor {
    expectations: Vec<(CommandPattern, MockProcessOutput)>,
    hooks: Vec<(CommandPattern, Hook)>,
    default_output: Option<MockProcessOutput>,
    missing_tools: BTreeSet<String>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockExecutor {
    /// Executor that fails every command it has no expectation for.
    pub fn new() -> Self {
        MockExecutor {
            expectations: Vec::new(),
            hooks: Vec::new(),
            default_output: None,
            missing_tools: BTreeSet::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Executor where every command succeeds with no output.
    pub fn succeeding() -> Self {
        let mut exec = MockExecutor::new();
        exec.default_output = Some(MockProcessOutput::default());
        exec
    }

    /// Answer commands matching `pattern` with `output`.
    pub fn expect_regex(&mut self, pattern: &str, output: MockProcessOutput) -> &mut Self {
        self.expectations.push((CommandPattern::new(pattern), output));
        self
    }

    /// Make `locate` fail for `tool`.
    pub fn without_tool(mut self, tool: &str) -> Self {
        self.missing_tools.insert(tool.to_string());
        self
    }

    /// Run `hook` before answering any command matching `pattern`.
    pub fn on_call(mut self, pattern: &str, hook: impl Fn(&ProcessBuilder) + 'static) -> Self {
        self.hooks.push((CommandPattern::new(pattern), Box::new(hook)));
        self
    }

    /// Run `hook` for every install step (`make install`, `install.bat`).
    pub fn on_install(self, hook: impl Fn(&ProcessBuilder) + 'static) -> Self {
        self.on_call(INSTALL_PATTERN, hook)
    }

    /// Every command run so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of recorded commands matching `pattern`.
    pub fn count_matching(&self, pattern: &str) -> usize {
        let pattern = CommandPattern::new(pattern);
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| pattern.matches(&c.command))
            .count()
    }
}

impl Default for MockExecutor {
    fn default() -> Self {
        MockExecutor::new()
    }
}

impl ProcessExecutor for MockExecutor {
    fn run(&self, cmd: &ProcessBuilder) -> Result<ProcessOutcome, PackageError> {
        let command = cmd.display_command();
        self.calls.lock().unwrap().push(RecordedCall {
            command: command.clone(),
            cwd: cmd.get_cwd().map(|p| p.to_path_buf()),
            env: cmd.get_env().clone(),
        });

        for (pattern, hook) in &self.hooks {
            if pattern.matches(&command) {
                hook(cmd);
            }
        }

        self.expectations
            .iter()
            .find(|(pattern, _)| pattern.matches(&command))
            .map(|(_, output)| output)
            .or(self.default_output.as_ref())
            .map(MockProcessOutput::to_outcome)
            .ok_or_else(|| PackageError::ToolNotFound {
                tool: cmd.get_program().display().to_string(),
            })
    }

    fn locate(&self, tool: &str) -> Option<PathBuf> {
        if self.missing_tools.contains(tool) {
            None
        } else {
            Some(PathBuf::from("/usr/bin").join(tool))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_records_and_answers() {
        let mut exec = MockExecutor::succeeding();
        exec.expect_regex("^make", MockProcessOutput::failure(2, "boom"));

        let ok = exec
            .run(&ProcessBuilder::new("configure").arg("--prefix=/out").cwd("/src"))
            .unwrap();
        let failed = exec.run(&ProcessBuilder::new("make").env("CC", "gcc")).unwrap();

        assert!(ok.success());
        assert_eq!(failed.code, Some(2));
        assert_eq!(failed.stderr, "boom");

        let calls = exec.calls();
        assert_eq!(calls[0].command, "configure --prefix=/out");
        assert_eq!(calls[0].cwd, Some(PathBuf::from("/src")));
        assert_eq!(calls[1].env["CC"], "gcc");
        assert_eq!(exec.count_matching("make"), 1);
    }

    #[test]
    fn test_unexpected_command_without_default() {
        let exec = MockExecutor::new();
        assert!(exec.run(&ProcessBuilder::new("gcc")).is_err());
        assert_eq!(exec.calls().len(), 1);
    }

    #[test]
    fn test_install_hook() {
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        let exec = MockExecutor::succeeding().on_install(move |_| counter.set(counter.get() + 1));

        exec.run(&ProcessBuilder::new("make")).unwrap();
        exec.run(&ProcessBuilder::new("make").arg("install")).unwrap();
        exec.run(&ProcessBuilder::new("cmd").args(["/c", "install.bat", "C:/out"]))
            .unwrap();

        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn test_missing_tool() {
        let exec = MockExecutor::succeeding().without_tool("make");
        assert!(exec.locate("make").is_none());
        assert!(exec.locate("perl").is_some());
    }
}
