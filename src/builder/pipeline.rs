//! The staged build pipeline.
//!
//! One [`BuildPipeline`] drives one run. It owns the configure memo, tracks
//! how far the staged strategy has progressed and turns every command
//! failure into a [`PackageError`]. Nothing is retried.

use std::path::{Path, PathBuf};

use crate::builder::events::{Silent, Stage, StageListener};
use crate::builder::memo::StageMemo;
use crate::builder::strategy::{BuildStrategy, ScriptStrategy, StagedStrategy};
use crate::builder::toolchain::ToolchainDescriptor;
use crate::core::errors::PackageError;
use crate::core::option::EffectiveConfiguration;
use crate::resolver::DependencyInfo;
use crate::util::fs::replace_in_file;
use crate::util::process::{require_tools, ProcessBuilder, ProcessExecutor, ProcessOutcome};

/// Directories a run works in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkLayout {
    /// Unpacked upstream source
    pub source_dir: PathBuf,
    /// Scratch install prefix the build writes into
    pub output_dir: PathBuf,
}

impl WorkLayout {
    /// Standard layout below a work directory.
    pub fn in_work_dir(work_dir: &Path, subfolder: &str) -> Self {
        WorkLayout {
            source_dir: work_dir.join(subfolder),
            output_dir: work_dir.join("output"),
        }
    }
}

/// Progress of the staged strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StagedState {
    Unconfigured,
    Configured,
    CommonBuilt,
    ComponentBuilt,
}

/// Progress of the script-driven strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ScriptState {
    Pending,
    Ran,
}

/// Proof that `execute` finished; required by the install stage.
#[derive(Debug, Clone)]
pub struct BuiltTree {
    strategy: BuildStrategy,
    toolchain: ToolchainDescriptor,
    source_dir: PathBuf,
    output_dir: PathBuf,
}

impl BuiltTree {
    pub fn strategy(&self) -> &BuildStrategy {
        &self.strategy
    }

    pub fn toolchain(&self) -> &ToolchainDescriptor {
        &self.toolchain
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

/// Everything a stage needs besides the memo.
struct StageContext<'a> {
    executor: &'a dyn ProcessExecutor,
    config: &'a EffectiveConfiguration,
    layout: WorkLayout,
    deps: Vec<DependencyInfo>,
    jobs: Option<usize>,
    listener: &'a dyn StageListener,
}

impl StageContext<'_> {
    fn run(&self, cmd: &ProcessBuilder) -> Result<ProcessOutcome, PackageError> {
        tracing::debug!(
            "running `{}` in {}",
            cmd.display_command(),
            cmd.get_cwd().unwrap_or(Path::new(".")).display()
        );
        self.executor.run(cmd)
    }

    fn configure_staged(&self, strategy: &StagedStrategy) -> Result<ToolchainDescriptor, PackageError> {
        self.listener.stage(Stage::Configuring, "configure");
        tracing::info!("configuring {}", self.layout.source_dir.display());

        let descriptor = ToolchainDescriptor::autotools(
            self.config,
            &strategy.spec.configure_args,
            &self.deps,
            &self.layout.output_dir,
        );
        let cmd = descriptor.configure_command(&self.layout.source_dir);
        let outcome = self.run(&cmd)?;
        if !outcome.success() {
            return Err(PackageError::BuildStageFailed {
                stage: "configure".to_string(),
                exit: outcome.exit_info(),
            });
        }
        Ok(descriptor)
    }
}

/// Drives the stages of one build strategy.
pub struct BuildPipeline<'a> {
    ctx: StageContext<'a>,
    memo: StageMemo,
    state: StagedState,
    script_state: ScriptState,
}

impl<'a> BuildPipeline<'a> {
    pub fn new(
        executor: &'a dyn ProcessExecutor,
        config: &'a EffectiveConfiguration,
        layout: WorkLayout,
    ) -> Self {
        BuildPipeline {
            ctx: StageContext {
                executor,
                config,
                layout,
                deps: Vec::new(),
                jobs: None,
                listener: &Silent,
            },
            memo: StageMemo::new(),
            state: StagedState::Unconfigured,
            script_state: ScriptState::Pending,
        }
    }

    /// Provided dependencies whose directories feed the toolchain.
    pub fn with_dependencies(mut self, deps: Vec<DependencyInfo>) -> Self {
        self.ctx.deps = deps;
        self
    }

    /// Parallel jobs for `make`.
    pub fn with_jobs(mut self, jobs: Option<usize>) -> Self {
        self.ctx.jobs = jobs.filter(|j| *j > 0);
        self
    }

    pub fn with_listener(mut self, listener: &'a dyn StageListener) -> Self {
        self.ctx.listener = listener;
        self
    }

    pub fn state(&self) -> StagedState {
        self.state
    }

    pub fn script_state(&self) -> ScriptState {
        self.script_state
    }

    pub fn memo(&self) -> &StageMemo {
        &self.memo
    }

    pub fn layout(&self) -> &WorkLayout {
        &self.ctx.layout
    }

    pub fn config(&self) -> &EffectiveConfiguration {
        self.ctx.config
    }

    pub(crate) fn listener(&self) -> &dyn StageListener {
        self.ctx.listener
    }

    /// Fail early when a tool the strategy needs is missing.
    pub fn preflight(&self, strategy: &BuildStrategy) -> Result<(), PackageError> {
        require_tools(self.ctx.executor, strategy.tools())
    }

    /// Configure the staged build, at most once per pipeline.
    ///
    /// Later calls return the cached descriptor without running anything.
    pub fn configure(&mut self, strategy: &StagedStrategy) -> Result<&ToolchainDescriptor, PackageError> {
        let ctx = &self.ctx;
        let descriptor = self
            .memo
            .get_or_try_insert_with(strategy.id(), || ctx.configure_staged(strategy))?;
        if self.state < StagedState::Configured {
            self.state = StagedState::Configured;
        }
        Ok(descriptor)
    }

    /// Run every build stage of `strategy`.
    pub fn execute(&mut self, strategy: &BuildStrategy) -> Result<BuiltTree, PackageError> {
        self.preflight(strategy)?;

        let toolchain = match strategy {
            BuildStrategy::Script(script) => self.execute_script(script)?,
            BuildStrategy::Staged(staged) => self.execute_staged(staged)?,
        };

        Ok(BuiltTree {
            strategy: strategy.clone(),
            toolchain,
            source_dir: self.ctx.layout.source_dir.clone(),
            output_dir: self.ctx.layout.output_dir.clone(),
        })
    }

    fn execute_staged(&mut self, strategy: &StagedStrategy) -> Result<ToolchainDescriptor, PackageError> {
        let toolchain = self.configure(strategy)?.clone();

        if self.state < StagedState::CommonBuilt {
            self.make(&toolchain, &strategy.spec.common_dir, &[])?;
            self.state = StagedState::CommonBuilt;
        }
        if self.state < StagedState::ComponentBuilt {
            self.make(&toolchain, &strategy.spec.component_dir, &[])?;
            self.state = StagedState::ComponentBuilt;
        }

        Ok(toolchain)
    }

    fn execute_script(&mut self, strategy: &ScriptStrategy) -> Result<ToolchainDescriptor, PackageError> {
        if self.script_state == ScriptState::Ran {
            if let Some(toolchain) = self.memo.get(&strategy.id()) {
                return Ok(toolchain.clone());
            }
        }

        let script_dir = self.ctx.layout.source_dir.join(&strategy.spec.dir);

        for patch in &strategy.spec.patches {
            let path = script_dir.join(&patch.file);
            let applied = replace_in_file(&path, &patch.find, &patch.replace)
                .map_err(|e| PackageError::io(format!("failed to patch {}", path.display()), e))?;
            if applied {
                tracing::debug!("patched {}", path.display());
            } else {
                tracing::debug!("patch for {} already applied or not needed", path.display());
            }
        }

        let ctx = &self.ctx;
        let toolchain = self
            .memo
            .get_or_try_insert_with::<PackageError>(strategy.id(), || {
                Ok(ToolchainDescriptor::msvc(ctx.config, &ctx.deps, &ctx.layout.output_dir))
            })?
            .clone();

        self.ctx
            .listener
            .stage(Stage::Compiling, &strategy.spec.build.join(" "));
        tracing::info!("running build scripts in {}", script_dir.display());
        self.run_script(&strategy.spec.build, &script_dir, &toolchain)?;
        self.script_state = ScriptState::Ran;

        Ok(toolchain)
    }

    /// Run `make [targets]` in `dir` below the source root.
    pub(crate) fn make(
        &self,
        toolchain: &ToolchainDescriptor,
        dir: &str,
        targets: &[&str],
    ) -> Result<(), PackageError> {
        let stage = if targets.is_empty() {
            format!("make {}", dir)
        } else {
            format!("make {} {}", targets.join(" "), dir)
        };

        let (status, verb) = if targets.contains(&"install") {
            (Stage::Installing, "installing")
        } else {
            (Stage::Compiling, "building")
        };
        self.ctx.listener.stage(status, dir);
        tracing::info!("{} {}", verb, dir);

        let mut cmd = ProcessBuilder::new("make");
        if let Some(jobs) = self.ctx.jobs {
            cmd = cmd.arg(format!("-j{}", jobs));
        }
        let cmd = cmd
            .args(targets)
            .envs(&toolchain.env)
            .cwd(self.ctx.layout.source_dir.join(dir));

        let outcome = self.ctx.run(&cmd)?;
        if !outcome.success() {
            return Err(PackageError::BuildStageFailed {
                stage,
                exit: outcome.exit_info(),
            });
        }
        Ok(())
    }

    /// Run a script command line, expanding `{output}`.
    pub(crate) fn run_script(
        &self,
        argv: &[String],
        cwd: &Path,
        toolchain: &ToolchainDescriptor,
    ) -> Result<(), PackageError> {
        let output = toolchain.output_dir.display().to_string();
        let mut argv = argv.iter().map(|a| a.replace("{output}", &output));
        let program = argv
            .next()
            .ok_or_else(|| PackageError::InvalidRecipe("empty script command".to_string()))?;

        let cmd = ProcessBuilder::new(program)
            .args(argv)
            .envs(&toolchain.env)
            .cwd(cwd);

        let outcome = self.ctx.run(&cmd)?;
        if !outcome.success() {
            return Err(PackageError::BuildCommandFailed {
                command: cmd.display_command(),
                exit: outcome.exit_info(),
            });
        }
        Ok(())
    }
}
