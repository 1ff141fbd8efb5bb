//! Platform dispatch: pick exactly one build strategy per run.
//!
//! The mapping from `(os, compiler)` to a strategy is the table below.
//! Anything the table does not list is an unsupported platform, reported
//! before any side effect happens.

use std::fmt;

use serde::Serialize;

use crate::builder::collect::ArtifactRule;
use crate::core::errors::PackageError;
use crate::core::recipe::{Recipe, ScriptSpec, StagedSpec};
use crate::core::settings::{CompilerFamily, Os, Settings};

/// The two mutually exclusive ways of driving an upstream build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Upstream-provided build scripts, run as-is
    Script,
    /// configure, then make per subtree, then make install per subtree
    Staged,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Script => "script",
            StrategyKind::Staged => "staged",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `None` in the compiler column matches every compiler.
const DISPATCH_TABLE: &[(Os, Option<CompilerFamily>, StrategyKind)] = &[
    (Os::Windows, Some(CompilerFamily::Msvc), StrategyKind::Script),
    (Os::Linux, None, StrategyKind::Staged),
    (Os::Macos, None, StrategyKind::Staged),
];

/// Look up the strategy kind for a platform.
pub fn dispatch(os: Os, compiler: CompilerFamily) -> Option<StrategyKind> {
    DISPATCH_TABLE
        .iter()
        .find(|(o, c, _)| *o == os && c.map_or(true, |c| c == compiler))
        .map(|(_, _, kind)| *kind)
}

/// Identity of a strategy instance, used as the stage memo key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct StrategyId {
    pub kind: StrategyKind,
    /// Subtree the strategy builds
    pub component: String,
}

impl fmt::Display for StrategyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.component)
    }
}

#[derive(Debug, Clone)]
pub struct ScriptStrategy {
    pub spec: ScriptSpec,
}

#[derive(Debug, Clone)]
pub struct StagedStrategy {
    pub spec: StagedSpec,
}

impl StagedStrategy {
    pub fn id(&self) -> StrategyId {
        StrategyId {
            kind: StrategyKind::Staged,
            component: self.spec.component_dir.clone(),
        }
    }
}

impl ScriptStrategy {
    pub fn id(&self) -> StrategyId {
        StrategyId {
            kind: StrategyKind::Script,
            component: self.spec.dir.clone(),
        }
    }
}

/// The strategy selected for one run.
#[derive(Debug, Clone)]
pub enum BuildStrategy {
    Script(ScriptStrategy),
    Staged(StagedStrategy),
}

impl BuildStrategy {
    pub fn kind(&self) -> StrategyKind {
        match self {
            BuildStrategy::Script(_) => StrategyKind::Script,
            BuildStrategy::Staged(_) => StrategyKind::Staged,
        }
    }

    pub fn id(&self) -> StrategyId {
        match self {
            BuildStrategy::Script(s) => s.id(),
            BuildStrategy::Staged(s) => s.id(),
        }
    }

    /// Tools that must be on PATH before the first stage runs.
    pub fn tools(&self) -> &[String] {
        match self {
            BuildStrategy::Script(s) => &s.spec.tools,
            BuildStrategy::Staged(s) => &s.spec.tools,
        }
    }

    /// Ordered, human-readable description of the stages.
    pub fn stages(&self) -> Vec<String> {
        match self {
            BuildStrategy::Script(s) => vec![
                format!("patch scripts in {}", s.spec.dir),
                format!("build: {}", s.spec.build.join(" ")),
                format!("install: {}", s.spec.install.join(" ")),
                "collect artifacts".to_string(),
            ],
            BuildStrategy::Staged(s) => vec![
                "configure".to_string(),
                format!("make in {}", s.spec.common_dir),
                format!("make in {}", s.spec.component_dir),
                format!("make install in {}", s.spec.common_dir),
                format!("make install in {}", s.spec.component_dir),
                "collect artifacts".to_string(),
            ],
        }
    }

    /// Collection rules for the target OS, libraries included.
    pub fn artifact_rules(&self, os: Os) -> Vec<ArtifactRule> {
        match self {
            BuildStrategy::Script(s) => s.spec.artifacts.clone(),
            BuildStrategy::Staged(s) => {
                let mut rules = s.spec.artifacts.clone();
                rules.extend(s.spec.libraries.rules_for(os));
                rules
            }
        }
    }
}

/// Select the strategy for `settings`.
///
/// Pure: no filesystem, process or network access. A platform missing from
/// the dispatch table, or whose strategy the recipe does not describe, is
/// unsupported.
pub fn select_strategy(recipe: &Recipe, settings: &Settings) -> Result<BuildStrategy, PackageError> {
    let unsupported = || PackageError::UnsupportedPlatform {
        os: settings.os,
        compiler: settings.compiler,
    };

    let strategy = match dispatch(settings.os, settings.compiler).ok_or_else(unsupported)? {
        StrategyKind::Script => recipe
            .script
            .clone()
            .map(|spec| BuildStrategy::Script(ScriptStrategy { spec })),
        StrategyKind::Staged => recipe
            .staged
            .clone()
            .map(|spec| BuildStrategy::Staged(StagedStrategy { spec })),
    };

    let strategy = strategy.ok_or_else(unsupported)?;
    tracing::debug!("selected {} strategy for {}", strategy.kind(), settings);
    Ok(strategy)
}
