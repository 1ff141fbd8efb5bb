//! Implementation of `dockyard plan`.
//!
//! Shows what a packaging run would do. Nothing is fetched or executed.

use std::fmt::Write as _;
use std::path::Path;

use serde::Serialize;

use crate::builder::strategy::{select_strategy, StrategyKind};
use crate::builder::toolchain::ToolchainDescriptor;
use crate::core::errors::PackageError;
use crate::core::option::{resolve, EffectiveConfiguration, RawOptions};
use crate::core::recipe::Recipe;
use crate::core::requirement::requirements;
use crate::core::settings::Settings;

/// The selected strategy and the steps it would take.
#[derive(Debug, Clone, Serialize)]
pub struct BuildPlan {
    pub name: String,
    pub version: String,
    pub settings: Settings,
    pub strategy: StrategyKind,
    /// Subtree the strategy builds
    pub component: String,
    pub tools: Vec<String>,
    pub stages: Vec<String>,
    /// `configure` arguments, staged builds only
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub configure_args: Vec<String>,
    pub requirements: Vec<String>,
}

/// Plan a run for `settings`; fails like `package` would on bad options or
/// an unsupported platform.
pub fn plan(recipe: &Recipe, raw: &RawOptions, settings: &Settings) -> Result<BuildPlan, PackageError> {
    let config = resolve(&recipe.options, raw, settings, recipe.drop_libcxx)?;
    plan_for(recipe, &config)
}

/// Plan a run for an already resolved configuration.
pub fn plan_for(recipe: &Recipe, config: &EffectiveConfiguration) -> Result<BuildPlan, PackageError> {
    let strategy = select_strategy(recipe, &config.settings)?;

    let configure_args = match strategy.kind() {
        StrategyKind::Staged => {
            let fixed = recipe
                .staged
                .as_ref()
                .map(|s| s.configure_args.clone())
                .unwrap_or_default();
            // Dependency flags are only known once requirements are resolved.
            ToolchainDescriptor::autotools(config, &fixed, &[], Path::new("<output>")).configure_args
        }
        StrategyKind::Script => Vec::new(),
    };

    Ok(BuildPlan {
        name: recipe.name.clone(),
        version: recipe.version.clone(),
        settings: config.settings.clone(),
        strategy: strategy.kind(),
        component: strategy.id().component,
        tools: strategy.tools().to_vec(),
        stages: strategy.stages(),
        configure_args,
        requirements: requirements(config).iter().map(|r| r.to_string()).collect(),
    })
}

/// Render a plan for the terminal.
pub fn format_plan(plan: &BuildPlan) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} {} ({})", plan.name, plan.version, plan.settings);
    let _ = writeln!(out, "strategy: {} ({})", plan.strategy, plan.component);
    if !plan.tools.is_empty() {
        let _ = writeln!(out, "tools: {}", plan.tools.join(", "));
    }
    if !plan.requirements.is_empty() {
        let _ = writeln!(out, "requires: {}", plan.requirements.join(", "));
    }
    if !plan.configure_args.is_empty() {
        let _ = writeln!(out, "configure: {}", plan.configure_args.join(" "));
    }
    let _ = writeln!(out, "stages:");
    for (i, stage) in plan.stages.iter().enumerate() {
        let _ = writeln!(out, "  {}. {}", i + 1, stage);
    }
    out.truncate(out.trim_end().len());
    out
}
