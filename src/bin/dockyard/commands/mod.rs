//! Command implementations

pub mod clean;
pub mod completions;
pub mod options;
pub mod package;
pub mod plan;

use std::path::Path;

use anyhow::{anyhow, Context, Result};

use crate::cli::TargetArgs;
use dockyard::core::option::parse_assignments;
use dockyard::core::{Arch, BuildType, CompilerFamily, Os, RawOptions, Recipe, Settings};
use dockyard::util::GlobalContext;

/// Load a built-in recipe by name, or a recipe file by path.
pub fn load_recipe(ctx: &GlobalContext, recipe: &str) -> Result<Recipe> {
    let path = Path::new(recipe);
    let is_file = path.extension().is_some_and(|ext| ext == "toml") || recipe.contains('/');
    let recipe = if is_file {
        let path = ctx.resolve(path);
        Recipe::load(&path).with_context(|| format!("failed to load recipe {}", path.display()))?
    } else {
        Recipe::builtin(recipe)?
    };
    Ok(recipe)
}

impl TargetArgs {
    /// Settings for the requested target, filling gaps from the host.
    pub fn settings(&self) -> Result<Settings> {
        let host = Settings::host();

        let os = self.os.as_deref().map(str::parse::<Os>).transpose()?.unwrap_or(host.os);
        let arch = self
            .arch
            .as_deref()
            .map(str::parse::<Arch>)
            .transpose()?
            .unwrap_or(host.arch);
        // An explicit --os without --compiler picks that platform's usual compiler.
        let compiler = match self.compiler.as_deref() {
            Some(c) => c.parse::<CompilerFamily>()?,
            None if self.os.is_some() => CompilerFamily::default_for(os),
            None => host.compiler,
        };
        let build_type = self.build_type.parse::<BuildType>()?;

        let mut settings = Settings::new(os, arch, compiler, self.compiler_version.clone().unwrap_or_default())
            .with_build_type(build_type);
        if let Some(libcxx) = &self.libcxx {
            settings = settings.with_libcxx(libcxx);
        }
        Ok(settings)
    }

    /// The `-o name=value` assignments.
    pub fn raw_options(&self) -> Result<RawOptions> {
        parse_assignments(&self.options).map_err(|e| anyhow!("invalid --option: {}", e))
    }
}

