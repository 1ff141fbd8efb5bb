//! Implementation of `dockyard options`.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::Serialize;

use crate::builder::package_info::package_id;
use crate::core::errors::PackageError;
use crate::core::option::{resolve, OptionValue, RawOptions};
use crate::core::recipe::Recipe;
use crate::core::requirement::requirements;
use crate::core::settings::Settings;

/// Effective configuration of a recipe for one platform.
#[derive(Debug, Clone, Serialize)]
pub struct OptionsReport {
    pub name: String,
    pub version: String,
    pub settings: Settings,
    pub options: BTreeMap<String, OptionValue>,
    /// Declared options that do not apply to this platform
    pub removed: Vec<String>,
    pub requirements: Vec<String>,
    pub package_id: String,
}

/// Resolve the recipe's options without building anything.
pub fn options_report(
    recipe: &Recipe,
    raw: &RawOptions,
    settings: &Settings,
) -> Result<OptionsReport, PackageError> {
    let config = resolve(&recipe.options, raw, settings, recipe.drop_libcxx)?;

    let removed = recipe
        .options
        .iter()
        .filter(|d| !config.contains(&d.name))
        .map(|d| d.name.clone())
        .collect();

    Ok(OptionsReport {
        name: recipe.name.clone(),
        version: recipe.version.clone(),
        settings: config.settings.clone(),
        options: config.options.clone(),
        removed,
        requirements: requirements(&config).iter().map(|r| r.to_string()).collect(),
        package_id: package_id(recipe, &config),
    })
}

/// Render a report for the terminal.
pub fn format_options_report(report: &OptionsReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} {} ({})", report.name, report.version, report.settings);
    let _ = writeln!(out, "options:");
    for (name, value) in &report.options {
        let _ = writeln!(out, "  {} = {}", name, value);
    }
    if !report.removed.is_empty() {
        let _ = writeln!(out, "not applicable: {}", report.removed.join(", "));
    }
    if report.requirements.is_empty() {
        let _ = writeln!(out, "requires: (none)");
    } else {
        let _ = writeln!(out, "requires:");
        for req in &report.requirements {
            let _ = writeln!(out, "  {}", req);
        }
    }
    let _ = write!(out, "package id: {}", report.package_id);
    out
}
