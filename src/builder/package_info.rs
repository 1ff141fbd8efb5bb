//! Consumer metadata for a finished package.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;

use crate::builder::collect::{PackageTree, Role};
use crate::builder::strategy::{BuildStrategy, StrategyKind};
use crate::core::errors::PackageError;
use crate::core::option::{EffectiveConfiguration, OptionValue};
use crate::core::recipe::Recipe;
use crate::core::requirement::requirements;
use crate::core::settings::Settings;
use crate::util::hash::Fingerprint;

/// File the metadata is written to, inside the package root.
pub const METADATA_FILE: &str = "dockyard-package.json";

/// What a downstream build needs to consume the package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageMetadata {
    pub name: String,
    pub version: String,
    pub package_id: String,
    pub strategy: StrategyKind,
    pub settings: Settings,
    pub options: BTreeMap<String, OptionValue>,
    pub requirements: Vec<String>,
    /// Link names, in link order, system libraries last
    pub libs: Vec<String>,
    /// Platform libraries consumers must also link
    pub system_libs: Vec<String>,
    pub include_dirs: Vec<String>,
    pub lib_dirs: Vec<String>,
    pub bin_dirs: Vec<String>,
}

impl PackageMetadata {
    /// Write the metadata as pretty JSON into the package root.
    pub fn write(&self, package_dir: &Path) -> Result<(), PackageError> {
        let path = package_dir.join(METADATA_FILE);
        let json = serde_json::to_string_pretty(self).map_err(|e| {
            PackageError::io(
                format!("failed to serialize {}", path.display()),
                std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            )
        })?;
        std::fs::write(&path, json + "\n")
            .map_err(|e| PackageError::io(format!("failed to write {}", path.display()), e))
    }
}

/// Stable identity of a configuration: same recipe, settings and options
/// yield the same id.
pub fn package_id(recipe: &Recipe, config: &EffectiveConfiguration) -> String {
    let settings = &config.settings;
    let mut fp = Fingerprint::new();
    fp.field("name", &recipe.name)
        .field("version", &recipe.version)
        .field("os", settings.os.as_str())
        .field("arch", settings.arch.as_str())
        .field("compiler", settings.compiler.as_str())
        .field("compiler.version", &settings.compiler_version)
        .field_opt("compiler.libcxx", settings.libcxx.as_deref())
        .field("build_type", settings.build_type.as_str());
    for (name, value) in &config.options {
        fp.field(&format!("options.{}", name), &value.to_string());
    }
    for req in requirements(config) {
        fp.field("requires", &req.to_string());
    }
    fp.finish()
}

/// Link name for a collected library file, if it is one.
///
/// `libpq.a`, `libpq.so.5.10` and `libpq.5.dylib` give `pq`; Windows import
/// libraries keep their stem (`libpq.lib` gives `libpq`).
pub fn link_name(file_name: &str) -> Option<String> {
    if let Some(stem) = file_name.strip_suffix(".lib") {
        return (!stem.is_empty()).then(|| stem.to_string());
    }

    let base = if let Some(idx) = file_name.find(".so") {
        let rest = &file_name[idx + 3..];
        if !(rest.is_empty() || rest.starts_with('.')) {
            return None;
        }
        &file_name[..idx]
    } else if let Some(stem) = file_name.strip_suffix(".a") {
        stem
    } else if let Some(stem) = file_name.strip_suffix(".dylib") {
        stem.split('.').next().unwrap_or(stem)
    } else {
        return None;
    };

    let name = base.strip_prefix("lib").unwrap_or(base);
    (!name.is_empty()).then(|| name.to_string())
}

/// Link names of the libraries actually collected, sorted and unique.
pub fn collect_libs(tree: &PackageTree) -> Vec<String> {
    let mut names: Vec<String> = tree
        .files(Role::Lib)
        .iter()
        .filter_map(|path| path.file_name()?.to_str())
        .filter_map(link_name)
        .collect();
    names.sort();
    names.dedup();
    names
}

/// Derive consumer metadata from the collected tree.
///
/// Script builds whose recipe names a `link_override` link exactly that
/// library plus the platform extras, whatever files were collected.
pub fn emit(
    recipe: &Recipe,
    config: &EffectiveConfiguration,
    strategy: &BuildStrategy,
    tree: &PackageTree,
) -> PackageMetadata {
    let settings = &config.settings;
    let system_libs = recipe
        .system_libs
        .get(&settings.os)
        .cloned()
        .unwrap_or_default();

    let mut libs = match strategy {
        BuildStrategy::Script(script) => match script.spec.link_override {
            Some(ref name) => vec![name.clone()],
            None => collect_libs(tree),
        },
        BuildStrategy::Staged(_) => collect_libs(tree),
    };
    for lib in &system_libs {
        if !libs.contains(lib) {
            libs.push(lib.clone());
        }
    }

    let dirs_for = |role: Role| -> Vec<String> {
        if tree.files(role).is_empty() {
            Vec::new()
        } else {
            vec![role.dir_name().to_string()]
        }
    };

    PackageMetadata {
        name: recipe.name.clone(),
        version: recipe.version.clone(),
        package_id: package_id(recipe, config),
        strategy: strategy.kind(),
        settings: settings.clone(),
        options: config.options.clone(),
        requirements: requirements(config).iter().map(|r| r.to_string()).collect(),
        libs,
        system_libs,
        include_dirs: dirs_for(Role::Include),
        lib_dirs: dirs_for(Role::Lib),
        bin_dirs: dirs_for(Role::Bin),
    }
}
