//! Toolchain environment descriptors.
//!
//! A [`ToolchainDescriptor`] is everything the configure stage decides: the
//! arguments handed to `configure`, the environment overlay for every later
//! command, and the output directory the build installs into.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::core::option::EffectiveConfiguration;
use crate::core::settings::BuildType;
use crate::resolver::DependencyInfo;
use crate::util::process::ProcessBuilder;

/// Option that, by convention, requests position-independent code.
pub const FPIC_OPTION: &str = "fPIC";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolchainKind {
    Autotools,
    Msvc,
}

/// Result of configuring a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolchainDescriptor {
    pub kind: ToolchainKind,
    /// Arguments for `configure` (empty for MSVC)
    pub configure_args: Vec<String>,
    /// Environment overlay for every build command
    pub env: BTreeMap<String, String>,
    /// Install prefix the build writes into
    pub output_dir: PathBuf,
}

impl ToolchainDescriptor {
    /// Descriptor for an autotools `configure && make` build.
    pub fn autotools(
        config: &EffectiveConfiguration,
        fixed_args: &[String],
        deps: &[DependencyInfo],
        output_dir: &Path,
    ) -> Self {
        let settings = &config.settings;

        let mut configure_args = vec![format!("--prefix={}", output_dir.display())];
        configure_args.extend(fixed_args.iter().cloned());
        configure_args.extend(
            config
                .iter_decls()
                .filter_map(|(decl, value)| decl.configure_flags.as_ref()?.for_value(value))
                .map(str::to_string),
        );

        let mut cflags: Vec<&str> = Vec::new();
        if config.is_enabled(FPIC_OPTION) {
            cflags.push("-fPIC");
        }
        match settings.build_type {
            BuildType::Debug => cflags.push("-g"),
            BuildType::Release => cflags.push("-O3"),
        }
        if let Some(flag) = settings.arch.gcc_width_flag() {
            cflags.push(flag);
        }

        let mut cppflags: Vec<String> = deps
            .iter()
            .flat_map(|d| d.include_dirs.iter())
            .map(|dir| format!("-I{}", dir.display()))
            .collect();
        if !settings.build_type.is_debug() {
            cppflags.push("-DNDEBUG".to_string());
        }

        let mut ldflags: Vec<String> = deps
            .iter()
            .flat_map(|d| d.lib_dirs.iter())
            .map(|dir| format!("-L{}", dir.display()))
            .collect();
        if let Some(flag) = settings.arch.gcc_width_flag() {
            ldflags.push(flag.to_string());
        }

        let mut env = BTreeMap::new();
        env.insert("CC".to_string(), settings.compiler.c_driver().to_string());
        env.insert("CFLAGS".to_string(), cflags.join(" "));
        env.insert("CPPFLAGS".to_string(), cppflags.join(" "));
        env.insert("LDFLAGS".to_string(), ldflags.join(" "));

        ToolchainDescriptor {
            kind: ToolchainKind::Autotools,
            configure_args,
            env,
            output_dir: output_dir.to_path_buf(),
        }
    }

    /// Descriptor for the MSVC script build.
    ///
    /// `CL` carries the runtime flag; dependency directories are prepended
    /// to the `INCLUDE` and `LIB` search paths inherited from the caller.
    pub fn msvc(config: &EffectiveConfiguration, deps: &[DependencyInfo], output_dir: &Path) -> Self {
        let runtime = if config.settings.build_type.is_debug() {
            "/MDd"
        } else {
            "/MD"
        };

        let mut env = BTreeMap::new();
        env.insert("CL".to_string(), runtime.to_string());
        env.insert(
            "INCLUDE".to_string(),
            search_path(deps.iter().flat_map(|d| d.include_dirs.iter()), "INCLUDE"),
        );
        env.insert(
            "LIB".to_string(),
            search_path(deps.iter().flat_map(|d| d.lib_dirs.iter()), "LIB"),
        );

        ToolchainDescriptor {
            kind: ToolchainKind::Msvc,
            configure_args: Vec::new(),
            env,
            output_dir: output_dir.to_path_buf(),
        }
    }

    /// The `configure` invocation for `source_dir`.
    pub fn configure_command(&self, source_dir: &Path) -> ProcessBuilder {
        ProcessBuilder::new(source_dir.join("configure"))
            .args(&self.configure_args)
            .envs(&self.env)
            .cwd(source_dir)
    }
}

fn search_path<'a>(dirs: impl Iterator<Item = &'a PathBuf>, inherited: &str) -> String {
    let mut parts: Vec<String> = dirs.map(|d| d.display().to_string()).collect();
    if let Some(existing) = std::env::var_os(inherited) {
        let existing = existing.to_string_lossy().into_owned();
        if !existing.is_empty() {
            parts.push(existing);
        }
    }
    parts.join(";")
}
