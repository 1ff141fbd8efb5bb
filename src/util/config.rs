//! Configuration file support for dockyard.
//!
//! Two locations are read:
//! - Global: `~/.dockyard/config.toml` - user-wide defaults
//! - Project: `.dockyard/config.toml` - overrides for one directory
//!
//! Project config takes precedence over global config. Command-line flags
//! take precedence over both.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// dockyard configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub build: BuildConfig,
    pub source: SourceConfig,
    pub deps: DepsConfig,
}

/// Build-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Parallel jobs passed to `make` (None = let make decide)
    pub jobs: Option<usize>,

    /// Work directory for unpacked sources and build output
    pub work_dir: Option<PathBuf>,

    /// Where finished packages are placed
    pub package_dir: Option<PathBuf>,
}

/// Source fetching configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Download cache for source archives
    pub cache_dir: Option<PathBuf>,

    /// Never hit the network
    pub offline: bool,
}

/// Dependency lookup configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepsConfig {
    /// Root holding installed dependencies (`<prefix>/<name>-<version>`)
    pub prefix: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if the file is missing
    /// or broken.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.build.jobs.is_some() {
            self.build.jobs = other.build.jobs;
        }
        if other.build.work_dir.is_some() {
            self.build.work_dir = other.build.work_dir;
        }
        if other.build.package_dir.is_some() {
            self.build.package_dir = other.build.package_dir;
        }

        if other.source.cache_dir.is_some() {
            self.source.cache_dir = other.source.cache_dir;
        }
        if other.source.offline {
            self.source.offline = true;
        }

        if other.deps.prefix.is_some() {
            self.deps.prefix = other.deps.prefix;
        }
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.dockyard/config.toml)
/// 2. Global config (~/.dockyard/config.toml)
/// 3. Defaults
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Config {
    let mut config = Config::default();

    if let Some(global_path) = global_path {
        config.merge(Config::load_or_default(global_path));
    }
    config.merge(Config::load_or_default(project_path));

    config
}

/// Get the global dockyard directory (~/.dockyard).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".dockyard"))
}

/// Get the project config path (.dockyard/config.toml).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".dockyard").join("config.toml")
}
