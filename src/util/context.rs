//! Global context for dockyard operations.
//!
//! Provides centralized access to configuration and the directories a run
//! works in.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::util::config::{global_config_dir, load_config, project_config_path, Config};

/// Global context containing configuration and paths.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Current working directory
    cwd: PathBuf,

    /// Home directory for global dockyard data (~/.dockyard/)
    home: PathBuf,

    /// Merged global and project configuration
    config: Config,
}

impl GlobalContext {
    /// Create a context for the current directory, loading configuration.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        Ok(Self::with_cwd(cwd))
    }

    /// Create a context rooted at `cwd`.
    pub fn with_cwd(cwd: PathBuf) -> Self {
        let home = global_config_dir().unwrap_or_else(|| PathBuf::from(".dockyard"));
        Self::with_home(cwd, home)
    }

    /// Create a context with an explicit home directory.
    pub fn with_home(cwd: PathBuf, home: PathBuf) -> Self {
        let config = load_config(Some(&home.join("config.toml")), &project_config_path(&cwd));
        GlobalContext {
            cwd,
            home,
            config,
        }
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// The dockyard home directory (~/.dockyard/).
    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Download cache for source archives.
    pub fn cache_dir(&self) -> PathBuf {
        self.config
            .source
            .cache_dir
            .as_ref()
            .map(|p| self.resolve(p))
            .unwrap_or_else(|| self.home.join("cache"))
    }

    /// Project-local dockyard directory.
    pub fn project_dir(&self) -> PathBuf {
        self.cwd.join(".dockyard")
    }

    /// Default work directory for a recipe.
    pub fn work_dir(&self, recipe: &str) -> PathBuf {
        self.config
            .build
            .work_dir
            .as_ref()
            .map(|p| self.resolve(p))
            .unwrap_or_else(|| self.project_dir().join("work"))
            .join(recipe)
    }

    /// Default package directory for a recipe.
    pub fn package_dir(&self, recipe: &str) -> PathBuf {
        self.config
            .build
            .package_dir
            .as_ref()
            .map(|p| self.resolve(p))
            .unwrap_or_else(|| self.project_dir().join("package"))
            .join(recipe)
    }

    /// Root of installed dependencies, if configured.
    pub fn deps_prefix(&self) -> Option<PathBuf> {
        self.config.deps.prefix.as_ref().map(|p| self.resolve(p))
    }

    /// Resolve a possibly relative path against the working directory.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd.join(path)
        }
    }
}
