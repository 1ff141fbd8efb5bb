//! Implementation of `dockyard clean`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// What `clean` should remove.
#[derive(Debug, Clone)]
pub struct CleanOptions {
    pub work_dir: PathBuf,
    /// Also remove this finished package
    pub package_dir: Option<PathBuf>,
}

/// Remove the work directory (and optionally the package).
///
/// Returns the directories that existed and were removed.
pub fn clean(opts: &CleanOptions) -> Result<Vec<PathBuf>> {
    let mut removed = Vec::new();
    for dir in std::iter::once(&opts.work_dir).chain(opts.package_dir.as_ref()) {
        if remove_if_exists(dir)? {
            tracing::info!("removed {}", dir.display());
            removed.push(dir.clone());
        }
    }
    Ok(removed)
}

fn remove_if_exists(dir: &Path) -> Result<bool> {
    if !dir.exists() {
        return Ok(false);
    }
    std::fs::remove_dir_all(dir).with_context(|| format!("failed to remove {}", dir.display()))?;
    Ok(true)
}
