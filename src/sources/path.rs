//! Source copied from a local directory.

use std::path::{Path, PathBuf};

use crate::core::errors::PackageError;
use crate::core::recipe::Recipe;
use crate::sources::{unavailable, SourceProvider};
use crate::util::fs::copy_dir_all;

/// Copies an already unpacked source tree into the work directory.
pub struct PathSource {
    root: PathBuf,
}

impl PathSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        PathSource { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl SourceProvider for PathSource {
    fn name(&self) -> &str {
        "path"
    }

    fn fetch_into(&self, recipe: &Recipe, dest: &Path) -> Result<(), PackageError> {
        if !self.root.is_dir() {
            return Err(unavailable(
                recipe,
                format!("{} is not a directory", self.root.display()),
            ));
        }

        copy_dir_all(&self.root, dest).map_err(|e| unavailable(recipe, format!("{:#}", e)))?;
        tracing::debug!("copied {} to {}", self.root.display(), dest.display());
        Ok(())
    }
}
