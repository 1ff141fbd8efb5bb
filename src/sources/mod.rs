//! Upstream source providers.
//!
//! A provider places the recipe's source tree at
//! `<work_dir>/<source.subfolder>`. A subfolder that is already populated is
//! reused as-is, so a re-run after a failed build does not fetch again.

pub mod path;
pub mod tarball;

use std::path::{Path, PathBuf};

use crate::core::errors::PackageError;
use crate::core::recipe::Recipe;

pub use path::PathSource;
pub use tarball::{extract_tarball, TarballSource};

/// Something that can produce an unpacked upstream source tree.
pub trait SourceProvider {
    /// Human-readable name, used in log lines.
    fn name(&self) -> &str;

    /// Populate `dest` with the source tree. `dest` does not exist yet.
    fn fetch_into(&self, recipe: &Recipe, dest: &Path) -> Result<(), PackageError>;

    /// Return the source subfolder below `work_dir`, fetching it if needed.
    fn fetch(&self, recipe: &Recipe, work_dir: &Path) -> Result<PathBuf, PackageError> {
        let dest = work_dir.join(&recipe.source.subfolder);
        if is_populated(&dest) {
            tracing::debug!("reusing source in {}", dest.display());
            return Ok(dest);
        }

        if dest.exists() {
            std::fs::remove_dir_all(&dest)
                .map_err(|e| PackageError::io(format!("failed to clear {}", dest.display()), e))?;
        }
        std::fs::create_dir_all(work_dir)
            .map_err(|e| PackageError::io(format!("failed to create {}", work_dir.display()), e))?;

        tracing::info!(
            "fetching {} {} ({})",
            recipe.name,
            recipe.version,
            self.name()
        );
        self.fetch_into(recipe, &dest)?;
        Ok(dest)
    }
}

/// Whether `dir` exists and has at least one entry.
pub fn is_populated(dir: &Path) -> bool {
    std::fs::read_dir(dir)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

/// `SourceUnavailable` for `recipe`.
pub(crate) fn unavailable(recipe: &Recipe, reason: impl Into<String>) -> PackageError {
    PackageError::SourceUnavailable {
        name: recipe.name.clone(),
        version: recipe.version.clone(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use tempfile::TempDir;

    struct Counting {
        calls: Cell<usize>,
    }

    impl SourceProvider for Counting {
        fn name(&self) -> &str {
            "counting"
        }

        fn fetch_into(&self, _recipe: &Recipe, dest: &Path) -> Result<(), PackageError> {
            self.calls.set(self.calls.get() + 1);
            std::fs::create_dir_all(dest).unwrap();
            std::fs::write(dest.join("configure"), "#!/bin/sh\n").unwrap();
            Ok(())
        }
    }

    #[test]
    fn test_populated_subfolder_is_reused() {
        let tmp = TempDir::new().unwrap();
        let recipe = Recipe::builtin("libpq").unwrap();
        let provider = Counting { calls: Cell::new(0) };

        let first = provider.fetch(&recipe, tmp.path()).unwrap();
        let second = provider.fetch(&recipe, tmp.path()).unwrap();

        assert_eq!(first, tmp.path().join("source_subfolder"));
        assert_eq!(first, second);
        assert_eq!(provider.calls.get(), 1);
    }

    #[test]
    fn test_empty_subfolder_is_refetched() {
        let tmp = TempDir::new().unwrap();
        let recipe = Recipe::builtin("libpq").unwrap();
        std::fs::create_dir_all(tmp.path().join("source_subfolder")).unwrap();
        let provider = Counting { calls: Cell::new(0) };

        provider.fetch(&recipe, tmp.path()).unwrap();
        assert_eq!(provider.calls.get(), 1);
        assert!(is_populated(&tmp.path().join("source_subfolder")));
    }
}
