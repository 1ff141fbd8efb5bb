//! Resolve requirements from a directory of pre-built dependencies.

use std::path::{Path, PathBuf};

use super::{DependencyInfo, DependencyResolver};
use crate::core::errors::PackageError;
use crate::core::requirement::Requirement;

/// Looks up `<root>/<name>-<version>` first, then `<root>/<name>`.
///
/// A candidate counts only if it has an `include/` directory.
#[derive(Debug, Clone)]
pub struct PrefixResolver {
    root: PathBuf,
}

impl PrefixResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        PrefixResolver { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn candidates(&self, requirement: &Requirement) -> [PathBuf; 2] {
        [
            self.root.join(requirement.dir_name()),
            self.root.join(&requirement.name),
        ]
    }
}

impl DependencyResolver for PrefixResolver {
    fn resolve(&self, requirement: &Requirement) -> Result<DependencyInfo, PackageError> {
        self.candidates(requirement)
            .into_iter()
            .find(|dir| dir.join("include").is_dir())
            .map(|dir| DependencyInfo::from_root(requirement.clone(), dir))
            .ok_or_else(|| PackageError::DependencyUnavailable {
                requirement: requirement.to_string(),
                reason: format!(
                    "not found under {} (looked for `{}` and `{}`)",
                    self.root.display(),
                    requirement.dir_name(),
                    requirement.name
                ),
            })
    }
}
