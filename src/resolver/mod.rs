//! Dependency provision.
//!
//! A packaging run only declares the requirements its options imply; a
//! [`DependencyResolver`] is responsible for making each one available and
//! reporting where its headers and libraries live.

mod prefix;

pub use prefix::PrefixResolver;

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::Serialize;

use crate::core::errors::PackageError;
use crate::core::requirement::Requirement;

/// A provided dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyInfo {
    pub requirement: Requirement,
    pub root: PathBuf,
    pub include_dirs: Vec<PathBuf>,
    pub lib_dirs: Vec<PathBuf>,
}

impl DependencyInfo {
    /// Conventional `include/` + `lib/` layout under `root`.
    pub fn from_root(requirement: Requirement, root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        DependencyInfo {
            requirement,
            include_dirs: vec![root.join("include")],
            lib_dirs: vec![root.join("lib")],
            root,
        }
    }
}

/// Provides requirements for a build.
pub trait DependencyResolver {
    fn resolve(&self, requirement: &Requirement) -> Result<DependencyInfo, PackageError>;
}

/// Resolve every requirement, failing on the first unavailable one.
pub fn resolve_all(
    resolver: &dyn DependencyResolver,
    requirements: &BTreeSet<Requirement>,
) -> Result<Vec<DependencyInfo>, PackageError> {
    requirements
        .iter()
        .map(|req| {
            let info = resolver.resolve(req)?;
            tracing::debug!("dependency {} provided from {}", req, info.root.display());
            Ok(info)
        })
        .collect()
}

/// Resolver for runs without requirements; any request is an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDependencies;

impl DependencyResolver for NoDependencies {
    fn resolve(&self, requirement: &Requirement) -> Result<DependencyInfo, PackageError> {
        Err(PackageError::DependencyUnavailable {
            requirement: requirement.to_string(),
            reason: "no dependency prefix configured".to_string(),
        })
    }
}
