//! dockyard - recipe-driven build-and-package orchestrator for native C
//! libraries.
//!
//! A recipe declares a component's options, its upstream source and how each
//! platform builds it. dockyard resolves the options for a target platform,
//! picks the single applicable build strategy, drives the upstream build
//! tools and collects the result into a consumer package with metadata.

pub mod builder;
pub mod core;
pub mod ops;
pub mod resolver;
pub mod sources;
pub mod util;

/// Test utilities and mocks for dockyard unit tests.
#[cfg(test)]
pub mod test_support;

pub use core::{EffectiveConfiguration, PackageError, Recipe, Settings};
pub use util::context::GlobalContext;
