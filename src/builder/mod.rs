//! The build engine.
//!
//! Strategy selection, the staged pipeline with its configure memo, the
//! install stage with pattern-based collection, and the metadata emitted
//! for consumers.

pub mod collect;
pub mod events;
pub mod install;
pub mod memo;
pub mod package_info;
pub mod pipeline;
pub mod strategy;
pub mod toolchain;

pub use collect::{ArtifactRule, PackageTree, Role};
pub use events::{BuildEvent, Stage, StageListener};
pub use install::install;
pub use package_info::{emit, PackageMetadata};
pub use pipeline::{BuildPipeline, BuiltTree, ScriptState, StagedState, WorkLayout};
pub use strategy::{select_strategy, BuildStrategy, StrategyId, StrategyKind};
pub use toolchain::ToolchainDescriptor;
