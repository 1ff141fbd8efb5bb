//! High-level operations.
//!
//! This module contains the implementation of dockyard commands.

pub mod clean;
pub mod options;
pub mod package;
pub mod plan;

pub use clean::{clean, CleanOptions};
pub use options::{format_options_report, options_report, OptionsReport};
pub use package::{package, Collaborators, PackageOptions, PackageOutcome};
pub use plan::{format_plan, plan, plan_for, BuildPlan};
