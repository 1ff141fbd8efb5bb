//! Core data structures for dockyard.
//!
//! - Target settings and build options
//! - Requirements implied by enabled options
//! - Recipes (declarative component descriptions)
//! - The packaging error type

pub mod errors;
pub mod option;
pub mod recipe;
pub mod requirement;
pub mod settings;

pub use errors::{ExitInfo, PackageError};
pub use option::{EffectiveConfiguration, OptionDecl, OptionValue, RawOptions};
pub use recipe::Recipe;
pub use requirement::Requirement;
pub use settings::{Arch, BuildType, CompilerFamily, Os, Settings};
