//! Install stage: run the strategy's install actions, then collect the
//! package tree.

use std::fs;
use std::path::Path;

use crate::builder::collect::{collect, PackageTree};
use crate::builder::events::Stage;
use crate::builder::pipeline::{BuildPipeline, BuiltTree};
use crate::builder::strategy::BuildStrategy;
use crate::core::errors::PackageError;
use crate::core::recipe::Recipe;

/// Install a built tree and collect it into `package_dir`.
///
/// Anything already in `package_dir` is removed first. On error no tree is
/// returned and the directory content is unspecified.
pub fn install(
    pipeline: &BuildPipeline<'_>,
    built: BuiltTree,
    recipe: &Recipe,
    package_dir: &Path,
) -> Result<PackageTree, PackageError> {
    match built.strategy() {
        BuildStrategy::Script(script) => {
            let script_dir = built.source_dir().join(&script.spec.dir);
            pipeline
                .listener()
                .stage(Stage::Installing, &script.spec.install.join(" "));
            tracing::info!("installing into {}", built.output_dir().display());
            pipeline.run_script(&script.spec.install, &script_dir, built.toolchain())?;
        }
        BuildStrategy::Staged(staged) => {
            // The shared helpers must be installed before the component.
            for dir in [&staged.spec.common_dir, &staged.spec.component_dir] {
                pipeline.make(built.toolchain(), dir, &["install"])?;
            }
        }
    }

    if package_dir.exists() {
        fs::remove_dir_all(package_dir)
            .map_err(|e| PackageError::io(format!("failed to clear {}", package_dir.display()), e))?;
    }

    let config = pipeline.config();
    let mut rules = built.strategy().artifact_rules(config.settings.os);
    rules.extend(recipe.license_rule());

    let mut tree = PackageTree::new(package_dir);
    collect(&rules, config, built.source_dir(), built.output_dir(), &mut tree)?;

    tracing::info!(
        "collected {} files into {}",
        tree.len(),
        package_dir.display()
    );
    Ok(tree)
}
