//! `dockyard package` command

use anyhow::Result;

use crate::cli::PackageArgs;
use dockyard::builder::events::BuildEvent;
use dockyard::ops::{package, Collaborators, PackageOptions};
use dockyard::resolver::{DependencyResolver, NoDependencies, PrefixResolver};
use dockyard::sources::{PathSource, SourceProvider, TarballSource};
use dockyard::util::process::SystemExecutor;
use dockyard::util::shell::{format_duration, Status};
use dockyard::util::{GlobalContext, Shell};

pub fn execute(args: PackageArgs, shell: &Shell) -> Result<()> {
    let ctx = GlobalContext::new()?;
    let config = ctx.config();

    let recipe = super::load_recipe(&ctx, &args.target.recipe)?;
    let settings = args.target.settings()?;
    let raw_options = args.target.raw_options()?;

    // Flags > config > defaults
    let opts = PackageOptions {
        settings,
        raw_options,
        work_dir: args
            .work_dir
            .as_deref()
            .map(|p| ctx.resolve(p))
            .unwrap_or_else(|| ctx.work_dir(&recipe.name)),
        package_dir: args
            .package_dir
            .as_deref()
            .map(|p| ctx.resolve(p))
            .unwrap_or_else(|| ctx.package_dir(&recipe.name)),
        jobs: args.jobs.or(config.build.jobs),
    };

    let source: Box<dyn SourceProvider> = match &args.source_dir {
        Some(dir) => Box::new(PathSource::new(ctx.resolve(dir))),
        None => Box::new(TarballSource::new(ctx.cache_dir()).offline(args.offline || config.source.offline)),
    };

    let prefix = args.deps_prefix.as_deref().map(|p| ctx.resolve(p)).or_else(|| ctx.deps_prefix());
    let resolver: Box<dyn DependencyResolver> = match prefix {
        Some(prefix) => Box::new(PrefixResolver::new(prefix)),
        None => Box::new(NoDependencies),
    };

    tracing::debug!("work dir: {}", opts.work_dir.display());
    tracing::debug!("source: {}", source.name());

    let outcome = package(
        &recipe,
        &opts,
        &Collaborators {
            executor: &SystemExecutor,
            source: source.as_ref(),
            resolver: resolver.as_ref(),
            listener: shell,
        },
    )?;

    let files = outcome.tree.len();
    if shell.is_json() {
        shell.event(&BuildEvent::PackageFinished {
            package_id: outcome.metadata.package_id.clone(),
            package_dir: outcome.package_dir().to_path_buf(),
            files,
            duration_ms: outcome.duration.as_millis() as u64,
        });
    } else {
        shell.status(
            Status::Finished,
            format!(
                "{} {} ({}) {} files in {}",
                recipe.name,
                recipe.version,
                outcome.metadata.package_id,
                files,
                format_duration(outcome.duration)
            ),
        );
    }

    Ok(())
}
