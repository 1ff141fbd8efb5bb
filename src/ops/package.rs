//! Implementation of `dockyard package`.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::builder::events::{Stage, StageListener};
use crate::builder::install::install;
use crate::builder::package_info::{emit, PackageMetadata, METADATA_FILE};
use crate::builder::pipeline::{BuildPipeline, WorkLayout};
use crate::builder::strategy::select_strategy;
use crate::builder::PackageTree;
use crate::core::errors::PackageError;
use crate::core::option::{resolve, RawOptions};
use crate::core::recipe::Recipe;
use crate::core::requirement::requirements;
use crate::core::settings::Settings;
use crate::resolver::{resolve_all, DependencyResolver};
use crate::sources::SourceProvider;
use crate::util::process::ProcessExecutor;

/// Options for one packaging run.
#[derive(Debug, Clone)]
pub struct PackageOptions {
    pub settings: Settings,
    /// Option values as given by the user, before resolution
    pub raw_options: RawOptions,
    /// Holds the unpacked source and the build output
    pub work_dir: PathBuf,
    /// Where the package tree is assembled
    pub package_dir: PathBuf,
    /// Parallel jobs for `make`
    pub jobs: Option<usize>,
}

/// The outside world a run talks to.
pub struct Collaborators<'a> {
    pub executor: &'a dyn ProcessExecutor,
    pub source: &'a dyn SourceProvider,
    pub resolver: &'a dyn DependencyResolver,
    pub listener: &'a dyn StageListener,
}

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct PackageOutcome {
    pub metadata: PackageMetadata,
    pub tree: PackageTree,
    pub duration: Duration,
}

impl PackageOutcome {
    pub fn package_dir(&self) -> &Path {
        &self.tree.root
    }
}

/// Build and package `recipe`.
///
/// Options, platform and dependencies are all checked before the source is
/// fetched or any command runs. Any failure aborts the run and leaves no
/// metadata file behind. Relative work and package directories are taken
/// relative to the current directory, since the build changes directory.
pub fn package(
    recipe: &Recipe,
    opts: &PackageOptions,
    with: &Collaborators<'_>,
) -> Result<PackageOutcome, PackageError> {
    let start = Instant::now();
    let work_dir = absolute(&opts.work_dir)?;
    let package_dir = absolute(&opts.package_dir)?;

    let config = resolve(&recipe.options, &opts.raw_options, &opts.settings, recipe.drop_libcxx)?;
    let strategy = select_strategy(recipe, &config.settings)?;
    tracing::info!(
        "packaging {} {} for {} with the {} strategy",
        recipe.name,
        recipe.version,
        config.settings,
        strategy.kind()
    );

    let deps = resolve_all(with.resolver, &requirements(&config))?;

    let stale = package_dir.join(METADATA_FILE);
    if stale.exists() {
        std::fs::remove_file(&stale)
            .map_err(|e| PackageError::io(format!("failed to remove {}", stale.display()), e))?;
    }

    with.listener
        .stage(Stage::Fetching, &format!("{} {}", recipe.name, recipe.version));
    let source_dir = with.source.fetch(recipe, &work_dir)?;

    let layout = WorkLayout {
        source_dir,
        output_dir: work_dir.join("output"),
    };
    if layout.output_dir.exists() {
        std::fs::remove_dir_all(&layout.output_dir).map_err(|e| {
            PackageError::io(format!("failed to clear {}", layout.output_dir.display()), e)
        })?;
    }

    let mut pipeline = BuildPipeline::new(with.executor, &config, layout)
        .with_dependencies(deps)
        .with_jobs(opts.jobs)
        .with_listener(with.listener);
    let built = pipeline.execute(&strategy)?;
    let tree = install(&pipeline, built, recipe, &package_dir)?;

    let metadata = emit(recipe, &config, &strategy, &tree);
    metadata.write(&package_dir)?;

    with.listener
        .stage(Stage::Packaged, &package_dir.display().to_string());

    Ok(PackageOutcome {
        metadata,
        tree,
        duration: start.elapsed(),
    })
}

fn absolute(path: &Path) -> Result<PathBuf, PackageError> {
    std::path::absolute(path)
        .map_err(|e| PackageError::io(format!("failed to resolve {}", path.display()), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::collect::Role;
    use crate::builder::events::Silent;
    use crate::builder::strategy::{dispatch, StrategyKind};
    use crate::core::settings::{Arch, CompilerFamily, Os};
    use crate::resolver::{NoDependencies, PrefixResolver};
    use crate::sources::PathSource;
    use crate::test_support::{fixtures, MockExecutor, MockProcessOutput};
    use std::path::PathBuf;
    use tempfile::TempDir;

    struct Run {
        tmp: TempDir,
        upstream: PathBuf,
    }

    impl Run {
        fn new() -> Self {
            let tmp = TempDir::new().unwrap();
            let upstream = tmp.path().join("postgresql-10.4");
            fixtures::libpq_source_tree(&upstream);
            Run { tmp, upstream }
        }

        fn work_dir(&self) -> PathBuf {
            self.tmp.path().join("work")
        }

        fn package_dir(&self) -> PathBuf {
            self.tmp.path().join("package")
        }

        fn options(&self, settings: Settings, pairs: &[(&str, &str)]) -> PackageOptions {
            PackageOptions {
                settings,
                raw_options: pairs
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                work_dir: self.work_dir(),
                package_dir: self.package_dir(),
                jobs: None,
            }
        }

        fn run(
            &self,
            exec: &MockExecutor,
            resolver: &dyn DependencyResolver,
            opts: &PackageOptions,
        ) -> Result<PackageOutcome, PackageError> {
            let recipe = Recipe::builtin("libpq").unwrap();
            let source = PathSource::new(&self.upstream);
            package(
                &recipe,
                opts,
                &Collaborators {
                    executor: exec,
                    source: &source,
                    resolver,
                    listener: &Silent,
                },
            )
        }
    }

    fn linux() -> Settings {
        Settings::new(Os::Linux, Arch::X86_64, CompilerFamily::Gcc, "12").with_libcxx("libstdc++11")
    }

    #[test]
    fn test_linux_static_package() {
        let run = Run::new();
        let exec = MockExecutor::succeeding()
            .on_install(fixtures::staged_install_hook(&run.work_dir().join("output")));
        let opts = run.options(
            linux(),
            &[("shared", "False"), ("with_zlib", "False"), ("with_openssl", "False")],
        );

        let outcome = run.run(&exec, &NoDependencies, &opts).unwrap();

        assert_eq!(outcome.metadata.strategy, StrategyKind::Staged);
        assert!(outcome
            .tree
            .files(Role::Lib)
            .iter()
            .all(|f| f.extension().is_some_and(|e| e == "a")));
        assert!(outcome
            .tree
            .files(Role::Include)
            .contains(&PathBuf::from("include/libpq-fe.h")));
        assert!(outcome.metadata.system_libs.contains(&"pthread".to_string()));
        assert!(outcome.metadata.settings.libcxx.is_none());
        assert!(run.package_dir().join(METADATA_FILE).exists());
        assert_eq!(outcome.package_dir(), run.package_dir());
    }

    #[test]
    fn test_linux_shared_package() {
        let run = Run::new();
        let exec = MockExecutor::succeeding()
            .on_install(fixtures::staged_install_hook(&run.work_dir().join("output")));
        let opts = run.options(linux(), &[("shared", "True")]);

        let outcome = run.run(&exec, &NoDependencies, &opts).unwrap();

        let libs = outcome.tree.files(Role::Lib);
        assert!(libs.contains(&PathBuf::from("lib/libpq.a")));
        assert!(libs.contains(&PathBuf::from("lib/libpq.so.5.10")));
        assert!(run.package_dir().join("lib/libpq.so.5.10").exists());
    }

    #[test]
    fn test_windows_script_package() {
        let run = Run::new();
        let exec = MockExecutor::succeeding()
            .on_install(fixtures::script_install_hook(&run.work_dir().join("output")));
        let settings = Settings::new(Os::Windows, Arch::X86_64, CompilerFamily::Msvc, "15");
        let opts = run.options(settings, &[]);

        let outcome = run.run(&exec, &NoDependencies, &opts).unwrap();

        assert_eq!(outcome.metadata.strategy, StrategyKind::Script);
        assert_eq!(outcome.metadata.libs, vec!["libpq", "ws2_32"]);
        assert!(!outcome.metadata.options.contains_key("shared"));
        assert!(!outcome.metadata.options.contains_key("fPIC"));
        assert!(run.package_dir().join("bin/libpq.dll").exists());
        assert!(run.package_dir().join("symbols/libpq.pdb").exists());

        let commands: Vec<String> = exec.calls().into_iter().map(|c| c.command).collect();
        assert_eq!(commands[0], "cmd /c build.bat");
        assert!(commands[1].starts_with("cmd /c install.bat "));
    }

    #[test]
    fn test_with_zlib_uses_provided_dependency() {
        let run = Run::new();
        let deps = run.tmp.path().join("deps");
        std::fs::create_dir_all(deps.join("zlib-1.2.11/include")).unwrap();

        let exec = MockExecutor::succeeding()
            .on_install(fixtures::staged_install_hook(&run.work_dir().join("output")));
        let opts = run.options(linux(), &[("with_zlib", "True")]);

        let outcome = run.run(&exec, &PrefixResolver::new(&deps), &opts).unwrap();

        assert_eq!(outcome.metadata.requirements, vec!["zlib/1.2.11@conan/stable"]);
        let configure = &exec.calls()[0];
        assert!(configure.command.contains("--with-zlib"));
        assert!(configure.env["CPPFLAGS"].contains(&deps.join("zlib-1.2.11/include").display().to_string()));
    }

    #[test]
    fn test_missing_dependency_aborts_before_fetch() {
        let run = Run::new();
        let exec = MockExecutor::succeeding();
        let opts = run.options(linux(), &[("with_openssl", "True")]);

        let err = run.run(&exec, &NoDependencies, &opts).unwrap_err();

        assert!(matches!(err, PackageError::DependencyUnavailable { ref requirement, .. }
            if requirement == "OpenSSL/1.0.2o@conan/stable"));
        assert!(exec.calls().is_empty());
        assert!(!run.work_dir().exists());
    }

    #[test]
    fn test_unsupported_platform_runs_nothing() {
        let unsupported = Os::ALL.into_iter().flat_map(|os| {
            CompilerFamily::ALL
                .into_iter()
                .filter(move |compiler| dispatch(os, *compiler).is_none())
                .map(move |compiler| (os, compiler))
        });

        let mut checked = 0;
        for (os, compiler) in unsupported {
            let run = Run::new();
            let exec = MockExecutor::succeeding();
            let opts = run.options(Settings::new(os, Arch::X86_64, compiler, "12"), &[]);

            let err = run.run(&exec, &NoDependencies, &opts).unwrap_err();

            assert!(
                matches!(err, PackageError::UnsupportedPlatform { os: o, compiler: c } if o == os && c == compiler),
                "{} {}: {}",
                os,
                compiler,
                err
            );
            assert!(exec.calls().is_empty(), "{} {} ran commands", os, compiler);
            assert!(!run.work_dir().exists());
            assert!(!run.package_dir().exists());
            checked += 1;
        }
        // three non-msvc compilers on windows, every compiler on freebsd/android/ios
        assert_eq!(checked, 3 + 3 * 4);
    }

    #[test]
    fn test_failed_build_leaves_no_metadata() {
        let run = Run::new();
        std::fs::create_dir_all(run.package_dir()).unwrap();
        std::fs::write(run.package_dir().join(METADATA_FILE), "{}").unwrap();

        let mut exec = MockExecutor::succeeding();
        exec.expect_regex("configure", MockProcessOutput::failure(1, "configure: error"));
        let opts = run.options(linux(), &[]);

        let err = run.run(&exec, &NoDependencies, &opts).unwrap_err();

        assert!(matches!(err, PackageError::BuildStageFailed { ref stage, .. } if stage == "configure"));
        assert!(!run.package_dir().join(METADATA_FILE).exists());
    }

    #[test]
    fn test_invalid_option_value() {
        let run = Run::new();
        let exec = MockExecutor::succeeding();
        let opts = run.options(linux(), &[("shared", "maybe")]);

        let err = run.run(&exec, &NoDependencies, &opts).unwrap_err();
        assert!(matches!(err, PackageError::InvalidOptionValue { ref option, .. } if option == "shared"));
        assert!(exec.calls().is_empty());
    }

    #[test]
    fn test_relative_dirs_give_absolute_prefix() {
        let run = Run::new();
        let exec = MockExecutor::succeeding()
            .on_install(fixtures::staged_install_hook(&run.work_dir().join("output")));
        let cwd = std::env::current_dir().unwrap();
        let mut opts = run.options(linux(), &[("shared", "False")]);
        opts.work_dir = pathdiff::diff_paths(run.work_dir(), &cwd).unwrap();
        opts.package_dir = pathdiff::diff_paths(run.package_dir(), &cwd).unwrap();
        assert!(opts.work_dir.is_relative());

        let outcome = run.run(&exec, &NoDependencies, &opts).unwrap();

        let configure = exec
            .calls()
            .into_iter()
            .find(|c| c.command.contains("--prefix="))
            .unwrap();
        let prefix = configure
            .command
            .split_whitespace()
            .find_map(|arg| arg.strip_prefix("--prefix="))
            .map(PathBuf::from)
            .unwrap();
        assert!(prefix.is_absolute());
        assert_eq!(
            std::fs::canonicalize(&prefix).unwrap(),
            std::fs::canonicalize(run.work_dir().join("output")).unwrap()
        );
        assert!(outcome.package_dir().is_absolute());
        assert!(run.package_dir().join(METADATA_FILE).exists());
    }
}
