//! CLI argument definitions

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell as CompletionShell;

#[derive(Parser)]
#[command(name = "dockyard")]
#[command(author, version, about = "Build and package native C libraries from recipes", long_about = None)]
pub struct Cli {
    /// Use verbose output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Coloring: auto, always, never
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    pub color: String,

    /// Output format for messages
    #[arg(long, global = true, value_enum, default_value_t = MessageFormat::Human)]
    pub message_format: MessageFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum MessageFormat {
    Human,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch, build and package a recipe
    Package(PackageArgs),

    /// Show the effective options of a recipe for a platform
    Options(OptionsArgs),

    /// Show the build strategy and stages without running anything
    Plan(PlanArgs),

    /// Remove work directories
    Clean(CleanArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Recipe, platform and option selection shared by several commands.
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Built-in recipe name, or path to a recipe file
    #[arg(default_value = "libpq")]
    pub recipe: String,

    /// Target operating system (default: host)
    #[arg(long)]
    pub os: Option<String>,

    /// Target architecture (default: host)
    #[arg(long)]
    pub arch: Option<String>,

    /// Compiler family (default: the host's usual compiler)
    #[arg(long)]
    pub compiler: Option<String>,

    /// Compiler version
    #[arg(long, value_name = "VERSION")]
    pub compiler_version: Option<String>,

    /// C++ standard library; ignored for C components
    #[arg(long)]
    pub libcxx: Option<String>,

    /// Build type: debug or release
    #[arg(long, default_value = "release")]
    pub build_type: String,

    /// Set an option, e.g. `-o shared=true`
    #[arg(short = 'o', long = "option", value_name = "NAME=VALUE")]
    pub options: Vec<String>,
}

#[derive(Args)]
pub struct PackageArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Use an already unpacked source tree instead of downloading
    #[arg(long)]
    pub source_dir: Option<PathBuf>,

    /// Work directory (default: .dockyard/work/<recipe>)
    #[arg(long)]
    pub work_dir: Option<PathBuf>,

    /// Package directory (default: .dockyard/package/<recipe>)
    #[arg(long)]
    pub package_dir: Option<PathBuf>,

    /// Root holding installed dependencies
    #[arg(long, env = "DOCKYARD_DEPS_PREFIX")]
    pub deps_prefix: Option<PathBuf>,

    /// Number of parallel jobs
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Never hit the network; use cached archives only
    #[arg(long)]
    pub offline: bool,
}

#[derive(Args)]
pub struct OptionsArgs {
    #[command(flatten)]
    pub target: TargetArgs,
}

#[derive(Args)]
pub struct PlanArgs {
    #[command(flatten)]
    pub target: TargetArgs,
}

#[derive(Args)]
pub struct CleanArgs {
    /// Recipe whose directories to remove
    #[arg(default_value = "libpq")]
    pub recipe: String,

    /// Work directory (default: .dockyard/work/<recipe>)
    #[arg(long)]
    pub work_dir: Option<PathBuf>,

    /// Also remove the finished package
    #[arg(long)]
    pub package: bool,

    /// Package directory (default: .dockyard/package/<recipe>)
    #[arg(long)]
    pub package_dir: Option<PathBuf>,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: CompletionShell,
}
