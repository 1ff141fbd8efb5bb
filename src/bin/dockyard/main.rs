//! dockyard - recipe-driven build-and-package orchestrator

use anyhow::Result;
use clap::Parser;
use miette::Diagnostic as _;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands, MessageFormat};
use dockyard::util::diagnostic;
use dockyard::util::shell::ColorChoice;
use dockyard::util::Shell;
use dockyard::PackageError;

fn main() {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    let color = cli.color.parse::<ColorChoice>();
    let shell = Shell::from_flags(
        cli.quiet,
        cli.verbose,
        color.as_ref().copied().unwrap_or_default(),
        cli.message_format == MessageFormat::Json,
    );
    if let Err(e) = color {
        shell.warn(e);
    }

    if let Err(e) = run(cli.command, &shell) {
        report(&shell, &e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    // RUST_LOG wins over --verbose
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("dockyard=debug")
        } else {
            EnvFilter::new("dockyard=info")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn run(command: Commands, shell: &Shell) -> Result<()> {
    match command {
        Commands::Package(args) => commands::package::execute(args, shell),
        Commands::Options(args) => commands::options::execute(args, shell),
        Commands::Plan(args) => commands::plan::execute(args, shell),
        Commands::Clean(args) => commands::clean::execute(args, shell),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}

/// Print a failed run: a diagnostic for packaging errors, the error chain
/// otherwise.
fn report(shell: &Shell, err: &anyhow::Error) {
    shell.finish_spinner();
    match err.downcast_ref::<PackageError>() {
        Some(e) if shell.is_json() => shell.error(e, e.code().map(|c| c.to_string())),
        Some(e) => diagnostic::emit(&e.to_diagnostic(), shell.use_color()),
        None => {
            if shell.is_json() {
                shell.error(format!("{:#}", err), None);
            } else {
                eprintln!("error: {:#}", err);
            }
        }
    }
}
