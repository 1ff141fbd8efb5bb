//! `dockyard clean` command

use anyhow::Result;

use crate::cli::CleanArgs;
use dockyard::ops::{clean, CleanOptions};
use dockyard::util::shell::Status;
use dockyard::util::{GlobalContext, Shell};

pub fn execute(args: CleanArgs, shell: &Shell) -> Result<()> {
    let ctx = GlobalContext::new()?;
    let name = super::load_recipe(&ctx, &args.recipe)?.name;

    let work_dir = match &args.work_dir {
        Some(dir) => ctx.resolve(dir),
        None => ctx.work_dir(&name),
    };
    let package_dir = args.package.then(|| match &args.package_dir {
        Some(dir) => ctx.resolve(dir),
        None => ctx.package_dir(&name),
    });

    let removed = clean(&CleanOptions { work_dir, package_dir })?;

    if removed.is_empty() {
        shell.note("nothing to clean");
    }
    for dir in &removed {
        shell.status(Status::Removed, dir.display());
    }
    Ok(())
}
