//! `dockyard options` command

use anyhow::Result;

use crate::cli::OptionsArgs;
use dockyard::ops::{format_options_report, options_report};
use dockyard::util::{GlobalContext, Shell};

pub fn execute(args: OptionsArgs, shell: &Shell) -> Result<()> {
    let ctx = GlobalContext::new()?;
    let recipe = super::load_recipe(&ctx, &args.target.recipe)?;
    let settings = args.target.settings()?;
    let raw = args.target.raw_options()?;

    let report = options_report(&recipe, &raw, &settings)?;

    if shell.is_json() {
        shell.json_value(&serde_json::to_value(&report)?);
    } else {
        println!("{}", format_options_report(&report));
    }
    Ok(())
}
