//! `dockyard plan` command

use anyhow::Result;

use crate::cli::PlanArgs;
use dockyard::ops::{format_plan, plan};
use dockyard::util::{GlobalContext, Shell};

pub fn execute(args: PlanArgs, shell: &Shell) -> Result<()> {
    let ctx = GlobalContext::new()?;
    let recipe = super::load_recipe(&ctx, &args.target.recipe)?;
    let settings = args.target.settings()?;
    let raw = args.target.raw_options()?;

    let plan = plan(&recipe, &raw, &settings)?;

    if shell.is_json() {
        shell.json_value(&serde_json::to_value(&plan)?);
    } else {
        println!("{}", format_plan(&plan));
    }
    Ok(())
}
