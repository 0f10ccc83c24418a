use anyhow::Result;
use declarative::ExecuteOptions;

use crate::Context;
use crate::cli::DestroyArgs;
use crate::engine::{Plan, differ};
use crate::ui;

pub fn run(ctx: &Context, args: &DestroyArgs) -> Result<()> {
    let manifest = super::load_manifest(ctx)?;
    let mut state = super::load_state(ctx)?;

    let mut plan = Plan::destroy(&state);
    plan.retain_target(args.target.target.as_deref());
    if plan.is_empty() {
        ui::info("Nothing to destroy");
        return Ok(());
    }

    if !ctx.quiet {
        differ::display_plan(&plan, false);
    }

    let client = super::connect(&manifest)?;
    let summary = super::execute(
        ctx,
        &client,
        plan,
        &ExecuteOptions::default(),
        !args.yes,
        &mut state,
    )?;
    super::finish(ctx, &summary)
}
