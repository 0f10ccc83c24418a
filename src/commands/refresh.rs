use anyhow::Result;
use declarative::ExecuteOptions;

use crate::Context;
use crate::cli::TargetArgs;
use crate::engine::Plan;
use crate::ui;

/// Re-read stored records; the ones deleted on the server are forgotten
pub fn run(ctx: &Context, args: &TargetArgs) -> Result<()> {
    let manifest = super::load_manifest(ctx)?;
    let mut state = super::load_state(ctx)?;

    let mut plan = Plan::refresh(&state);
    plan.retain_target(args.target.as_deref());
    if plan.is_empty() {
        ui::info("No records to refresh");
        return Ok(());
    }

    let client = super::connect(&manifest)?;
    let summary = super::execute(
        ctx,
        &client,
        plan,
        &ExecuteOptions::default(),
        false,
        &mut state,
    )?;
    super::finish(ctx, &summary)
}
