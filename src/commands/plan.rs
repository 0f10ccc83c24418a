use anyhow::Result;

use crate::Context;
use crate::cli::PlanArgs;
use crate::engine::{Plan, differ};

/// Compare the manifest with the state; never contacts the server
pub fn run(ctx: &Context, args: &PlanArgs) -> Result<()> {
    let manifest = super::load_manifest(ctx)?;
    let desired = super::load_desired(ctx, &manifest)?;
    let state = super::load_state(ctx)?;

    let mut plan = Plan::converge(&desired, &state);
    plan.retain_target(args.target.target.as_deref());

    differ::display_plan(&plan, args.all || ctx.verbose > 0);
    Ok(())
}
