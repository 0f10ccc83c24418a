use anyhow::Result;
use declarative::ExecuteOptions;

use crate::Context;
use crate::cli::ApplyArgs;
use crate::engine::{Plan, differ};
use crate::ui;

pub fn run(ctx: &Context, args: &ApplyArgs) -> Result<()> {
    let manifest = super::load_manifest(ctx)?;
    let desired = super::load_desired(ctx, &manifest)?;
    let mut state = super::load_state(ctx)?;

    let mut plan = Plan::converge(&desired, &state);
    plan.retain_target(args.target.target.as_deref());
    log::info!("Planned {} record(s), {} change(s)", plan.len(), plan.change_count());

    if !ctx.quiet {
        differ::display_plan(&plan, ctx.verbose > 0);
    }
    if args.dry_run {
        ui::dim("Dry run, nothing applied");
        return Ok(());
    }
    if plan.is_empty() {
        return Ok(());
    }

    // Unchanged records are still checked so out-of-band deletions get recreated.
    let confirm = plan.change_count() > 0 && !args.yes;
    let client = super::connect(&manifest)?;
    let opts = ExecuteOptions {
        dry_run: false,
        jobs: args.jobs.max(1) as usize,
    };

    let summary = super::execute(ctx, &client, plan, &opts, confirm, &mut state)?;
    super::finish(ctx, &summary)
}
