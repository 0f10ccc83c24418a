//! Subcommands and the plumbing they share

pub mod apply;
pub mod destroy;
pub mod import;
pub mod plan;
pub mod refresh;
pub mod show;

use anyhow::{Result, bail};
use declarative::{AutoConfirm, ExecuteOptions, ExecuteSummary};
use kestra::Client;

use crate::Context;
use crate::config::{self, Desired, Manifest};
use crate::engine::{Batch, Plan};
use crate::progress::{BarProgress, PromptConfirm};
use crate::state::KestraState;
use crate::ui;

/// Load the manifest named on the command line
pub fn load_manifest(ctx: &Context) -> Result<Manifest> {
    Manifest::load(&ctx.manifest)
}

/// Records declared by the manifest
pub fn load_desired(ctx: &Context, manifest: &Manifest) -> Result<Desired> {
    manifest.desired(&config::manifest_dir(&ctx.manifest))
}

/// Client for the server the manifest points at
pub fn connect(manifest: &Manifest) -> Result<Client> {
    let settings = manifest.settings()?;
    log::info!("Connecting to {}", settings.url);
    Ok(Client::connect(
        &settings.url,
        settings.tenant_id,
        settings.timeout,
    ))
}

pub fn load_state(ctx: &Context) -> Result<KestraState> {
    KestraState::load_from(&ctx.state_file()?)
}

pub fn save_state(ctx: &Context, state: &mut KestraState) -> Result<()> {
    state.save_to(&ctx.state_file()?)
}

/// Run a plan against the server and save whatever finished
///
/// Prompts first when `confirm` is set.
pub fn execute(
    ctx: &Context,
    client: &Client,
    plan: Plan,
    opts: &ExecuteOptions,
    confirm: bool,
    state: &mut KestraState,
) -> Result<ExecuteSummary> {
    let batch = Batch::new(client, plan);
    log::debug!("Running {} task(s)", batch.len());
    let mut progress = BarProgress::new(ctx.quiet);

    let summary = if confirm {
        batch.run(opts, &mut progress, &mut PromptConfirm, state)?
    } else {
        batch.run(opts, &mut progress, &mut AutoConfirm, state)?
    };

    if summary.skipped < summary.total() {
        save_state(ctx, state)?;
    }
    Ok(summary)
}

/// Print the summary and fail if any record failed
pub fn finish(ctx: &Context, summary: &ExecuteSummary) -> Result<()> {
    if !ctx.quiet {
        ui::summary(summary);
    }
    if !summary.is_success() {
        bail!("{} record(s) failed", summary.failed);
    }
    Ok(())
}
