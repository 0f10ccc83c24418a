use anyhow::{Result, bail};
use declarative::{Reconciler, Record};
use kestra::RepresentationMode;

use crate::Context;
use crate::cli::{ImportArgs, RecordKind};
use crate::ui;

/// Adopt an existing server-side record into the state
pub fn run(ctx: &Context, args: &ImportArgs) -> Result<()> {
    let manifest = super::load_manifest(ctx)?;
    let client = super::connect(&manifest)?;
    let mut state = super::load_state(ctx)?;

    let address = match args.kind {
        RecordKind::Flow => {
            let mode = if args.structured {
                RepresentationMode::Structured
            } else {
                RepresentationMode::Source
            };
            let Some(flow) = client.flows().import_as(&args.id, mode)? else {
                bail!("No flow {} exists on the server", args.id);
            };
            let address = flow.address();
            if state.flows.contains_key(&address) {
                ui::warn(&format!("Replacing {address} in the state"));
            }
            if !ctx.quiet {
                ui::kv("revision", &flow.revision.unwrap_or_default().to_string());
                ui::kv("mode", flow.mode.name());
            }
            state.put_flow(flow);
            address
        }
        RecordKind::Role => {
            let Some(mut role) = client.roles().import(&args.id)? else {
                bail!("No role {} exists on the server", args.id);
            };
            role.key.clone_from(&args.key);
            let address = role.address();
            if state.roles.contains_key(&address) {
                ui::warn(&format!("Replacing {address} in the state"));
            }
            if !ctx.quiet {
                ui::kv("id", role.id.as_deref().unwrap_or_default());
                ui::kv("tenant", role.tenant_id.as_deref().unwrap_or("none"));
            }
            state.put_role(role);
            address
        }
    };

    super::save_state(ctx, &mut state)?;
    ui::success(&format!("Imported {address}"));
    Ok(())
}
