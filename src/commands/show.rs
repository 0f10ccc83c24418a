use anyhow::Result;
use colored::Colorize;

use crate::Context;
use crate::ui;

/// List what the state currently tracks
pub fn run(ctx: &Context) -> Result<()> {
    let path = ctx.state_file()?;
    let state = super::load_state(ctx)?;

    if state.is_empty() {
        ui::info(&format!("No records in {}", path.display()));
        return Ok(());
    }

    if !state.flows.is_empty() {
        ui::header("Flows");
        for (address, flow) in &state.flows {
            println!(
                "  {} {}",
                address,
                format!(
                    "rev {} · {}",
                    flow.revision.unwrap_or_default(),
                    flow.mode.name()
                )
                .dimmed()
            );
        }
    }

    if !state.roles.is_empty() {
        ui::header("Roles");
        for (address, role) in &state.roles {
            println!(
                "  {} {}",
                address,
                format!(
                    "id {} · tenant {}",
                    role.id.as_deref().unwrap_or("-"),
                    role.tenant_id.as_deref().unwrap_or("none")
                )
                .dimmed()
            );
        }
    }

    println!();
    ui::kv("state", &path.display().to_string());
    ui::kv("updated", &state.last_updated.format("%Y-%m-%d %H:%M:%S UTC").to_string());
    Ok(())
}
