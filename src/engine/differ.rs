//! Plan display

use colored::Colorize;
use declarative::Record;
use kestra::{FlowRecord, RoleRecord, types::sorted_grants};

use super::planner::{Action, Plan, Step};
use crate::ui;

/// Print every step of a plan; unchanged records only when `verbose`
pub fn display_plan(plan: &Plan, verbose: bool) {
    if plan.change_count() == 0 {
        println!();
        println!("  {} No changes needed", "✓".green());
        if !verbose {
            return;
        }
    }

    println!();
    for step in &plan.flows {
        if step.action.is_change() || verbose {
            print_step(step);
            if let Some(diff) = flow_diff(step) {
                print!("{diff}");
            }
        }
    }
    for step in &plan.roles {
        if step.action.is_change() || verbose {
            print_step(step);
            for line in role_details(step) {
                ui::dim(&format!("    {line}"));
            }
        }
    }

    println!();
    println!(
        "  {} to create, {} to update, {} to delete",
        plan.count("+").to_string().green(),
        plan.count("~").to_string().yellow(),
        plan.count("-").to_string().red(),
    );
}

fn print_step<R: Record>(step: &Step<R>) {
    let symbol = match step.action {
        Action::Create => "+".green(),
        Action::Update(_) => "~".yellow(),
        Action::Delete => "-".red(),
        Action::Converge | Action::Read => "○".dimmed(),
    };
    let detail = match &step.action {
        Action::Update(changes) => format!(" ({changes})").dimmed().to_string(),
        _ => String::new(),
    };
    println!("  {symbol} {}{detail}", step.address());
}

/// Content diff for a flow step, if its content changes
fn flow_diff(step: &Step<FlowRecord>) -> Option<String> {
    match (&step.action, &step.previous) {
        (Action::Update(changes), Some(previous)) if changes.contains("content") => {
            Some(ui::content_diff(&previous.content, &step.record.content))
        }
        (Action::Create, _) => Some(ui::content_diff("", &step.record.content)),
        _ => None,
    }
}

/// One line per changed role attribute
fn role_details(step: &Step<RoleRecord>) -> Vec<String> {
    let (Action::Update(changes), Some(previous)) = (&step.action, &step.previous) else {
        return Vec::new();
    };
    let role = &step.record;
    let mut lines = Vec::new();

    if changes.contains("name") {
        lines.push(format!("name: {} → {}", previous.name, role.name));
    }
    if changes.contains("description") {
        lines.push(format!(
            "description: {:?} → {:?}",
            previous.description.as_deref().unwrap_or_default(),
            role.description.as_deref().unwrap_or_default()
        ));
    }
    if changes.contains("namespace") {
        lines.push(format!(
            "namespace: {} → {}",
            previous.namespace.as_deref().unwrap_or("-"),
            role.namespace.as_deref().unwrap_or("-")
        ));
    }
    if changes.contains("is_default") {
        lines.push(format!("default: {} → {}", previous.is_default, role.is_default));
    }
    if changes.contains("permissions") {
        let before = sorted_grants(&previous.permissions);
        for grant in sorted_grants(&role.permissions) {
            if !before.contains(&grant) {
                lines.push(format!("+ {}: {}", grant.category, grant.permissions.join(", ")));
            }
        }
        let after = sorted_grants(&role.permissions);
        for grant in before {
            if !after.contains(&grant) {
                lines.push(format!("- {}: {}", grant.category, grant.permissions.join(", ")));
            }
        }
    }

    lines
}
