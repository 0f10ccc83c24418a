use colored::Colorize;
use declarative::{ApplyResult, ExecuteSummary, Outcome};
use similar::{ChangeTag, TextDiff};

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

/// Symbol for a finished task
pub fn result_symbol(result: &ApplyResult) -> String {
    match result {
        ApplyResult::Done(Outcome::Created) => "+".green().to_string(),
        ApplyResult::Done(Outcome::Updated) => "~".yellow().to_string(),
        ApplyResult::Done(Outcome::Removed) => "-".red().to_string(),
        ApplyResult::Done(Outcome::Drifted) => "!".yellow().to_string(),
        ApplyResult::Done(Outcome::Unchanged | Outcome::Refreshed) => "○".dimmed().to_string(),
        ApplyResult::Failed { .. } => "✗".red().to_string(),
        ApplyResult::Skipped { .. } => "⊘".dimmed().to_string(),
    }
}

/// Print the totals of an execution
pub fn summary(summary: &ExecuteSummary) {
    println!();
    let line = format!(
        "{} created, {} updated, {} removed, {} unchanged",
        summary.created, summary.updated, summary.removed, summary.unchanged
    );
    if summary.is_success() {
        success(&line);
    } else {
        error(&format!("{line}, {} failed", summary.failed));
    }
    if summary.drifted > 0 {
        warn(&format!(
            "{} record(s) were deleted outside of kestractl",
            summary.drifted
        ));
    }
    if summary.skipped > 0 {
        dim(&format!("{} skipped", summary.skipped));
    }
}

/// Render a unified, colored diff between two documents
pub fn content_diff(old: &str, new: &str) -> String {
    let diff = TextDiff::from_lines(old, new);
    let mut out = String::new();

    for group in diff.grouped_ops(3) {
        for op in group {
            for change in diff.iter_changes(&op) {
                let line = change.to_string_lossy();
                let line = line.trim_end_matches('\n');
                let rendered = match change.tag() {
                    ChangeTag::Delete => format!("- {line}").red().to_string(),
                    ChangeTag::Insert => format!("+ {line}").green().to_string(),
                    ChangeTag::Equal => format!("  {line}").dimmed().to_string(),
                };
                out.push_str("      ");
                out.push_str(&rendered);
                out.push('\n');
            }
        }
    }

    out
}
