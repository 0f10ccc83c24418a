use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "kestractl")]
#[command(version)]
#[command(about = "Declaratively manage Kestra flows and roles", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Manifest declaring the desired flows and roles
    #[arg(
        short,
        long,
        global = true,
        env = "KESTRACTL_MANIFEST",
        default_value = crate::config::DEFAULT_MANIFEST
    )]
    pub manifest: PathBuf,

    /// State file (defaults to the kestractl state directory)
    #[arg(long, global = true, env = "KESTRACTL_STATE")]
    pub state: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show what apply would change
    Plan(PlanArgs),

    /// Create, update and delete records until the server matches the manifest
    Apply(ApplyArgs),

    /// Re-read every stored record and forget the ones deleted out of band
    Refresh(TargetArgs),

    /// Adopt an existing flow or role into the state
    Import(ImportArgs),

    /// Delete every record in the state
    Destroy(DestroyArgs),

    /// List the records in the state
    Show,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct TargetArgs {
    /// Only act on records matching this target (e.g. "flow", "role.operators")
    #[arg(short, long)]
    pub target: Option<String>,
}

#[derive(Args)]
pub struct PlanArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Also list records that would not change
    #[arg(long)]
    pub all: bool,
}

#[derive(Args)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Show the plan without touching the server
    #[arg(long)]
    pub dry_run: bool,

    /// Number of records reconciled in parallel
    #[arg(short, long, default_value = "4")]
    pub jobs: u32,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Args)]
pub struct DestroyArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Args)]
pub struct ImportArgs {
    /// Kind of record to import
    #[arg(value_enum)]
    pub kind: RecordKind,

    /// Identifier: `<namespace>/<flow_id>` for flows, the role id for roles
    pub id: String,

    /// Store the flow as the server's canonical document instead of its source
    #[arg(long)]
    pub structured: bool,

    /// Track an imported role under this key instead of its name
    #[arg(long)]
    pub key: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum RecordKind {
    Flow,
    Role,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_apply() {
        let cli = Cli::parse_from(["kestractl", "apply", "--yes", "-j", "2", "-t", "role"]);
        assert_eq!(cli.manifest, PathBuf::from("kestra.toml"));
        let Command::Apply(args) = cli.command else {
            panic!("expected apply");
        };
        assert!(args.yes);
        assert_eq!(args.jobs, 2);
        assert_eq!(args.target.target.as_deref(), Some("role"));
    }

    #[test]
    fn test_parse_import() {
        let cli = Cli::parse_from([
            "kestractl",
            "--manifest",
            "ops/kestra.toml",
            "import",
            "flow",
            "company.team/hello",
            "--structured",
        ]);
        assert_eq!(cli.manifest, PathBuf::from("ops/kestra.toml"));
        let Command::Import(args) = cli.command else {
            panic!("expected import");
        };
        assert_eq!(args.kind, RecordKind::Flow);
        assert_eq!(args.id, "company.team/hello");
        assert!(args.structured);
        assert!(args.key.is_none());
    }

    #[test]
    fn test_parse_import_role_key() {
        let cli = Cli::parse_from(["kestractl", "import", "role", "role-1", "--key", "ops"]);
        let Command::Import(args) = cli.command else {
            panic!("expected import");
        };
        assert_eq!(args.kind, RecordKind::Role);
        assert_eq!(args.key.as_deref(), Some("ops"));
    }
}
