use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "actas",
    about = "Tally-sheet ledger: record, trace and total election actas",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Configuration file (default: ./actas.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Ledger log file, overriding the configured one
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Seed the ledger from a JSON array of acta templates
    Create(CreateArgs),
    /// Attach the scanned image reference to a created acta
    RegisterImage(RegisterImageArgs),
    /// Void a registered acta
    Void(IdArgs),
    /// Record the vote counts of a registered acta
    RegisterResults(RegisterResultsArgs),
    /// Show one acta
    Show(IdArgs),
    /// List every acta
    List(ListArgs),
    /// Total the results across every acta
    Results(ResultsArgs),
    /// Show every version of an acta
    History(IdArgs),
    /// Check whether an acta exists
    Exists(IdArgs),
    /// Check version histories against the lifecycle
    Audit(AuditArgs),
}

#[derive(Args)]
pub struct CreateArgs {
    pub templates: PathBuf,
}

#[derive(Args)]
pub struct RegisterImageArgs {
    pub id: String,
    pub image_ref: String,
}

#[derive(Args)]
pub struct IdArgs {
    pub id: String,
}

#[derive(Args)]
pub struct RegisterResultsArgs {
    pub id: String,
    #[arg(long)]
    pub blank: u32,
    #[arg(long)]
    pub spoiled: u32,
    #[arg(long)]
    pub candidate1: u32,
    #[arg(long)]
    pub candidate2: u32,
    #[arg(long)]
    pub total: u32,
}

#[derive(Args)]
pub struct ListArgs {}

#[derive(Args)]
pub struct ResultsArgs {}

#[derive(Args)]
pub struct AuditArgs {
    pub id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_create() {
        let cli = Cli::try_parse_from(["actas", "create", "seed.json"]).unwrap();
        if let Command::Create(args) = cli.command {
            assert_eq!(args.templates, PathBuf::from("seed.json"));
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_register_image() {
        let cli = Cli::try_parse_from(["actas", "register-image", "E1", "cidABC"]).unwrap();
        if let Command::RegisterImage(args) = cli.command {
            assert_eq!(args.id, "E1");
            assert_eq!(args.image_ref, "cidABC");
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_register_results() {
        let cli = Cli::try_parse_from([
            "actas",
            "register-results",
            "E1",
            "--blank",
            "5",
            "--spoiled",
            "2",
            "--candidate1",
            "10",
            "--candidate2",
            "12",
            "--total",
            "29",
        ])
        .unwrap();
        if let Command::RegisterResults(args) = cli.command {
            assert_eq!(
                (args.blank, args.spoiled, args.candidate1, args.candidate2, args.total),
                (5, 2, 10, 12, 29)
            );
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn register_results_requires_every_count() {
        let parsed = Cli::try_parse_from(["actas", "register-results", "E1", "--blank", "5"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn negative_counts_are_rejected() {
        let parsed = Cli::try_parse_from([
            "actas",
            "register-results",
            "E1",
            "--blank=-1",
            "--spoiled=0",
            "--candidate1=0",
            "--candidate2=0",
            "--total=0",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn parse_void() {
        let cli = Cli::try_parse_from(["actas", "void", "E1"]).unwrap();
        assert!(matches!(cli.command, Command::Void(IdArgs { ref id }) if id == "E1"));
    }

    #[test]
    fn parse_audit_all() {
        let cli = Cli::try_parse_from(["actas", "audit"]).unwrap();
        assert!(matches!(cli.command, Command::Audit(AuditArgs { id: None })));
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::try_parse_from([
            "actas",
            "list",
            "--store",
            "/tmp/actas.log",
            "--config",
            "other.toml",
            "--format",
            "json",
            "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.store, Some(PathBuf::from("/tmp/actas.log")));
        assert_eq!(cli.config, Some(PathBuf::from("other.toml")));
    }

    #[test]
    fn default_format_is_text() {
        let cli = Cli::try_parse_from(["actas", "results"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Text);
        assert!(!cli.verbose);
    }
}
