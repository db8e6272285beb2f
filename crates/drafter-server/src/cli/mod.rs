pub mod analyze;
pub mod audit;
pub mod brief;
pub mod config_cmd;
pub mod draft;
pub mod generate;
pub mod init;
pub mod shell;

use crate::session::Session;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "drafter")]
#[command(version, about = "Dependency-driven patent application drafting")]
pub struct Cli {
    /// Path to drafter.toml
    #[arg(
        long,
        global = true,
        env = "DRAFTER_CONFIG",
        default_value = "drafter.toml"
    )]
    pub config: PathBuf,

    /// Path to data directory (overrides config file)
    #[arg(long, global = true, env = "DRAFTER_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Session id (overrides config file)
    #[arg(long, global = true, env = "DRAFTER_SESSION")]
    pub session: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP API
    Serve,
    /// Interactive setup wizard
    Init,
    /// Interactive REPL over one session
    Shell,
    /// Analyze a disclosure into a structured brief
    Analyze(AnalyzeArgs),
    /// Structured brief operations
    #[command(subcommand)]
    Brief(BriefCommands),
    /// Generate one section, or every section
    Generate(GenerateArgs),
    /// Freshness and version counts of every section
    Status,
    /// List the versions of a key
    Versions(VersionsArgs),
    /// Make an earlier version active
    Select(SelectArgs),
    /// Commit a hand-edited version
    Edit(EditArgs),
    /// Run the whole-document refinement pass
    Refine,
    /// Render the draft as Markdown
    Export(ExportArgs),
    /// Drawing operations
    #[command(subcommand)]
    Drawing(DrawingCommands),
    /// Generate the figure reference-numeral table
    Labels,
    /// Check that the claims are supported by the specification
    CheckClaims(CheckClaimsArgs),
    /// Query the audit log
    Audit(AuditArgs),
    /// Configuration commands
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Disclosure text. Reads --file or stdin when omitted.
    pub text: Option<String>,
    /// Read the disclosure from a file
    #[arg(long, short)]
    pub file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum BriefCommands {
    /// Print the active brief
    Show {
        /// Print JSON instead of labelled text
        #[arg(long)]
        json: bool,
    },
    /// Replace one text field
    Set {
        /// Field name, e.g. problem_statement
        field: String,
        value: String,
    },
    /// Walk through every text field interactively
    Review,
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Section key (title, technical_field, ...) or "all"
    pub target: String,
    /// With "all": only sections that are stale or not generated yet
    #[arg(long)]
    pub outdated: bool,
}

#[derive(Args, Debug)]
pub struct VersionsArgs {
    /// Section, unit, or structured_brief
    pub key: String,
    /// Print full content instead of a one-line preview
    #[arg(long)]
    pub full: bool,
}

#[derive(Args, Debug)]
pub struct SelectArgs {
    pub key: String,
    /// Zero-based version index
    pub index: usize,
}

#[derive(Args, Debug)]
pub struct EditArgs {
    pub key: String,
    /// New content inline
    #[arg(long, conflicts_with = "file")]
    pub text: Option<String>,
    /// Read the new content from a file
    #[arg(long, short)]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Write to this file instead of stdout
    #[arg(long, short)]
    pub output: Option<PathBuf>,
    /// Use the refined draft where one exists
    #[arg(long)]
    pub refined: bool,
}

#[derive(Subcommand, Debug)]
pub enum DrawingCommands {
    /// Regenerate the diagram code of one drawing
    Regen {
        /// One-based drawing number
        number: usize,
    },
    /// List the active drawings
    List,
}

#[derive(Args, Debug)]
pub struct CheckClaimsArgs {
    /// Output format: table (default) | json
    #[arg(long, default_value = "table")]
    pub format: String,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    Validate,
    Show,
}

#[derive(Args, Debug)]
pub struct AuditArgs {
    /// Only show entries since this duration (e.g. "24h", "7d", "1h30m")
    #[arg(long)]
    pub since: Option<String>,
    /// Filter by action (e.g. "model.call", "section.committed")
    #[arg(long)]
    pub action: Option<String>,
    /// Minimum level: debug | info | warn | error
    #[arg(long)]
    pub level: Option<String>,
    /// Output format: table (default) | json
    #[arg(long, default_value = "table")]
    pub format: String,
    /// Maximum number of entries to return
    #[arg(long, default_value = "100")]
    pub limit: usize,
}

/// Run a command that operates on an open session. Commands that do not
/// need one are rejected.
pub async fn run_with_session(command: Commands, session: &Session) -> anyhow::Result<()> {
    match command {
        Commands::Analyze(a) => analyze::run(a, session).await?,
        Commands::Brief(cmd) => brief::run(cmd, session).await?,
        Commands::Generate(a) => generate::run(a, session).await?,
        Commands::Status => draft::status(session)?,
        Commands::Versions(a) => draft::versions(a, session)?,
        Commands::Select(a) => draft::select(a, session)?,
        Commands::Edit(a) => draft::edit(a, session)?,
        Commands::Refine => draft::refine(session).await?,
        Commands::Export(a) => draft::export(a, session)?,
        Commands::Drawing(cmd) => generate::drawing(cmd, session).await?,
        Commands::Labels => generate::labels(session).await?,
        Commands::CheckClaims(a) => generate::check_claims(a, session).await?,
        other => anyhow::bail!("{:?} does not run against a session", other),
    }
    Ok(())
}

/// Read text from an inline argument, a file, or stdin, in that order.
pub(crate) fn read_input(text: Option<String>, file: Option<&PathBuf>) -> anyhow::Result<String> {
    use anyhow::Context;
    use std::io::Read;

    if let Some(text) = text {
        return Ok(text);
    }
    if let Some(path) = file {
        return std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()));
    }
    let mut buf = String::new();
    std::io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_generate_all_outdated() {
        let cli = Cli::try_parse_from(["drafter", "generate", "all", "--outdated"]).unwrap();
        match cli.command {
            Commands::Generate(args) => {
                assert_eq!(args.target, "all");
                assert!(args.outdated);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "drafter", "select", "claims", "0", "--session", "case-7", "--data-dir", "/tmp/x",
        ])
        .unwrap();
        assert_eq!(cli.session.as_deref(), Some("case-7"));
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/x")));
        assert!(matches!(cli.command, Commands::Select(SelectArgs { index: 0, .. })));
    }

    #[test]
    fn test_edit_text_conflicts_with_file() {
        let parsed =
            Cli::try_parse_from(["drafter", "edit", "claims", "--text", "x", "--file", "y"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_read_input_prefers_inline_text() {
        let path = PathBuf::from("/definitely/missing");
        assert_eq!(read_input(Some("inline".into()), Some(&path)).unwrap(), "inline");
        assert!(read_input(None, Some(&path)).is_err());
    }
}
