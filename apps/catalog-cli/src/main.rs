//! # catalog-cli
//!
//! Command-line interface for the catalog engine.
//!
//! - `catalog eval --tree <file>` — aggregate and resolve a pre-built decision tree
//! - `catalog check` — run the built-in rulebooks against a hook event
//! - `catalog lint tree/namespace` — authoring-time checks
//!
//! Results go to stdout as JSON; logs go to stderr.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use catalog_engine::CatalogConfig;

/// Catalog CLI — evaluate and lint policy rulebooks.
#[derive(Parser)]
#[command(name = "catalog", version, about)]
struct Cli {
    /// Engine config file. Defaults apply when it does not exist.
    #[arg(long, default_value = "catalog.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate and resolve a decision tree produced elsewhere.
    Eval {
        /// JSON file holding the tree.
        #[arg(long)]
        tree: PathBuf,
        /// Only aggregate this rulebook's subtree.
        #[arg(long)]
        scope: Option<String>,
    },
    /// Evaluate a hook event with the built-in rulebooks.
    Check {
        /// JSON file holding the hook event (stdin if neither flag is given).
        #[arg(long, conflicts_with = "command")]
        event: Option<PathBuf>,
        /// Shorthand for a Bash PreToolUse event running this command.
        #[arg(long)]
        command: Option<String>,
    },
    /// Authoring-time checks.
    Lint {
        #[command(subcommand)]
        command: commands::lint::LintCommands,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("catalog_engine=info".parse()?)
                .add_directive("catalog=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = CatalogConfig::load_or_default(&cli.config)?;

    match &cli.command {
        Commands::Eval { tree, scope } => commands::eval::execute(&config, tree, scope.as_deref()),
        Commands::Check { event, command } => {
            commands::check::execute(&config, event.as_deref(), command.as_deref())
        }
        Commands::Lint { command } => commands::lint::execute(command, &config),
    }
}
