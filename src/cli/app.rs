//! Main CLI application structure

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use super::output::{Output, OutputFormat};
use super::task::{self, AddArgs, ListArgs};
use super::watch;
use crate::domain::Status;
use crate::storage::Config;

#[derive(Parser)]
#[command(name = "marktask")]
#[command(author, version, about = "Index, query and edit tasks in markdown notes")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Notes root (defaults to the nearest directory with .marktask.toml, else the current one)
    #[arg(long, short = 'r', global = true, env = "MARKTASK_ROOT")]
    pub root: Option<PathBuf>,

    /// Output format (defaults to the global config)
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Enable debug logging on stderr
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List tasks
    List(ListArgs),

    /// Show the number of indexed tasks
    Summary,

    /// Add a task line to a document
    Add(AddArgs),

    /// Change the status of the task on a line
    Set {
        /// Document path, relative to the root
        document: String,

        /// Line number, counted from the top of the file
        line: usize,

        /// New status (todo, doing, blocked, done, abandoned)
        status: Status,
    },

    /// Remove the task on a line
    Remove {
        /// Document path, relative to the root
        document: String,

        /// Line number, counted from the top of the file
        line: usize,
    },

    /// Print index events as documents change
    Watch,
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    install_tracing(cli.verbose);

    let config = Config::load(cli.root.as_deref())?;
    let format = cli
        .format
        .unwrap_or_else(|| config.global.default_format.into());
    let output = Output::new(format);

    tracing::debug!(root = %config.root.display(), "loaded configuration");

    match cli.command {
        Commands::List(args) => task::list(&config, &args, &output),
        Commands::Summary => task::summary(&config, &output),
        Commands::Add(args) => task::add(&config, &args, &output),
        Commands::Set {
            document,
            line,
            status,
        } => task::set_status(&config, &document, line, status, &output),
        Commands::Remove { document, line } => task::remove(&config, &document, line, &output),
        Commands::Watch => watch::run(&config, &output),
    }
}

/// Logs go to stderr; `RUST_LOG` overrides the default level
fn install_tracing(verbose: bool) {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}
