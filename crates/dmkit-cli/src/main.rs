//! dmkit CLI - Bayesian structure learning and MDP policy solvers
//!
//! `dmkit structure` learns a network from a CSV table; `dmkit policy`
//! solves one of the bundled decision problems and writes its policy.

// Clippy pedantic allows - these are intentional design choices
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::unused_async)]
#![allow(clippy::too_many_lines)]

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;

use commands::{policy, structure};

#[derive(Parser)]
#[command(name = "dmkit")]
#[command(author, version, about = "dmkit - Bayesian structure learning and MDP policy solvers", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print a JSON run summary instead of text
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Learn a Bayesian network structure from a CSV table
    Structure(structure::StructureArgs),

    /// Compute a policy for one of the bundled MDP problems
    Policy(policy::PolicyArgs),

    /// Configuration management
    #[command(subcommand)]
    Config(commands::config::ConfigCommands),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = if cli.verbose { "debug" } else { "info" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("dmkit={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let settings = config::Config::load()?;

    match cli.command {
        Commands::Structure(args) => structure::run(args, &settings, cli.json).await,
        Commands::Policy(args) => policy::run(args, &settings, cli.json).await,
        Commands::Config(cmd) => commands::config::run(cmd, &settings).await,
    }
}
