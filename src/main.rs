use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "ferri")]
#[command(about = "Pipe recon tool output into a bug bounty SQLite database")]
#[command(version)]
struct Cli {
    /// Path to the database (defaults to ~/bugbounty/db/bounty.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Path to the config file (defaults to ~/.ferri/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Label of the tool that produced the input (e.g. subfinder, httpx)
    #[arg(short, long, global = true)]
    source: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Read targets from stdin, one per line (default command)
    Ingest {
        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create the database and default config
    Init,

    /// List programs with target counts
    Programs {
        #[arg(long)]
        json: bool,
    },

    /// List the targets of a program
    Targets {
        /// Program name or ID
        program: String,

        /// Only targets marked alive
        #[arg(long)]
        alive: bool,

        #[arg(long)]
        json: bool,
    },

    /// Show the observation trail of a target
    Recon {
        target_id: i64,

        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // stdout carries results, logs go to stderr
    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let ctx = cli::CliContext::resolve(
        cli.config.as_deref(),
        cli.db.as_deref(),
        cli.source.as_deref(),
    )?;

    match cli.command {
        Some(Commands::Ingest { json }) => cli::ingest::ingest_command(&ctx, json)?,
        Some(Commands::Init) => cli::init::init_command(&ctx)?,
        Some(Commands::Programs { json }) => cli::list::programs(&ctx, json)?,
        Some(Commands::Targets {
            program,
            alive,
            json,
        }) => cli::list::targets(&ctx, &program, alive, json)?,
        Some(Commands::Recon { target_id, json }) => cli::list::recon(&ctx, target_id, json)?,
        None => cli::ingest::ingest_command(&ctx, false)?,
    }

    Ok(())
}
