//! `txmgr` — a small operational tool for inspecting and exercising a
//! transaction manager's on-disk state directly, without a real storage
//! shard attached.
//!
//! This is deliberately thin: building actual `ObjectStore` shards is out of
//! scope for this crate, so the only things worth doing from a CLI are
//! initializing a fresh catalog directory, reporting its recovered status,
//! and running a no-op commit to prove the pipeline round-trips.

mod commands;

use std::process;

use clap::{Parser, Subcommand};

/// Inspect and exercise a transaction manager's durable state.
#[derive(Parser)]
#[command(name = "txmgr", version, about)]
struct Cli {
    /// Data directory (the transaction log lives under `<dir>/sys`).
    #[arg(long, default_value = "./data")]
    dir: std::path::PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a fresh catalog directory with an empty transaction log.
    Init,
    /// Open (recovering if necessary) and report the last committed id.
    Status,
    /// Open, run one no-op commit (no stores enlisted), then report status.
    Ping,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Init => commands::init(&cli.dir),
        Command::Status => commands::status(&cli.dir),
        Command::Ping => commands::ping(&cli.dir),
    };

    if let Err(e) = result {
        eprintln!("txmgr: {e}");
        process::exit(1);
    }
}
