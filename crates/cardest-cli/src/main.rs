//! cardest - cardinality-estimation workbench CLI.
//!
//! Two operator-facing modes: `build` compacts a text data graph and
//! builds one estimator's summary; `query` benchmarks that estimator
//! on a pattern query under the isolated trial harness. The hidden
//! `trial` subcommand is the per-trial execution context that `query`
//! re-execs, never invoked by hand.
//!
//! stdout is a machine contract (one CSV line per query, one
//! build-time line per build); all diagnostics go to stderr.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

/// Cardinality-estimation workbench.
#[derive(Parser)]
#[command(name = "cardest")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose debug logging (stderr)
    #[arg(long, short, global = true)]
    verbose: bool,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Compact the data graph (if needed) and build a summary
    Build(BuildArgs),

    /// Benchmark one query under the isolated trial harness
    Query(QueryArgs),

    /// Run a single isolated trial (spawned by `query`)
    #[command(hide = true)]
    Trial(TrialArgs),
}

/// Arguments for build mode.
#[derive(clap::Args)]
struct BuildArgs {
    /// Estimator method name
    #[arg(long, short)]
    method: String,

    /// Text data graph to compact
    #[arg(long, short)]
    input: PathBuf,

    /// Binary graph path (built here if absent, reused otherwise)
    #[arg(long, short)]
    data: PathBuf,

    /// Sampling ratio (kept verbatim in the summary name)
    #[arg(long, short = 'p', default_value = "0.03")]
    ratio: String,

    /// Memory budget for sketch methods, instead of a ratio
    #[arg(long, short, conflicts_with = "ratio")]
    budget: Option<u64>,

    /// Random seed
    #[arg(long, short, default_value_t = 0)]
    seed: u64,
}

/// Arguments for query mode.
#[derive(clap::Args)]
struct QueryArgs {
    /// Estimator method name
    #[arg(long, short)]
    method: String,

    /// Text query graph to estimate
    #[arg(long, short)]
    input: PathBuf,

    /// Binary graph path (also keys the summary name)
    #[arg(long, short)]
    data: PathBuf,

    /// Sampling ratio (kept verbatim in the summary name)
    #[arg(long, short = 'p', default_value = "0.03")]
    ratio: String,

    /// Memory budget for sketch methods, instead of a ratio
    #[arg(long, short, conflicts_with = "ratio")]
    budget: Option<u64>,

    /// Trials per query
    #[arg(long, short = 'n', default_value_t = 30)]
    iterations: u32,

    /// Base random seed; trial i runs with seed + i
    #[arg(long, short, default_value_t = 0)]
    seed: u64,

    /// Per-trial wall-clock ceiling in seconds
    #[arg(long, default_value_t = 300)]
    timeout_secs: u64,

    /// Completion-poll interval in milliseconds
    #[arg(long, default_value_t = 100)]
    poll_interval_ms: u64,
}

/// Arguments for the hidden per-trial child mode.
#[derive(clap::Args)]
struct TrialArgs {
    /// Estimator method name
    #[arg(long)]
    method: String,

    /// Binary graph path
    #[arg(long)]
    data: PathBuf,

    /// Summary artifact path
    #[arg(long)]
    summary: PathBuf,

    /// Text query graph
    #[arg(long)]
    query: PathBuf,

    /// Numeric estimation parameter (resolved ratio or budget)
    #[arg(long)]
    param: f64,

    /// This trial's derived RNG seed
    #[arg(long)]
    seed: u64,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::WARN
        })
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Build(args) => commands::build::run(&args),
        Commands::Query(args) => commands::query::run(&args),
        Commands::Trial(args) => commands::trial::run(&args),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
