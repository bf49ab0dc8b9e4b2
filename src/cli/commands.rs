//! CLI command definitions for profile_forge.
//!
//! This module provides the command-line interface for dispatching profile
//! records onto Redis queues and running the worker pool that consumes them.

use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};

use crate::dataset::read_profiles;
use crate::dispatch::Dispatcher;
use crate::queue::{queue_name, redis_url, QueueTransport, RedisTransport};
use crate::worker::{WorkerPool, WorkerPoolConfig};

/// Default Redis host.
const DEFAULT_REDIS_HOST: &str = "localhost";

/// Default Redis port.
const DEFAULT_REDIS_PORT: u16 = 6379;

/// Default Redis database index.
const DEFAULT_REDIS_DB: u32 = 0;

/// Default queue name prefix.
const DEFAULT_QUEUE_PREFIX: &str = "profiles";

/// Default number of queues to spread records across.
const DEFAULT_NUM_QUEUES: usize = 4;

const DEFAULT_QUEUE_OFFSET: usize = 0;

/// Default port of the first completion endpoint.
const DEFAULT_START_PORT: u16 = 8000;

/// Highest endpoint port a worker may be assigned.
const DEFAULT_MAX_PORT: u16 = 8007;

/// Default completion endpoint host.
const DEFAULT_ENDPOINT_HOST: &str = "localhost";

/// Default output directory for saved conversations.
const DEFAULT_OUTPUT_DIR: &str = "./output";

/// Profile analysis pipeline over Redis queues and completion endpoints.
#[derive(Parser)]
#[command(name = "profile_forge")]
#[command(about = "Dispatch profile records to Redis queues and consume them into conversations")]
#[command(version)]
#[command(
    long_about = "profile_forge spreads profile records across N Redis queues and runs one worker\nper queue. Each worker builds an analysis prompt, calls its own completion\nendpoint, and saves the prompt/response exchange as a JSON conversation file.\n\nExample usage:\n  profile_forge dispatch --input ./profiles.parquet --num-queues 4\n  profile_forge work --num-queues 4 --start-port 8000 --output-dir ./output"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Read a profile dataset and spread its records across the queues.
    #[command(alias = "send")]
    Dispatch(DispatchArgs),

    /// Run one worker per queue, consuming records into conversation files.
    ///
    /// Each worker owns exactly one queue and one completion endpoint; records
    /// popped from queue `i` are sent to port `start_port + i`. Workers run
    /// until interrupted with Ctrl+C.
    #[command(alias = "process")]
    Work(WorkArgs),

    /// Show the number of pending entries in each queue.
    Queues(QueuesArgs),
}

/// Arguments for `profile_forge dispatch`.
#[derive(Parser, Debug)]
pub struct DispatchArgs {
    /// Input dataset of profile records (.parquet, .jsonl or .json).
    #[arg(short, long)]
    pub input: String,

    /// Number of queues to spread records across.
    #[arg(short = 'n', long, default_value_t = DEFAULT_NUM_QUEUES)]
    pub num_queues: usize,

    /// Queue name prefix.
    #[arg(long, default_value = DEFAULT_QUEUE_PREFIX)]
    pub queue_prefix: String,

    /// Redis host.
    #[arg(long, default_value = DEFAULT_REDIS_HOST)]
    pub redis_host: String,

    /// Redis port.
    #[arg(long, default_value_t = DEFAULT_REDIS_PORT)]
    pub redis_port: u16,

    /// Redis database index.
    #[arg(long, default_value_t = DEFAULT_REDIS_DB)]
    pub redis_db: u32,
}

/// Arguments for `profile_forge work`.
#[derive(Parser, Debug)]
pub struct WorkArgs {
    /// Number of workers to run (one per queue).
    #[arg(short = 'n', long, default_value_t = DEFAULT_NUM_QUEUES)]
    pub num_queues: usize,

    /// Index of the first queue this pool consumes.
    #[arg(long, default_value_t = DEFAULT_QUEUE_OFFSET)]
    pub queue_offset: usize,

    /// Queue name prefix.
    #[arg(long, default_value = DEFAULT_QUEUE_PREFIX)]
    pub queue_prefix: String,

    /// Completion endpoint host.
    #[arg(long, default_value = DEFAULT_ENDPOINT_HOST)]
    pub endpoint_host: String,

    /// Port of the completion endpoint paired with the first queue.
    #[arg(long, default_value_t = DEFAULT_START_PORT)]
    pub start_port: u16,

    /// Highest endpoint port a worker may be assigned; workers mapped past
    /// it are skipped.
    #[arg(long, default_value_t = DEFAULT_MAX_PORT)]
    pub max_port: u16,

    /// Output directory for conversation files.
    #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: String,

    /// Redis host.
    #[arg(long, default_value = DEFAULT_REDIS_HOST)]
    pub redis_host: String,

    /// Redis port.
    #[arg(long, default_value_t = DEFAULT_REDIS_PORT)]
    pub redis_port: u16,

    /// Redis database index.
    #[arg(long, default_value_t = DEFAULT_REDIS_DB)]
    pub redis_db: u32,
}

/// Arguments for `profile_forge queues`.
#[derive(Parser, Debug)]
pub struct QueuesArgs {
    /// Number of queues to inspect.
    #[arg(short = 'n', long, default_value_t = DEFAULT_NUM_QUEUES)]
    pub num_queues: usize,

    /// Index of the first queue to inspect.
    #[arg(long, default_value_t = DEFAULT_QUEUE_OFFSET)]
    pub queue_offset: usize,

    /// Queue name prefix.
    #[arg(long, default_value = DEFAULT_QUEUE_PREFIX)]
    pub queue_prefix: String,

    /// Redis host.
    #[arg(long, default_value = DEFAULT_REDIS_HOST)]
    pub redis_host: String,

    /// Redis port.
    #[arg(long, default_value_t = DEFAULT_REDIS_PORT)]
    pub redis_port: u16,

    /// Redis database index.
    #[arg(long, default_value_t = DEFAULT_REDIS_DB)]
    pub redis_db: u32,
}

/// Parse CLI arguments and return the Cli struct.
///
/// This allows main.rs to access CLI arguments (like log_level) before running commands.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI by parsing arguments and executing the command.
///
/// This is a convenience function that parses CLI args and runs the command.
/// For more control over logging initialization, use `parse_cli()` and `run_with_cli()`.
pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

/// Run the CLI with the parsed arguments.
///
/// This is the main entry point for the profile_forge CLI.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Dispatch(args) => {
            run_dispatch_command(args).await?;
        }
        Commands::Work(args) => {
            run_work_command(args).await?;
        }
        Commands::Queues(args) => {
            run_queues_command(args).await?;
        }
    }
    Ok(())
}

// ============================================================================
// Dispatch Command Implementation
// ============================================================================

async fn run_dispatch_command(args: DispatchArgs) -> anyhow::Result<()> {
    let records = read_profiles(Path::new(&args.input))
        .map_err(|e| anyhow::anyhow!("Failed to read profile dataset {}: {}", args.input, e))?;

    if records.is_empty() {
        warn!(input = %args.input, "Dataset contains no records, nothing to dispatch");
    }

    let url = redis_url(&args.redis_host, args.redis_port, args.redis_db);
    let transport = RedisTransport::connect(&url)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to Redis at {}: {}", url, e))?;

    let dispatcher = Dispatcher::new(Arc::new(transport), args.queue_prefix);
    let report = dispatcher.dispatch(records, args.num_queues).await?;

    println!(
        "Dispatch complete. Total profiles sent: {}/{}.",
        report.dispatched, report.total
    );
    if !report.is_complete() {
        warn!(
            failed = report.failed_indices.len(),
            "Some records were not dispatched; re-run to queue them again"
        );
    }

    Ok(())
}

// ============================================================================
// Work Command Implementation
// ============================================================================

async fn run_work_command(args: WorkArgs) -> anyhow::Result<()> {
    let url = redis_url(&args.redis_host, args.redis_port, args.redis_db);
    let transport = RedisTransport::connect(&url)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to Redis at {}: {}", url, e))?;

    let config = WorkerPoolConfig::new(args.num_queues)
        .with_queue_prefix(args.queue_prefix)
        .with_queue_offset(args.queue_offset)
        .with_endpoint_host(args.endpoint_host)
        .with_start_port(args.start_port)
        .with_max_port(args.max_port)
        .with_output_dir(args.output_dir);

    let mut pool = WorkerPool::new(config, Arc::new(transport));
    let started = pool.start()?;

    println!("Started {} queue processors. Press Ctrl+C to stop.", started);

    tokio::signal::ctrl_c().await?;
    info!("Interrupt received, shutting down workers");

    pool.shutdown().await?;

    let stats = pool.stats();
    println!(
        "Processed {} jobs ({} completed, {} failed).",
        stats.total_processed(),
        stats.jobs_completed,
        stats.jobs_failed
    );

    Ok(())
}

// ============================================================================
// Queues Command Implementation
// ============================================================================

async fn run_queues_command(args: QueuesArgs) -> anyhow::Result<()> {
    let url = redis_url(&args.redis_host, args.redis_port, args.redis_db);
    let transport = RedisTransport::connect(&url)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to Redis at {}: {}", url, e))?;

    let mut total = 0;
    for i in 0..args.num_queues {
        let queue = queue_name(&args.queue_prefix, args.queue_offset + i);
        let len = transport.len(&queue).await?;
        println!("Queue {}: {} items", queue, len);
        total += len;
    }
    println!("Total pending: {}", total);

    Ok(())
}
