//! Canoe struct metadata tool
//!
//! Command-line companion for the struct meta pool:
//! - Replay a synthetic record stream and report pool statistics
//! - Validate a meta pool configuration file
//!
//! # Examples
//!
//! ```bash
//! # Simulate 100 batches of 256 records over 2000 record shapes
//! canoe-meta simulate --shapes 2000 --batches 100 --records 256 --capacity 512
//!
//! # Check a configuration file
//! canoe-meta check-config canoe.toml
//! ```

use canoe::meta::{MetaPool, MetaPoolConfig};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Canoe - struct metadata deduplication tool
#[derive(Parser, Debug)]
#[command(name = "canoe-meta")]
#[command(version = canoe::VERSION)]
#[command(about = "Canoe struct metadata pool tool", long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Drive a meta pool with a synthetic record stream
    Simulate(SimulateArgs),

    /// Load and validate a meta pool configuration file
    CheckConfig {
        /// TOML configuration path
        path: PathBuf,
    },

    /// Show version
    Version,
}

/// Simulation arguments
#[derive(Args, Debug)]
struct SimulateArgs {
    /// Number of distinct record shapes in the stream
    #[arg(long, default_value = "2000")]
    shapes: usize,

    /// Number of batches (one reset per batch)
    #[arg(long, default_value = "100")]
    batches: usize,

    /// Records per batch
    #[arg(long, default_value = "256")]
    records: usize,

    /// Context capacity (overrides the config file)
    #[arg(long)]
    capacity: Option<usize>,

    /// Also register every n-th record as a transient struct (0 disables)
    #[arg(long, default_value = "4")]
    transient_every: usize,

    /// TOML configuration path
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(&cli);

    match cli.command {
        Commands::Simulate(args) => simulate_command(args),
        Commands::CheckConfig { path } => check_config_command(path),
        Commands::Version => {
            println!("canoe-meta {}", canoe::VERSION);
            Ok(())
        }
    }
}

/// Setup console logging
fn setup_logging(cli: &Cli) {
    let log_level = cli
        .log_level
        .parse::<tracing::Level>()
        .unwrap_or(tracing::Level::INFO);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(!cli.no_color),
        )
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .init();
}

/// Simulate command - replay a deterministic record stream through a pool
fn simulate_command(args: SimulateArgs) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => MetaPoolConfig::load(path)?,
        None => MetaPoolConfig::default(),
    };
    if let Some(capacity) = args.capacity {
        config.context_capacity = capacity;
    }
    anyhow::ensure!(args.shapes > 0, "--shapes must be positive");

    let mut pool = MetaPool::from_config(&config)?;
    info!(
        shapes = args.shapes,
        batches = args.batches,
        records = args.records,
        capacity = config.context_capacity,
        "Starting simulation"
    );

    let mut first_occurrences = 0u64;
    let start = Instant::now();
    for batch in 0..args.batches {
        for record in 0..args.records {
            let shape = synthetic_shape(batch, record, args.shapes);
            let reg = pool.register_context_struct_outcome(Some(&shape[..]))?;
            if reg.is_new {
                first_occurrences += 1;
            }

            if args.transient_every > 0 && record % args.transient_every == 0 {
                pool.register_transient_struct(Some(&shape[1..]))?;
            }
        }
        pool.reset();
        debug!(batch, context = pool.context_len(), "Batch closed");
    }
    let elapsed = start.elapsed();

    let stats = pool.stats();
    info!(
        elapsed_ms = elapsed.as_millis() as u64,
        hit_rate = stats.hit_rate(),
        first_occurrences,
        "Simulation complete"
    );

    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

/// Shape used by `record` of `batch`: skewed so a few shapes dominate
fn synthetic_shape(batch: usize, record: usize, shapes: usize) -> Vec<String> {
    let hot = (record * record + batch) % shapes.min(16);
    let cold = (batch * 7919 + record * 104_729) % shapes;
    let shape = if record % 3 == 0 { cold } else { hot };
    vec![
        format!("type_{}", shape),
        "id".to_string(),
        format!("attr_{}", shape % 5),
    ]
}

/// Check-config command - load, validate and echo a configuration file
fn check_config_command(path: PathBuf) -> anyhow::Result<()> {
    let config = MetaPoolConfig::load(&path)?;
    info!(path = %path.display(), "Configuration is valid");
    print!("{}", config.to_toml_string()?);
    Ok(())
}
