//! ASIN-Ripple main entry point
//!
//! This is the command-line interface for the ASIN-Ripple catalog crawler.

use asin_ripple::config::{load_config_with_hash, mask_secret, Config, DrainMode};
use asin_ripple::crawler::Coordinator;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// ASIN-Ripple: a queue-driven catalog crawler
///
/// ASIN-Ripple drains a queue of catalog identifiers, resolves each one
/// against the signed lookup API, stores the result and enqueues related
/// identifiers that are not yet in the catalog.
#[derive(Parser, Debug)]
#[command(name = "asin-ripple")]
#[command(version = "1.0.0")]
#[command(about = "A queue-driven catalog crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show the resolved settings without running
    #[arg(long)]
    dry_run: bool,

    /// Process a single batch and stop, whatever the configured drain mode
    #[arg(long)]
    single_batch: bool,

    /// Enqueue these identifiers (if not already known) before running
    #[arg(long, value_name = "ASIN")]
    seed: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let mut config = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.single_batch {
        config.run.drain_mode = DrainMode::SingleBatch;
    }

    if cli.dry_run {
        handle_dry_run(&config, &cli.seed);
        return Ok(());
    }

    handle_run(&config, &cli.seed).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("asin_ripple=info,warn"),
            1 => EnvFilter::new("asin_ripple=debug,info"),
            2 => EnvFilter::new("asin_ripple=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the resolved configuration
fn handle_dry_run(config: &Config, seeds: &[String]) {
    println!("=== ASIN-Ripple Dry Run ===\n");

    println!("Queue:");
    println!("  URL: {}", config.queue.url);
    println!("  Max messages per poll: {}", config.queue.max_messages);
    println!("  Wait time: {}s", config.queue.wait_seconds);
    if let Some(region) = &config.queue.region {
        println!("  Region: {}", region);
    }

    println!("\nLookup:");
    println!("  Endpoint: {}", config.lookup.endpoint);
    println!("  Access key: {}", mask_secret(&config.lookup.access_key));
    println!("  Secret key: ********");
    println!("  Associate tag: {}", config.lookup.associate_tag);
    println!(
        "  Operation: {} ({} by {}, condition {})",
        config.lookup.operation,
        config.lookup.response_group,
        config.lookup.id_type,
        config.lookup.condition
    );

    println!("\nRun:");
    println!("  Time budget: {}s", config.run.time_budget_secs);
    println!("  Host limit: {}s", config.run.host_max_secs);
    println!("  Drain mode: {}", config.run.drain_mode);

    println!("\nCatalog:");
    println!("  Database: {}", config.catalog.database_path);

    if !seeds.is_empty() {
        println!("\nSeeds ({}):", seeds.len());
        for seed in seeds {
            println!("  - {}", seed);
        }
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the main run: seeds, then drains the queue
async fn handle_run(config: &Config, seeds: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let coordinator = Coordinator::from_config(config).await?;
    let ctx = coordinator.start_invocation();

    if !seeds.is_empty() {
        let sent = coordinator.seed(seeds, &ctx).await?;
        tracing::info!("Seeded {} of {} identifiers", sent, seeds.len());
    }

    match coordinator.run_invocation(ctx).await {
        Ok(report) => {
            println!("{}", report.status.terminal_status());
            Ok(())
        }
        Err(e) => {
            tracing::error!("Run failed: {}", e);
            Err(e.into())
        }
    }
}
