//! Hubstats main entry point
//!
//! This is the command-line interface for the Hubstats popularity tracker.

use clap::Parser;
use hubstats::config::{load_config_with_hash, validate, Config};
use hubstats::crawler::seed_urls;
use hubstats::output::{history_json, print_statistics, stats_json};
use hubstats::Engine;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Hubstats: a popularity tracker for container-image registries
///
/// Hubstats discovers repositories from the registry search index and
/// periodically records their star and pull counts as snapshots.
#[derive(Parser, Debug)]
#[command(name = "hubstats")]
#[command(version)]
#[command(about = "A popularity tracker for container-image registries", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults apply when omitted)
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show the effective settings without crawling
    #[arg(long, conflicts_with_all = ["stats", "history", "list", "reset_errors"])]
    dry_run: bool,

    /// Print statistics as JSON and exit
    #[arg(long, conflicts_with_all = ["history", "list", "reset_errors"])]
    stats: bool,

    /// Print the snapshot history of a repository as JSON and exit
    #[arg(long, value_name = "SLUG", conflicts_with_all = ["list", "reset_errors"])]
    history: Option<String>,

    /// Print the slugs of all healthy repositories and exit
    #[arg(long, conflicts_with = "reset_errors")]
    list: bool,

    /// Clear the error state of a repository and exit
    #[arg(long, value_name = "SLUG")]
    reset_errors: Option<String>,

    /// Print statistics in a human readable layout (with --stats)
    #[arg(long, requires = "stats")]
    pretty: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = match load(&cli) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e);
        }
    };

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config)?;
        return Ok(());
    }

    // Failing to open the store is fatal
    let engine = match Engine::new(config) {
        Ok(engine) => engine,
        Err(e) => {
            tracing::error!("Failed to start engine: {}", e);
            return Err(e.into());
        }
    };

    if cli.stats {
        let stats = engine.stats();
        if cli.pretty {
            print_statistics(&stats);
        } else {
            println!("{}", stats_json(&stats)?);
        }
    } else if let Some(slug) = &cli.history {
        println!("{}", history_json(&engine.find_snapshots(slug)?)?);
    } else if cli.list {
        for slug in engine.list_repository_slugs()? {
            println!("{}", slug);
        }
    } else if let Some(slug) = &cli.reset_errors {
        if engine.reset_error(slug)? {
            println!("✓ Error state cleared for {}", slug);
        } else {
            println!("No repository found for {}", slug);
        }
    } else {
        handle_run(&engine).await?;
    }

    Ok(())
}

/// Loads the configuration file, or the defaults when none is given
fn load(cli: &Cli) -> Result<Config, Box<dyn std::error::Error>> {
    match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            Ok(config)
        }
        None => {
            tracing::info!("No configuration file given, using defaults");
            let config = Config::default();
            validate(&config)?;
            Ok(config)
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("hubstats=info,warn"),
            1 => EnvFilter::new("hubstats=debug,info"),
            2 => EnvFilter::new("hubstats=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows the effective settings
fn handle_dry_run(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Hubstats Dry Run ===\n");

    println!("Scraper:");
    println!("  Snapshot workers: {}", config.scraper.task_count);
    println!(
        "  Refresh interval: {}",
        config.scraper.refresh_interval_description()
    );
    println!("  Cycle delay: {}s", config.scraper.snapshot_delay_secs);
    println!("  Refresh page size: {}", config.scraper.refresh_page_size);

    println!("\nDiscovery:");
    println!("  Sweep interval: {}s", config.discovery.interval_secs);
    println!("  Page delay: {}s", config.discovery.delay_secs);
    println!("  Page size: {}", config.discovery.page_size);

    println!("\nRegistry:");
    println!("  Detail API: {}", config.registry.detail_base_url);
    println!("  Search-Version: {}", config.registry.search_version);
    println!("  User agent: {}", config.registry.user_agent);
    println!(
        "  Timeouts: {}s total, {}s connect",
        config.registry.timeout_secs, config.registry.connect_timeout_secs
    );

    println!("\nStorage:");
    println!("  Database: {}", config.storage.database_path);

    let seeds = seed_urls(&config.registry.search_url, config.discovery.page_size)?;
    println!("\nDiscovery Seeds ({}):", seeds.len());
    for seed in &seeds {
        println!("  - {}", seed);
    }

    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the main run: crawls until Ctrl-C
async fn handle_run(engine: &Engine) -> Result<(), Box<dyn std::error::Error>> {
    let cancel = CancellationToken::new();

    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Interrupt received, shutting down");
                signal_cancel.cancel();
            }
            Err(e) => tracing::error!("Unable to listen for interrupt: {}", e),
        }
    });

    match engine.run(cancel).await {
        Ok(()) => {
            tracing::info!("Engine shut down cleanly");
            Ok(())
        }
        Err(e) => {
            tracing::error!("Engine failed: {}", e);
            Err(e.into())
        }
    }
}
