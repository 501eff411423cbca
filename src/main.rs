//! Site-Harvester main entry point
//!
//! This is the command-line interface for the Site-Harvester text harvester.

use clap::Parser;
use site_harvester::config::{load_config_with_hash, Config};
use site_harvester::crawler::harvest;
use site_harvester::output::{load_statistics, open_log_file, print_statistics, print_summary};
use site_harvester::storage::{open_storage, ContentSink, Ledger, SqliteStorage};
use site_harvester::HarvestError;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Site-Harvester: an incremental site text harvester
///
/// Site-Harvester crawls a website breadth-first from one or more seed URLs,
/// extracts readable text from HTML pages and PDF documents, and remembers
/// what it has already harvested so that repeated runs only do new work.
#[derive(Parser, Debug)]
#[command(name = "site-harvester")]
#[command(version)]
#[command(about = "An incremental site text harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Seed URL to crawl instead of the configured seeds (repeatable)
    #[arg(long = "seed", value_name = "URL")]
    seeds: Vec<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Erase the ledger and all harvested text before crawling
    #[arg(long)]
    fresh: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with_all = ["stats", "export"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "export"])]
    stats: bool,

    /// Write the harvested text to PATH and exit
    #[arg(long, value_name = "PATH", conflicts_with_all = ["dry_run", "stats"])]
    export: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // The log file location comes from the config, so load it first
    let loaded = load_config_with_hash(&cli.config);
    let log_path = loaded
        .as_ref()
        .ok()
        .and_then(|(config, _)| config.output.log_path.as_deref())
        .map(PathBuf::from);
    setup_logging(cli.verbose, cli.quiet, log_path.as_deref())?;

    tracing::info!("Configuration file: {}", cli.config.display());
    let (config, config_hash) = match loaded {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    let seeds = if cli.seeds.is_empty() {
        config.seed_urls()
    } else {
        cli.seeds.clone()
    };

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config, &seeds);
    } else if cli.stats {
        handle_stats(&config)?;
    } else if let Some(path) = &cli.export {
        handle_export(&config, path)?;
    } else {
        handle_crawl(&config, &config_hash, &seeds, cli.fresh).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// Lines always go to stderr. With `log_path` they are also appended,
/// without colour codes, to that file.
fn setup_logging(
    verbose: u8,
    quiet: bool,
    log_path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("site_harvester=info,warn"),
            1 => EnvFilter::new("site_harvester=debug,info"),
            2 => EnvFilter::new("site_harvester=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    let file_layer = match log_path {
        Some(path) => Some(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(open_log_file(path)?))
                .with_ansi(false)
                .with_target(false),
        ),
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false),
        )
        .with(file_layer)
        .init();

    if let Some(path) = log_path {
        tracing::debug!("Also logging to {}", path.display());
    }
    Ok(())
}

/// Handles the --dry-run mode: shows the effective budget and seeds
fn handle_dry_run(config: &Config, seeds: &[String]) {
    let budget = config.budget();

    println!("=== Site-Harvester Dry Run ===\n");

    println!("Crawl Budget:");
    println!("  Max depth: {}", budget.max_depth);
    println!("  Max pages: {}", budget.max_pages);
    println!("  Delay between requests: {:?}", budget.delay);
    println!("  Request timeout: {:?}", budget.request_timeout);
    println!("  Max PDF size: {} MB", budget.max_pdf_size_mb);
    println!("  Refresh seed links: {}", budget.refresh_seed_links);
    println!("  Same domain: {}", budget.same_domain.as_str());
    println!("  Ignored extensions: {}", budget.ignored_extensions.join(" "));

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    match &config.output.export_path {
        Some(path) => println!("  Export: {}", path),
        None => println!("  Export: (none)"),
    }
    match &config.output.log_path {
        Some(path) => println!("  Log file: {}", path),
        None => println!("  Log file: (stderr only)"),
    }

    println!("\nSeeds ({}):", seeds.len());
    for seed in seeds {
        println!("  - {}", seed);
    }

    println!("\n✓ Configuration is valid");
    if seeds.is_empty() {
        println!("✗ No seeds configured; pass --seed or add [[seed]] entries");
    }
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("Database: {}\n", config.output.database_path);

    let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --export mode: writes the sink to a text file
fn handle_export(config: &Config, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
    let written = storage.export(path)?;

    println!("✓ {} documents exported to: {}", written, path.display());
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: &Config,
    config_hash: &str,
    seeds: &[String],
    fresh: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if seeds.is_empty() {
        return Err("no seed URLs: pass --seed or add [[seed]] entries to the config".into());
    }

    let mut storage = open_storage(Path::new(&config.output.database_path))?;
    if fresh {
        tracing::info!("Starting fresh harvest (erasing ledger and harvested text)");
        storage.reset()?;
        storage.clear()?;
    }
    let storage = Arc::new(Mutex::new(storage));

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current page");
            on_signal.cancel();
        }
    });

    tracing::info!("Total seed URLs: {}", seeds.len());

    let summaries = match harvest(config, config_hash, Arc::clone(&storage), seeds, &cancel).await
    {
        Ok(summaries) => summaries,
        Err(HarvestError::Aborted {
            seed,
            summary,
            source,
            ..
        }) => {
            tracing::error!("Harvest of {} aborted: {}", seed, source);
            print_summary(std::slice::from_ref(&*summary));
            return Err(source.into());
        }
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            return Err(e.into());
        }
    };

    if let Some(export_path) = &config.output.export_path {
        let guard = storage
            .lock()
            .map_err(|_| "storage lock poisoned after crawl")?;
        guard.export(Path::new(export_path))?;
    }

    print_summary(&summaries);
    Ok(())
}
