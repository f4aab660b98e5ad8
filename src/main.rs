//! Event Harvester main entry point
//!
//! This is the command-line interface for the event directory harvester.

use anyhow::Context;
use clap::Parser;
use event_harvester::config::{load_config_with_hash, Config};
use event_harvester::crawler::{run_harvest, HarvestReport};
use event_harvester::extract::load_rules;
use event_harvester::output::{
    load_statistics, print_events, print_statistics, DEFAULT_RECENT_EVENTS,
};
use event_harvester::storage::{EventStore, SqliteStorage};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Event Harvester: a polite event-directory crawler
///
/// Walks the paginated listing pages of each configured target, scrapes
/// every event detail page, and reconciles the records into a SQLite store.
#[derive(Parser, Debug)]
#[command(name = "event-harvester")]
#[command(version)]
#[command(about = "A polite event-directory crawler", long_about = None)]
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

    /// Validate config and rules and show what would be crawled without crawling
    #[arg(long, conflicts_with_all = ["stats", "list"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "list")]
    stats: bool,

    /// Recently updated events shown with --stats
    #[arg(long, value_name = "N", default_value_t = DEFAULT_RECENT_EVENTS, requires = "stats")]
    recent: usize,

    /// List every stored event and exit
    #[arg(long)]
    list: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.stats {
        handle_stats(&config, cli.recent)
    } else if cli.list {
        handle_list(&config)
    } else {
        handle_harvest(config, &config_hash).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("event_harvester=info,warn"),
            1 => EnvFilter::new("event_harvester=debug,info"),
            2 => EnvFilter::new("event_harvester=trace,debug"),
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

/// Handles the --dry-run mode: validates config and rules, shows the targets
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    let rules = load_rules(config.rules.path.as_deref().map(Path::new))
        .context("Failed to load extraction rules")?;

    println!("=== Event Harvester Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Max pages: {}", config.crawler.max_pages);
    println!("  Request delay: {}ms", config.crawler.request_delay_ms);
    println!("  Max empty pages: {}", config.crawler.max_empty_pages);

    println!("\nHTTP:");
    println!("  User agent: {}", config.http.user_agent);
    println!("  Timeout: {}s", config.http.timeout_secs);
    println!(
        "  Retries: {} (backoff {}ms base + {}ms)",
        config.http.max_retries, config.http.backoff_base_ms, config.http.backoff_offset_ms
    );

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Batch size: {}", config.output.batch_size);

    println!("\nExtraction Rules:");
    match &config.rules.path {
        Some(path) => println!("  File: {}", path),
        None => println!("  Built-in defaults"),
    }
    println!("  Card selectors: {}", rules.listing.cards.len());
    println!("  Title selectors: {}", rules.detail.title.rules.len());

    println!("\nTargets ({}):", config.targets.len());
    for target in &config.targets {
        let max_pages = target.max_pages.unwrap_or(config.crawler.max_pages);
        println!("  - {} (up to {} pages)", target.url, max_pages);
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would crawl {} target(s)", config.targets.len());

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config, recent: usize) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = open_database(config)?;
    let stats = load_statistics(&storage, recent)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --list mode: prints every stored event
fn handle_list(config: &Config) -> anyhow::Result<()> {
    let storage = open_database(config)?;
    let events = storage.list_events()?;
    print_events(&events);

    Ok(())
}

fn open_database(config: &Config) -> anyhow::Result<SqliteStorage> {
    SqliteStorage::new(Path::new(&config.output.database_path))
        .context("Failed to open the event database")
}

/// Handles the main harvest operation
async fn handle_harvest(config: Config, config_hash: &str) -> anyhow::Result<()> {
    tracing::info!(
        "Targets: {}, max pages: {}, delay: {}ms",
        config.targets.len(),
        config.crawler.max_pages,
        config.crawler.request_delay_ms
    );

    match run_harvest(config, config_hash).await {
        Ok(report) => {
            print_report(&report);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            Err(e.into())
        }
    }
}

fn print_report(report: &HarvestReport) {
    println!("\n=== Harvest Summary (run #{}) ===", report.run_id);
    println!("  Targets crawled: {}", report.targets);
    println!("  Pages visited: {}", report.pages_visited);
    println!("  Events scraped: {}", report.records_scraped);
    println!("  Duplicates skipped: {}", report.duplicates_skipped);
    println!("  Failed detail pages: {}", report.failed_details);
    println!("  Inserted: {}", report.summary.inserted);
    println!("  Updated: {}", report.summary.updated);
    println!("  Errored: {}", report.summary.errored);
    println!("  Elapsed: {:.1}s", report.elapsed.as_secs_f64());
}
