//! Harvest coordinator - main run orchestration logic
//!
//! This module ties one harvest run together:
//! - Opening the event store and recording the run
//! - Loading the extraction rules and building the fetcher
//! - Crawling every configured target in order
//! - Reconciling the collected records and closing the run

use crate::config::Config;
use crate::crawler::fetcher::Fetcher;
use crate::crawler::pagination::PaginationDriver;
use crate::crawler::site::SiteScanner;
use crate::crawler::sleep::{Sleeper, TokioSleeper};
use crate::extract::{load_rules, EventRecord};
use crate::storage::{open_storage, EventStore, RunTotals, SqliteStorage, UpsertSummary};
use crate::HarvestError;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Totals of one finished harvest run
#[derive(Debug, Clone)]
pub struct HarvestReport {
    pub run_id: i64,
    pub targets: usize,
    pub pages_visited: u32,
    pub records_scraped: usize,
    pub duplicates_skipped: usize,
    pub failed_details: usize,
    pub summary: UpsertSummary,
    pub elapsed: Duration,
}

/// Main harvest coordinator structure
pub struct Coordinator {
    config: Config,
    storage: SqliteStorage,
    scanner: SiteScanner,
    sleeper: Arc<dyn Sleeper>,
    run_id: i64,
}

impl Coordinator {
    /// Creates a coordinator that paces and backs off on the tokio timer
    ///
    /// # Arguments
    ///
    /// * `config` - The harvester configuration
    /// * `config_hash` - Hash recorded on the run row
    pub fn new(config: Config, config_hash: &str) -> Result<Self, HarvestError> {
        Self::with_sleeper(config, config_hash, Arc::new(TokioSleeper))
    }

    /// Creates a coordinator with an injected sleeper for pacing and backoff
    pub fn with_sleeper(
        config: Config,
        config_hash: &str,
        sleeper: Arc<dyn Sleeper>,
    ) -> Result<Self, HarvestError> {
        let mut storage = open_storage(
            Path::new(&config.output.database_path),
            config.output.batch_size,
        )?;

        // Rules are reread on every run
        let rules = load_rules(config.rules.path.as_deref().map(Path::new))?;
        let fetcher = Fetcher::with_sleeper(&config.http, Arc::clone(&sleeper))?;

        let run_id = storage.create_run(config_hash)?;
        tracing::info!("Starting harvest run {}", run_id);

        Ok(Self {
            config,
            storage,
            scanner: SiteScanner::new(fetcher, rules),
            sleeper,
            run_id,
        })
    }

    pub fn run_id(&self) -> i64 {
        self.run_id
    }

    /// Crawls every target, then reconciles what was collected
    ///
    /// A store-level failure marks the run failed before being returned.
    pub async fn run(&mut self) -> Result<HarvestReport, HarvestError> {
        let start_time = Instant::now();
        let delay = self.config.crawler.request_delay();

        let mut records: Vec<EventRecord> = Vec::new();
        let mut report = HarvestReport {
            run_id: self.run_id,
            targets: self.config.targets.len(),
            pages_visited: 0,
            records_scraped: 0,
            duplicates_skipped: 0,
            failed_details: 0,
            summary: UpsertSummary::default(),
            elapsed: Duration::ZERO,
        };

        let driver = PaginationDriver::new(
            &self.scanner,
            self.sleeper.as_ref(),
            self.config.crawler.max_empty_pages,
        );

        for (index, target) in self.config.targets.iter().enumerate() {
            let max_pages = target.max_pages.unwrap_or(self.config.crawler.max_pages);
            tracing::info!(
                "Target {}/{}: {} (up to {} pages)",
                index + 1,
                report.targets,
                target.url,
                max_pages
            );

            let outcome = driver.crawl(&target.url, max_pages, delay).await;
            report.pages_visited += outcome.pages_visited;
            report.duplicates_skipped += outcome.duplicates_skipped;
            report.failed_details += outcome.failed_details;
            records.extend(outcome.records);
        }

        report.records_scraped = records.len();

        if records.is_empty() {
            tracing::warn!("No events were scraped, nothing to store");
        } else {
            tracing::info!("Saving {} events to the database", records.len());
            report.summary = match self.storage.upsert_events(&records) {
                Ok(summary) => summary,
                Err(e) => {
                    tracing::error!("Storing events failed: {}", e);
                    if let Err(mark_err) = self.storage.fail_run(self.run_id, &e.to_string()) {
                        tracing::error!("Could not mark run {} failed: {}", self.run_id, mark_err);
                    }
                    return Err(e.into());
                }
            };
        }

        let totals = RunTotals {
            pages_visited: report.pages_visited,
            records_scraped: report.records_scraped,
            summary: report.summary,
        };
        self.storage.complete_run(self.run_id, &totals)?;

        report.elapsed = start_time.elapsed();
        tracing::info!(
            "Harvest completed: {} pages, {} events ({} inserted, {} updated, {} errored) in {:?}",
            report.pages_visited,
            report.records_scraped,
            report.summary.inserted,
            report.summary.updated,
            report.summary.errored,
            report.elapsed
        );

        Ok(report)
    }

    /// Read access to the store, for reporting after a run
    pub fn storage(&self) -> &SqliteStorage {
        &self.storage
    }
}

/// Runs one complete harvest
///
/// # Example
///
/// ```no_run
/// use event_harvester::config::load_config_with_hash;
/// use event_harvester::crawler::run_harvest;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (config, hash) = load_config_with_hash(Path::new("config.toml"))?;
/// let report = run_harvest(config, &hash).await?;
/// println!("{} events stored", report.summary.inserted);
/// # Ok(())
/// # }
/// ```
pub async fn run_harvest(config: Config, config_hash: &str) -> Result<HarvestReport, HarvestError> {
    let mut coordinator = Coordinator::new(config, config_hash)?;
    coordinator.run().await
}
