//! Crawler module for fetching and walking the event directory
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with bounded retry and backoff
//! - Paginated traversal of listing queries
//! - Per-crawl deduplication of event addresses
//! - Overall harvest coordination

mod coordinator;
mod dedup;
mod fetcher;
mod pagination;
mod site;
mod sleep;

pub use coordinator::{run_harvest, Coordinator, HarvestReport};
pub use dedup::Deduplicator;
pub use fetcher::{build_http_client, FetchCause, FetchFailure, Fetcher, RawDocument, RetryPolicy};
pub use pagination::{CrawlOutcome, EventSource, PaginationDriver, StopReason};
pub use site::SiteScanner;
pub use sleep::{RecordingSleeper, Sleeper, TokioSleeper};
