//! Crawler module for ads.txt fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching of `/ads.txt` with HTML sniffing
//! - The per-host crawl cycle with one-hop referral expansion
//! - The worker pool that fans the host queue out

mod fetcher;
mod orchestrator;
mod pool;

pub use fetcher::{
    build_http_client, looks_like_html, manifest_url, FetchRejection, HostFetcher, MANIFEST_PATH,
};
pub use orchestrator::{CrawlPhase, Crawler, HostPass};
pub use pool::{partition, CrawlPool, CrawlSummary};

use crate::config::{validate_crawler_config, Config};
use crate::storage::{SqliteStorage, Storage};
use crate::CrawlError;
use std::path::Path;

/// Runs a complete crawl operation
///
/// This is the main entry point for a crawl. It will:
/// 1. Check the crawler settings, then that the database is reachable and
///    its exchange registry seeded
/// 2. Build the HTTP client
/// 3. Crawl every host across the configured number of workers
/// 4. Back-fill exchange ids of stored records
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `hosts` - The host queue, in crawl order
///
/// # Returns
///
/// * `Ok(CrawlSummary)` - Crawl finished (individual hosts may have failed)
/// * `Err(CrawlError)` - The settings are invalid, or the database or HTTP
///   client could not be set up
pub async fn crawl(config: &Config, hosts: Vec<String>) -> crate::Result<CrawlSummary> {
    validate_crawler_config(&config.crawler)?;

    let database_path = Path::new(&config.output.database_path);

    let exchanges = SqliteStorage::new(database_path)?.count_exchanges()?;
    if exchanges == 0 {
        return Err(CrawlError::EmptyRegistry(
            config.output.database_path.clone(),
        ));
    }
    tracing::info!("Exchange registry has {} entries", exchanges);

    let client = build_http_client(&config.user_agent, &config.crawler)?;
    let pool = CrawlPool::new(database_path, HostFetcher::new(client), config.crawler.workers);

    if pool.workers() > 1 {
        tracing::info!("Crawling with {} workers", pool.workers());
    } else {
        tracing::info!("Crawling with a single worker");
    }

    let summary = pool.run(hosts).await;

    let reconciled = SqliteStorage::new(database_path)?.reconcile_exchange_ids()?;
    if reconciled > 0 {
        tracing::info!("Back-filled exchange ids on {} records", reconciled);
    }

    Ok(summary)
}
