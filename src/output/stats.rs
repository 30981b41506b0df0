//! Statistics generation from the crawl database
//!
//! This module provides functionality for extracting and displaying
//! crawl statistics from the storage layer.

use crate::crawler::CrawlSummary;
use crate::manifest::Relationship;
use crate::storage::{Storage, StorageResult};

/// Database statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStatistics {
    /// Total number of stored ads.txt records
    pub ads_records: u64,

    /// Number of distinct sites with records
    pub sites: u64,

    /// Records whose exchange domain is not in the registry
    pub unresolved_records: u64,

    /// Stored contentproducerdomain relationships
    pub producer_directives: u64,

    /// Stored contentdistributordomain relationships
    pub distributor_directives: u64,

    /// Entries in the exchange registry
    pub exchanges: u64,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - Successfully loaded statistics
/// * `Err(StorageError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> StorageResult<CrawlStatistics> {
    Ok(CrawlStatistics {
        ads_records: storage.count_ads_records()?,
        sites: storage.count_sites()?,
        unresolved_records: storage.count_unresolved_records()?,
        producer_directives: storage.count_content_directives(Relationship::Producer)?,
        distributor_directives: storage.count_content_directives(Relationship::Distributor)?,
        exchanges: storage.count_exchanges()?,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== ads.txt Statistics ===\n");

    println!("Records:");
    println!("  ads.txt records: {}", stats.ads_records);
    println!("  Sites: {}", stats.sites);

    let unresolved_pct = if stats.ads_records > 0 {
        (stats.unresolved_records as f64 / stats.ads_records as f64) * 100.0
    } else {
        0.0
    };
    println!(
        "  Unknown exchange: {} ({:.1}%)",
        stats.unresolved_records, unresolved_pct
    );
    println!();

    println!("Content directives:");
    println!("  Producers: {}", stats.producer_directives);
    println!("  Distributors: {}", stats.distributor_directives);
    println!();

    println!("Exchange registry: {} entries", stats.exchanges);
}

/// Prints the result of a crawl run
pub fn print_summary(summary: &CrawlSummary, database_path: &str) {
    println!(
        "Wrote {} records from {} hosts to {} in {}s",
        summary.rows_written,
        summary.hosts,
        database_path,
        summary.duration_seconds()
    );

    if summary.failed_workers > 0 {
        println!(
            "{} worker(s) stopped early, see the log for details",
            summary.failed_workers
        );
    }
}
