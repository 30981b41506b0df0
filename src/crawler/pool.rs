//! Fixed-size worker pool over the host queue
//!
//! The queue is split into contiguous partitions, one per worker. Each
//! worker opens its own database connection and crawls its partition
//! strictly in order, referrals included, before moving to the next host.
//! There is no work stealing and no shared state besides the database.

use crate::crawler::fetcher::HostFetcher;
use crate::crawler::orchestrator::Crawler;
use crate::storage::SqliteStorage;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// Aggregate result of a pool run
#[derive(Debug, Clone)]
pub struct CrawlSummary {
    /// Number of queued hosts (referrals not included)
    pub hosts: usize,
    /// Rows written across all hosts and their referrals
    pub rows_written: u64,
    /// Workers that stopped early on a fatal error
    pub failed_workers: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl CrawlSummary {
    pub fn duration_seconds(&self) -> i64 {
        (self.finished_at - self.started_at).num_seconds()
    }
}

/// Runs crawl workers against one database
#[derive(Debug, Clone)]
pub struct CrawlPool {
    database_path: PathBuf,
    fetcher: HostFetcher,
    workers: usize,
}

impl CrawlPool {
    /// Creates a pool; a worker count of 0 is treated as 1
    pub fn new(database_path: impl Into<PathBuf>, fetcher: HostFetcher, workers: usize) -> Self {
        Self {
            database_path: database_path.into(),
            fetcher,
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Crawls every host and waits for all workers to finish
    pub async fn run(&self, hosts: Vec<String>) -> CrawlSummary {
        let started_at = Utc::now();
        let host_count = hosts.len();

        let mut handles = Vec::new();
        for (worker_id, partition) in partition(hosts, self.workers).into_iter().enumerate() {
            tracing::debug!("Worker {} assigned {} hosts", worker_id, partition.len());
            let path = self.database_path.clone();
            let fetcher = self.fetcher.clone();
            handles.push(tokio::spawn(async move {
                run_worker(worker_id, &path, fetcher, partition).await
            }));
        }

        let mut rows_written = 0;
        let mut failed_workers = 0;
        for (worker_id, handle) in handles.into_iter().enumerate() {
            match handle.await {
                Ok(Ok(rows)) => rows_written += rows,
                Ok(Err(e)) => {
                    tracing::error!("Worker {} stopped: {}", worker_id, e);
                    failed_workers += 1;
                }
                Err(e) => {
                    tracing::error!("Worker {} panicked: {}", worker_id, e);
                    failed_workers += 1;
                }
            }
        }

        CrawlSummary {
            hosts: host_count,
            rows_written,
            failed_workers,
            started_at,
            finished_at: Utc::now(),
        }
    }
}

/// Crawls one partition with a worker-local connection
async fn run_worker(
    worker_id: usize,
    database_path: &Path,
    fetcher: HostFetcher,
    hosts: Vec<String>,
) -> crate::Result<u64> {
    let storage = SqliteStorage::new(database_path)?;
    let mut crawler = Crawler::new(fetcher, storage);

    let mut total = 0;
    for host in &hosts {
        total += crawler.crawl_host(host).await?;
    }

    tracing::info!(
        "Worker {} finished {} hosts, {} rows written",
        worker_id,
        hosts.len(),
        total
    );
    Ok(total)
}

/// Splits hosts into at most `workers` contiguous, order-preserving partitions
pub fn partition(hosts: Vec<String>, workers: usize) -> Vec<Vec<String>> {
    if hosts.is_empty() {
        return Vec::new();
    }

    let chunk_size = hosts.len().div_ceil(workers.max(1));
    hosts
        .chunks(chunk_size)
        .map(|chunk| chunk.to_vec())
        .collect()
}
