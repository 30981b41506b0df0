//! Per-host crawl cycle
//!
//! A host is crawled in one of two phases:
//!
//! | Phase      | Fetch, parse, store | Follow referrals          |
//! |------------|---------------------|---------------------------|
//! | `Initial`  | yes                 | yes, each one in `Referral` |
//! | `Referral` | yes                 | no, they are discarded    |
//!
//! so referral expansion never goes deeper than one hop. Every cycle returns
//! the number of rows it wrote; callers sum the returned totals.

use crate::crawler::fetcher::HostFetcher;
use crate::manifest::{
    normalize_key, validate_directive, validate_record, Directive, LineEvent, Manifest,
    RecordCandidate,
};
use crate::storage::{Storage, StorageResult};
use std::collections::VecDeque;

/// Where a host sits in the referral expansion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlPhase {
    /// A host from the crawl queue; its referrals are crawled
    Initial,
    /// A host discovered through a directive; its referrals are dropped
    Referral,
}

/// Outcome of processing one host's manifest
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostPass {
    /// Rows written for this host alone
    pub rows_written: u64,
    /// Referral hostnames, de-duplicated, in manifest order
    pub referrals: Vec<String>,
}

/// Runs crawl cycles for one worker
///
/// Owns the worker's storage connection; nothing in here is shared with
/// other workers.
pub struct Crawler<S> {
    fetcher: HostFetcher,
    storage: S,
}

impl<S: Storage> Crawler<S> {
    pub fn new(fetcher: HostFetcher, storage: S) -> Self {
        Self { fetcher, storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    /// Crawls a queued host and its first-hop referrals
    ///
    /// # Returns
    ///
    /// * `Ok(u64)` - Rows written for the host plus all its referrals
    /// * `Err(StorageError)` - The exchange registry could not be read; the
    ///   worker cannot continue
    pub async fn crawl_host(&mut self, host: &str) -> StorageResult<u64> {
        self.crawl(host, CrawlPhase::Initial).await
    }

    /// Runs the crawl cycle for `host` in the given phase
    ///
    /// Hosts are worked off a FIFO queue: an `Initial` host enqueues its
    /// referrals in the `Referral` phase, a `Referral` host enqueues nothing.
    pub async fn crawl(&mut self, host: &str, phase: CrawlPhase) -> StorageResult<u64> {
        let root = normalize_key(host);
        let mut pending = VecDeque::from([(root.clone(), phase)]);
        let mut total = 0;

        while let Some((host, phase)) = pending.pop_front() {
            let pass = self.crawl_pass(&host).await?;
            total += pass.rows_written;

            match phase {
                CrawlPhase::Initial => {
                    for referral in pass.referrals {
                        tracing::debug!("Following referral {} -> {}", host, referral);
                        pending.push_back((referral, CrawlPhase::Referral));
                    }
                }
                CrawlPhase::Referral => discard_referrals(&host, &pass.referrals),
            }
        }

        tracing::info!("{}: {} rows written", root, total);
        Ok(total)
    }

    /// Fetches and processes one host, without following referrals
    async fn crawl_pass(&mut self, host: &str) -> StorageResult<HostPass> {
        tracing::info!("Crawling {}", host);

        match self.fetcher.fetch(host).await {
            Ok(body) => self.process_manifest(host, &Manifest::new(&body)),
            Err(rejection) => {
                tracing::info!("{} unavailable: {}", host, rejection);
                Ok(HostPass::default())
            }
        }
    }

    /// Parses, validates and stores a fetched manifest for `host`
    ///
    /// Referral directives are collected but not followed.
    pub fn process_manifest(&mut self, host: &str, manifest: &Manifest) -> StorageResult<HostPass> {
        let host = normalize_key(host);
        let mut pass = HostPass::default();

        for event in manifest.events() {
            match event {
                LineEvent::CommentOnly(_) => {}
                LineEvent::Directive(directive) => {
                    if !pass.referrals.contains(&directive.target) {
                        pass.referrals.push(directive.target.clone());
                    }

                    if directive.kind.relationship().is_some() {
                        pass.rows_written += self.store_directive(&host, &directive);
                    }
                }
                LineEvent::DataCandidate(candidate) => {
                    pass.rows_written += self.store_record(&host, &candidate)?;
                }
            }
        }

        Ok(pass)
    }

    fn store_directive(&mut self, host: &str, directive: &Directive) -> u64 {
        match validate_directive(
            host,
            directive.kind,
            &directive.target,
            directive.comment.as_deref(),
        ) {
            Ok(content) => {
                tracing::debug!(
                    "{} | {} | {} | {}",
                    content.relationship,
                    content.site_domain,
                    content.related_domain,
                    content.comment.as_deref().unwrap_or("")
                );
                self.storage.upsert_content_directive(&content) as u64
            }
            Err(rejection) => {
                tracing::debug!("Rejected directive on {}: {}", host, rejection);
                0
            }
        }
    }

    fn store_record(&mut self, host: &str, candidate: &RecordCandidate) -> StorageResult<u64> {
        let exchange_id = self
            .storage
            .lookup_exchange_id(&candidate.exchange_domain)?;

        if !matches!(exchange_id, Some(id) if id > 0) {
            tracing::warn!(
                "Unknown exchange domain [{}] on {}",
                candidate.exchange_domain,
                host
            );
        }

        match validate_record(host, candidate, exchange_id) {
            Ok(record) => {
                tracing::debug!(
                    "{} | {} | {:?} | {} | {} | {} | {}",
                    record.site_domain,
                    record.exchange_domain,
                    record.exchange_id,
                    record.seller_account_id,
                    record.account_type,
                    record.tag_id.as_deref().unwrap_or(""),
                    record.comment.as_deref().unwrap_or("")
                );
                Ok(self.storage.upsert_ads_record(&record) as u64)
            }
            Err(rejection) => {
                tracing::debug!("Rejected record on {}: {}", host, rejection);
                Ok(0)
            }
        }
    }
}

fn discard_referrals(host: &str, referrals: &[String]) {
    if !referrals.is_empty() {
        tracing::debug!(
            "Discarding {} referrals found on referral host {}",
            referrals.len(),
            host
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CrawlerConfig, UserAgentConfig};
    use crate::crawler::fetcher::build_http_client;
    use crate::manifest::{AccountType, Relationship};
    use crate::storage::SqliteStorage;

    fn crawler() -> Crawler<SqliteStorage> {
        let client =
            build_http_client(&UserAgentConfig::default(), &CrawlerConfig::default()).unwrap();
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage.register_exchange("exchange.example.com", 7).unwrap();
        Crawler::new(HostFetcher::new(client), storage)
    }

    fn process(crawler: &mut Crawler<SqliteStorage>, text: &str) -> HostPass {
        crawler
            .process_manifest("site.example.com", &Manifest::new(text))
            .unwrap()
    }

    #[test]
    fn test_valid_record_writes_one_row() {
        let mut crawler = crawler();
        let pass = process(&mut crawler, "exchange.example.com, 12345, DIRECT, tag1");

        assert_eq!(pass.rows_written, 1);
        let stored = crawler
            .storage()
            .load_ads_records("site.example.com")
            .unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].account_type, AccountType::Direct);
        assert_eq!(stored[0].exchange_id, Some(7));
        assert_eq!(stored[0].tag_id.as_deref(), Some("tag1"));
    }

    #[test]
    fn test_reprocessing_is_idempotent() {
        let mut crawler = crawler();
        let text = "exchange.example.com, 12345, DIRECT";

        assert_eq!(process(&mut crawler, text).rows_written, 1);
        assert_eq!(process(&mut crawler, text).rows_written, 1);
        assert_eq!(crawler.storage().count_ads_records().unwrap(), 1);
    }

    #[test]
    fn test_comment_only_manifest() {
        let mut crawler = crawler();
        let pass = process(&mut crawler, "# just a comment");

        assert_eq!(pass, HostPass::default());
        assert_eq!(crawler.storage().count_ads_records().unwrap(), 0);
    }

    #[test]
    fn test_empty_seller_rejected() {
        let mut crawler = crawler();
        let pass = process(&mut crawler, "exchange.example.com, , RESELLER");

        assert_eq!(pass.rows_written, 0);
        assert_eq!(crawler.storage().count_ads_records().unwrap(), 0);
    }

    #[test]
    fn test_unknown_exchange_stored_unresolved() {
        let mut crawler = crawler();
        let pass = process(&mut crawler, "unknown.example.net, 1, reseller");

        assert_eq!(pass.rows_written, 1);
        assert_eq!(crawler.storage().count_unresolved_records().unwrap(), 1);
    }

    #[test]
    fn test_subdomain_directive_only_refers() {
        let mut crawler = crawler();
        let pass = process(&mut crawler, "subdomain=child.example.com");

        assert_eq!(pass.rows_written, 0);
        assert_eq!(pass.referrals, vec!["child.example.com".to_string()]);
        assert_eq!(crawler.storage().count_ads_records().unwrap(), 0);
        assert_eq!(
            crawler
                .storage()
                .count_content_directives(Relationship::Producer)
                .unwrap(),
            0
        );
    }

    #[test]
    fn test_producer_directive_stored_and_referred() {
        let mut crawler = crawler();
        let pass = process(
            &mut crawler,
            "contentproducerdomain=producer.example.com #note",
        );

        assert_eq!(pass.rows_written, 1);
        assert_eq!(pass.referrals, vec!["producer.example.com".to_string()]);
        assert_eq!(
            crawler
                .storage()
                .count_content_directives(Relationship::Producer)
                .unwrap(),
            1
        );
    }

    #[test]
    fn test_referrals_deduplicated_self_kept() {
        let mut crawler = crawler();
        let pass = process(
            &mut crawler,
            "subdomain=a.example.com\nsubdomain=site.example.com\ncontentdistributordomain=a.example.com\nsubdomain=b.example.com\nsubdomain=site.example.com",
        );

        assert_eq!(
            pass.referrals,
            vec![
                "a.example.com".to_string(),
                "site.example.com".to_string(),
                "b.example.com".to_string()
            ]
        );
        // The distributor directive is still stored
        assert_eq!(pass.rows_written, 1);
    }

    #[test]
    fn test_registry_failure_is_fatal() {
        let client =
            build_http_client(&UserAgentConfig::default(), &CrawlerConfig::default()).unwrap();
        // An in-memory database without any tables
        let storage = SqliteStorage::new(std::path::Path::new(":memory:")).unwrap();
        let mut crawler = Crawler::new(HostFetcher::new(client), storage);

        let result = crawler.process_manifest(
            "site.example.com",
            &Manifest::new("exchange.example.com, 1, direct"),
        );
        assert!(result.is_err());
    }
}
