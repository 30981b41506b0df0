//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::manifest::{AdsRecord, ContentDirective, Relationship};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Writes are upserts keyed on the record's natural key and commit
/// immediately. A write rejected by the engine is logged by the backend and
/// reported as zero rows written; it never surfaces as an error. Reads do
/// return errors: a backend that cannot answer a lookup is unusable.
pub trait Storage {
    // ===== Exchange Registry =====

    /// Resolves an exchange domain to its registry id
    ///
    /// Returns `Ok(None)` when the domain is not registered. A registry row
    /// with a non-positive id is returned as is, but records carrying it are
    /// stored as unresolved and read back with no exchange id.
    fn lookup_exchange_id(&self, exchange_domain: &str) -> StorageResult<Option<i64>>;

    /// Number of exchanges in the registry
    fn count_exchanges(&self) -> StorageResult<u64>;

    // ===== Upserts =====

    /// Inserts or replaces an ads.txt record
    ///
    /// # Returns
    ///
    /// The number of rows written: 1 on success (also when replacing), 0 on failure
    fn upsert_ads_record(&mut self, record: &AdsRecord) -> usize;

    /// Inserts or replaces a content producer/distributor relationship
    ///
    /// # Returns
    ///
    /// The number of rows written: 1 on success (also when replacing), 0 on failure
    fn upsert_content_directive(&mut self, directive: &ContentDirective) -> usize;

    // ===== Maintenance =====

    /// Back-fills the exchange id of stored records whose exchange domain
    /// has since been added to the registry
    ///
    /// # Returns
    ///
    /// The number of records updated
    fn reconcile_exchange_ids(&mut self) -> StorageResult<usize>;

    // ===== Statistics =====

    /// Total number of stored ads.txt records
    fn count_ads_records(&self) -> StorageResult<u64>;

    /// Number of stored records for one site
    fn count_ads_records_for_site(&self, site_domain: &str) -> StorageResult<u64>;

    /// Number of stored records whose exchange id is unresolved
    fn count_unresolved_records(&self) -> StorageResult<u64>;

    /// Number of distinct sites with at least one stored record
    fn count_sites(&self) -> StorageResult<u64>;

    /// Number of stored content relationships of one kind
    fn count_content_directives(&self, relationship: Relationship) -> StorageResult<u64>;
}
