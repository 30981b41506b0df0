//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.
//! Every crawl write is a single autocommit statement, so concurrent workers
//! with their own connections never hold overlapping transactions; SQLite's
//! file locking (plus a busy timeout) serializes them. Only the exchange-id
//! back-fill runs as a transaction.

use crate::manifest::{
    AccountType, AdsRecord, ContentDirective, Relationship, UNKNOWN_EXCHANGE_ID,
};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::time::Duration;

/// How long a writer waits for a lock held by another worker
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

const SELECT_EXCHANGE_ID: &str = "SELECT id FROM adsystem_domain WHERE domain = ?1";

const UPSERT_ADS_RECORD: &str = "INSERT OR REPLACE INTO adstxt
    (site_domain, exchange_domain, adsystem_id, seller_account_id, account_type, tag_id, entry_comment, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)";

const UPSERT_CONTENT_PRODUCER: &str = "INSERT OR REPLACE INTO adstxt_contentproducer
    (site_domain, producer_domain, entry_comment, updated_at)
    VALUES (?1, ?2, ?3, ?4)";

const UPSERT_CONTENT_DISTRIBUTOR: &str = "INSERT OR REPLACE INTO adstxt_contentdistributor
    (site_domain, distributor_domain, entry_comment, updated_at)
    VALUES (?1, ?2, ?3, ?4)";

/// Rows whose back-filled key already exists are superseded by the row
/// that was written with the registry id
const DELETE_SUPERSEDED_RECORDS: &str = "DELETE FROM adstxt
    WHERE EXISTS (
        SELECT 1 FROM adsystem_domain d
        JOIN adstxt newer
          ON newer.site_domain = adstxt.site_domain
         AND newer.exchange_domain = adstxt.exchange_domain
         AND newer.adsystem_id = d.id
         AND newer.seller_account_id = adstxt.seller_account_id
         AND newer.account_type = adstxt.account_type
         AND newer.tag_id = adstxt.tag_id
        WHERE d.domain = adstxt.exchange_domain AND d.id <> adstxt.adsystem_id
    )";

const RECONCILE_EXCHANGE_IDS: &str = "UPDATE OR REPLACE adstxt
    SET adsystem_id = (SELECT d.id FROM adsystem_domain d WHERE d.domain = adstxt.exchange_domain)
    WHERE EXISTS (
        SELECT 1 FROM adsystem_domain d
        WHERE d.domain = adstxt.exchange_domain AND d.id <> adstxt.adsystem_id
    )";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens an existing database
    ///
    /// The schema is expected to exist already; see [`init_database`] for
    /// creating it.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database with the reference schema (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Adds or replaces an entry of the exchange registry
    ///
    /// The crawler itself only reads the registry; this is for seeding.
    /// Registry ids must be positive; `0` is the stored marker for an
    /// unresolved exchange.
    pub fn register_exchange(&mut self, domain: &str, id: i64) -> StorageResult<()> {
        if id <= UNKNOWN_EXCHANGE_ID {
            return Err(StorageError::Database(format!(
                "exchange id for {} must be positive, got {}",
                domain, id
            )));
        }

        self.conn.execute(
            "INSERT OR REPLACE INTO adsystem_domain (domain, id) VALUES (?1, ?2)",
            params![crate::manifest::normalize_key(domain), id],
        )?;
        Ok(())
    }

    /// Loads the stored records of one site, ordered by exchange and seller
    pub fn load_ads_records(&self, site_domain: &str) -> StorageResult<Vec<AdsRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT site_domain, exchange_domain, adsystem_id, seller_account_id, account_type,
             tag_id, entry_comment
             FROM adstxt WHERE site_domain = ?1
             ORDER BY exchange_domain, seller_account_id, account_type, tag_id",
        )?;

        let rows = stmt.query_map(params![site_domain], |row| {
            let exchange_id: i64 = row.get(2)?;
            let account_type: String = row.get(4)?;
            let tag_id: String = row.get(5)?;
            let comment: String = row.get(6)?;

            Ok(AdsRecord {
                site_domain: row.get(0)?,
                exchange_domain: row.get(1)?,
                exchange_id: (exchange_id != UNKNOWN_EXCHANGE_ID).then_some(exchange_id),
                seller_account_id: row.get(3)?,
                account_type: AccountType::parse(&account_type).ok_or_else(|| {
                    rusqlite::Error::InvalidColumnType(4, "account_type".to_string(), Type::Text)
                })?,
                tag_id: (!tag_id.is_empty()).then_some(tag_id),
                comment: (!comment.is_empty()).then_some(comment),
            })
        })?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }

        Ok(records)
    }

    fn count(&self, sql: &str, params: impl rusqlite::Params) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(sql, params, |row| row.get(0))?;
        Ok(count as u64)
    }
}

impl Storage for SqliteStorage {
    // ===== Exchange Registry =====

    fn lookup_exchange_id(&self, exchange_domain: &str) -> StorageResult<Option<i64>> {
        let id = self
            .conn
            .query_row(SELECT_EXCHANGE_ID, params![exchange_domain], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(id)
    }

    fn count_exchanges(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM adsystem_domain", [])
    }

    // ===== Upserts =====

    fn upsert_ads_record(&mut self, record: &AdsRecord) -> usize {
        let exchange_id = record.exchange_id.unwrap_or(UNKNOWN_EXCHANGE_ID);
        let tag_id = record.tag_id.as_deref().unwrap_or("");
        let comment = record.comment.as_deref().unwrap_or("");
        let now = Utc::now().to_rfc3339();

        match self.conn.execute(
            UPSERT_ADS_RECORD,
            params![
                record.site_domain,
                record.exchange_domain,
                exchange_id,
                record.seller_account_id,
                record.account_type.as_str(),
                tag_id,
                comment,
                now
            ],
        ) {
            Ok(rows) => rows,
            Err(e) => {
                tracing::error!(
                    statement = UPSERT_ADS_RECORD,
                    site = %record.site_domain,
                    exchange = %record.exchange_domain,
                    exchange_id,
                    seller = %record.seller_account_id,
                    account_type = %record.account_type,
                    tag_id,
                    comment,
                    "Failed to store ads.txt record: {}",
                    e
                );
                0
            }
        }
    }

    fn upsert_content_directive(&mut self, directive: &ContentDirective) -> usize {
        let statement = match directive.relationship {
            Relationship::Producer => UPSERT_CONTENT_PRODUCER,
            Relationship::Distributor => UPSERT_CONTENT_DISTRIBUTOR,
        };
        let comment = directive.comment.as_deref().unwrap_or("");
        let now = Utc::now().to_rfc3339();

        match self.conn.execute(
            statement,
            params![directive.site_domain, directive.related_domain, comment, now],
        ) {
            Ok(rows) => rows,
            Err(e) => {
                tracing::error!(
                    statement,
                    relationship = %directive.relationship,
                    site = %directive.site_domain,
                    related = %directive.related_domain,
                    comment,
                    "Failed to store content directive: {}",
                    e
                );
                0
            }
        }
    }

    // ===== Maintenance =====

    fn reconcile_exchange_ids(&mut self) -> StorageResult<usize> {
        let tx = self.conn.transaction()?;
        let superseded = tx.execute(DELETE_SUPERSEDED_RECORDS, [])?;
        let updated = tx.execute(RECONCILE_EXCHANGE_IDS, [])?;
        tx.commit()?;

        if superseded > 0 {
            tracing::debug!("Dropped {} records superseded by resolved rows", superseded);
        }
        Ok(updated)
    }

    // ===== Statistics =====

    fn count_ads_records(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM adstxt", [])
    }

    fn count_ads_records_for_site(&self, site_domain: &str) -> StorageResult<u64> {
        self.count(
            "SELECT COUNT(*) FROM adstxt WHERE site_domain = ?1",
            params![site_domain],
        )
    }

    fn count_unresolved_records(&self) -> StorageResult<u64> {
        self.count(
            "SELECT COUNT(*) FROM adstxt WHERE adsystem_id = ?1",
            params![UNKNOWN_EXCHANGE_ID],
        )
    }

    fn count_sites(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(DISTINCT site_domain) FROM adstxt", [])
    }

    fn count_content_directives(&self, relationship: Relationship) -> StorageResult<u64> {
        match relationship {
            Relationship::Producer => self.count("SELECT COUNT(*) FROM adstxt_contentproducer", []),
            Relationship::Distributor => {
                self.count("SELECT COUNT(*) FROM adstxt_contentdistributor", [])
            }
        }
    }
}

/// Opens a database and creates any missing tables
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Database ready for crawling (once the registry is seeded)
/// * `Err(StorageError)` - Failed to open the database or apply the schema
pub fn init_database(path: &Path) -> StorageResult<SqliteStorage> {
    let storage = SqliteStorage::new(path)?;
    initialize_schema(&storage.conn)?;
    Ok(storage)
}
