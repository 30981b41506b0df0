//! Reference schema for the ads.txt database
//!
//! Production databases are provisioned (and the exchange registry seeded)
//! outside the crawler. This schema is applied only on explicit request
//! (`--init-schema`) and by the test suite.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Exchange registry: exchange domain -> exchange-system id (ids are positive)
CREATE TABLE IF NOT EXISTS adsystem_domain (
    domain TEXT NOT NULL PRIMARY KEY,
    id INTEGER NOT NULL
);

-- One row per authorized seller line; adsystem_id 0 means unresolved
CREATE TABLE IF NOT EXISTS adstxt (
    site_domain TEXT NOT NULL,
    exchange_domain TEXT NOT NULL,
    adsystem_id INTEGER NOT NULL DEFAULT 0,
    seller_account_id TEXT NOT NULL,
    account_type TEXT NOT NULL,
    tag_id TEXT NOT NULL DEFAULT '',
    entry_comment TEXT NOT NULL DEFAULT '',
    updated_at TEXT NOT NULL,
    PRIMARY KEY (site_domain, exchange_domain, adsystem_id, seller_account_id, account_type, tag_id)
);

CREATE INDEX IF NOT EXISTS idx_adstxt_exchange ON adstxt(exchange_domain);

-- contentproducerdomain= declarations
CREATE TABLE IF NOT EXISTS adstxt_contentproducer (
    site_domain TEXT NOT NULL,
    producer_domain TEXT NOT NULL,
    entry_comment TEXT NOT NULL DEFAULT '',
    updated_at TEXT NOT NULL,
    PRIMARY KEY (site_domain, producer_domain)
);

-- contentdistributordomain= declarations
CREATE TABLE IF NOT EXISTS adstxt_contentdistributor (
    site_domain TEXT NOT NULL,
    distributor_domain TEXT NOT NULL,
    entry_comment TEXT NOT NULL DEFAULT '',
    updated_at TEXT NOT NULL,
    PRIMARY KEY (site_domain, distributor_domain)
);
"#;

/// Creates any missing tables
pub fn initialize_schema(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)
}
