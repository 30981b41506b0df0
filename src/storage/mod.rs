//! Storage module for persisting crawl data
//!
//! This module handles all database operations for the crawler:
//! - Idempotent upserts of ads.txt records and content directives
//! - Exchange registry lookups
//! - Exchange id back-fill and statistics queries
//! - The reference schema used to bootstrap a database

mod schema;
mod sqlite;
mod traits;

pub use schema::{initialize_schema, SCHEMA_SQL};
pub use sqlite::{init_database, SqliteStorage};
pub use traits::{Storage, StorageError, StorageResult};

use std::path::Path;

/// Opens an existing storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully opened storage
/// * `Err(StorageError)` - Failed to open storage
pub fn open_storage(path: &Path) -> StorageResult<SqliteStorage> {
    SqliteStorage::new(path)
}
