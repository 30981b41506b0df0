//! adstxt-crawler: an ads.txt crawler
//!
//! This crate fetches the `ads.txt` manifest of every host in a queue, parses
//! and validates its records and directives, and upserts them into a SQLite
//! database. Referral directives (`subdomain=`, `contentproducerdomain=`,
//! `contentdistributordomain=`) are followed exactly one hop deep.

pub mod config;
pub mod crawler;
pub mod manifest;
pub mod output;
pub mod queue;
pub mod storage;

use thiserror::Error;

/// Main error type for crawler operations
///
/// Per-host problems (unavailable hosts, malformed lines, invalid records,
/// failed writes) never show up here; they are absorbed inside the host's
/// crawl cycle.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Exchange registry in {0} is empty; seed adsystem_domain before crawling")]
    EmptyRegistry(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for crawler operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{crawl, CrawlPool, CrawlSummary, Crawler, HostFetcher};
pub use manifest::{AdsRecord, ContentDirective, LineEvent, Manifest};
pub use storage::{SqliteStorage, Storage};
