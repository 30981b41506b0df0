//! Output module for crawl reports
//!
//! This module handles:
//! - Loading database statistics
//! - Printing run summaries and statistics

pub mod stats;

pub use stats::{load_statistics, print_statistics, print_summary, CrawlStatistics};
