//! Integration tests for adstxt-crawler

mod crawl_tests;
