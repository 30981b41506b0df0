//! HTTP fetcher implementation
//!
//! This module handles the single network request made per host:
//! - Building the HTTP client with the crawler's user agent
//! - Plain-HTTP GET of `http://<host>/ads.txt`
//! - Classifying every failure into a [`FetchRejection`]
//! - Rejecting HTML pages served in place of the manifest
//!
//! There are no retries: one attempt per host per crawl pass.

use crate::config::{CrawlerConfig, UserAgentConfig};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Client, StatusCode};
use std::error::Error as _;
use std::time::Duration;
use thiserror::Error;

/// Path of the manifest on every host
pub const MANIFEST_PATH: &str = "/ads.txt";

/// Substrings that mark a body as an HTML page rather than a manifest
const HTML_MARKERS: [&str; 4] = ["html", "body", "div", "span"];

/// Why a host's manifest could not be used
///
/// The orchestrator treats every variant the same way (host unavailable);
/// the distinction only matters for diagnostics.
#[derive(Debug, Error)]
pub enum FetchRejection {
    #[error("request timed out")]
    Timeout,

    #[error("DNS lookup failed: {0}")]
    Dns(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("response looks like HTML, not ads.txt")]
    HtmlContent,

    #[error("transport error: {0}")]
    Transport(String),
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `user_agent` - The user agent configuration
/// * `crawler` - Crawler settings (fetch timeout)
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    crawler: &CrawlerConfig,
) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("text/plain"));

    Client::builder()
        .user_agent(user_agent.header_value())
        .default_headers(headers)
        .timeout(Duration::from_secs(crawler.fetch_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
}

/// URL of a host's manifest
pub fn manifest_url(host: &str) -> String {
    format!("http://{}{}", host, MANIFEST_PATH)
}

/// Returns true when a body contains any of the HTML markers
pub fn looks_like_html(body: &str) -> bool {
    let lowered = body.to_lowercase();
    HTML_MARKERS.iter().any(|marker| lowered.contains(marker))
}

/// Fetches one host's manifest
#[derive(Debug, Clone)]
pub struct HostFetcher {
    client: Client,
}

impl HostFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Fetches `http://<host>/ads.txt`
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The body of a 200 response that does not look like HTML
    /// * `Err(FetchRejection)` - Anything else
    pub async fn fetch(&self, host: &str) -> Result<String, FetchRejection> {
        let url = manifest_url(host);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(classify_error)?;

        let status = response.status();
        tracing::info!("{} -> {}", url, status.as_u16());

        if status != StatusCode::OK {
            return Err(FetchRejection::Status(status.as_u16()));
        }

        let body = response.text().await.map_err(classify_error)?;

        if looks_like_html(&body) {
            return Err(FetchRejection::HtmlContent);
        }

        Ok(body)
    }
}

/// Maps a reqwest error to a rejection
fn classify_error(e: reqwest::Error) -> FetchRejection {
    if e.is_timeout() {
        FetchRejection::Timeout
    } else if e.is_connect() {
        if is_dns_failure(&e) {
            FetchRejection::Dns(e.to_string())
        } else {
            FetchRejection::Connect(e.to_string())
        }
    } else {
        FetchRejection::Transport(e.to_string())
    }
}

/// Walks the error chain looking for the resolver's failure message
fn is_dns_failure(e: &reqwest::Error) -> bool {
    let mut source = e.source();
    while let Some(err) = source {
        if err.to_string().to_lowercase().contains("dns error") {
            return true;
        }
        source = err.source();
    }
    false
}
