//! Host queue loading
//!
//! Reads a target list (one hostname or URL per line) and reduces it to the
//! ordered list of hosts to crawl. Optionally drops hosts that do not resolve.

use std::collections::HashSet;
use std::path::Path;
use url::Url;

/// Parses a target list into hostnames
///
/// - Blank lines and lines starting with `#` are skipped
/// - Only the first comma-separated field of a line is used
/// - `http://` and `https://` URLs are reduced to their host (and explicit port)
/// - Hosts are lower-cased; repeated hosts keep their first position
///
/// # Example
///
/// ```
/// use adstxt_crawler::queue::parse_targets;
///
/// let hosts = parse_targets("# targets\nhttps://News.example.com/page\nexample.org,ignored\n");
/// assert_eq!(hosts, vec!["news.example.com", "example.org"]);
/// ```
pub fn parse_targets(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut hosts = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let item = line.split(',').next().unwrap_or("").trim();
        match target_host(item) {
            Some(host) => {
                if seen.insert(host.clone()) {
                    hosts.push(host);
                }
            }
            None => tracing::debug!("Skipping unusable target: {}", item),
        }
    }

    hosts
}

/// Extracts the host from a hostname or URL target
fn target_host(item: &str) -> Option<String> {
    if item.contains("http:") || item.contains("https:") {
        let url = Url::parse(item).ok()?;
        let host = url.host_str()?.to_lowercase();
        return Some(match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host,
        });
    }

    let host = item.to_lowercase();
    if host.is_empty() {
        None
    } else {
        Some(host)
    }
}

/// Keeps only hosts that resolve to a usable address
///
/// A host is dropped when the lookup fails or any address it resolves to is
/// unspecified (`0.0.0.0`), which is how sinkholed domains are usually
/// published.
pub async fn resolve_hosts(hosts: Vec<String>) -> Vec<String> {
    let mut resolved = Vec::with_capacity(hosts.len());

    for host in hosts {
        if is_resolvable(&host).await {
            resolved.push(host);
        } else {
            tracing::info!("Skipping {}: does not resolve", host);
        }
    }

    resolved
}

async fn is_resolvable(host: &str) -> bool {
    let target = if host.contains(':') {
        host.to_string()
    } else {
        format!("{}:80", host)
    };

    match tokio::net::lookup_host(target).await {
        Ok(addrs) => {
            let addrs: Vec<_> = addrs.collect();
            !addrs.is_empty() && addrs.iter().all(|addr| !addr.ip().is_unspecified())
        }
        Err(e) => {
            tracing::debug!("DNS lookup for {} failed: {}", host, e);
            false
        }
    }
}

/// Loads the host queue from a target file
///
/// # Arguments
///
/// * `path` - Target list file
/// * `resolve` - Drop hosts that do not resolve
pub async fn load_host_queue(path: &Path, resolve: bool) -> crate::Result<Vec<String>> {
    let content = tokio::fs::read_to_string(path).await?;
    let hosts = parse_targets(&content);
    tracing::info!("Loaded {} targets from {}", hosts.len(), path.display());

    if resolve {
        Ok(resolve_hosts(hosts).await)
    } else {
        Ok(hosts)
    }
}
