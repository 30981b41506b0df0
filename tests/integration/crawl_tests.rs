//! Integration tests for the crawler
//!
//! These tests use wiremock to serve ads.txt files and run the full
//! fetch, parse, validate and store cycle against on-disk databases.

use adstxt_crawler::config::{Config, CrawlerConfig, OutputConfig, UserAgentConfig};
use adstxt_crawler::crawler::{
    build_http_client, CrawlPhase, Crawler, FetchRejection, HostFetcher,
};
use adstxt_crawler::manifest::Relationship;
use adstxt_crawler::storage::{init_database, SqliteStorage, Storage};
use adstxt_crawler::{crawl, CrawlError};
use std::path::Path;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const EXCHANGE: &str = "exchange.example.com";
const EXCHANGE_ID: i64 = 7;

fn create_test_config(db_path: &Path, workers: usize) -> Config {
    Config {
        crawler: CrawlerConfig {
            workers,
            fetch_timeout_secs: 5,
            resolve_hosts: false,
        },
        user_agent: UserAgentConfig::default(),
        output: OutputConfig {
            database_path: db_path.to_string_lossy().to_string(),
        },
    }
}

/// Creates a database with the schema and a seeded exchange registry
fn seeded_database(db_path: &Path) -> SqliteStorage {
    let mut storage = init_database(db_path).expect("Failed to initialize database");
    storage
        .register_exchange(EXCHANGE, EXCHANGE_ID)
        .expect("Failed to seed registry");
    storage
}

fn test_fetcher() -> HostFetcher {
    fetcher_with_timeout(5)
}

fn fetcher_with_timeout(fetch_timeout_secs: u64) -> HostFetcher {
    let mut config = create_test_config(Path::new("unused.db"), 1);
    config.crawler.fetch_timeout_secs = fetch_timeout_secs;
    let client = build_http_client(&config.user_agent, &config.crawler)
        .expect("Failed to build client");
    HostFetcher::new(client)
}

/// Host part of a mock server, e.g. "127.0.0.1:43210"
fn host_of(server: &MockServer) -> String {
    server
        .uri()
        .trim_start_matches("http://")
        .trim_end_matches('/')
        .to_string()
}

async fn serve_manifest(server: &MockServer, body: String) {
    Mock::given(method("GET"))
        .and(path("/ads.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_crawl_follows_one_referral_hop() {
    let site = MockServer::start().await;
    let subdomain = MockServer::start().await;
    let second_hop = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/ads.txt"))
        .and(header("accept", "text/plain"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            "# ads.txt\n{}, pub-1, DIRECT, abc123\nsubdomain={}\n",
            EXCHANGE,
            host_of(&subdomain)
        )))
        .expect(1)
        .mount(&site)
        .await;

    Mock::given(method("GET"))
        .and(path("/ads.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            "{}, pub-2, RESELLER\nsubdomain={}\n",
            EXCHANGE,
            host_of(&second_hop)
        )))
        .expect(1)
        .mount(&subdomain)
        .await;

    // A referral found on a referral host is never crawled
    Mock::given(method("GET"))
        .and(path("/ads.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            "{}, pub-3, DIRECT\n",
            EXCHANGE
        )))
        .expect(0)
        .mount(&second_hop)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let storage = seeded_database(&dir.path().join("adstxt.db"));
    let mut crawler = Crawler::new(test_fetcher(), storage);

    let rows = crawler.crawl_host(&host_of(&site)).await.unwrap();
    assert_eq!(rows, 2);

    let storage = crawler.into_storage();
    let site_records = storage.load_ads_records(&host_of(&site)).unwrap();
    assert_eq!(site_records.len(), 1);
    assert_eq!(site_records[0].seller_account_id, "pub-1");
    assert_eq!(site_records[0].exchange_id, Some(EXCHANGE_ID));
    assert_eq!(site_records[0].tag_id.as_deref(), Some("abc123"));

    let subdomain_records = storage.load_ads_records(&host_of(&subdomain)).unwrap();
    assert_eq!(subdomain_records.len(), 1);
    assert_eq!(subdomain_records[0].seller_account_id, "pub-2");

    assert_eq!(
        storage
            .count_ads_records_for_site(&host_of(&second_hop))
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn test_self_referral_is_crawled_again() {
    let site = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/ads.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            "{}, pub-1, DIRECT\nsubdomain={}\n",
            EXCHANGE,
            host_of(&site)
        )))
        .expect(2)
        .mount(&site)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let storage = seeded_database(&dir.path().join("adstxt.db"));
    let mut crawler = Crawler::new(test_fetcher(), storage);

    // Initial pass plus one referral pass; the upsert replaces the same row
    let rows = crawler.crawl_host(&host_of(&site)).await.unwrap();
    assert_eq!(rows, 2);
    assert_eq!(crawler.storage().count_ads_records().unwrap(), 1);
}

#[tokio::test]
async fn test_referral_phase_does_not_follow_directives() {
    let referral = MockServer::start().await;
    let next_hop = MockServer::start().await;

    serve_manifest(
        &referral,
        format!(
            "{}, pub-4, RESELLER\ncontentproducerdomain={}\n",
            EXCHANGE,
            host_of(&next_hop)
        ),
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/ads.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            "{}, pub-5, DIRECT\n",
            EXCHANGE
        )))
        .expect(0)
        .mount(&next_hop)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let storage = seeded_database(&dir.path().join("adstxt.db"));
    let mut crawler = Crawler::new(test_fetcher(), storage);

    // The record and the producer directive are still stored
    let rows = crawler
        .crawl(&host_of(&referral), CrawlPhase::Referral)
        .await
        .unwrap();
    assert_eq!(rows, 2);
    assert_eq!(
        crawler
            .storage()
            .count_ads_records_for_site(&host_of(&next_hop))
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn test_slow_host_times_out() {
    let slow = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/ads.txt"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(format!("{}, pub-1, DIRECT\n", EXCHANGE))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&slow)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let storage = seeded_database(&dir.path().join("adstxt.db"));
    let fetcher = fetcher_with_timeout(1);
    assert!(matches!(
        fetcher.fetch(&host_of(&slow)).await,
        Err(FetchRejection::Timeout)
    ));

    let mut crawler = Crawler::new(fetcher, storage);
    assert_eq!(crawler.crawl_host(&host_of(&slow)).await.unwrap(), 0);
    assert_eq!(crawler.storage().count_ads_records().unwrap(), 0);
}

#[tokio::test]
async fn test_content_directives_are_stored_and_followed() {
    let site = MockServer::start().await;
    let producer = MockServer::start().await;

    serve_manifest(
        &site,
        format!(
            "contentproducerdomain={} # studio\n{}, pub-1, DIRECT\n",
            host_of(&producer),
            EXCHANGE
        ),
    )
    .await;
    serve_manifest(&producer, format!("{}, pub-9, DIRECT\n", EXCHANGE)).await;

    let dir = tempfile::tempdir().unwrap();
    let storage = seeded_database(&dir.path().join("adstxt.db"));
    let mut crawler = Crawler::new(test_fetcher(), storage);

    // directive + record on the site, one record on the producer
    let rows = crawler.crawl_host(&host_of(&site)).await.unwrap();
    assert_eq!(rows, 3);

    let storage = crawler.storage();
    assert_eq!(
        storage
            .count_content_directives(Relationship::Producer)
            .unwrap(),
        1
    );
    assert_eq!(
        storage
            .count_content_directives(Relationship::Distributor)
            .unwrap(),
        0
    );
    assert_eq!(storage.count_ads_records().unwrap(), 2);
}

#[tokio::test]
async fn test_unavailable_hosts_write_nothing() {
    let missing = MockServer::start().await;
    let html = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/ads.txt"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&missing)
        .await;

    serve_manifest(
        &html,
        format!(
            "<html><body>{}, pub-1, DIRECT</body></html>",
            EXCHANGE
        ),
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let storage = seeded_database(&dir.path().join("adstxt.db"));
    let mut crawler = Crawler::new(test_fetcher(), storage);

    assert_eq!(crawler.crawl_host(&host_of(&missing)).await.unwrap(), 0);
    assert_eq!(crawler.crawl_host(&host_of(&html)).await.unwrap(), 0);
    assert_eq!(crawler.storage().count_ads_records().unwrap(), 0);
}

#[tokio::test]
async fn test_empty_registry_refuses_to_crawl() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("adstxt.db");
    init_database(&db_path).unwrap();

    let config = create_test_config(&db_path, 2);
    let result = crawl(&config, vec!["example.com".to_string()]).await;

    assert!(matches!(result, Err(CrawlError::EmptyRegistry(_))));
}

#[tokio::test]
async fn test_invalid_worker_count_refuses_to_crawl() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("adstxt.db");
    seeded_database(&db_path);

    let config = create_test_config(&db_path, 0);
    let result = crawl(&config, vec!["example.com".to_string()]).await;

    assert!(matches!(result, Err(CrawlError::Config(_))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_worker_count_does_not_change_results() {
    let mut servers = Vec::new();
    for i in 0..6 {
        let server = MockServer::start().await;
        let body = (0..=i)
            .map(|n| format!("{}, pub-{}-{}, DIRECT\n", EXCHANGE, i, n))
            .collect::<String>();
        serve_manifest(&server, body).await;
        servers.push(server);
    }
    let hosts: Vec<String> = servers.iter().map(host_of).collect();

    let dir = tempfile::tempdir().unwrap();
    let single_path = dir.path().join("single.db");
    let pooled_path = dir.path().join("pooled.db");
    seeded_database(&single_path);
    seeded_database(&pooled_path);

    let single = crawl(&create_test_config(&single_path, 1), hosts.clone())
        .await
        .unwrap();
    let pooled = crawl(&create_test_config(&pooled_path, 4), hosts.clone())
        .await
        .unwrap();

    assert_eq!(single.rows_written, 21);
    assert_eq!(single.rows_written, pooled.rows_written);
    assert_eq!(single.failed_workers, 0);
    assert_eq!(pooled.failed_workers, 0);

    let single_db = SqliteStorage::new(&single_path).unwrap();
    let pooled_db = SqliteStorage::new(&pooled_path).unwrap();
    assert_eq!(single_db.count_ads_records().unwrap(), 21);
    for host in &hosts {
        assert_eq!(
            single_db.load_ads_records(host).unwrap(),
            pooled_db.load_ads_records(host).unwrap()
        );
    }
}

#[tokio::test]
async fn test_recrawl_is_idempotent() {
    let site = MockServer::start().await;
    serve_manifest(
        &site,
        format!(
            "{}, pub-1, DIRECT\n{}, pub-1, DIRECT\n{}, pub-2, RESELLER, tag # reseller\n",
            EXCHANGE, EXCHANGE, EXCHANGE
        ),
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("adstxt.db");
    seeded_database(&db_path);
    let config = create_test_config(&db_path, 1);

    crawl(&config, vec![host_of(&site)]).await.unwrap();
    crawl(&config, vec![host_of(&site)]).await.unwrap();

    let storage = SqliteStorage::new(&db_path).unwrap();
    let records = storage.load_ads_records(&host_of(&site)).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].comment.as_deref(), Some("reseller"));
}

#[tokio::test]
async fn test_unknown_exchange_is_back_filled() {
    let site = MockServer::start().await;
    serve_manifest(&site, "newexchange.example.net, 555, DIRECT\n".to_string()).await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("adstxt.db");
    seeded_database(&db_path);
    let config = create_test_config(&db_path, 1);

    let summary = crawl(&config, vec![host_of(&site)]).await.unwrap();
    assert_eq!(summary.rows_written, 1);

    let mut storage = SqliteStorage::new(&db_path).unwrap();
    assert_eq!(storage.count_unresolved_records().unwrap(), 1);
    let records = storage.load_ads_records(&host_of(&site)).unwrap();
    assert_eq!(records[0].exchange_id, None);

    storage
        .register_exchange("newexchange.example.net", 42)
        .unwrap();
    assert_eq!(storage.reconcile_exchange_ids().unwrap(), 1);
    assert_eq!(storage.count_unresolved_records().unwrap(), 0);

    let records = storage.load_ads_records(&host_of(&site)).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].exchange_id, Some(42));
}
