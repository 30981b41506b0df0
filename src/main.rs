//! adstxt-crawler main entry point
//!
//! This is the command-line interface for the ads.txt crawler.

use adstxt_crawler::config::{load_config_with_hash, validate_crawler_config, Config};
use adstxt_crawler::output::{load_statistics, print_statistics, print_summary};
use adstxt_crawler::queue::load_host_queue;
use adstxt_crawler::storage::{init_database, open_storage, Storage};
use anyhow::{bail, Context};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// adstxt-crawler: crawl ads.txt files into a SQLite database
///
/// Fetches http://<host>/ads.txt for every target, validates the records and
/// stores them keyed by site and exchange. Hosts referenced through
/// subdomain/content directives are crawled one hop deep.
#[derive(Parser, Debug)]
#[command(name = "adstxt-crawler")]
#[command(version)]
#[command(about = "Crawl ads.txt files into a SQLite database", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// List of domains or URLs to crawl ads.txt from
    #[arg(short, long, value_name = "FILE")]
    targets: Option<PathBuf>,

    /// Number of crawl workers (overrides the config file)
    #[arg(short = 'p', long)]
    workers: Option<usize>,

    /// Crawl targets without checking that they resolve
    #[arg(long)]
    no_resolve: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Create any missing tables in the database and exit
    #[arg(long, conflicts_with_all = ["stats", "reconcile"])]
    init_schema: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["init_schema", "reconcile"])]
    stats: bool,

    /// Back-fill exchange ids from the registry and exit
    #[arg(long, conflicts_with_all = ["init_schema", "stats"])]
    reconcile: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if let Some(workers) = cli.workers {
        config.crawler.workers = workers;
        validate_crawler_config(&config.crawler)?;
    }
    if cli.no_resolve {
        config.crawler.resolve_hosts = false;
    }

    let database_path = Path::new(&config.output.database_path);

    if cli.init_schema {
        init_database(database_path)
            .with_context(|| format!("Failed to initialize {}", database_path.display()))?;
        println!("Schema ready in {}", database_path.display());
    } else if cli.stats {
        handle_stats(database_path)?;
    } else if cli.reconcile {
        let updated = open_storage(database_path)?.reconcile_exchange_ids()?;
        println!("Back-filled exchange ids on {} records", updated);
    } else {
        let Some(targets) = cli.targets.as_deref() else {
            bail!("Missing target domains file (--targets)");
        };
        handle_crawl(&config, targets).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("adstxt_crawler=info,warn"),
            1 => EnvFilter::new("adstxt_crawler=debug,info"),
            2 => EnvFilter::new("adstxt_crawler=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .init();
}

/// Handles the --stats mode
fn handle_stats(database_path: &Path) -> anyhow::Result<()> {
    println!("Database: {}\n", database_path.display());

    let storage = open_storage(database_path)?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: &Config, targets: &Path) -> anyhow::Result<()> {
    let hosts = load_host_queue(targets, config.crawler.resolve_hosts)
        .await
        .with_context(|| format!("Failed to load targets from {}", targets.display()))?;

    if hosts.is_empty() {
        tracing::warn!("No crawl: no usable hosts in {}", targets.display());
        bail!("No usable hosts in {}", targets.display());
    }
    tracing::info!("Crawling {} hosts", hosts.len());

    let summary = adstxt_crawler::crawl(config, hosts).await?;

    tracing::info!(
        "Finished crawl: {} records from {} hosts",
        summary.rows_written,
        summary.hosts
    );
    print_summary(&summary, &config.output.database_path);

    if summary.failed_workers > 0 {
        bail!("{} worker(s) failed", summary.failed_workers);
    }

    Ok(())
}
