//! dirscrape main entry point
//!
//! Command-line interface for the directory scraper.

use anyhow::Context;
use clap::Parser;
use dirscrape::config::{load_from_env, RunOptions};
use dirscrape::crawler::run_crawl;
use tracing_subscriber::EnvFilter;

/// dirscrape: scrape the manufacturer directory into JSON files
///
/// Listing and detail pages are cached under the cache directory, so reruns
/// only hit the network for pages that have never been fetched successfully.
#[derive(Parser, Debug)]
#[command(name = "dirscrape")]
#[command(version)]
#[command(about = "Scrape a paginated company directory", long_about = None)]
struct Cli {
    /// Also write the results to the NATS key-value bucket
    #[arg(long)]
    nats: bool,

    /// Fail on any cache miss instead of making an HTTP request
    #[arg(long = "http-fail")]
    http_fail: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // A missing .env is fine; everything has a default
    let _ = dotenvy::dotenv();

    setup_logging();

    let (config, hash) = load_from_env().context("failed to load configuration")?;
    match hash {
        Some(hash) => tracing::info!("Configuration loaded (hash: {})", hash),
        None => tracing::info!("No configuration file, using defaults"),
    }

    let options = RunOptions {
        use_kv: cli.nats,
        strict_cache: cli.http_fail,
    };

    tracing::info!("Starting crawl at {}", config.site.seed_url);
    if options.strict_cache {
        tracing::info!("Strict cache mode: network access disabled");
    }

    match run_crawl(config, options).await {
        Ok(summary) => {
            tracing::info!(
                "Crawl completed: {} pages, {} companies, {} detail records{}",
                summary.pages,
                summary.seed_records,
                summary.detail_records,
                if summary.kv_written {
                    ", replicated to key-value store"
                } else {
                    ""
                }
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}

/// Sets up the logging/tracing subscriber
///
/// `RUST_LOG` wins when set; otherwise this crate logs at info and
/// dependencies at warn.
fn setup_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("dirscrape=info,warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}
