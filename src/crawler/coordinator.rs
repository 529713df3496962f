//! Crawler coordinator - main crawl orchestration logic
//!
//! A run is strictly staged:
//! 1. Walk and buffer every listing page before parsing any of them
//! 2. Parse listing pages, in page order, into seed records
//! 3. Checkpoint the seed records to the file sink
//! 4. Fetch detail pages with bounded concurrency, persisting each one as it
//!    completes
//! 5. Write the joined dataset
//! 6. Optionally replicate all artifacts to the key-value store
//!
//! Any fetch or parse failure aborts the run. Everything fetched so far is in
//! the response cache, so a rerun resumes from there.

use crate::cache::{CachedFetcher, ResponseCache};
use crate::config::{Config, RunOptions};
use crate::crawler::fetcher::{Fetch, HttpFetcher};
use crate::crawler::parser::{DirectoryExtractor, RecordExtractor};
use crate::crawler::pool::fetch_many;
use crate::crawler::walker::PageWalker;
use crate::records::{DetailRecord, JoinedRecord, SeedRecord};
use crate::storage::{
    assign_record_keys, FileSink, KeyLayout, KvBucket, Sink, SinkResult, VersionedKvSink,
    FILE_LAYOUT, KV_LAYOUT,
};
use crate::ScrapeError;
use futures::StreamExt;
use std::collections::HashMap;
use std::future::Future;
use std::time::Instant;

/// Counts reported at the end of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Listing pages walked
    pub pages: usize,

    /// Distinct seed records parsed from the listing
    pub seed_records: usize,

    /// Detail records fetched and joined
    pub detail_records: usize,

    /// Whether the artifacts were replicated to the key-value store
    pub kv_written: bool,
}

/// Everything one crawl produced, ready to be written to a sink
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub pages: usize,

    /// Seed records in listing order
    pub seeds: Vec<SeedRecord>,

    /// Joined records in listing order
    pub joined: Vec<JoinedRecord>,

    /// Per-record key by detail URL
    pub record_keys: HashMap<String, String>,
}

impl Dataset {
    /// Storage key assigned to `seed` when the listing was parsed
    pub fn record_key(&self, seed: &SeedRecord) -> Result<&str, ScrapeError> {
        record_key(&self.record_keys, &seed.detail_url)
    }
}

fn record_key<'a>(keys: &'a HashMap<String, String>, url: &str) -> Result<&'a str, ScrapeError> {
    keys.get(url).map(String::as_str).ok_or_else(|| ScrapeError::Parse {
        url: url.to_string(),
        message: "detail URL does not belong to any listing row".to_string(),
    })
}

/// Main crawler coordinator structure
pub struct Coordinator<F, E> {
    config: Config,
    options: RunOptions,
    fetcher: F,
    extractor: E,
}

impl Coordinator<CachedFetcher<HttpFetcher>, DirectoryExtractor> {
    /// Creates a coordinator backed by the network and the on-disk cache
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `options` - Per-run switches (key-value replication, strict cache)
    pub fn new(config: Config, options: RunOptions) -> Result<Self, ScrapeError> {
        let http = HttpFetcher::from_config(&config.crawler)?;
        let cache = ResponseCache::new(&config.output.cache_dir);
        let fetcher = CachedFetcher::new(http, cache, options.strict_cache);
        let extractor = DirectoryExtractor::new(&config.site.base_url)?;

        Ok(Self::with_parts(config, options, fetcher, extractor))
    }
}

impl<F: Fetch, E: RecordExtractor> Coordinator<F, E> {
    /// Creates a coordinator from explicit collaborators
    pub fn with_parts(config: Config, options: RunOptions, fetcher: F, extractor: E) -> Self {
        Self {
            config,
            options,
            fetcher,
            extractor,
        }
    }

    /// Runs the full pipeline against the configured sinks
    ///
    /// The key-value stage uses the NATS bucket named in the configuration.
    pub async fn run(&self) -> Result<RunSummary, ScrapeError> {
        let kv = &self.config.kv;
        self.run_with_kv(|| VersionedKvSink::connect(kv)).await
    }

    /// Runs the full pipeline, opening the key-value session with `connect`
    ///
    /// The key-value stage only starts once every file artifact has been
    /// written, and `connect` is not called at all unless it is enabled. The
    /// session is closed whether or not replication succeeded; a replication
    /// error is logged and returned.
    pub async fn run_with_kv<B, C, Fut>(&self, connect: C) -> Result<RunSummary, ScrapeError>
    where
        B: KvBucket,
        C: FnOnce() -> Fut,
        Fut: Future<Output = SinkResult<VersionedKvSink<B>>>,
    {
        let start_time = Instant::now();

        let mut files = FileSink::new(&self.config.output.data_dir);
        let dataset = self.crawl(&mut files).await?;

        let mut summary = RunSummary {
            pages: dataset.pages,
            seed_records: dataset.seeds.len(),
            detail_records: dataset.joined.len(),
            kv_written: false,
        };

        if self.options.use_kv {
            let mut kv = connect().await.map_err(|e| {
                tracing::error!("Key-value store unavailable: {}", e);
                e
            })?;

            let result = self.replicate(&mut kv, &dataset).await;
            if let Err(e) = &result {
                tracing::error!("Key-value replication failed: {}", e);
            }

            let closed = kv.close().await;
            result?;
            closed?;
            summary.kv_written = true;
        }

        tracing::info!(
            "Run completed: {} pages, {} records in {:?}",
            summary.pages,
            summary.detail_records,
            start_time.elapsed()
        );

        Ok(summary)
    }

    /// Walks the directory and writes the file artifacts to `sink`
    ///
    /// Returns the dataset so it can be replicated to a second sink.
    pub async fn crawl<S: Sink + ?Sized>(&self, sink: &mut S) -> Result<Dataset, ScrapeError> {
        let layout = FILE_LAYOUT;

        // Stage 1: fetch every listing page before parsing any of them
        let walker = PageWalker::new(
            &self.fetcher,
            &self.extractor,
            self.config.crawler.max_pages,
        );
        let pages = walker.walk(&self.config.site.seed_url).await?;

        // Stage 2: parse in page order
        let mut seeds = Vec::new();
        let mut seed_by_url: HashMap<String, usize> = HashMap::new();
        for page in &pages {
            for seed in self.extractor.parse_list_page(&page.url, &page.text())? {
                if seed_by_url.contains_key(&seed.detail_url) {
                    tracing::warn!(
                        "Duplicate detail URL {} for '{}', keeping the first record",
                        seed.detail_url,
                        seed.name
                    );
                    continue;
                }
                seed_by_url.insert(seed.detail_url.clone(), seeds.len());
                seeds.push(seed);
            }
        }
        tracing::info!("Parsed {} companies from {} pages", seeds.len(), pages.len());

        let record_keys = assign_record_keys(&seeds);

        // Stage 3: checkpoint before the detail fan-out
        sink.save(layout.companies, &layout.encode(&seeds)?).await?;

        // Stage 4: detail pages, consumed in completion order
        let urls: Vec<String> = seeds.iter().map(|s| s.detail_url.clone()).collect();
        let mut details_by_url: HashMap<String, DetailRecord> = HashMap::with_capacity(urls.len());
        let mut results = Box::pin(fetch_many(
            &self.fetcher,
            urls,
            self.config.crawler.max_concurrency,
        ));

        while let Some((url, result)) = results.next().await {
            let response = result?.error_for_status(&url)?;
            let seed = seed_by_url
                .get(&url)
                .map(|&i| &seeds[i])
                .ok_or_else(|| ScrapeError::Parse {
                    url: url.clone(),
                    message: "detail URL does not belong to any listing row".to_string(),
                })?;

            let details = self.extractor.parse_detail_page(&url, &response.text())?;
            let key = record_key(&record_keys, &url)?;
            sink.save(&layout.detail(key), &layout.encode(&details)?)
                .await?;

            tracing::debug!(
                "Stored details for {} ({}/{})",
                seed.name,
                details_by_url.len() + 1,
                seeds.len()
            );
            details_by_url.insert(url, details);
        }
        drop(results);

        // Stage 5: join in listing order
        let joined: Vec<JoinedRecord> = seeds
            .iter()
            .filter_map(|seed| {
                details_by_url
                    .remove(&seed.detail_url)
                    .map(|details| JoinedRecord::new(seed.clone(), details))
            })
            .collect();
        sink.save(layout.everything, &layout.encode(&joined)?).await?;
        tracing::info!("Wrote {} joined records", joined.len());

        Ok(Dataset {
            pages: pages.len(),
            seeds,
            joined,
            record_keys,
        })
    }

    /// Writes an already collected dataset to a key-value sink
    pub async fn replicate<S: Sink + ?Sized>(
        &self,
        sink: &mut S,
        dataset: &Dataset,
    ) -> Result<(), ScrapeError> {
        write_dataset(sink, &KV_LAYOUT, dataset).await
    }
}

/// Writes companies, per-record details and the joined set, in that order
async fn write_dataset<S: Sink + ?Sized>(
    sink: &mut S,
    layout: &KeyLayout,
    dataset: &Dataset,
) -> Result<(), ScrapeError> {
    sink.save(layout.companies, &layout.encode(&dataset.seeds)?)
        .await?;

    for record in &dataset.joined {
        let key = layout.detail(dataset.record_key(&record.seed)?);
        sink.save(&key, &layout.encode(&record.details)?).await?;
    }

    sink.save(layout.everything, &layout.encode(&dataset.joined)?)
        .await?;

    tracing::info!(
        "Replicated {} records to {}",
        dataset.joined.len(),
        layout.everything
    );
    Ok(())
}

/// Runs a complete crawl with the network fetcher and on-disk cache
///
/// # Example
///
/// ```no_run
/// use dirscrape::config::{Config, RunOptions};
/// use dirscrape::crawler::run_crawl;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let summary = run_crawl(Config::default(), RunOptions::default()).await?;
/// println!("{} records", summary.detail_records);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: Config, options: RunOptions) -> Result<RunSummary, ScrapeError> {
    let coordinator = Coordinator::new(config, options)?;
    coordinator.run().await
}
