//! Crawler module for directory page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - The `Fetch` abstraction and its HTTP implementation
//! - Bounded-concurrency fan-out over detail pages
//! - Sequential pagination over the listing
//! - HTML extraction of company records
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
mod parser;
mod pool;
mod walker;

pub use coordinator::{run_crawl, Coordinator, Dataset, RunSummary};
pub use fetcher::{build_http_client, Fetch, HttpFetcher, Request, Response};
pub use parser::{field_key, DirectoryExtractor, RecordExtractor};
pub use pool::{fetch_many, DEFAULT_CONCURRENCY};
pub use walker::{Page, PageWalker};
