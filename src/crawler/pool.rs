//! Bounded concurrent fan-out over many URLs
//!
//! Results come back in completion order, each tagged with the URL it
//! belongs to. A failed request only affects its own item.

use crate::crawler::fetcher::{Fetch, Request, Response};
use crate::ScrapeError;
use futures::stream::{self, Stream, StreamExt};

/// Default number of requests kept in flight
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Fetches every URL with at most `max_concurrency` requests in flight
///
/// The stream yields one `(url, result)` per input URL, in the order the
/// requests finish. A `max_concurrency` of zero is treated as one.
///
/// # Example
///
/// ```no_run
/// use dirscrape::crawler::{fetch_many, HttpFetcher};
/// use dirscrape::config::CrawlerConfig;
/// use futures::StreamExt;
///
/// # async fn example() -> Result<(), dirscrape::ScrapeError> {
/// let fetcher = HttpFetcher::from_config(&CrawlerConfig::default())?;
/// let urls = vec!["https://example.com/a".to_string(), "https://example.com/b".to_string()];
/// let mut results = fetch_many(&fetcher, urls, 2);
/// while let Some((url, response)) = results.next().await {
///     println!("{} -> {}", url, response?.status);
/// }
/// # Ok(())
/// # }
/// ```
pub fn fetch_many<'a, F>(
    fetcher: &'a F,
    urls: Vec<String>,
    max_concurrency: usize,
) -> impl Stream<Item = (String, Result<Response, ScrapeError>)> + Send + 'a
where
    F: Fetch + ?Sized,
{
    stream::iter(urls)
        .map(move |url| async move {
            let result = fetcher.fetch(&Request::get(url.as_str())).await;
            (url, result)
        })
        .buffer_unordered(max_concurrency.max(1))
}
