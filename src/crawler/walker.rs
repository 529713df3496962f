//! Sequential pagination over the directory listing
//!
//! Pages are fetched one after another, following each page's "next" link,
//! and are all buffered before anything is parsed into records.

use crate::crawler::fetcher::{Fetch, Request};
use crate::crawler::parser::RecordExtractor;
use crate::ScrapeError;
use bytes::Bytes;
use std::collections::HashSet;

/// One fetched listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub url: String,
    pub body: Bytes,
}

impl Page {
    pub fn text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// Follows "next page" links from a seed URL
pub struct PageWalker<'a, F: ?Sized, E: ?Sized> {
    fetcher: &'a F,
    extractor: &'a E,
    max_pages: usize,
}

impl<'a, F, E> PageWalker<'a, F, E>
where
    F: Fetch + ?Sized,
    E: RecordExtractor + ?Sized,
{
    pub fn new(fetcher: &'a F, extractor: &'a E, max_pages: usize) -> Self {
        Self {
            fetcher,
            extractor,
            max_pages,
        }
    }

    /// Fetches every page of the chain starting at `seed_url`, in order
    ///
    /// # Errors
    ///
    /// * `ScrapeError::HttpStatus` - a page answered with a non-2xx status
    /// * `ScrapeError::PaginationCycle` - a "next" link pointed at a page
    ///   already visited
    /// * `ScrapeError::PaginationLimit` - the chain is longer than `max_pages`
    /// * fetch and parse errors propagate unchanged
    pub async fn walk(&self, seed_url: &str) -> Result<Vec<Page>, ScrapeError> {
        let mut pages = Vec::new();
        let mut visited = HashSet::new();
        let mut next = Some(seed_url.to_string());

        while let Some(url) = next.take() {
            if !visited.insert(url.clone()) {
                return Err(ScrapeError::PaginationCycle { url });
            }

            if pages.len() >= self.max_pages {
                return Err(ScrapeError::PaginationLimit {
                    limit: self.max_pages,
                });
            }

            let response = self
                .fetcher
                .fetch(&Request::get(url.as_str()))
                .await?
                .error_for_status(&url)?;

            next = self
                .extractor
                .next_page_link(&url, &response.text())?;

            tracing::debug!("Fetched listing page {} ({})", pages.len() + 1, url);
            pages.push(Page {
                url,
                body: response.body,
            });
        }

        tracing::info!("Walked {} listing pages", pages.len());
        Ok(pages)
    }
}
