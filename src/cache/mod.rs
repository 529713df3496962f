//! Disk-backed response cache
//!
//! Successful responses are stored one file per [`CacheKey`] as a status line
//! followed by the raw body. Entries never expire; clear the directory to
//! force a refetch. [`CachedFetcher`] puts the cache in front of any other
//! [`Fetch`] implementation.

mod key;

pub use key::CacheKey;

use crate::crawler::{Fetch, Request, Response};
use crate::ScrapeError;
use async_trait::async_trait;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

/// Errors raised by the response cache
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Corrupt cache entry {path}: {message}")]
    Corrupt { path: String, message: String },
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// On-disk store of successful responses
#[derive(Debug, Clone)]
pub struct ResponseCache {
    dir: PathBuf,
}

impl ResponseCache {
    /// Creates a cache rooted at `dir`; the directory is created on first write
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.as_str())
    }

    /// Reads the entry for `key`, if any
    pub fn get(&self, key: &CacheKey) -> CacheResult<Option<Response>> {
        let path = self.path_for(key);
        match std::fs::read(&path) {
            Ok(raw) => decode_entry(&raw)
                .map(Some)
                .map_err(|message| CacheError::Corrupt {
                    path: path.display().to_string(),
                    message,
                }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Stores `response` under `key`
    ///
    /// The entry is written to a temporary file in the cache directory and
    /// renamed into place, so readers never see a partial entry.
    pub fn put(&self, key: &CacheKey, response: &Response) -> CacheResult<()> {
        std::fs::create_dir_all(&self.dir)?;

        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&encode_entry(response))?;
        tmp.flush()?;
        tmp.persist(self.path_for(key)).map_err(|e| e.error)?;

        Ok(())
    }
}

/// Serializes an entry as `<status>\n<body>`
fn encode_entry(response: &Response) -> Vec<u8> {
    let mut out = format!("{}\n", response.status).into_bytes();
    out.extend_from_slice(&response.body);
    out
}

fn decode_entry(raw: &[u8]) -> Result<Response, String> {
    let newline = raw
        .iter()
        .position(|&b| b == b'\n')
        .ok_or_else(|| "missing status line".to_string())?;

    let status = std::str::from_utf8(&raw[..newline])
        .map_err(|e| e.to_string())?
        .trim()
        .parse::<u16>()
        .map_err(|e| format!("bad status line: {}", e))?;

    Ok(Response::new(status, raw[newline + 1..].to_vec()))
}

/// A fetcher that consults the [`ResponseCache`] before delegating
///
/// Only 2xx responses are stored, so failed requests are retried on the next
/// run. In strict mode a miss is a [`ScrapeError::CacheMiss`] and the inner
/// fetcher is never called.
pub struct CachedFetcher<F> {
    inner: F,
    cache: ResponseCache,
    strict: bool,
}

impl<F: Fetch> CachedFetcher<F> {
    pub fn new(inner: F, cache: ResponseCache, strict: bool) -> Self {
        Self {
            inner,
            cache,
            strict,
        }
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }
}

#[async_trait]
impl<F: Fetch> Fetch for CachedFetcher<F> {
    async fn fetch(&self, request: &Request) -> Result<Response, ScrapeError> {
        let key = CacheKey::for_request(request);

        if let Some(hit) = self.cache.get(&key)? {
            tracing::debug!("Cache hit for {}", request.url);
            return Ok(hit);
        }

        if self.strict {
            return Err(ScrapeError::CacheMiss {
                url: request.url.clone(),
            });
        }

        let response = self.inner.fetch(request).await?;

        if response.is_success() {
            self.cache.put(&key, &response)?;
        } else {
            tracing::debug!(
                "Not caching HTTP {} response for {}",
                response.status,
                request.url
            );
        }

        Ok(response)
    }
}
