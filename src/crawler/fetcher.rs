//! HTTP fetcher implementation
//!
//! This module defines the `Fetch` abstraction the rest of the pipeline is
//! written against, plus the direct network implementation:
//! - Building the HTTP client with the configured user agent and timeouts
//! - GET requests with explicit query parameters
//! - Transport error attribution to the requested URL

use crate::config::CrawlerConfig;
use crate::ScrapeError;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Method};
use std::borrow::Cow;
use std::time::Duration;

/// One logical HTTP request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub url: String,
    /// Query parameters sent in addition to any already present in `url`
    pub params: Vec<(String, String)>,
}

impl Request {
    /// A GET request without extra parameters
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            params: Vec::new(),
        }
    }

    /// Adds a query parameter
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }
}

/// Status code and raw body of a completed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: Bytes,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// True for any 2xx status
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body decoded as UTF-8, replacing invalid sequences
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Turns a non-2xx response into `ScrapeError::HttpStatus`
    pub fn error_for_status(self, url: &str) -> Result<Self, ScrapeError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ScrapeError::HttpStatus {
                url: url.to_string(),
                status: self.status,
            })
        }
    }
}

/// Anything that can turn a [`Request`] into a [`Response`]
///
/// Implemented by [`HttpFetcher`] for real network access and by
/// [`crate::cache::CachedFetcher`], which wraps another fetcher.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response, ScrapeError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The crawler configuration (user agent, timeout)
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use dirscrape::config::CrawlerConfig;
/// use dirscrape::crawler::build_http_client;
///
/// let client = build_http_client(&CrawlerConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &CrawlerConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Direct network fetcher
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_config(config: &CrawlerConfig) -> Result<Self, ScrapeError> {
        let client = build_http_client(config).map_err(|source| ScrapeError::Http {
            url: String::new(),
            source,
        })?;
        Ok(Self::new(client))
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response, ScrapeError> {
        let attribute = |source: reqwest::Error| ScrapeError::Http {
            url: request.url.clone(),
            source,
        };

        let mut builder = self.client.request(request.method.clone(), &request.url);
        if !request.params.is_empty() {
            builder = builder.query(&request.params);
        }

        let response = builder.send().await.map_err(attribute)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(attribute)?;

        tracing::debug!("{} {} -> {}", request.method, request.url, status);

        Ok(Response { status, body })
    }
}
