//! dirscrape: a manufacturer directory scraper
//!
//! This crate walks a paginated directory listing, extracts company records
//! from list and detail pages, and persists them to a local file store and,
//! optionally, to a versioned NATS key-value bucket.

pub mod cache;
pub mod config;
pub mod crawler;
pub mod records;
pub mod storage;

use thiserror::Error;

/// Main error type for dirscrape operations
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Cache miss for {url} while network access is disabled")]
    CacheMiss { url: String },

    #[error("Cache error: {0}")]
    Cache(#[from] cache::CacheError),

    #[error("HTML parse error for {url}: {message}")]
    Parse { url: String, message: String },

    #[error("Pagination cycle detected at {url}")]
    PaginationCycle { url: String },

    #[error("Pagination exceeded {limit} pages")]
    PaginationLimit { limit: usize },

    #[error("Sink error: {0}")]
    Sink(#[from] storage::SinkError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for dirscrape operations
pub type Result<T> = std::result::Result<T, ScrapeError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::{Config, RunOptions};
pub use crawler::{run_crawl, Coordinator, RunSummary};
pub use records::{DetailRecord, JoinedRecord, SeedRecord};
