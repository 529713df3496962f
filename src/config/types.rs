use serde::Deserialize;

/// Main configuration structure for dirscrape
///
/// Every section is optional; missing keys fall back to the values used for
/// the Idaho manufacturer directory.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub site: SiteConfig,
    pub crawler: CrawlerConfig,
    pub output: OutputConfig,
    pub kv: KvConfig,
}

/// Directory site configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SiteConfig {
    /// Base URL that relative detail links are resolved against
    pub base_url: String,

    /// First listing page of the directory
    pub seed_url: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://connect.idmfg.org".to_string(),
            seed_url: "https://connect.idmfg.org/simple-search?searchterm=&page=1".to_string(),
        }
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Maximum number of detail pages fetched concurrently
    pub max_concurrency: usize,

    /// Upper bound on the number of listing pages walked
    pub max_pages: usize,

    /// Per-request timeout enforced by the HTTP client (seconds)
    pub request_timeout_secs: u64,

    /// User-Agent header sent with every request
    pub user_agent: String,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: crate::crawler::DEFAULT_CONCURRENCY,
            max_pages: 200,
            request_timeout_secs: 30,
            user_agent: format!("dirscrape/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Folder receiving the JSON artifacts
    pub data_dir: String,

    /// Folder holding cached HTTP responses
    pub cache_dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            data_dir: "./data".to_string(),
            cache_dir: ".cache".to_string(),
        }
    }
}

/// NATS key-value store configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct KvConfig {
    /// Bucket name; created on first connect if absent
    pub bucket: String,

    /// NATS server address (overridden by `NATS_SERVER`)
    pub server: String,

    /// Optional credentials file (overridden by `NATS_CREDS_FILE`)
    pub creds_file: Option<String>,
}

impl Default for KvConfig {
    fn default() -> Self {
        Self {
            bucket: "IDAHO_MFG".to_string(),
            server: "localhost".to_string(),
            creds_file: None,
        }
    }
}

/// Per-run switches chosen on the command line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Also persist to the versioned key-value store
    pub use_kv: bool,

    /// Treat every cache miss as fatal instead of hitting the network
    pub strict_cache: bool,
}
