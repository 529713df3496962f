//! Configuration module for dirscrape
//!
//! Settings come from an optional TOML file, then environment overrides for
//! the NATS connection. Per-run switches live in [`RunOptions`].
//!
//! # Example
//!
//! ```no_run
//! use dirscrape::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("dirscrape.toml")).unwrap();
//! println!("Writing artifacts to {}", config.output.data_dir);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, KvConfig, OutputConfig, RunOptions, SiteConfig};

// Re-export parser functions
pub use parser::{
    apply_env_overrides, compute_config_hash, load_config, load_config_with_hash, load_from_env,
    resolve_config_path, CONFIG_PATH_ENV, DEFAULT_CONFIG_FILE,
};
pub use validation::validate;
