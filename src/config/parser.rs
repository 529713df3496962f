use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "DIRSCRAPE_CONFIG";

/// Config file picked up from the working directory when present
pub const DEFAULT_CONFIG_FILE: &str = "dirscrape.toml";

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use dirscrape::config::load_config;
///
/// let config = load_config(Path::new("dirscrape.toml")).unwrap();
/// println!("Concurrency: {}", config.crawler.max_concurrency);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at startup so two runs can be told apart by their settings.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

/// Picks the config file for this run
///
/// An explicit `DIRSCRAPE_CONFIG` always wins; otherwise `dirscrape.toml` is
/// used only if it exists in the working directory.
pub fn resolve_config_path<F>(lookup: F) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = lookup(CONFIG_PATH_ENV).filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(path));
    }

    let default = PathBuf::from(DEFAULT_CONFIG_FILE);
    default.exists().then_some(default)
}

/// Applies `NATS_SERVER` / `NATS_CREDS_FILE` on top of the file settings
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(server) = lookup("NATS_SERVER").filter(|s| !s.is_empty()) {
        config.kv.server = server;
    }

    if let Some(creds) = lookup("NATS_CREDS_FILE").filter(|s| !s.is_empty()) {
        config.kv.creds_file = Some(creds);
    }
}

/// Loads the effective configuration from the process environment
///
/// Returns the config and, when a file was read, the hash of its content.
pub fn load_from_env() -> Result<(Config, Option<String>), ConfigError> {
    let lookup = |key: &str| std::env::var(key).ok();

    let (mut config, hash) = match resolve_config_path(lookup) {
        Some(path) => {
            let (config, hash) = load_config_with_hash(&path)?;
            (config, Some(hash))
        }
        None => (Config::default(), None),
    };

    apply_env_overrides(&mut config, lookup);
    validate(&config)?;

    Ok((config, hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let config_content = r#"
[site]
base-url = "https://directory.example.com"
seed-url = "https://directory.example.com/search?page=1"

[crawler]
max-concurrency = 8
max-pages = 40

[output]
data-dir = "./out"

[kv]
bucket = "TEST_BUCKET"
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.site.base_url, "https://directory.example.com");
        assert_eq!(config.crawler.max_concurrency, 8);
        assert_eq!(config.crawler.max_pages, 40);
        assert_eq!(config.crawler.request_timeout_secs, 30);
        assert_eq!(config.output.data_dir, "./out");
        assert_eq!(config.output.cache_dir, ".cache");
        assert_eq!(config.kv.bucket, "TEST_BUCKET");
        assert_eq!(config.kv.server, "localhost");
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let file = create_temp_config("");
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.crawler.max_concurrency, 5);
        assert_eq!(config.kv.bucket, "IDAHO_MFG");
        assert_eq!(config.output.data_dir, "./data");
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/dirscrape.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let file = create_temp_config("[crawler]\nmax-concurrency = 0\n");
        let result = load_config(file.path());
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }

    #[test]
    fn test_compute_config_hash() {
        let file = create_temp_config("test content");

        let hash1 = compute_config_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("NATS_SERVER", "nats://kv.internal:4222"),
            ("NATS_CREDS_FILE", "/etc/nats/user.creds"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        apply_env_overrides(&mut config, |k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.kv.server, "nats://kv.internal:4222");
        assert_eq!(config.kv.creds_file.as_deref(), Some("/etc/nats/user.creds"));
    }

    #[test]
    fn test_empty_env_values_are_ignored() {
        let mut config = Config::default();
        apply_env_overrides(&mut config, |_| Some(String::new()));

        assert_eq!(config.kv.server, "localhost");
        assert!(config.kv.creds_file.is_none());
    }

    #[test]
    fn test_explicit_config_path_wins() {
        let path = resolve_config_path(|k| {
            (k == CONFIG_PATH_ENV).then(|| "/srv/dirscrape/custom.toml".to_string())
        });
        assert_eq!(path, Some(PathBuf::from("/srv/dirscrape/custom.toml")));
    }
}
