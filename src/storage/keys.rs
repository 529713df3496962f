//! Artifact key naming shared by both sinks

use crate::records::SeedRecord;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Replaces every character outside `[A-Za-z0-9_-]` with `_`
///
/// An empty name maps to `_` so it still yields a usable file name and
/// key-value key.
///
/// # Examples
///
/// ```
/// use dirscrape::storage::sanitize_key;
///
/// assert_eq!(sanitize_key("Be ta/Co"), "Be_ta_Co");
/// ```
pub fn sanitize_key(name: &str) -> String {
    if name.is_empty() {
        return "_".to_string();
    }

    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Assigns each record a unique per-record key, in seed order
///
/// Records are keyed by their detail URL. When two names sanitize to the
/// same key, later ones get `_2`, `_3`, ... appended and a warning is logged.
/// The stems of the fixed artifacts (`_companies`, `_everything`) are never
/// handed out, so no record can overwrite them.
pub fn assign_record_keys(seeds: &[SeedRecord]) -> HashMap<String, String> {
    let mut taken: HashSet<String> = FILE_LAYOUT
        .fixed_stems()
        .map(str::to_string)
        .collect();
    let mut keys = HashMap::with_capacity(seeds.len());

    for seed in seeds {
        let base = sanitize_key(&seed.name);
        let mut key = base.clone();
        let mut n = 2;
        while taken.contains(&key) {
            key = format!("{}_{}", base, n);
            n += 1;
        }

        if key != base {
            tracing::warn!(
                "Name '{}' collides with an existing key; storing as '{}'",
                seed.name,
                key
            );
        }

        taken.insert(key.clone());
        keys.insert(seed.detail_url.clone(), key);
    }

    keys
}

/// Key names and encoding used by one sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyLayout {
    pub companies: &'static str,
    pub everything: &'static str,
    detail_prefix: &'static str,
    detail_suffix: &'static str,
    pretty: bool,
}

/// File sink layout: `_companies.json`, `<name>.json`, `_everything.json`
pub const FILE_LAYOUT: KeyLayout = KeyLayout {
    companies: "_companies.json",
    everything: "_everything.json",
    detail_prefix: "",
    detail_suffix: ".json",
    pretty: true,
};

/// Key-value layout: `companies`, `details.<name>`, `everything`
pub const KV_LAYOUT: KeyLayout = KeyLayout {
    companies: "companies",
    everything: "everything",
    detail_prefix: "details.",
    detail_suffix: "",
    pretty: false,
};

impl KeyLayout {
    /// Record keys that would land on the companies or everything artifact
    pub fn fixed_stems(&self) -> impl Iterator<Item = &'static str> {
        let prefix = self.detail_prefix;
        let suffix = self.detail_suffix;
        [self.companies, self.everything].into_iter().filter_map(move |key| {
            key.strip_prefix(prefix)
                .and_then(|rest| rest.strip_suffix(suffix))
        })
    }

    /// Full key for a record's detail artifact
    pub fn detail(&self, record_key: &str) -> String {
        format!("{}{}{}", self.detail_prefix, record_key, self.detail_suffix)
    }

    /// Serializes a value the way this sink stores it
    pub fn encode<T: Serialize + ?Sized>(&self, value: &T) -> serde_json::Result<Vec<u8>> {
        if self.pretty {
            serde_json::to_vec_pretty(value)
        } else {
            serde_json::to_vec(value)
        }
    }
}
