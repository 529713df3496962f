//! Record shapes produced while a directory entry moves through the pipeline
//!
//! A listing row becomes a [`SeedRecord`], its detail page a
//! [`DetailRecord`], and the two together a [`JoinedRecord`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A directory-listing entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedRecord {
    pub name: String,
    pub email: String,
    pub phone_number: String,
    pub address: String,
    pub website: String,
    pub products_manufactured: String,

    /// Absolute URL of the entry's detail page; unique within a run
    pub detail_url: String,
}

/// Field-name to field-value pairs scraped from a detail page
pub type DetailRecord = BTreeMap<String, String>;

/// A seed record with its detail fields attached under `details`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinedRecord {
    #[serde(flatten)]
    pub seed: SeedRecord,
    pub details: DetailRecord,
}

impl JoinedRecord {
    pub fn new(seed: SeedRecord, details: DetailRecord) -> Self {
        Self { seed, details }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed() -> SeedRecord {
        SeedRecord {
            name: "Acme".to_string(),
            email: "sales@acme.test".to_string(),
            phone_number: "208-555-0100".to_string(),
            address: "1 Main St, Boise, ID".to_string(),
            website: "https://acme.test".to_string(),
            products_manufactured: "Anvils".to_string(),
            detail_url: "https://directory.test/company/acme".to_string(),
        }
    }

    #[test]
    fn test_joined_record_flattens_seed_fields() {
        let mut details = DetailRecord::new();
        details.insert("employees".to_string(), "12".to_string());

        let value = serde_json::to_value(JoinedRecord::new(seed(), details)).unwrap();

        assert_eq!(value["name"], "Acme");
        assert_eq!(value["detail_url"], "https://directory.test/company/acme");
        assert_eq!(value["details"]["employees"], "12");
        assert!(value.get("seed").is_none());
    }
}
