use crate::crawler::Request;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::Method;
use sha2::{Digest, Sha256};
use std::fmt;
use url::{form_urlencoded, Url};

/// Characters left as-is in a key; everything else is percent-encoded
const KEY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'~');

/// Keys longer than this are truncated and suffixed with a digest
const MAX_KEY_LEN: usize = 200;

/// Length of the readable prefix kept for an over-long key
const TRUNCATED_PREFIX_LEN: usize = 120;

/// Identifier of one logical HTTP request in the response cache
///
/// Derived from the method, the URL without its fragment, and the union of
/// the URL's own query pairs with any explicit parameters, sorted. The result
/// is case-folded and percent-encoded so it is usable as a file name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Computes the key for a method, URL and parameter list
    ///
    /// # Examples
    ///
    /// ```
    /// use dirscrape::cache::CacheKey;
    /// use reqwest::Method;
    ///
    /// let a = CacheKey::new(&Method::GET, "https://example.com/s", &[
    ///     ("page".to_string(), "2".to_string()),
    ///     ("q".to_string(), "x".to_string()),
    /// ]);
    /// let b = CacheKey::new(&Method::GET, "https://example.com/s?q=x", &[
    ///     ("page".to_string(), "2".to_string()),
    /// ]);
    /// assert_eq!(a, b);
    /// ```
    pub fn new(method: &Method, url: &str, params: &[(String, String)]) -> Self {
        let normalized = normalize_request_url(url, params);
        let folded = normalized.to_lowercase().replace(' ', "_");
        let encoded = utf8_percent_encode(&folded, KEY_ENCODE_SET).to_string();
        let key = format!("{}_{}", method.as_str(), encoded);

        if key.len() <= MAX_KEY_LEN {
            return Self(key);
        }

        let digest = hex::encode(Sha256::digest(key.as_bytes()));
        // Percent-encoded output is pure ASCII, so byte slicing is safe
        Self(format!("{}_{}", &key[..TRUNCATED_PREFIX_LEN], digest))
    }

    /// Computes the key for a [`Request`]
    pub fn for_request(request: &Request) -> Self {
        Self::new(&request.method, &request.url, &request.params)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Rebuilds `url` with its query pairs and `params` merged and sorted
fn normalize_request_url(url: &str, params: &[(String, String)]) -> String {
    let mut pairs: Vec<(String, String)> = params.to_vec();

    let base = match Url::parse(url) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            pairs.extend(
                parsed
                    .query_pairs()
                    .map(|(k, v)| (k.into_owned(), v.into_owned())),
            );
            parsed.set_query(None);
            parsed.to_string()
        }
        // Unparseable input is still keyed deterministically, just not normalized
        Err(_) => url.to_string(),
    };

    if pairs.is_empty() {
        return base;
    }

    pairs.sort();
    let query = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(&pairs)
        .finish();

    format!("{}?{}", base, query)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_key_is_deterministic() {
        let p = params(&[("searchterm", ""), ("page", "3")]);
        let a = CacheKey::new(&Method::GET, "https://example.com/simple-search", &p);
        let b = CacheKey::new(&Method::GET, "https://example.com/simple-search", &p);
        assert_eq!(a, b);
    }

    #[test]
    fn test_param_insertion_order_is_irrelevant() {
        let a = CacheKey::new(
            &Method::GET,
            "https://example.com/s",
            &params(&[("b", "2"), ("a", "1"), ("c", "3")]),
        );
        let b = CacheKey::new(
            &Method::GET,
            "https://example.com/s",
            &params(&[("c", "3"), ("a", "1"), ("b", "2")]),
        );
        assert_eq!(a, b);
    }

    #[test]
    fn test_inline_query_matches_explicit_params() {
        let inline = CacheKey::new(&Method::GET, "https://example.com/s?page=2&q=x", &[]);
        let explicit = CacheKey::new(
            &Method::GET,
            "https://example.com/s",
            &params(&[("q", "x"), ("page", "2")]),
        );
        assert_eq!(inline, explicit);
    }

    #[test]
    fn test_method_distinguishes_keys() {
        let get = CacheKey::new(&Method::GET, "https://example.com/", &[]);
        let head = CacheKey::new(&Method::HEAD, "https://example.com/", &[]);
        assert_ne!(get, head);
        assert!(get.as_str().starts_with("GET_"));
    }

    #[test]
    fn test_key_is_case_folded_and_file_safe() {
        let upper = CacheKey::new(&Method::GET, "https://Example.com/Company/ACME Inc?Q=1", &[]);
        let lower = CacheKey::new(&Method::GET, "https://example.com/company/acme inc?q=1", &[]);
        assert_eq!(upper, lower);

        let s = upper.as_str();
        assert!(!s.contains('/'));
        assert!(!s.contains(':'));
        assert!(!s.contains('?'));
        assert!(!s.contains(' '));
    }

    #[test]
    fn test_fragment_is_ignored() {
        let a = CacheKey::new(&Method::GET, "https://example.com/page#top", &[]);
        let b = CacheKey::new(&Method::GET, "https://example.com/page", &[]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_long_keys_are_bounded() {
        let long = format!("https://example.com/{}", "segment/".repeat(60));
        let key = CacheKey::new(&Method::GET, &long, &[]);
        assert!(key.as_str().len() <= TRUNCATED_PREFIX_LEN + 1 + 64);

        let other = format!("https://example.com/{}x", "segment/".repeat(60));
        assert_ne!(key, CacheKey::new(&Method::GET, &other, &[]));
    }
}
