use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::schema::UNCACHED_HEADERS;

/// Header name to a single value. Repeated headers keep the last value seen.
pub type Headers = BTreeMap<String, String>;

/// Everything the proxy has cached, keyed by upstream URL.
pub type CacheTable = BTreeMap<CacheKey, CacheEntry>;

/// Upstream URL a request resolves to: origin base plus the request target.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Joins the origin (trailing slashes stripped) with the request target.
    /// The target is used as-is, query string included.
    pub fn new(origin: &str, target: &str) -> Self {
        Self(format!("{}{}", origin.trim_end_matches('/'), target))
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

impl From<&str> for CacheKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

/// One captured upstream response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub status: u16,
    #[serde(with = "body_encoding")]
    pub body: Vec<u8>,
    #[serde(default)]
    pub headers: Headers,
}

impl CacheEntry {
    /// Builds an entry from raw response parts, dropping connection-level
    /// headers and collapsing repeated names to their last value.
    pub fn from_parts<I, K, V>(status: u16, headers: I, body: Vec<u8>) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut flattened = Headers::new();
        for (name, value) in headers {
            let name = name.as_ref().to_ascii_lowercase();
            if UNCACHED_HEADERS.contains(&name.as_str()) {
                continue;
            }
            flattened.insert(name, value.into());
        }

        Self { status, body, headers: flattened }
    }
}

/// Aggregate numbers for a cache table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub body_bytes: u64,
}

impl CacheStats {
    pub fn of(table: &CacheTable) -> Self {
        Self {
            entries: table.len(),
            body_bytes: table.values().map(|e| e.body.len() as u64).sum(),
        }
    }
}

// Bodies are arbitrary bytes, so the snapshot stores them as base64 text.
mod body_encoding {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(body: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(body))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded.as_bytes()).map_err(serde::de::Error::custom)
    }
}
