use std::fmt;

// Wire constants shared by the proxy and the CLI

pub const X_CACHE_HEADER: &str = "x-cache";

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_ORIGIN: &str = "https://api.github.com";
pub const DEFAULT_CACHE_FILE: &str = "cache.json";
pub const DEFAULT_CONFIG_FILE: &str = "capro.toml";
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Headers that describe a single connection and are never cached or replayed.
/// `content-length` is recomputed for the replayed body.
pub const UNCACHED_HEADERS: &[&str] = &[
    "connection",
    "content-length",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Value of the `X-Cache` diagnostic header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hit => "HIT",
            Self::Miss => "MISS",
        }
    }
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_status_displays_header_value() {
        assert_eq!(CacheStatus::Hit.to_string(), "HIT");
        assert_eq!(format!("{}", CacheStatus::Miss), CacheStatus::Miss.as_str());
    }
}
