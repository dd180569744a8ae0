use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::error::{CaproError, Result};
use crate::schema::{DEFAULT_CACHE_FILE, DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_ORIGIN, DEFAULT_PORT};

/// Settings the proxy core runs with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    pub port: u16,
    pub origin: String,
    pub cache_file: PathBuf,
    pub fetch_timeout: Duration,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            origin: DEFAULT_ORIGIN.to_string(),
            cache_file: PathBuf::from(DEFAULT_CACHE_FILE),
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
        }
    }
}

impl ProxyConfig {
    /// Checks that the origin is an absolute http(s) URL and the timeout is usable.
    pub fn validate(&self) -> Result<()> {
        let origin = self.origin.trim();
        if origin.is_empty() {
            return Err(CaproError::Config("origin is required".to_string()));
        }

        let url = Url::parse(origin)
            .map_err(|e| CaproError::Config(format!("Invalid origin '{}': {}", origin, e)))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(CaproError::Config(format!(
                "Origin must use http or https, got '{}'",
                url.scheme()
            )));
        }

        if url.host_str().is_none() {
            return Err(CaproError::Config(format!("Origin '{}' has no host", origin)));
        }

        if url.query().is_some() || url.fragment().is_some() {
            return Err(CaproError::Config(format!(
                "Origin '{}' must not carry a query or fragment",
                origin
            )));
        }

        if self.fetch_timeout.is_zero() {
            return Err(CaproError::Config("fetch timeout must be greater than zero".to_string()));
        }

        Ok(())
    }

    /// Origin with surrounding whitespace and trailing slashes removed.
    pub fn origin_base(&self) -> &str {
        self.origin.trim().trim_end_matches('/')
    }
}
