use capro_common::{CacheEntry, CaproError, Result};
use reqwest::{header::HeaderValue, Client, ClientBuilder, StatusCode};
use std::time::Duration;
use tracing::{debug, error, warn};

const MAX_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Fetches cache misses from the origin.
#[derive(Clone)]
pub struct OriginFetcher {
    client: Client,
}

impl OriginFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = ClientBuilder::new()
            .connect_timeout(timeout.min(MAX_CONNECT_TIMEOUT))
            .timeout(timeout)
            .use_rustls_tls()
            .user_agent(concat!("capro/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                error!(error = %e, "failed to build http client");
                CaproError::Config(format!("HTTP client build failed: {}", e))
            })?;

        Ok(Self { client })
    }

    /// Single GET, no retries. Anything but 200 is an error.
    pub async fn fetch(&self, url: &str) -> Result<CacheEntry> {
        let response = self.client.get(url).send().await.map_err(|e| {
            warn!(url = url, error = %e, "origin request failed");
            Self::classify(&e)
        })?;

        let status = response.status();
        if status != StatusCode::OK {
            warn!(url = url, status = status.as_u16(), "origin returned non-success status");
            return Err(CaproError::UpstreamStatus(status.as_u16()));
        }

        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| match header_text(value) {
                Some(text) => Some((name.as_str().to_string(), text.to_string())),
                None => {
                    debug!(url = url, header = %name, "Not caching header with non-UTF-8 value");
                    None
                }
            })
            .collect();

        let body = response.bytes().await.map_err(|e| {
            warn!(url = url, error = %e, "failed to read origin response body");
            Self::classify(&e)
        })?;

        debug!(url = url, bytes = body.len(), headers = headers.len(), "origin response received");
        Ok(CacheEntry::from_parts(status.as_u16(), headers, body.to_vec()))
    }

    /// Maps a reqwest failure to an upstream error without leaking internals.
    fn classify(error: &reqwest::Error) -> CaproError {
        if error.is_timeout() {
            CaproError::UpstreamTimeout
        } else if error.is_connect() {
            CaproError::Upstream("connection refused or unreachable".to_string())
        } else if error.is_body() || error.is_decode() {
            CaproError::Upstream("response body error".to_string())
        } else if error.is_redirect() {
            CaproError::Upstream("too many redirects".to_string())
        } else if error.is_builder() {
            CaproError::Upstream("invalid upstream url".to_string())
        } else {
            CaproError::Upstream("network error".to_string())
        }
    }
}

// Cached headers are stored as text, so values that aren't UTF-8 are left out
// rather than rewritten.
fn header_text(value: &HeaderValue) -> Option<&str> {
    std::str::from_utf8(value.as_bytes()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_text_keeps_utf8_and_rejects_opaque_bytes() {
        assert_eq!(header_text(&HeaderValue::from_static("text/plain")), Some("text/plain"));
        assert_eq!(
            header_text(&HeaderValue::from_bytes("caf\u{e9}".as_bytes()).unwrap()),
            Some("caf\u{e9}")
        );
        assert_eq!(header_text(&HeaderValue::from_bytes(b"\xff\xfe").unwrap()), None);
    }

    #[tokio::test]
    async fn captures_ok_response() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/x")
            .with_status(200)
            .with_header("content-type", "text/plain")
            .with_header("x-custom", "yes")
            .with_body("hello")
            .create_async()
            .await;

        let fetcher = OriginFetcher::new(Duration::from_secs(5)).unwrap();
        let entry = fetcher.fetch(&format!("{}/x", server.url())).await.unwrap();

        mock.assert_async().await;
        assert_eq!(entry.status, 200);
        assert_eq!(entry.body, b"hello");
        assert_eq!(entry.headers["content-type"], "text/plain");
        assert_eq!(entry.headers["x-custom"], "yes");
        assert!(!entry.headers.contains_key("content-length"));
    }

    #[tokio::test]
    async fn non_ok_status_is_reported_not_cached() {
        let mut server = mockito::Server::new_async().await;
        server.mock("GET", "/missing").with_status(404).create_async().await;
        server.mock("GET", "/created").with_status(201).create_async().await;

        let fetcher = OriginFetcher::new(Duration::from_secs(5)).unwrap();

        let missing = fetcher.fetch(&format!("{}/missing", server.url())).await;
        assert!(matches!(missing, Err(CaproError::UpstreamStatus(404))));

        let created = fetcher.fetch(&format!("{}/created", server.url())).await;
        assert!(matches!(created, Err(CaproError::UpstreamStatus(201))));
    }

    #[tokio::test]
    async fn refused_connection_is_a_network_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let fetcher = OriginFetcher::new(Duration::from_secs(5)).unwrap();
        let result = fetcher.fetch(&format!("http://{}/x", addr)).await;

        assert!(matches!(result, Err(CaproError::Upstream(_))));
    }

    #[tokio::test]
    async fn silent_origin_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _accept = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let fetcher = OriginFetcher::new(Duration::from_millis(200)).unwrap();
        let result = fetcher.fetch(&format!("http://{}/slow", addr)).await;

        assert!(matches!(result, Err(CaproError::UpstreamTimeout)));
    }
}
