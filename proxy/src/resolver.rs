use axum::{
    body::Body,
    extract::State,
    http::{HeaderName, HeaderValue, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use capro_common::{CacheEntry, CacheKey, CacheStatus, CaproError, Result, X_CACHE_HEADER};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::origin::OriginFetcher;
use crate::store::CacheStore;

/// Resolves request targets against the cache, falling back to the origin.
#[derive(Clone)]
pub struct Proxy {
    origin: Arc<str>,
    store: CacheStore,
    fetcher: OriginFetcher,
}

impl Proxy {
    pub fn new(origin: &str, store: CacheStore, fetcher: OriginFetcher) -> Self {
        Self {
            origin: Arc::from(origin.trim_end_matches('/')),
            store,
            fetcher,
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// Router that sends every method and path to [`handle`].
    pub fn router(self) -> Router {
        Router::new().fallback(handle).with_state(self)
    }

    /// Looks `target` up in the cache and fetches it from the origin on a miss.
    ///
    /// A miss commits the fetched entry before returning it. Failing to
    /// persist that commit is logged and does not fail the request.
    pub async fn resolve(&self, target: &str) -> Result<(CacheStatus, CacheEntry)> {
        let key = CacheKey::new(&self.origin, target);

        if let Some(entry) = self.store.get(&key).await {
            info!(uri = target, "Cache hit");
            return Ok((CacheStatus::Hit, entry));
        }

        info!(uri = target, "Cache miss");
        let entry = self.fetcher.fetch(key.as_str()).await?;

        if let Err(e) = self.store.put(key, entry.clone()).await {
            warn!(uri = target, error = %e, "Serving uncommitted response, cache snapshot not updated");
        }

        Ok((CacheStatus::Miss, entry))
    }
}

/// Fallback handler: every request is treated as a GET of its target.
pub async fn handle(State(proxy): State<Proxy>, uri: Uri) -> Response {
    let target = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");

    match proxy.resolve(target).await {
        Ok((status, entry)) => {
            debug!(uri = target, cache = %status, status = entry.status, bytes = entry.body.len(), "Replaying response");
            replay(entry, status)
        }
        Err(e) => {
            if e.is_upstream() {
                warn!(uri = target, error = %e, "Origin fetch failed");
            } else {
                error!(uri = target, error = %e, "Request resolution failed");
            }
            GatewayError(e).into_response()
        }
    }
}

/// Writes a cached entry back out, tagged with its cache status.
fn replay(entry: CacheEntry, status: CacheStatus) -> Response {
    let CacheEntry { status: code, body, headers: stored } = entry;

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = StatusCode::from_u16(code).unwrap_or(StatusCode::OK);

    let headers = response.headers_mut();
    for (name, value) in &stored {
        match (HeaderName::try_from(name.as_str()), HeaderValue::try_from(value.as_str())) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => debug!(header = %name, "Skipping cached header that is not valid HTTP"),
        }
    }
    headers.insert(X_CACHE_HEADER, HeaderValue::from_static(status.as_str()));

    response
}

/// A failed resolution, rendered as a gateway error for the client.
struct GatewayError(CaproError);

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let reason = status.canonical_reason().unwrap_or("Error");

        (
            status,
            [(X_CACHE_HEADER, CacheStatus::Miss.as_str())],
            format!("{}: {}\n", reason, self.0),
        )
            .into_response()
    }
}
