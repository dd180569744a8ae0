//! Caching reverse proxy core.
//!
//! Requests are resolved against a [`CacheStore`]; misses are fetched from the
//! origin by an [`OriginFetcher`], committed write-through to the JSON snapshot
//! and replayed with an `X-Cache: MISS` marker. Hits are replayed from memory
//! with `X-Cache: HIT` and never touch the network.

pub mod lifecycle;
pub mod origin;
pub mod resolver;
pub mod snapshot;
pub mod store;

pub use lifecycle::{build_proxy, clear_cache, serve, serve_listener};
pub use origin::OriginFetcher;
pub use resolver::Proxy;
pub use store::CacheStore;
