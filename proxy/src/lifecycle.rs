// Entry points the CLI drives: serving and clearing the cache

use capro_common::{CaproError, ProxyConfig, Result};
use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::{net::TcpListener, signal};
use tracing::{error, info};

use crate::origin::OriginFetcher;
use crate::resolver::Proxy;
use crate::store::CacheStore;

/// Validates `config`, loads the cache and builds a ready-to-serve proxy.
pub async fn build_proxy(config: &ProxyConfig) -> Result<Proxy> {
    config.validate()?;

    let store = CacheStore::new(config.cache_file.clone());
    store.load().await;

    let fetcher = OriginFetcher::new(config.fetch_timeout)?;
    Ok(Proxy::new(config.origin_base(), store, fetcher))
}

/// Serves on `0.0.0.0:<port>` until the process receives Ctrl+C or SIGTERM.
pub async fn serve(config: ProxyConfig) -> Result<()> {
    let proxy = build_proxy(&config).await?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await.map_err(|e| {
        error!(address = %addr, error = %e, "Failed to bind listener");
        CaproError::Io(e)
    })?;

    info!(address = %addr, origin = proxy.origin(), "Starting proxy server");
    serve_listener(listener, proxy, shutdown_signal()).await
}

/// Serves `proxy` on an already bound listener until `shutdown` resolves.
pub async fn serve_listener<F>(listener: TcpListener, proxy: Proxy, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, proxy.router())
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Proxy server stopped");
    Ok(())
}

/// Empties the cache file at `path` without starting a server.
pub async fn clear_cache(path: impl Into<PathBuf>) -> Result<()> {
    CacheStore::new(path).clear().await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}
