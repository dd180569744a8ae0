use capro_common::{ProxyConfig, Result};
use tracing::info;

pub async fn execute(config: ProxyConfig) -> Result<()> {
    info!(
        port = config.port,
        origin = %config.origin,
        cache_file = %config.cache_file.display(),
        timeout = ?config.fetch_timeout,
        "Starting proxy server"
    );

    capro_proxy::serve(config).await
}
