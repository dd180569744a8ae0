use capro_common::Result;
use std::path::PathBuf;
use tracing::{error, info};

pub async fn execute(cache_file: PathBuf) -> Result<()> {
    info!("Clearing cache at: {}", cache_file.display());

    if let Err(e) = capro_proxy::clear_cache(&cache_file).await {
        error!("Error clearing cache: {}", e);
        return Err(e);
    }

    println!("Cache cleared");
    Ok(())
}
