use bytesize::ByteSize;
use capro_common::Result;
use capro_proxy::CacheStore;
use std::path::PathBuf;

pub async fn execute(cache_file: PathBuf) -> Result<()> {
    let store = CacheStore::new(cache_file);
    store.load().await;

    let stats = store.stats().await;

    println!("Cache Statistics:");
    println!("  File: {}", store.path().display());
    println!("  Entries: {}", stats.entries);
    println!("  Body size: {}", ByteSize(stats.body_bytes));

    Ok(())
}
