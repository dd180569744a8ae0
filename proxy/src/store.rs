use capro_common::{CacheEntry, CacheKey, CacheStats, CacheTable, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::snapshot::Snapshot;

/// Cache table shared by all request handlers, persisted write-through.
///
/// Reads share the lock. `put` and `clear` hold the write lock until the
/// snapshot on disk matches memory, so snapshot writes never interleave.
#[derive(Clone)]
pub struct CacheStore {
    table: Arc<RwLock<CacheTable>>,
    snapshot: Arc<Snapshot>,
}

impl CacheStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            table: Arc::new(RwLock::new(CacheTable::new())),
            snapshot: Arc::new(Snapshot::new(path.into())),
        }
    }

    pub fn path(&self) -> &Path {
        self.snapshot.path()
    }

    /// A missing or unreadable snapshot loads empty.
    pub async fn load(&self) -> usize {
        let loaded = match self.snapshot.read().await {
            Ok(Some(table)) => table,
            Ok(None) => {
                debug!(path = %self.path().display(), "No cache snapshot, starting empty");
                CacheTable::new()
            }
            Err(e) => {
                warn!(path = %self.path().display(), error = %e, "Ignoring unreadable cache snapshot");
                CacheTable::new()
            }
        };

        let mut table = self.table.write().await;
        *table = loaded;
        info!(path = %self.path().display(), entries = table.len(), "Cache loaded");
        table.len()
    }

    pub async fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.table.read().await.get(key).cloned()
    }

    /// If persisting fails the entry stays in memory and the error is returned.
    pub async fn put(&self, key: CacheKey, entry: CacheEntry) -> Result<()> {
        let mut table = self.table.write().await;
        debug!(key = %key, status = entry.status, bytes = entry.body.len(), "Storing cache entry");
        table.insert(key, entry);
        self.snapshot.write(&table).await
    }

    pub async fn clear(&self) -> Result<()> {
        let mut table = self.table.write().await;
        table.clear();
        self.snapshot.write(&table).await?;
        info!(path = %self.path().display(), "Cache cleared");
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.table.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.table.read().await.is_empty()
    }

    pub async fn stats(&self) -> CacheStats {
        CacheStats::of(&*self.table.read().await)
    }
}
