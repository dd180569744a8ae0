// On-disk copy of the cache table

use capro_common::{CacheTable, CaproError, Result};
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs as tokio_fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

pub struct Snapshot {
    path: PathBuf,
}

impl Snapshot {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads and parses the snapshot. `Ok(None)` means there is no file yet.
    pub async fn read(&self) -> Result<Option<CacheTable>> {
        let content = match tokio_fs::read(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let table: CacheTable = serde_json::from_slice(&content)?;
        debug!(path = %self.path.display(), entries = table.len(), "Read cache snapshot");
        Ok(Some(table))
    }

    /// Replaces the snapshot with `table`.
    ///
    /// The table is written to a sibling temp file which is then renamed over
    /// the target, so readers see either the old or the new snapshot in full.
    pub async fn write(&self, table: &CacheTable) -> Result<()> {
        let data = serde_json::to_vec_pretty(table)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio_fs::create_dir_all(parent)
                    .await
                    .map_err(|e| self.storage_error("create directory for", e))?;
            }
        }

        let tmp_path = self.tmp_path();
        let mut file = tokio_fs::File::create(&tmp_path)
            .await
            .map_err(|e| self.storage_error("create", e))?;
        file.write_all(&data).await.map_err(|e| self.storage_error("write", e))?;
        file.sync_all().await.map_err(|e| self.storage_error("sync", e))?;
        drop(file);

        if let Err(e) = tokio_fs::rename(&tmp_path, &self.path).await {
            let _ = tokio_fs::remove_file(&tmp_path).await;
            return Err(self.storage_error("replace", e));
        }

        debug!(path = %self.path.display(), entries = table.len(), bytes = data.len(), "Wrote cache snapshot");
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| OsString::from("cache"));
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn storage_error(&self, action: &str, error: std::io::Error) -> CaproError {
        CaproError::Storage(format!("failed to {} {}: {}", action, self.path.display(), error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capro_common::{CacheEntry, CacheKey, Headers};
    use tempfile::TempDir;

    fn sample_table() -> CacheTable {
        let mut table = CacheTable::new();
        table.insert(
            CacheKey::from("http://origin/x"),
            CacheEntry { status: 200, body: b"hello".to_vec(), headers: Headers::new() },
        );
        table
    }

    #[tokio::test]
    async fn missing_file_reads_as_none() {
        let dir = TempDir::new().unwrap();
        let snapshot = Snapshot::new(dir.path().join("cache.json"));

        assert!(snapshot.read().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn write_then_read_returns_same_table() {
        let dir = TempDir::new().unwrap();
        let snapshot = Snapshot::new(dir.path().join("nested/dir/cache.json"));
        let table = sample_table();

        snapshot.write(&table).await.unwrap();

        assert_eq!(snapshot.read().await.unwrap(), Some(table));
        assert!(!dir.path().join("nested/dir/cache.json.tmp").exists());
    }

    #[tokio::test]
    async fn malformed_file_is_a_serialization_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, b"{ not json").unwrap();

        let result = Snapshot::new(path).read().await;
        assert!(matches!(result, Err(CaproError::Serialization(_))));
    }

    #[tokio::test]
    async fn reads_snapshot_written_by_hand() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(
            &path,
            br#"{"http://origin/x":{"status":200,"body":"aGVsbG8=","headers":{"content-type":"text/plain"}}}"#,
        )
        .unwrap();

        let table = Snapshot::new(path).read().await.unwrap().unwrap();
        let entry = &table[&CacheKey::from("http://origin/x")];
        assert_eq!(entry.body, b"hello");
        assert_eq!(entry.headers["content-type"], "text/plain");
    }
}
