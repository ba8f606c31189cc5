//! Local filesystem storage implementation.
//!
//! Keeps every key in one JSON object on disk, rewritten atomically
//! (temp file, then rename) on each change.

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::storage::KeyValueStore;

const FILE_NAME: &str = "local.json";

/// Persistent file-backed store.
pub struct LocalStore {
    root_dir: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl LocalStore {
    /// Create a new LocalStore rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            lock: Mutex::new(()),
        }
    }

    fn path(&self) -> PathBuf {
        self.root_dir.join(FILE_NAME)
    }

    /// An unreadable file is logged and treated as empty; the next write
    /// replaces it.
    async fn read_map(&self) -> Result<BTreeMap<String, String>> {
        match tokio::fs::read(self.path()).await {
            Ok(bytes) if bytes.is_empty() => Ok(BTreeMap::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                log::warn!(
                    "Ignoring corrupt storage file {}: {}",
                    self.path().display(),
                    e
                );
                BTreeMap::new()
            })),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Write the map atomically (write to temp, then rename).
    async fn write_map(&self, map: &BTreeMap<String, String>) -> Result<()> {
        tokio::fs::create_dir_all(&self.root_dir).await?;

        let path = self.path();
        let tmp = path.with_extension("tmp");
        let bytes = serde_json::to_vec_pretty(map)?;

        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(&bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for LocalStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.lock.lock().await;
        Ok(self.read_map().await?.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut map = self.read_map().await?;
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map).await
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        let _guard = self.lock.lock().await;
        let mut map = self.read_map().await?;
        if map.remove(key).is_none() {
            return Ok(false);
        }
        self.write_map(&map).await?;
        Ok(true)
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let _guard = self.lock.lock().await;
        Ok(self.read_map().await?.into_keys().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_and_read() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path().join("nested"));

        store.set("authToken", "abc").await.unwrap();
        assert_eq!(store.get("authToken").await.unwrap().as_deref(), Some("abc"));
        assert!(tmp.path().join("nested/local.json").exists());
    }

    #[tokio::test]
    async fn test_read_nonexistent() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());

        assert!(store.get("nope").await.unwrap().is_none());
        assert!(store.keys().await.unwrap().is_empty());
        assert!(!store.remove("nope").await.unwrap());
    }

    #[tokio::test]
    async fn test_persists_across_instances() {
        let tmp = TempDir::new().unwrap();
        LocalStore::new(tmp.path()).set("b", "2").await.unwrap();
        LocalStore::new(tmp.path()).set("a", "1").await.unwrap();

        let store = LocalStore::new(tmp.path());
        assert_eq!(store.keys().await.unwrap(), vec!["a", "b"]);
        assert!(store.remove("a").await.unwrap());
        assert_eq!(store.keys().await.unwrap(), vec!["b"]);
    }

    #[tokio::test]
    async fn test_corrupt_file_reads_as_empty() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(FILE_NAME), b"not json").unwrap();
        let store = LocalStore::new(tmp.path());

        assert!(store.get("x").await.unwrap().is_none());
        assert!(store.keys().await.unwrap().is_empty());

        store.set("authToken", "abc").await.unwrap();
        assert_eq!(store.keys().await.unwrap(), vec!["authToken"]);
    }
}
