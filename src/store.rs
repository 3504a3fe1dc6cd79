//! Flat-file persistence for the record collection.
//!
//! The collection lives in one pretty-printed JSON array. Loading is
//! forgiving: a missing file is an empty collection, and an undecodable one
//! is either copied aside and treated as empty or reported as fatal,
//! depending on [`CorruptStorePolicy`]. Saving always replaces the whole
//! file through a temporary sibling and a rename, so a failed write never
//! leaves a truncated collection behind.

use chrono::Utc;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{info, instrument, warn};

use crate::config::CorruptStorePolicy;
use crate::error::{HarvestError, Result};
use crate::models::Record;

#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
    on_corrupt: CorruptStorePolicy,
}

impl Store {
    pub fn new(path: impl Into<PathBuf>, on_corrupt: CorruptStorePolicy) -> Self {
        Self {
            path: path.into(),
            on_corrupt,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the full collection.
    ///
    /// # Errors
    ///
    /// I/O failures other than "not found" are returned as-is. A corrupt file
    /// is an error only under [`CorruptStorePolicy::Fail`].
    #[instrument(level = "info", skip_all, fields(path = %self.path.display()))]
    pub async fn load(&self) -> Result<Vec<Record>> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("No store yet; starting empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice::<Vec<Record>>(&bytes) {
            Ok(records) => {
                info!(count = records.len(), "Loaded existing records");
                Ok(records)
            }
            Err(source) => match self.on_corrupt {
                CorruptStorePolicy::Fail => Err(HarvestError::CorruptStore {
                    path: self.path.clone(),
                    source,
                }),
                CorruptStorePolicy::Recover => {
                    match self.back_up().await {
                        Ok(backup) => warn!(
                            error = %source,
                            backup = %backup.display(),
                            "Store is not a valid record collection; copied aside and starting empty"
                        ),
                        Err(e) => warn!(
                            error = %source,
                            copy_error = %e,
                            "Store is not a valid record collection and could not be copied; starting empty"
                        ),
                    }
                    Ok(Vec::new())
                }
            },
        }
    }

    /// Replace the collection on disk with `records`.
    ///
    /// Output is indented JSON with non-ASCII text written verbatim.
    #[instrument(level = "info", skip_all, fields(path = %self.path.display(), count = records.len()))]
    pub async fn save(&self, records: &[Record]) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(records)?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let tmp = self.sibling("tmp");
        if let Err(e) = write_file(&tmp, &bytes).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e);
        }
        if let Err(e) = fs::rename(&tmp, &self.path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        info!(bytes = bytes.len(), "Saved store");
        Ok(())
    }

    /// Copy the current file to a timestamped `.corrupt-*` sibling.
    ///
    /// The original stays in place until a successful [`Store::save`]
    /// replaces it, so an aborted run leaves it untouched.
    async fn back_up(&self) -> Result<PathBuf> {
        let stamp = Utc::now().format("%Y%m%dT%H%M%SZ");
        let backup = self.sibling(&format!("corrupt-{stamp}"));
        fs::copy(&self.path, &backup).await?;
        Ok(backup)
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".");
        name.push(suffix);
        PathBuf::from(name)
    }
}

async fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Stub;

    fn record(id: &str, title: &str) -> Record {
        Record::from_stub(
            Stub {
                title: title.to_string(),
                link: id.to_string(),
                date: String::new(),
                thumbnail: None,
            },
            "body".to_string(),
            "Marketing",
        )
    }

    fn store_in(dir: &Path, policy: CorruptStorePolicy) -> Store {
        Store::new(dir.join("news.json"), policy)
    }

    #[tokio::test]
    async fn test_load_missing_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path(), CorruptStorePolicy::Fail);
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path(), CorruptStorePolicy::Recover);
        let records = vec![record("https://x.test/1", "Ünïcödé 日本"), record("https://x.test/2", "two")];

        store.save(&records).await.unwrap();
        assert_eq!(store.load().await.unwrap(), records);
        assert!(!dir.path().join("news.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_save_is_indented_and_unescaped() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path(), CorruptStorePolicy::Recover);
        store.save(&[record("https://x.test/1", "Café")]).await.unwrap();

        let text = std::fs::read_to_string(store.path()).unwrap();
        assert!(text.starts_with("[\n  {\n    \"id\""));
        assert!(text.contains("Café"));
        assert!(!text.contains("\\u"));
        assert!(text.contains("\"thumbnail\": null"));
    }

    #[tokio::test]
    async fn test_corrupt_recover_copies_file_aside() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path(), CorruptStorePolicy::Recover);
        std::fs::write(store.path(), "{ not json").unwrap();

        assert!(store.load().await.unwrap().is_empty());
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), "{ not json");

        let backups: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with("news.json.corrupt-"))
            .collect();
        assert_eq!(backups.len(), 1);
        let kept = std::fs::read_to_string(dir.path().join(&backups[0])).unwrap();
        assert_eq!(kept, "{ not json");
    }

    #[tokio::test]
    async fn test_corrupt_fail_is_error_and_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path(), CorruptStorePolicy::Fail);
        std::fs::write(store.path(), r#"{"id": "not an array"}"#).unwrap();

        let err = store.load().await.unwrap_err();
        assert!(matches!(err, HarvestError::CorruptStore { .. }));
        assert_eq!(
            std::fs::read_to_string(store.path()).unwrap(),
            r#"{"id": "not an array"}"#
        );
    }

    #[tokio::test]
    async fn test_save_overwrites_entirely() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path(), CorruptStorePolicy::Recover);
        store
            .save(&[record("a", "1"), record("b", "2"), record("c", "3")])
            .await
            .unwrap();
        store.save(&[record("a", "1")]).await.unwrap();
        assert_eq!(store.load().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_save_keeps_previous_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path(), CorruptStorePolicy::Recover);
        store.save(&[record("a", "1")]).await.unwrap();
        let before = std::fs::read(store.path()).unwrap();

        // a directory squatting on the temp path makes the write fail
        let tmp = dir.path().join("news.json.tmp");
        std::fs::create_dir(&tmp).unwrap();

        assert!(store.save(&[record("a", "1"), record("b", "2")]).await.is_err());
        assert_eq!(std::fs::read(store.path()).unwrap(), before);
        assert!(!tmp.is_file());
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_file())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(leftovers, vec!["news.json"]);
    }

    #[tokio::test]
    async fn test_save_into_missing_dir_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        // parent is a regular file, so neither create_dir_all nor create can succeed
        let store = Store::new(blocker.join("news.json"), CorruptStorePolicy::Recover);
        assert!(store.save(&[record("a", "1")]).await.is_err());
    }
}
