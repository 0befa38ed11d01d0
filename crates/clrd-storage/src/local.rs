use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Utc};
use tempfile::TempPath;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::error::{StorageError, StorageResult};
use crate::resolve::find_by_prefix;

const STAGING_PREFIX: &str = "upload-";

/// A file written to the staging root and awaiting its scan verdict.
///
/// Dropping it without calling [`LocalStorage::commit`] or
/// [`LocalStorage::discard`] removes the file from disk.
#[derive(Debug)]
pub struct StagedFile {
    temp: TempPath,
    extension: String,
    size: u64,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        &self.temp
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

/// A committed file in the durable tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub id: Uuid,
    pub extension: String,
    pub partition_dir: PathBuf,
    pub path: PathBuf,
}

/// Local filesystem storage with a separate staging area
#[derive(Clone, Debug)]
pub struct LocalStorage {
    storage_root: PathBuf,
    staging_root: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage instance, creating both roots if absent.
    pub async fn new(
        storage_root: impl Into<PathBuf>,
        staging_root: impl Into<PathBuf>,
    ) -> StorageResult<Self> {
        let storage_root = storage_root.into();
        let staging_root = staging_root.into();

        for dir in [&storage_root, &staging_root] {
            fs::create_dir_all(dir).await.map_err(|e| {
                StorageError::ConfigError(format!(
                    "Failed to create storage directory {}: {}",
                    dir.display(),
                    e
                ))
            })?;
        }

        Ok(LocalStorage {
            storage_root,
            staging_root,
        })
    }

    pub fn storage_root(&self) -> &Path {
        &self.storage_root
    }

    pub fn staging_root(&self) -> &Path {
        &self.staging_root
    }

    /// Reserve a fresh, empty file under the staging root.
    pub async fn staging_path(&self, extension: &str) -> StorageResult<TempPath> {
        fs::create_dir_all(&self.staging_root).await.map_err(|e| {
            StorageError::StagingFailed(format!(
                "Failed to create staging directory {}: {}",
                self.staging_root.display(),
                e
            ))
        })?;

        let root = self.staging_root.clone();
        let extension = extension.to_string();
        let reserved = tokio::task::spawn_blocking(move || {
            tempfile::Builder::new()
                .prefix(STAGING_PREFIX)
                .suffix(&extension)
                .tempfile_in(&root)
                .map(|file| file.into_temp_path())
        })
        .await
        .map_err(|e| StorageError::StagingFailed(format!("Staging task failed: {}", e)))?;

        reserved.map_err(|e| {
            StorageError::StagingFailed(format!(
                "Failed to create staging file in {}: {}",
                self.staging_root.display(),
                e
            ))
        })
    }

    /// Write `data` to a new staged file and flush it to disk.
    pub async fn stage(&self, extension: &str, data: &[u8]) -> StorageResult<StagedFile> {
        let start = Instant::now();
        let temp = self.staging_path(extension).await?;

        let mut file = fs::OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&temp)
            .await
            .map_err(|e| {
                StorageError::StagingFailed(format!(
                    "Failed to open staging file {}: {}",
                    temp.display(),
                    e
                ))
            })?;

        file.write_all(data).await.map_err(|e| {
            StorageError::StagingFailed(format!(
                "Failed to write staging file {}: {}",
                temp.display(),
                e
            ))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::StagingFailed(format!(
                "Failed to sync staging file {}: {}",
                temp.display(),
                e
            ))
        })?;

        tracing::debug!(
            path = %temp.display(),
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "File staged"
        );

        Ok(StagedFile {
            temp,
            extension: extension.to_string(),
            size: data.len() as u64,
        })
    }

    /// Allocate an identifier and its final location for a commit at `now`.
    ///
    /// The partition directory is created if absent.
    pub async fn final_path(&self, extension: &str, now: DateTime<Utc>) -> StorageResult<StoredFile> {
        let partition_dir = self
            .storage_root
            .join(now.format("%Y-%m-%d").to_string());

        fs::create_dir_all(&partition_dir).await.map_err(|e| {
            StorageError::CommitFailed(format!(
                "Failed to create partition {}: {}",
                partition_dir.display(),
                e
            ))
        })?;

        let id = Uuid::new_v4();
        let path = partition_dir.join(format!("{}{}", id, extension));

        Ok(StoredFile {
            id,
            extension: extension.to_string(),
            partition_dir,
            path,
        })
    }

    /// Atomically move a staged file into the durable tree.
    ///
    /// On failure the staged file is removed and nothing exists at the final path.
    pub async fn commit(&self, staged: StagedFile, now: DateTime<Utc>) -> StorageResult<StoredFile> {
        let start = Instant::now();
        let target = self.final_path(&staged.extension, now).await?;

        // Inline rename: a dropped request future must not complete it later.
        staged.temp.persist(&target.path).map_err(|e| {
            StorageError::CommitFailed(format!(
                "Failed to move staged file to {}: {}",
                target.path.display(),
                e.error
            ))
        })?;

        tracing::info!(
            file_id = %target.id,
            path = %target.path.display(),
            size_bytes = staged.size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "File committed"
        );

        Ok(target)
    }

    /// Remove a staged file that will not be committed.
    pub fn discard(&self, staged: StagedFile) {
        let path = staged.temp.to_path_buf();
        if let Err(e) = staged.temp.close() {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Failed to remove staged file"
            );
        } else {
            tracing::debug!(path = %path.display(), "Staged file discarded");
        }
    }

    /// Find the stored file whose name starts with `identifier`.
    pub async fn resolve(&self, identifier: &str) -> StorageResult<Option<PathBuf>> {
        let start = Instant::now();
        let root = self.storage_root.clone();
        let id = identifier.to_string();

        let found = tokio::task::spawn_blocking(move || find_by_prefix(&root, &id))
            .await
            .map_err(|e| StorageError::ResolveFailed(format!("Resolve task failed: {}", e)))??;

        tracing::debug!(
            file_id = %identifier,
            found = found.is_some(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Resolved identifier"
        );

        Ok(found)
    }

    pub async fn remove(&self, path: &Path) -> StorageResult<()> {
        let start = Instant::now();

        fs::remove_file(path).await.map_err(|e| {
            StorageError::DeleteFailed(format!("Failed to delete file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage delete successful"
        );

        Ok(())
    }

    /// Verify both roots are present directories.
    pub async fn health_check(&self) -> StorageResult<()> {
        for dir in [&self.storage_root, &self.staging_root] {
            let meta = fs::metadata(dir).await.map_err(|e| {
                StorageError::ConfigError(format!("{} is not accessible: {}", dir.display(), e))
            })?;
            if !meta.is_dir() {
                return Err(StorageError::ConfigError(format!(
                    "{} is not a directory",
                    dir.display()
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashSet;
    use std::sync::Arc;
    use tempfile::tempdir;

    async fn storage() -> (tempfile::TempDir, LocalStorage) {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path().join("uploads"), dir.path().join("staging"))
            .await
            .unwrap();
        (dir, storage)
    }

    fn count_files(dir: &Path) -> usize {
        walkdir::WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .count()
    }

    #[tokio::test]
    async fn test_stage_writes_content_outside_storage_root() {
        let (_dir, storage) = storage().await;
        let staged = storage.stage(".png", b"abc").await.unwrap();

        assert!(staged.path().starts_with(storage.staging_root()));
        assert!(staged.path().to_string_lossy().ends_with(".png"));
        assert_eq!(std::fs::read(staged.path()).unwrap(), b"abc");
        assert_eq!(staged.size(), 3);
        assert_eq!(count_files(storage.storage_root()), 0);
    }

    #[tokio::test]
    async fn test_commit_moves_into_dated_partition() {
        let (_dir, storage) = storage().await;
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 23, 59, 0).unwrap();

        let staged = storage.stage(".pdf", b"%PDF-1.4").await.unwrap();
        let staged_path = staged.path().to_path_buf();
        let stored = storage.commit(staged, now).await.unwrap();

        assert!(!staged_path.exists());
        assert_eq!(stored.partition_dir, storage.storage_root().join("2024-03-09"));
        assert_eq!(
            stored.path.file_name().unwrap().to_str().unwrap(),
            format!("{}.pdf", stored.id)
        );
        assert_eq!(std::fs::read(&stored.path).unwrap(), b"%PDF-1.4");
        assert_eq!(count_files(storage.staging_root()), 0);
    }

    #[tokio::test]
    async fn test_dropped_staged_file_is_removed() {
        let (_dir, storage) = storage().await;
        let staged = storage.stage(".gif", b"GIF89a").await.unwrap();
        let path = staged.path().to_path_buf();
        assert!(path.exists());

        drop(staged);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_discard_removes_staged_file() {
        let (_dir, storage) = storage().await;
        let staged = storage.stage(".png", b"abc").await.unwrap();
        let path = staged.path().to_path_buf();

        storage.discard(staged);
        assert!(!path.exists());
        assert_eq!(count_files(storage.storage_root()), 0);
    }

    #[tokio::test]
    async fn test_resolve_finds_committed_file() {
        let (_dir, storage) = storage().await;
        let staged = storage.stage(".png", b"abc").await.unwrap();
        let stored = storage.commit(staged, Utc::now()).await.unwrap();

        let found = storage.resolve(&stored.id.to_string()).await.unwrap();
        assert_eq!(found, Some(stored.path.clone()));

        let missing = storage.resolve(&Uuid::new_v4().to_string()).await.unwrap();
        assert!(missing.is_none());
        assert!(storage.resolve("").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_staged_files_are_not_resolvable() {
        let (_dir, storage) = storage().await;
        let staged = storage.stage(".png", b"abc").await.unwrap();
        let name = staged
            .path()
            .file_name()
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();

        assert!(storage.resolve(&name).await.unwrap().is_none());
        assert!(storage.resolve(STAGING_PREFIX).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_remove_then_missing() {
        let (_dir, storage) = storage().await;
        let staged = storage.stage(".png", b"abc").await.unwrap();
        let stored = storage.commit(staged, Utc::now()).await.unwrap();

        storage.remove(&stored.path).await.unwrap();
        assert!(storage
            .resolve(&stored.id.to_string())
            .await
            .unwrap()
            .is_none());
        assert!(matches!(
            storage.remove(&stored.path).await,
            Err(StorageError::DeleteFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_commits_get_unique_identifiers() {
        let (_dir, storage) = storage().await;
        let storage = Arc::new(storage);
        let now = Utc::now();

        let tasks: Vec<_> = (0..32)
            .map(|i| {
                let storage = Arc::clone(&storage);
                tokio::spawn(async move {
                    let staged = storage.stage(".jpg", format!("{}", i).as_bytes()).await?;
                    storage.commit(staged, now).await
                })
            })
            .collect();

        let results = futures::future::join_all(tasks).await;
        let ids: HashSet<Uuid> = results
            .into_iter()
            .map(|r| r.unwrap().unwrap().id)
            .collect();

        assert_eq!(ids.len(), 32);
        assert_eq!(count_files(storage.storage_root()), 32);
    }

    #[tokio::test]
    async fn test_health_check() {
        let (_dir, storage) = storage().await;
        assert!(storage.health_check().await.is_ok());

        std::fs::remove_dir_all(storage.staging_root()).unwrap();
        assert!(storage.health_check().await.is_err());
    }
}
