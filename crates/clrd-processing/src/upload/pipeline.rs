use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use clrd_core::models::{UploadResponseEntry, UploadedFile};
use clrd_core::{AllowList, ScanOutcome};
use clrd_services::ScanBackend;
use clrd_storage::LocalStorage;

use super::error::UploadError;

/// Validation → staging → scan → commit, for every file of one request.
///
/// Files are handled sequentially in submission order. The first rejection
/// stops the batch; files committed before it stay committed.
#[derive(Clone)]
pub struct IngestionPipeline {
    storage: Arc<LocalStorage>,
    scanner: Arc<dyn ScanBackend>,
    allow_list: AllowList,
    public_base_url: String,
}

impl IngestionPipeline {
    pub fn new(
        storage: Arc<LocalStorage>,
        scanner: Arc<dyn ScanBackend>,
        allow_list: AllowList,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            scanner,
            allow_list,
            public_base_url: public_base_url.into(),
        }
    }

    pub fn scanner(&self) -> &Arc<dyn ScanBackend> {
        &self.scanner
    }

    fn file_url(&self, id: &uuid::Uuid) -> String {
        format!("{}/{}", self.public_base_url.trim_end_matches('/'), id)
    }

    pub async fn ingest(&self, files: Vec<UploadedFile>) -> Result<Vec<UploadResponseEntry>, UploadError> {
        if files.is_empty() {
            return Err(UploadError::EmptyBatch);
        }

        let mut entries = Vec::with_capacity(files.len());
        for file in files {
            let entry = self.ingest_one(file).await?;
            entries.push(entry);
        }

        Ok(entries)
    }

    async fn ingest_one(&self, file: UploadedFile) -> Result<UploadResponseEntry, UploadError> {
        let start = Instant::now();
        let UploadedFile {
            original_filename,
            extension,
            data,
            ..
        } = file;

        if !self.allow_list.contains(&extension) {
            tracing::debug!(
                original_filename = %original_filename,
                extension = %extension,
                "Rejected upload with unsupported extension"
            );
            return Err(UploadError::UnsupportedExtension {
                filename: original_filename,
                extension,
            });
        }

        let staged = match self.storage.stage(&extension, &data).await {
            Ok(staged) => staged,
            Err(source) => {
                return Err(UploadError::Storage {
                    filename: original_filename,
                    source,
                })
            }
        };
        drop(data);

        let outcome = self.scanner.scan_path(staged.path()).await;
        match outcome {
            ScanOutcome::Clean => {}
            ScanOutcome::Infected(threat) => {
                self.storage.discard(staged);
                tracing::warn!(
                    original_filename = %original_filename,
                    scanner = self.scanner.name(),
                    virus = %threat,
                    "Upload rejected: virus detected"
                );
                return Err(UploadError::Infected {
                    filename: original_filename,
                    threat,
                });
            }
            ScanOutcome::Error(reason) => {
                self.storage.discard(staged);
                tracing::error!(
                    original_filename = %original_filename,
                    scanner = self.scanner.name(),
                    error = %reason,
                    "Upload rejected: scan failed"
                );
                return Err(UploadError::ScanFailed {
                    filename: original_filename,
                    reason,
                });
            }
        }

        let stored = match self.storage.commit(staged, Utc::now()).await {
            Ok(stored) => stored,
            Err(source) => {
                return Err(UploadError::Storage {
                    filename: original_filename,
                    source,
                })
            }
        };

        tracing::info!(
            file_id = %stored.id,
            original_filename = %original_filename,
            path = %stored.path.display(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "File accepted"
        );

        Ok(UploadResponseEntry {
            id: stored.id,
            url: self.file_url(&stored.id),
            original_filename,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use clrd_services::MockScanBackend;
    use std::path::Path;

    struct Fixture {
        _dir: tempfile::TempDir,
        storage: Arc<LocalStorage>,
    }

    impl Fixture {
        async fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let storage = LocalStorage::new(dir.path().join("uploads"), dir.path().join("staging"))
                .await
                .unwrap();
            Self {
                _dir: dir,
                storage: Arc::new(storage),
            }
        }

        fn pipeline(&self, scanner: MockScanBackend) -> IngestionPipeline {
            IngestionPipeline::new(
                Arc::clone(&self.storage),
                Arc::new(scanner),
                AllowList::default(),
                "http://localhost:8080/api/v1/files/",
            )
        }

        fn count(&self, root: &Path) -> usize {
            walkdir::WalkDir::new(root)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .count()
        }

        fn stored_count(&self) -> usize {
            self.count(self.storage.storage_root())
        }

        fn staged_count(&self) -> usize {
            self.count(self.storage.staging_root())
        }
    }

    fn file(name: &str, data: &'static [u8]) -> UploadedFile {
        UploadedFile::new(name, None, Bytes::from_static(data))
    }

    fn scanner_returning(outcome: ScanOutcome, times: usize) -> MockScanBackend {
        let mut mock = MockScanBackend::new();
        mock.expect_scan_path()
            .times(times)
            .returning(move |_| outcome.clone());
        mock.expect_name().return_const("mock");
        mock
    }

    #[tokio::test]
    async fn clean_file_is_committed_and_resolvable() {
        let fx = Fixture::new().await;
        let pipeline = fx.pipeline(scanner_returning(ScanOutcome::Clean, 1));

        let entries = pipeline.ingest(vec![file("a.png", b"abc")]).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].original_filename, "a.png");
        assert_eq!(
            entries[0].url,
            format!("http://localhost:8080/api/v1/files/{}", entries[0].id)
        );

        let path = fx
            .storage
            .resolve(&entries[0].id.to_string())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"abc");
        assert_eq!(fx.staged_count(), 0);
    }

    #[tokio::test]
    async fn disallowed_extension_never_reaches_scanner() {
        let fx = Fixture::new().await;
        let pipeline = fx.pipeline(scanner_returning(ScanOutcome::Clean, 0));

        let err = pipeline.ingest(vec![file("a.exe", b"MZ")]).await.unwrap_err();
        assert!(matches!(
            err,
            UploadError::UnsupportedExtension { ref extension, .. } if extension == ".exe"
        ));
        assert_eq!(fx.stored_count(), 0);
        assert_eq!(fx.staged_count(), 0);
    }

    #[tokio::test]
    async fn infected_file_leaves_nothing_behind() {
        let fx = Fixture::new().await;
        let pipeline = fx.pipeline(scanner_returning(
            ScanOutcome::Infected("EICAR".to_string()),
            1,
        ));

        let err = pipeline.ingest(vec![file("a.png", b"abc")]).await.unwrap_err();
        match err {
            UploadError::Infected { filename, threat } => {
                assert_eq!(filename, "a.png");
                assert_eq!(threat, "EICAR");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(fx.stored_count(), 0);
        assert_eq!(fx.staged_count(), 0);
    }

    #[tokio::test]
    async fn scan_error_fails_closed() {
        let fx = Fixture::new().await;
        let pipeline = fx.pipeline(scanner_returning(
            ScanOutcome::Error("connection refused".to_string()),
            1,
        ));

        let err = pipeline.ingest(vec![file("doc.pdf", b"%PDF")]).await.unwrap_err();
        assert!(matches!(err, UploadError::ScanFailed { .. }));
        assert_eq!(err.filename(), Some("doc.pdf"));
        assert_eq!(fx.stored_count(), 0);
        assert_eq!(fx.staged_count(), 0);
    }

    #[tokio::test]
    async fn scanner_sees_staged_content_outside_storage() {
        let fx = Fixture::new().await;
        let staging_root = fx.storage.staging_root().to_path_buf();

        let mut mock = MockScanBackend::new();
        mock.expect_scan_path()
            .times(1)
            .withf(move |path| path.starts_with(&staging_root))
            .returning(|path| {
                assert_eq!(std::fs::read(path).unwrap(), b"%PDF-1.4");
                ScanOutcome::Clean
            });
        mock.expect_name().return_const("mock");

        let entries = fx
            .pipeline(mock)
            .ingest(vec![file("report.PDF", b"%PDF-1.4")])
            .await
            .unwrap();
        assert_eq!(entries[0].original_filename, "report.PDF");
        assert_eq!(fx.stored_count(), 1);
    }

    #[tokio::test]
    async fn batch_stops_at_first_rejection() {
        let fx = Fixture::new().await;
        let pipeline = fx.pipeline(scanner_returning(ScanOutcome::Clean, 1));

        let err = pipeline
            .ingest(vec![
                file("a.png", b"abc"),
                file("b.exe", b"MZ"),
                file("c.png", b"def"),
            ])
            .await
            .unwrap_err();

        assert_eq!(err.filename(), Some("b.exe"));
        // a.png was fully committed before the rejection and stays.
        assert_eq!(fx.stored_count(), 1);
    }

    #[tokio::test]
    async fn empty_batch_is_rejected() {
        let fx = Fixture::new().await;
        let pipeline = fx.pipeline(scanner_returning(ScanOutcome::Clean, 0));
        assert!(matches!(
            pipeline.ingest(Vec::new()).await,
            Err(UploadError::EmptyBatch)
        ));
    }

    #[tokio::test]
    async fn multiple_clean_files_keep_order() {
        let fx = Fixture::new().await;
        let pipeline = fx.pipeline(scanner_returning(ScanOutcome::Clean, 3));

        let entries = pipeline
            .ingest(vec![
                file("one.jpg", b"1"),
                file("two.gif", b"2"),
                file("three.mp4", b"3"),
            ])
            .await
            .unwrap();

        let names: Vec<_> = entries.iter().map(|e| e.original_filename.as_str()).collect();
        assert_eq!(names, ["one.jpg", "two.gif", "three.mp4"]);
        assert_ne!(entries[0].id, entries[1].id);
        assert_eq!(fx.stored_count(), 3);
    }
}
