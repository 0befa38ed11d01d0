//! Test helpers: build the real router around a temporary storage tree and a mock scanner.
//!
//! Run from workspace root: `cargo test -p clrd-api`.

#![allow(dead_code)]

pub mod fixtures;

use axum_test::multipart::{MultipartForm, Part};
use axum_test::{TestResponse, TestServer};
use clrd_api::constants;
use clrd_api::setup::{build_state, routes};
use clrd_core::{
    AllowList, BaseConfig, Config, FileApiConfig, LogFormat, ScanBackendKind, ScanOutcome,
};
use clrd_services::MockScanBackend;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

pub const TEST_API_KEY: &str = "test-api-key-0123456789";

/// API path prefix for tests (e.g. `/api/v1`).
pub fn api_path(path: &str) -> String {
    format!("{}{}", constants::API_PREFIX, path)
}

/// Test application: server plus the temporary directories it writes to.
pub struct TestApp {
    pub server: TestServer,
    pub storage_root: PathBuf,
    pub staging_root: PathBuf,
    pub _temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// Regular files currently under the storage root
    pub fn stored_files(&self) -> Vec<PathBuf> {
        files_under(&self.storage_root)
    }

    /// Regular files currently under the staging root
    pub fn staged_files(&self) -> Vec<PathBuf> {
        files_under(&self.staging_root)
    }

    /// POST one multipart `file` part to the upload route
    pub async fn upload(&self, file_name: &str, data: &[u8]) -> TestResponse {
        let part = Part::bytes(bytes::Bytes::copy_from_slice(data)).file_name(file_name.to_string());
        self.server
            .post(&api_path("/upload"))
            .add_header(constants::API_KEY_HEADER, TEST_API_KEY)
            .multipart(MultipartForm::new().add_part("file", part))
            .await
    }
}

fn files_under(root: &Path) -> Vec<PathBuf> {
    walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect()
}

fn test_config(temp_dir: &TempDir) -> Config {
    Config(Box::new(FileApiConfig {
        base: BaseConfig {
            server_port: 8080,
            cors_origins: vec!["*".to_string()],
            environment: "test".to_string(),
            request_timeout_secs: 30,
            log_format: LogFormat::Compact,
        },
        api_key: TEST_API_KEY.to_string(),
        storage_root: temp_dir.path().join("uploads"),
        staging_root: temp_dir.path().join("staging"),
        public_base_url: "http://localhost:8080/api/v1/files".to_string(),
        max_upload_size_bytes: 10 * 1024 * 1024,
        allowed_extensions: AllowList::default(),
        scan_backend: ScanBackendKind::Clamd,
        clamav_host: "localhost".to_string(),
        clamav_port: 3310,
        clamscan_path: "clamscan".to_string(),
        clamscan_args: vec!["--no-summary".to_string()],
        scan_timeout_secs: 5,
    }))
}

/// Mock scanner answering every scan with `outcome`
pub fn scanner_returning(outcome: ScanOutcome) -> MockScanBackend {
    let mut mock = MockScanBackend::new();
    mock.expect_scan_path().returning(move |_| outcome.clone());
    mock.expect_name().return_const("mock");
    mock.expect_is_available().returning(|| true);
    mock
}

/// Setup test app with an isolated storage tree and the given scanner.
pub async fn setup_test_app(scanner: MockScanBackend) -> TestApp {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = test_config(&temp_dir);

    let state = build_state(&config, Arc::new(scanner))
        .await
        .expect("Failed to build app state");
    let router = routes::setup_routes(&config, state).expect("Failed to setup routes");

    let server = TestServer::new(router.into_make_service()).expect("Failed to create test server");

    TestApp {
        server,
        storage_root: config.storage_root().to_path_buf(),
        staging_root: config.staging_root().to_path_buf(),
        _temp_dir: temp_dir,
    }
}

/// Setup test app whose scanner reports every file clean.
pub async fn setup_clean_app() -> TestApp {
    setup_test_app(scanner_returning(ScanOutcome::Clean)).await
}
