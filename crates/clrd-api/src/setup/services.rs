//! Storage, scanner and service wiring

use crate::state::AppState;
use anyhow::{Context, Result};
use clrd_core::Config;
use clrd_processing::IngestionPipeline;
use clrd_services::{create_scanner, FileService, LocalStorage, ScanBackend};
use std::sync::Arc;

/// Build the application state with the scanner selected by the configuration
pub async fn initialize_services(config: &Config) -> Result<Arc<AppState>> {
    let scanner = create_scanner(config);

    if !scanner.is_available().await {
        tracing::warn!(
            scanner = scanner.name(),
            "Virus scanner is not reachable; uploads will be rejected until it is"
        );
    }

    build_state(config, scanner).await
}

/// Build the application state around an explicit scanner
pub async fn build_state(config: &Config, scanner: Arc<dyn ScanBackend>) -> Result<Arc<AppState>> {
    let storage = LocalStorage::new(
        config.storage_root().to_path_buf(),
        config.staging_root().to_path_buf(),
    )
    .await
    .context("Failed to initialize local storage")?;
    let storage = Arc::new(storage);

    tracing::info!(
        storage_root = %config.storage_root().display(),
        staging_root = %config.staging_root().display(),
        scanner = scanner.name(),
        "Storage initialized"
    );

    let pipeline = IngestionPipeline::new(
        Arc::clone(&storage),
        scanner,
        config.allowed_extensions().clone(),
        config.public_base_url(),
    );
    let files = FileService::new(Arc::clone(&storage));

    Ok(Arc::new(AppState {
        storage,
        pipeline,
        files,
    }))
}
