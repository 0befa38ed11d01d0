//! Application state shared by every handler.

use clrd_processing::IngestionPipeline;
use clrd_services::{FileService, LocalStorage};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<LocalStorage>,
    /// Upload path: allow-list, staging, scan, commit
    pub pipeline: IngestionPipeline,
    /// Read and delete path
    pub files: FileService,
}
