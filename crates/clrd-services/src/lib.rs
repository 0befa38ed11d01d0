//! CLRD Services Layer
//!
//! Virus-scan backends and the retrieval/deletion service. Both sit between
//! the HTTP handlers and `clrd-storage`; the ingestion pipeline in
//! `clrd-processing` only sees the [`ScanBackend`] trait.

pub mod files;
pub mod scanning;

pub use clrd_storage::{LocalStorage, StorageError, StorageResult};
pub use files::{sniff_content_type, Disposition, FileService, RetrievedFile};
#[cfg(any(test, feature = "mock"))]
pub use scanning::MockScanBackend;
pub use scanning::{create_scanner, ClamdScanner, ClamscanScanner, ScanBackend};
