//! CLRD Processing Library
//!
//! The ingestion pipeline: extension check, staging, virus scan, then commit
//! into the durable tree or rejection.

pub mod upload;

pub use upload::{IngestionPipeline, UploadError};
