//! CLRD Core Library
//!
//! This crate provides the domain models, error types, configuration and the
//! extension allow-list shared by every CLRD component.

pub mod config;
pub mod error;
pub mod models;
pub mod scan_types;
pub mod validation;

// Re-export commonly used types
pub use config::{BaseConfig, Config, FileApiConfig, LogFormat};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use scan_types::{ScanBackendKind, ScanOutcome};
pub use validation::{extension_of, AllowList, DEFAULT_ALLOWED_EXTENSIONS};
