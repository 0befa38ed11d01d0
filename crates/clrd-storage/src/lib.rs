//! CLRD Storage Library
//!
//! Local filesystem layout for uploaded files.
//!
//! # Layout
//!
//! - **Staging**: `{staging_root}/upload-XXXXXX{ext}`, holding files until their scan verdict
//! - **Durable**: `{storage_root}/{YYYY-MM-DD}/{uuid}{ext}`, partitioned by UTC commit date
//!
//! There is no index: an identifier is resolved by walking the durable tree for
//! the first regular file whose name starts with it. The staging root must live
//! outside the storage root (enforced by `Config::validate`) and on the same
//! filesystem, since commit is a single rename.

pub mod error;
pub mod local;
mod resolve;

pub use error::{StorageError, StorageResult};
pub use local::{LocalStorage, StagedFile, StoredFile};
