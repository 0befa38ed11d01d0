//! Data models for the application
//!
//! Transient upload items, the summaries returned to clients and the JSON
//! envelope every endpoint answers with.

mod response;
mod upload;

pub use response::*;
pub use upload::*;
