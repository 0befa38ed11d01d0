//! Upload validation shared by the pipeline and the HTTP layer.

pub mod extensions;

pub use extensions::{extension_of, AllowList, DEFAULT_ALLOWED_EXTENSIONS};
