mod error;
mod pipeline;

pub use error::UploadError;
pub use pipeline::IngestionPipeline;
