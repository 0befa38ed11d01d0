use clrd_storage::StorageError;

/// Why a batch upload was rejected
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("No files in upload")]
    EmptyBatch,

    #[error("Unsupported extension {extension:?} for {filename}")]
    UnsupportedExtension { filename: String, extension: String },

    #[error("Virus detected in {filename}: {threat}")]
    Infected { filename: String, threat: String },

    #[error("Scan failed for {filename}: {reason}")]
    ScanFailed { filename: String, reason: String },

    #[error("Storage failure for {filename}: {source}")]
    Storage {
        filename: String,
        #[source]
        source: StorageError,
    },
}

impl UploadError {
    /// Client filename of the file that stopped the batch, if any
    pub fn filename(&self) -> Option<&str> {
        match self {
            UploadError::EmptyBatch => None,
            UploadError::UnsupportedExtension { filename, .. }
            | UploadError::Infected { filename, .. }
            | UploadError::ScanFailed { filename, .. }
            | UploadError::Storage { filename, .. } => Some(filename),
        }
    }
}
