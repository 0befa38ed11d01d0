use bytes::Bytes;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::validation::extension_of;

/// One `file` part of a multipart upload, fully buffered.
///
/// Owned by the request and dropped once the pipeline has committed or rejected it.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub original_filename: String,
    /// Lower-cased, with leading dot; empty when the filename has none
    pub extension: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl UploadedFile {
    pub fn new(
        original_filename: impl Into<String>,
        content_type: Option<String>,
        data: Bytes,
    ) -> Self {
        let original_filename = original_filename.into();
        let extension = extension_of(&original_filename);
        Self {
            original_filename,
            extension,
            content_type,
            data,
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// External summary of one accepted file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UploadResponseEntry {
    pub id: Uuid,
    pub original_filename: String,
    /// Retrieval URL for the stored file
    pub url: String,
}
