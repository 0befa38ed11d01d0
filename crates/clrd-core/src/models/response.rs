use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::upload::UploadResponseEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// Successful upload: one entry per committed file, in submission order
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    pub status: ResponseStatus,
    pub message: String,
    pub data: Vec<UploadResponseEntry>,
}

impl UploadResponse {
    pub fn success(data: Vec<UploadResponseEntry>) -> Self {
        let message = if data.len() == 1 {
            "File uploaded successfully".to_string()
        } else {
            format!("{} files uploaded successfully", data.len())
        };
        Self {
            status: ResponseStatus::Success,
            message,
            data,
        }
    }
}

/// Envelope without payload, used by deletion
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    pub status: ResponseStatus,
    pub message: String,
}

impl StatusResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Success,
            message: message.into(),
        }
    }
}
