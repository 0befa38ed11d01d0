//! HTTP error response conversion
//!
//! Handlers return `Result<impl IntoResponse, HttpAppError>`. Domain errors
//! (`AppError`, `StorageError`, `UploadError`, multipart failures) convert into
//! [`HttpAppError`], which renders the JSON error envelope and logs at the level
//! the error declares.

use std::sync::atomic::{AtomicBool, Ordering};

use axum::{
    extract::multipart::{MultipartError, MultipartRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use clrd_core::models::ResponseStatus;
use clrd_core::{AppError, ErrorMetadata, LogLevel};
use clrd_processing::UploadError;
use clrd_storage::StorageError;
use serde::Serialize;
use utoipa::ToSchema;

static HIDE_ERROR_DETAILS: AtomicBool = AtomicBool::new(false);

/// Hide `details` and `error_type` from every error body (set once at startup in production).
pub fn set_hide_error_details(hide: bool) {
    HIDE_ERROR_DETAILS.store(hide, Ordering::Relaxed);
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Always `error`
    pub status: ResponseStatus,
    pub message: String,
    /// Machine-readable error code for programmatic handling
    pub code: String,
    /// Whether this error is recoverable (can be retried)
    pub recoverable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
}

/// Wrapper type for AppError to implement IntoResponse
/// This is necessary because of Rust's orphan rules - we can't implement
/// IntoResponse (external trait) for AppError (external type from clrd-core)
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

fn log_error(error: &AppError) {
    let error_type = error.error_type();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Error => {
            tracing::error!(error = %error, error_type = error_type, "Error occurred");
        }
    }
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let app_error = &self.0;

        let status = StatusCode::from_u16(app_error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        log_error(app_error);

        let hide_details = HIDE_ERROR_DETAILS.load(Ordering::Relaxed) || app_error.is_sensitive();
        let body = ErrorResponse {
            status: ResponseStatus::Error,
            message: app_error.client_message(),
            code: app_error.error_code().to_string(),
            recoverable: app_error.is_recoverable(),
            suggested_action: app_error.suggested_action().map(String::from),
            details: (!hide_details).then(|| app_error.detailed_message()),
            error_type: (!hide_details).then(|| app_error.error_type().to_string()),
        };

        (status, Json(body)).into_response()
    }
}

// Convert domain errors to HttpAppError (avoids orphan rule: we impl for local HttpAppError)

impl From<StorageError> for HttpAppError {
    fn from(err: StorageError) -> Self {
        let app = match err {
            StorageError::NotFound(_) => AppError::NotFound("File not found".to_string()),
            StorageError::StagingFailed(msg)
            | StorageError::CommitFailed(msg)
            | StorageError::ResolveFailed(msg)
            | StorageError::DeleteFailed(msg) => AppError::Storage(msg),
            StorageError::IoError(err) => AppError::Storage(format!("IO error: {}", err)),
            StorageError::ConfigError(msg) => AppError::Internal(msg),
        };
        HttpAppError(app)
    }
}

impl From<UploadError> for HttpAppError {
    fn from(err: UploadError) -> Self {
        let app = match err {
            UploadError::EmptyBatch => AppError::InvalidInput("File is required".to_string()),
            UploadError::UnsupportedExtension {
                filename,
                extension,
            } => AppError::UnsupportedFileType {
                filename,
                extension,
            },
            UploadError::Infected { filename, threat } => {
                AppError::FileInfected { filename, threat }
            }
            UploadError::ScanFailed { filename, reason } => {
                AppError::ScanFailed { filename, reason }
            }
            UploadError::Storage { filename, source } => {
                AppError::Storage(format!("{}: {}", filename, source))
            }
        };
        HttpAppError(app)
    }
}

impl From<MultipartRejection> for HttpAppError {
    fn from(rejection: MultipartRejection) -> Self {
        HttpAppError(AppError::InvalidInput(format!(
            "Invalid multipart request: {}",
            rejection.body_text()
        )))
    }
}

impl From<MultipartError> for HttpAppError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            HttpAppError(AppError::PayloadTooLarge(
                "Request body exceeds the upload size limit".to_string(),
            ))
        } else {
            HttpAppError(AppError::InvalidInput(format!(
                "Failed to read multipart: {}",
                err.body_text()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn infected_renders_envelope() {
        let response = HttpAppError::from(UploadError::Infected {
            filename: "a.png".to_string(),
            threat: "EICAR".to_string(),
        })
        .into_response();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let json = body_json(response).await;
        assert_eq!(json["status"], "error");
        assert_eq!(json["code"], "FILE_INFECTED");
        assert!(json["message"].as_str().unwrap().contains("a.png"));
        assert!(json.get("data").is_none());
    }

    #[tokio::test]
    async fn sensitive_errors_hide_details() {
        let response = HttpAppError::from(StorageError::CommitFailed(
            "rename /srv/staging/x -> /srv/uploads/y: EXDEV".to_string(),
        ))
        .into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["code"], "STORAGE_ERROR");
        assert_eq!(json["message"], "Failed to access storage");
        assert!(json.get("details").is_none());
    }

    #[test]
    fn storage_not_found_maps_to_404() {
        let HttpAppError(app) = StorageError::NotFound("abc".to_string()).into();
        assert_eq!(app.http_status_code(), 404);

        let HttpAppError(app) = UploadError::EmptyBatch.into();
        assert_eq!(app.client_message(), "File is required");
    }
}
