//! Error types module
//!
//! Every failure the service can report is unified under [`AppError`]. Each
//! variant describes its own HTTP presentation through [`ErrorMetadata`], so the
//! API layer only has to render it.

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for rejected content and recoverable issues
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "FILE_INFECTED")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden from clients
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unsupported file type {extension:?} for {filename}")]
    UnsupportedFileType { filename: String, extension: String },

    #[error("Virus detected in {filename}: {threat}")]
    FileInfected { filename: String, threat: String },

    #[error("Virus scan failed for {filename}: {reason}")]
    ScanFailed { filename: String, reason: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Request timed out: {0}")]
    RequestTimeout(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
fn app_error_static_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        AppError::InvalidInput(_) => (
            400,
            "INVALID_INPUT",
            false,
            Some("Check request parameters and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::UnsupportedFileType { .. } => (
            400,
            "UNSUPPORTED_FILE_TYPE",
            false,
            Some("Upload an image, document, spreadsheet or video file"),
            false,
            LogLevel::Debug,
        ),
        AppError::FileInfected { .. } => (
            422,
            "FILE_INFECTED",
            false,
            Some("Do not retry with the same content"),
            false,
            LogLevel::Warn,
        ),
        AppError::ScanFailed { .. } => (
            502,
            "SCAN_UNAVAILABLE",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::Storage(_) => (
            500,
            "STORAGE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::NotFound(_) => (
            404,
            "NOT_FOUND",
            false,
            Some("Verify the file ID exists"),
            false,
            LogLevel::Debug,
        ),
        AppError::Unauthorized(_) => (
            401,
            "UNAUTHORIZED",
            false,
            Some("Check the X-API-KEY header"),
            false,
            LogLevel::Debug,
        ),
        AppError::PayloadTooLarge(_) => (
            413,
            "PAYLOAD_TOO_LARGE",
            false,
            Some("Reduce file size"),
            false,
            LogLevel::Debug,
        ),
        AppError::RequestTimeout(_) => (
            408,
            "REQUEST_TIMEOUT",
            true,
            Some("Retry with a smaller upload or a faster connection"),
            false,
            LogLevel::Warn,
        ),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &str {
        match self {
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::UnsupportedFileType { .. } => "UnsupportedFileType",
            AppError::FileInfected { .. } => "FileInfected",
            AppError::ScanFailed { .. } => "ScanFailed",
            AppError::Storage(_) => "Storage",
            AppError::NotFound(_) => "NotFound",
            AppError::Unauthorized(_) => "Unauthorized",
            AppError::PayloadTooLarge(_) => "PayloadTooLarge",
            AppError::RequestTimeout(_) => "RequestTimeout",
            AppError::Internal(_) | AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            AppError::InvalidInput(ref msg) => msg.clone(),
            AppError::UnsupportedFileType {
                filename,
                extension,
            } => {
                if extension.is_empty() {
                    format!("File type not allowed: {} has no extension", filename)
                } else {
                    format!("File type not allowed: {} ({})", filename, extension)
                }
            }
            AppError::FileInfected { filename, threat } => {
                format!("File rejected: virus detected in {} ({})", filename, threat)
            }
            AppError::ScanFailed { filename, .. } => {
                format!("Virus scan failed for {}", filename)
            }
            AppError::Storage(_) => "Failed to access storage".to_string(),
            AppError::NotFound(ref msg) => msg.clone(),
            AppError::Unauthorized(ref msg) => msg.clone(),
            AppError::PayloadTooLarge(ref msg) => msg.clone(),
            AppError::RequestTimeout(ref msg) => msg.clone(),
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                "Internal server error".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_metadata_not_found() {
        let err = AppError::NotFound("File not found".to_string());
        assert_eq!(err.http_status_code(), 404);
        assert_eq!(err.error_code(), "NOT_FOUND");
        assert!(!err.is_recoverable());
        assert_eq!(err.client_message(), "File not found");
        assert!(!err.is_sensitive());
        assert_eq!(err.log_level(), LogLevel::Debug);
    }

    #[test]
    fn test_error_metadata_infected_names_file() {
        let err = AppError::FileInfected {
            filename: "a.png".to_string(),
            threat: "Eicar-Test-Signature".to_string(),
        };
        assert_eq!(err.http_status_code(), 422);
        assert_eq!(err.error_code(), "FILE_INFECTED");
        assert!(err.client_message().contains("a.png"));
        assert!(err.client_message().contains("Eicar-Test-Signature"));
        assert_eq!(err.log_level(), LogLevel::Warn);
    }

    #[test]
    fn test_error_metadata_scan_failure_is_server_side() {
        let err = AppError::ScanFailed {
            filename: "report.pdf".to_string(),
            reason: "connection refused".to_string(),
        };
        assert_eq!(err.http_status_code(), 502);
        assert_eq!(err.error_code(), "SCAN_UNAVAILABLE");
        assert!(err.is_recoverable());
        assert!(err.is_sensitive());
        assert!(!err.client_message().contains("connection refused"));
    }

    #[test]
    fn test_error_metadata_unsupported_type() {
        let err = AppError::UnsupportedFileType {
            filename: "a.exe".to_string(),
            extension: ".exe".to_string(),
        };
        assert_eq!(err.http_status_code(), 400);
        assert_eq!(err.error_code(), "UNSUPPORTED_FILE_TYPE");
        assert_eq!(err.client_message(), "File type not allowed: a.exe (.exe)");

        let bare = AppError::UnsupportedFileType {
            filename: "Makefile".to_string(),
            extension: String::new(),
        };
        assert!(bare.client_message().contains("no extension"));
    }

    #[test]
    fn test_error_metadata_request_timeout() {
        let err = AppError::RequestTimeout("Request took longer than 30 seconds".to_string());
        assert_eq!(err.http_status_code(), 408);
        assert_eq!(err.error_code(), "REQUEST_TIMEOUT");
        assert!(err.is_recoverable());
        assert_eq!(err.client_message(), "Request took longer than 30 seconds");
        assert_eq!(err.log_level(), LogLevel::Warn);
    }

    #[test]
    fn test_detailed_message_includes_source_chain() {
        let err = AppError::from(anyhow::anyhow!("disk gone").context("commit failed"));
        let details = err.detailed_message();
        assert!(details.starts_with("Internal error with source"));
        assert!(details.contains("commit failed"));
        assert_eq!(err.error_type(), "Internal");
    }
}
