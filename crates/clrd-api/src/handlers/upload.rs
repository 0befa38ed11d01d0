use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{
    extract::{
        multipart::{Multipart, MultipartRejection},
        State,
    },
    response::IntoResponse,
    Json,
};
use clrd_core::models::{UploadResponse, UploadedFile};
use clrd_core::AppError;
use std::sync::Arc;

const FILE_FIELD: &str = "file";

/// Read every `file` part into memory before any filesystem work, so a
/// malformed body is rejected with nothing staged.
async fn collect_files(mut multipart: Multipart) -> Result<Vec<UploadedFile>, HttpAppError> {
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let Some(filename) = field.file_name().map(str::to_string) else {
            tracing::debug!("Ignoring file part without a filename");
            continue;
        };
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await?;

        files.push(UploadedFile::new(filename, content_type, data));
    }

    if files.is_empty() {
        return Err(AppError::InvalidInput("File is required".to_string()).into());
    }

    Ok(files)
}

#[utoipa::path(
    post,
    path = "/api/v1/upload",
    tag = "files",
    request_body(content = String, content_type = "multipart/form-data", description = "One or more parts named `file`"),
    responses(
        (status = 200, description = "All files accepted", body = UploadResponse),
        (status = 400, description = "Malformed body, missing file or unsupported file type", body = ErrorResponse),
        (status = 401, description = "Missing or invalid API key", body = ErrorResponse),
        (status = 413, description = "Request body too large", body = ErrorResponse),
        (status = 422, description = "Virus detected", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse),
        (status = 502, description = "Virus scanner unavailable", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
#[tracing::instrument(skip(state, multipart), fields(operation = "upload"))]
pub async fn upload_files(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, HttpAppError> {
    let files = collect_files(multipart?).await?;

    tracing::debug!(
        file_count = files.len(),
        total_bytes = files.iter().map(UploadedFile::size).sum::<usize>(),
        "Upload received"
    );

    let entries = state.pipeline.ingest(files).await?;
    Ok(Json(UploadResponse::success(entries)))
}
