use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use clrd_core::models::StatusResponse;
use std::sync::Arc;

#[utoipa::path(
    delete,
    path = "/api/v1/files/{id}",
    tag = "files",
    params(
        ("id" = String, Path, description = "File identifier")
    ),
    responses(
        (status = 200, description = "File deleted", body = StatusResponse),
        (status = 401, description = "Missing or invalid API key", body = ErrorResponse),
        (status = 404, description = "File not found", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
#[tracing::instrument(skip(state), fields(file_id = %id, operation = "delete_file"))]
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    state.files.delete(&id).await?;
    Ok(Json(StatusResponse::success("File deleted successfully")))
}
