use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Path, Query, Request, State},
    http::{header, HeaderMap, HeaderValue, Response, StatusCode},
};
use chrono::{DateTime, Utc};
use clrd_core::AppError;
use clrd_services::{Disposition, RetrievedFile};
use serde::Deserialize;
use std::sync::Arc;
use tokio_util::io::ReaderStream;
use tower::ServiceExt;
use tower_http::services::ServeFile;
use utoipa::IntoParams;

const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FileQuery {
    /// `true` (or `1`) serves the file as an attachment
    pub download: Option<String>,
}

impl FileQuery {
    fn disposition(&self) -> Disposition {
        let download = self
            .download
            .as_deref()
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false);
        Disposition::from_download_flag(download)
    }
}

/// Range and date-conditional requests are answered by `ServeFile`.
fn needs_file_service(headers: &HeaderMap) -> bool {
    headers.contains_key(header::RANGE)
        || headers.contains_key(header::IF_MODIFIED_SINCE)
        || headers.contains_key(header::IF_UNMODIFIED_SINCE)
}

fn header_value(value: &str) -> Result<HeaderValue, HttpAppError> {
    HeaderValue::from_str(value).map_err(|e| {
        HttpAppError(AppError::from(
            anyhow::Error::new(e).context(format!("Invalid header value {:?}", value)),
        ))
    })
}

#[utoipa::path(
    get,
    path = "/api/v1/files/{id}",
    tag = "files",
    params(
        ("id" = String, Path, description = "File identifier"),
        FileQuery
    ),
    responses(
        (status = 200, description = "File content", content_type = "application/octet-stream"),
        (status = 206, description = "Partial content for a Range request"),
        (status = 401, description = "Missing or invalid API key", body = ErrorResponse),
        (status = 404, description = "File not found", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
#[tracing::instrument(skip(state, query, request), fields(file_id = %id, operation = "get_file"))]
pub async fn get_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<FileQuery>,
    request: Request,
) -> Result<Response<Body>, HttpAppError> {
    let retrieved = state.files.retrieve(&id, query.disposition()).await?;

    let content_type = header_value(&retrieved.content_type)?;
    let content_disposition =
        header_value(&retrieved.disposition.header_value(&retrieved.file_name))?;

    if needs_file_service(request.headers()) {
        return serve_partial(retrieved, request, content_type, content_disposition).await;
    }

    let RetrievedFile {
        file,
        size,
        modified,
        ..
    } = retrieved;

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_DISPOSITION, content_disposition)
        .header(header::CONTENT_LENGTH, size)
        .header(header::ACCEPT_RANGES, "bytes");

    if let Some(modified) = modified {
        let modified: DateTime<Utc> = modified.into();
        builder = builder.header(
            header::LAST_MODIFIED,
            modified.format(HTTP_DATE_FORMAT).to_string(),
        );
    }

    builder
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| {
            HttpAppError(AppError::from(
                anyhow::Error::new(e).context("Failed to build response"),
            ))
        })
}

async fn serve_partial(
    retrieved: RetrievedFile,
    request: Request,
    content_type: HeaderValue,
    content_disposition: HeaderValue,
) -> Result<Response<Body>, HttpAppError> {
    let RetrievedFile { path, file, .. } = retrieved;
    drop(file);

    let response = ServeFile::new(&path)
        .oneshot(request)
        .await
        .unwrap_or_else(|never| match never {});

    if response.status() == StatusCode::NOT_FOUND {
        return Err(AppError::NotFound("File not found".to_string()).into());
    }

    let (mut parts, body) = response.into_parts();
    if parts.status.is_success() {
        parts.headers.insert(header::CONTENT_TYPE, content_type);
        parts
            .headers
            .insert(header::CONTENT_DISPOSITION, content_disposition);
    }

    tracing::debug!(path = %path.display(), status = %parts.status, "Served via ServeFile");
    Ok(Response::from_parts(parts, Body::new(body)))
}
