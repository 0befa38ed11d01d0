//! Per-request deadline that answers with the JSON error envelope.

use crate::error::HttpAppError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use clrd_core::AppError;
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug)]
pub struct RequestTimeout(pub Duration);

/// Drop the inner future once the deadline passes and answer 408.
///
/// Only the time to produce response headers is bounded; a streaming body
/// already handed to the client is not cut off.
pub async fn request_timeout_middleware(
    State(RequestTimeout(limit)): State<RequestTimeout>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    match tokio::time::timeout(limit, next.run(request)).await {
        Ok(response) => response,
        Err(_) => {
            tracing::warn!(
                method = %method,
                path = %path,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Request timed out"
            );
            HttpAppError(AppError::RequestTimeout(format!(
                "Request took longer than {} seconds",
                limit.as_secs_f64()
            )))
            .into_response()
        }
    }
}
