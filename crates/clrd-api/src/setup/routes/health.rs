//! Health check handlers and response types.

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(5);

/// Run an async check with timeout; returns status string "healthy", "timeout", or "{prefix}: {error}".
async fn run_check<F, E>(timeout: Duration, f: F, error_prefix: &str) -> String
where
    F: Future<Output = Result<(), E>>,
    E: Display,
{
    match tokio::time::timeout(timeout, f).await {
        Ok(Ok(())) => "healthy".to_string(),
        Ok(Err(e)) => format!("{}: {}", error_prefix, e),
        Err(_) => "timeout".to_string(),
    }
}

#[derive(serde::Serialize)]
pub(super) struct HealthCheckResponse {
    pub status: String,
    pub storage: String,
    pub scanner: String,
    pub scanner_backend: &'static str,
}

/// Liveness probe - process is running.
pub async fn liveness_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({ "status": "alive" })),
    )
}

/// Storage roots present and the scanner reachable.
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let scanner = state.pipeline.scanner();

    let storage = run_check(TIMEOUT, state.storage.health_check(), "unhealthy").await;
    let scanner_status = run_check(
        TIMEOUT,
        async {
            if scanner.is_available().await {
                Ok(())
            } else {
                Err("not reachable")
            }
        },
        "unavailable",
    )
    .await;

    let healthy = storage == "healthy" && scanner_status == "healthy";
    if !healthy {
        tracing::warn!(storage = %storage, scanner = %scanner_status, "Health check degraded");
    }

    let response = HealthCheckResponse {
        status: if healthy { "healthy" } else { "degraded" }.to_string(),
        storage,
        scanner: scanner_status,
        scanner_backend: scanner.name(),
    };

    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(response))
}
