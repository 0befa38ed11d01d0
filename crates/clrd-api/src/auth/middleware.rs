use crate::constants::API_KEY_HEADER;
use crate::error::HttpAppError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use clrd_core::AppError;
use std::sync::Arc;
use subtle::ConstantTimeEq;

#[derive(Clone)]
pub struct AuthState {
    pub api_key: String,
}

impl AuthState {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }
}

fn secure_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Reject requests whose `X-API-KEY` header does not match the configured key.
pub async fn api_key_middleware(
    State(auth_state): State<Arc<AuthState>>,
    request: Request,
    next: Next,
) -> Response {
    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|h| h.to_str().ok());

    match provided {
        None => {
            tracing::debug!(
                method = %request.method(),
                path = %request.uri().path(),
                "Missing API key"
            );
            HttpAppError(AppError::Unauthorized(format!(
                "Missing {} header",
                API_KEY_HEADER
            )))
            .into_response()
        }
        Some(key) if !secure_compare(key, &auth_state.api_key) => {
            tracing::warn!(
                method = %request.method(),
                path = %request.uri().path(),
                "Invalid API key"
            );
            HttpAppError(AppError::Unauthorized("Invalid API key".to_string())).into_response()
        }
        Some(_) => next.run(request).await,
    }
}
