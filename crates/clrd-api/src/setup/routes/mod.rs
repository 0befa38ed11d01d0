//! Route configuration and setup

mod health;

use crate::api_doc::ApiDoc;
use crate::auth::{api_key_middleware, AuthState};
use crate::constants::API_PREFIX;
use crate::error::set_hide_error_details;
use crate::handlers;
use crate::middleware::{request_timeout_middleware, RequestTimeout};
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, post},
    Json, Router,
};
use clrd_core::Config;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

pub use health::{health_check, liveness_check};

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    set_hide_error_details(config.is_production());

    let cors = setup_cors(config)?;
    let auth_state = Arc::new(AuthState::new(config.api_key()));

    let protected_routes = protected_routes().layer(axum::middleware::from_fn_with_state(
        auth_state,
        api_key_middleware,
    ));

    let app = public_routes()
        .merge(protected_routes)
        .with_state(state)
        .route(
            "/api/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        .merge(utoipa_rapidoc::RapiDoc::new("/api/openapi.json").path("/docs"))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(config.max_upload_size_bytes()))
        .layer(axum::middleware::from_fn_with_state(
            RequestTimeout(Duration::from_secs(config.request_timeout_secs())),
            request_timeout_middleware,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    tracing::info!(
        max_upload_size_mb = config.max_upload_size_bytes() / 1024 / 1024,
        request_timeout_secs = config.request_timeout_secs(),
        "Routes configured"
    );

    Ok(app)
}

/// Setup CORS configuration
fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let methods = [Method::GET, Method::POST, Method::DELETE, Method::OPTIONS];

    let cors = if config.cors_origins().iter().any(|o| o == "*") {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any)
    } else {
        let origins = config
            .cors_origins()
            .iter()
            .map(|o| o.parse::<HeaderValue>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!("Invalid CORS origin: {}", e))?;

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(Any)
    };
    Ok(cors)
}

/// Public routes (no authentication required)
fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(handlers::root::service_info))
        .route("/health", get(health_check))
        .route("/live", get(liveness_check))
}

/// Protected routes (require `X-API-KEY`)
fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &format!("{}/upload", API_PREFIX),
            post(handlers::upload::upload_files),
        )
        .route(
            &format!("{}/files/{{id}}", API_PREFIX),
            get(handlers::file_get::get_file).delete(handlers::file_delete::delete_file),
        )
}
