//! OpenAPI documentation, served at `/api/openapi.json` and rendered by RapiDoc at `/docs`.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::constants::API_KEY_HEADER;
use crate::error;
use crate::handlers;
use clrd_core::models;

struct ApiKeyScheme;

impl Modify for ApiKeyScheme {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "api_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(API_KEY_HEADER))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "CLRD File API",
        description = "File intake service: uploads are checked against an extension allow-list and virus scanned before they are stored. Stored files can be retrieved or deleted by identifier."
    ),
    paths(
        handlers::root::service_info,
        handlers::upload::upload_files,
        handlers::file_get::get_file,
        handlers::file_delete::delete_file,
    ),
    components(schemas(
        models::UploadResponse,
        models::UploadResponseEntry,
        models::StatusResponse,
        models::ResponseStatus,
        error::ErrorResponse,
        handlers::root::ServiceInfo,
    )),
    modifiers(&ApiKeyScheme),
    tags(
        (name = "files", description = "Upload, retrieval and deletion"),
        (name = "service", description = "Service information")
    )
)]
pub struct ApiDoc;
