use crate::constants::{SERVICE_NAME, SERVICE_VERSION};
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct ServiceInfo {
    pub service: String,
    pub status: String,
    pub version: String,
}

#[utoipa::path(
    get,
    path = "/",
    tag = "service",
    responses(
        (status = 200, description = "Service banner", body = ServiceInfo)
    )
)]
pub async fn service_info() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        service: SERVICE_NAME.to_string(),
        status: "running".to_string(),
        version: SERVICE_VERSION.to_string(),
    })
}
