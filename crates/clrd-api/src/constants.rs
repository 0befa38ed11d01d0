//! API constants

/// Versioned prefix for every file route
pub const API_PREFIX: &str = "/api/v1";

/// Header carrying the shared API key
pub const API_KEY_HEADER: &str = "X-API-KEY";

/// Name reported by the banner and the OpenAPI document
pub const SERVICE_NAME: &str = "CLRD File API";

pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");
