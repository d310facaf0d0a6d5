//! Liveness endpoints.

use axum::Json;
use serde::Serialize;
use utoipa::{OpenApi, ToSchema};

#[derive(Debug, Serialize, ToSchema)]
pub struct ServiceHealth {
    pub success: bool,
    pub message: String,
    pub version: String,
    pub status: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiHealth {
    pub status: String,
    pub message: String,
}

#[derive(OpenApi)]
#[openapi(paths(service_health, api_health), tags((name = "Health")))]
pub(crate) struct HealthApi;

/// Service-level health check, also served at `/`
#[utoipa::path(
    get,
    path = "/health/",
    tag = "Health",
    responses((status = 200, description = "Service is running", body = ServiceHealth))
)]
pub async fn service_health() -> Json<ServiceHealth> {
    Json(ServiceHealth {
        success: true,
        message: "Bookstore API is running successfully".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "healthy".to_string(),
    })
}

/// Health check under the versioned API prefix
#[utoipa::path(
    get,
    path = "/api/v1/health/",
    tag = "Health",
    responses((status = 200, description = "API is healthy", body = ApiHealth))
)]
pub async fn api_health() -> Json<ApiHealth> {
    Json(ApiHealth {
        status: "healthy".to_string(),
        message: "API is running correctly".to_string(),
    })
}
