use crate::{
    app::{
        server::dto::{HealthResponse, ServiceInfo},
        state::AppState,
    },
    config::{SERVICE_NAME, VERSION},
    core::service::face::dto::SystemStats,
    error::FaceprintError,
};
use axum::{extract::State, response::Redirect, Json};

#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Vector database unreachable")
    ),
    tag = "Health"
)]
pub(super) async fn health(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, FaceprintError> {
    state.services.face.health().await?;
    Ok(Json(HealthResponse {
        status: String::from("healthy"),
        timestamp: chrono::Utc::now(),
        version: VERSION.to_string(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/stats",
    responses(
        (status = 200, description = "Collection and model information", body = SystemStats),
        (status = 500, description = "Internal server error"),
        (status = 503, description = "Vector database unavailable")
    ),
    tag = "System"
)]
pub(super) async fn stats(
    State(state): State<AppState>,
) -> Result<Json<SystemStats>, FaceprintError> {
    Ok(Json(state.services.face.stats().await?))
}

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service information", body = ServiceInfo)
    ),
    tag = "Health"
)]
pub(super) async fn service_info() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        message: SERVICE_NAME.to_string(),
        version: VERSION.to_string(),
        docs: String::from("/docs"),
        health: String::from("/api/health"),
    })
}

pub(super) async fn health_redirect() -> Redirect {
    Redirect::temporary("/api/health")
}
