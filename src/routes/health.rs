use axum::extract::State;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::routes::AppState;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status, always "ok" while the process serves requests
    pub status: String,
    /// API version
    pub version: String,
    /// Whether an instant snapshot is cached (fresh or not)
    pub instant_cached: bool,
    /// Whether a weekly snapshot is cached (fresh or not)
    pub weekly_cached: bool,
}

/// Health check endpoint.
///
/// Never calls the provider: reports what the cache currently holds.
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let store = state.store();
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        instant_cached: store.instant().is_some(),
        weekly_cached: store.weekly().is_some(),
    })
}
