//! Location HTTP endpoints.
//!
//! - GET /api/v1/location
//! - PUT /api/v1/location

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::{AppError, ErrorResponse};
use crate::models::LocationRecord;
use crate::routes::AppState;

/// The location all astronomy data is computed for.
#[derive(Debug, Serialize, ToSchema)]
pub struct LocationResponse {
    /// Latitude in degrees (-90 to 90)
    pub latitude: f64,
    /// Longitude in degrees (-180 to 180)
    pub longitude: f64,
    /// IANA timezone id (e.g. "Europe/Warsaw")
    pub timezone: String,
    pub city: String,
    pub country: String,
    /// When the location was last changed (ISO 8601)
    pub updated_at: String,
}

impl From<&LocationRecord> for LocationResponse {
    fn from(location: &LocationRecord) -> Self {
        Self {
            latitude: location.latitude,
            longitude: location.longitude,
            timezone: location.timezone_id.clone(),
            city: location.city.clone(),
            country: location.country.clone(),
            updated_at: location.updated_at.to_rfc3339(),
        }
    }
}

/// New coordinates; the timezone is looked up from them.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateLocationRequest {
    pub latitude: f64,
    pub longitude: f64,
}

/// Get the current location.
#[utoipa::path(
    get,
    path = "/api/v1/location",
    tag = "Location",
    responses(
        (status = 200, description = "Current location", body = LocationResponse),
    )
)]
pub async fn get_location(State(state): State<AppState>) -> Json<LocationResponse> {
    Json(LocationResponse::from(state.location().as_ref()))
}

/// Change the location.
///
/// The new location is kept even if prefetching its astronomy data fails;
/// the next astronomy request retries the fetch.
#[utoipa::path(
    put,
    path = "/api/v1/location",
    tag = "Location",
    request_body = UpdateLocationRequest,
    responses(
        (status = 200, description = "Location updated", body = LocationResponse),
        (status = 400, description = "Coordinates out of range", body = ErrorResponse),
        (status = 502, description = "Timezone lookup failed", body = ErrorResponse),
    )
)]
pub async fn update_location(
    State(state): State<AppState>,
    Json(request): Json<UpdateLocationRequest>,
) -> Result<Json<LocationResponse>, AppError> {
    let location = state
        .update_location(request.latitude, request.longitude)
        .await?;
    Ok(Json(LocationResponse::from(location.as_ref())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::tests::offline_state;

    #[tokio::test]
    async fn test_get_location() {
        let Json(location) = get_location(State(offline_state())).await;
        assert_eq!(location.latitude, 52.2298);
        assert_eq!(location.timezone, "Europe/Warsaw");
        assert_eq!(location.city, "Warsaw");
        assert_eq!(location.country, "Poland");
    }

    #[tokio::test]
    async fn test_update_location_rejects_out_of_range() {
        let request = UpdateLocationRequest {
            latitude: 12.0,
            longitude: 181.0,
        };
        let result = update_location(State(offline_state()), Json(request)).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_update_location_fails_when_lookup_unreachable() {
        let state = offline_state();
        let request = UpdateLocationRequest {
            latitude: 35.6762,
            longitude: 139.6503,
        };
        let result = update_location(State(state.clone()), Json(request)).await;
        assert!(matches!(result, Err(AppError::ExternalServiceError(_))));
        assert_eq!(state.location().city, "Warsaw");
    }
}
