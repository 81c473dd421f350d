//! Upstream collaborators and the raw records they return.
//!
//! The refresh coordinator only depends on these traits; `services::ipgeo`
//! implements them over HTTP and tests substitute in-memory fakes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Deserialize;

use crate::errors::AppError;

/// Raw astronomy record as sent by the provider.
///
/// Times are local wall-clock strings in the requested timezone. Every field
/// is optional: the provider omits or nulls values it cannot compute.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawAstronomy {
    pub date: Option<String>,
    pub current_time: Option<String>,
    pub sunrise: Option<String>,
    pub sunset: Option<String>,
    pub day_length: Option<String>,
    pub morning: RawTwilight,
    pub evening: RawTwilight,
    pub sun_altitude: Option<f64>,
    pub sun_distance: Option<f64>,
    pub sun_azimuth: Option<f64>,
    pub moonrise: Option<String>,
    pub moonset: Option<String>,
    pub moon_altitude: Option<f64>,
    pub moon_distance: Option<f64>,
    pub moon_azimuth: Option<f64>,
    pub moon_parallactic_angle: Option<f64>,
    pub moon_illumination_percentage: Option<String>,
}

/// Twilight window boundaries on one side of the day.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawTwilight {
    pub astronomical_twilight_begin: Option<String>,
    pub astronomical_twilight_end: Option<String>,
    pub nautical_twilight_begin: Option<String>,
    pub nautical_twilight_end: Option<String>,
    pub civil_twilight_begin: Option<String>,
    pub civil_twilight_end: Option<String>,
    pub blue_hour_begin: Option<String>,
    pub blue_hour_end: Option<String>,
    pub golden_hour_begin: Option<String>,
    pub golden_hour_end: Option<String>,
}

/// Place the provider resolved the coordinates to.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawPlace {
    pub city: Option<String>,
    pub country_name: Option<String>,
}

/// Response of the single-moment astronomy endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawInstantResponse {
    pub location: Option<RawPlace>,
    pub astronomy: Option<RawAstronomy>,
}

/// Source of sun/moon data for a location.
#[async_trait]
pub trait AstronomyProvider: Send + Sync {
    /// Astronomy for the current moment at the given coordinates.
    async fn fetch_instant(
        &self,
        latitude: f64,
        longitude: f64,
        timezone_id: &str,
    ) -> Result<RawInstantResponse, AppError>;

    /// One record per local day between `from` and `to` inclusive.
    /// Slots the provider sends as `null` are kept as `None`.
    async fn fetch_daily_range(
        &self,
        latitude: f64,
        longitude: f64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        timezone_id: &str,
    ) -> Result<Vec<Option<RawAstronomy>>, AppError>;
}

/// Lookup of the timezone in force at a coordinate.
#[async_trait]
pub trait TimezoneResolver: Send + Sync {
    /// Returns the IANA id and the parsed timezone.
    async fn resolve_timezone(&self, latitude: f64, longitude: f64)
        -> Result<(String, Tz), AppError>;
}

/// Parse an IANA timezone id reported by an upstream service.
pub fn parse_timezone_id(id: &str) -> Result<Tz, AppError> {
    id.trim()
        .parse::<Tz>()
        .map_err(|e| AppError::ExternalServiceError(format!("unknown timezone '{}': {}", id, e)))
}
