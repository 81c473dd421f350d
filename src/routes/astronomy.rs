//! Astronomy HTTP endpoints.
//!
//! - GET /api/v1/astronomy/instant
//! - GET /api/v1/astronomy/weekly
//!
//! Instants are rendered in the location's timezone (RFC 3339 with offset).

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use utoipa::ToSchema;

use crate::errors::{AppError, ErrorResponse};
use crate::helpers::format_duration;
use crate::models::{DailyRecord, InstantRecord, MoonPhase, MoonPhaseEvent, TwilightTimes, WeeklyRecord};
use crate::routes::{stale_headers, AppState};

fn local(at: DateTime<Utc>, tz: &Tz) -> String {
    at.with_timezone(tz).to_rfc3339()
}

fn opt_local(at: Option<DateTime<Utc>>, tz: &Tz) -> Option<String> {
    at.map(|at| local(at, tz))
}

/// Upcoming major moon phase.
#[derive(Debug, Serialize, ToSchema)]
pub struct MoonPhaseEventResponse {
    pub phase: MoonPhase,
    /// Opaque key for the phase's image resource (e.g. "moon/full_moon")
    pub resource_key: String,
    /// When the phase occurs (ISO 8601, local offset)
    pub at: String,
}

impl MoonPhaseEventResponse {
    fn new(event: &MoonPhaseEvent, tz: &Tz) -> Self {
        Self {
            phase: event.phase,
            resource_key: event.phase.resource_key().to_string(),
            at: local(event.at, tz),
        }
    }
}

/// Sun and moon state at the moment of the last refresh.
#[derive(Debug, Serialize, ToSchema)]
pub struct InstantResponse {
    /// Local date (YYYY-MM-DD)
    pub date: String,
    /// Local time of day of the snapshot
    pub current_time: String,
    /// IANA timezone the local values refer to
    pub timezone: String,
    /// Sun altitude above the horizon in degrees
    pub sun_altitude: f64,
    /// Distance to the sun in km
    pub sun_distance: f64,
    /// Sun azimuth in degrees (0 = north)
    pub sun_azimuth: f64,
    pub moon_altitude: f64,
    pub moon_distance: f64,
    pub moon_azimuth: f64,
    pub moon_parallactic_angle: f64,
    /// Illuminated fraction of the moon's disc in percent
    pub moon_illumination_pct: f64,
    /// Days since the last new moon
    pub lunar_age_days: f64,
    pub moon_phase: MoonPhase,
    pub moon_phase_resource_key: String,
    /// Next occurrence of each major phase, soonest first
    pub next_moon_phases: Vec<MoonPhaseEventResponse>,
    /// When this snapshot was fetched (ISO 8601)
    pub updated_at: String,
}

impl InstantResponse {
    pub fn new(record: &InstantRecord, tz: &Tz) -> Self {
        Self {
            date: record.date.format("%Y-%m-%d").to_string(),
            current_time: record.current_time.format("%H:%M:%S").to_string(),
            timezone: tz.name().to_string(),
            sun_altitude: record.sun_altitude,
            sun_distance: record.sun_distance,
            sun_azimuth: record.sun_azimuth,
            moon_altitude: record.moon_altitude,
            moon_distance: record.moon_distance,
            moon_azimuth: record.moon_azimuth,
            moon_parallactic_angle: record.moon_parallactic_angle,
            moon_illumination_pct: record.moon_illumination_pct,
            lunar_age_days: record.lunar_age_days,
            moon_phase: record.moon_phase,
            moon_phase_resource_key: record.moon_phase.resource_key().to_string(),
            next_moon_phases: record
                .next_moon_phases
                .iter()
                .map(|event| MoonPhaseEventResponse::new(event, tz))
                .collect(),
            updated_at: record.updated_at.to_rfc3339(),
        }
    }
}

/// Twilight windows on one side of the day. Null when the window does not occur.
#[derive(Debug, Serialize, ToSchema)]
pub struct TwilightResponse {
    pub astronomical_begin: Option<String>,
    pub astronomical_end: Option<String>,
    pub nautical_begin: Option<String>,
    pub nautical_end: Option<String>,
    pub civil_begin: Option<String>,
    pub civil_end: Option<String>,
    pub blue_hour_begin: Option<String>,
    pub blue_hour_end: Option<String>,
    pub golden_hour_begin: Option<String>,
    pub golden_hour_end: Option<String>,
}

impl TwilightResponse {
    fn new(times: &TwilightTimes, tz: &Tz) -> Self {
        Self {
            astronomical_begin: opt_local(times.astronomical_begin, tz),
            astronomical_end: opt_local(times.astronomical_end, tz),
            nautical_begin: opt_local(times.nautical_begin, tz),
            nautical_end: opt_local(times.nautical_end, tz),
            civil_begin: opt_local(times.civil_begin, tz),
            civil_end: opt_local(times.civil_end, tz),
            blue_hour_begin: opt_local(times.blue_hour_begin, tz),
            blue_hour_end: opt_local(times.blue_hour_end, tz),
            golden_hour_begin: opt_local(times.golden_hour_begin, tz),
            golden_hour_end: opt_local(times.golden_hour_end, tz),
        }
    }
}

/// One day of the weekly overview.
#[derive(Debug, Serialize, ToSchema)]
pub struct DailyResponse {
    /// Local date (YYYY-MM-DD)
    pub date: String,
    /// Time between sunrise and sunset (HH:MM:SS)
    pub day_length: String,
    /// 24h minus the day length (HH:MM:SS)
    pub night_length: String,
    /// Null on polar days/nights
    pub sunrise: Option<String>,
    pub sunset: Option<String>,
    pub morning: TwilightResponse,
    pub evening: TwilightResponse,
    pub moonrise: Option<String>,
    pub moonset: Option<String>,
    pub sun_altitude: f64,
    pub sun_distance: f64,
    pub sun_azimuth: f64,
    pub moon_altitude: f64,
    pub moon_distance: f64,
    pub moon_azimuth: f64,
    pub moon_parallactic_angle: f64,
    pub moon_illumination_pct: f64,
    /// Days since the last new moon, at local noon
    pub lunar_age_days: f64,
    /// Moon phase at local noon
    pub moon_phase: MoonPhase,
    pub moon_phase_resource_key: String,
}

impl DailyResponse {
    fn new(day: &DailyRecord, tz: &Tz) -> Self {
        Self {
            date: day.date.format("%Y-%m-%d").to_string(),
            day_length: format_duration(day.day_length),
            night_length: format_duration(day.night_length),
            sunrise: opt_local(day.sunrise, tz),
            sunset: opt_local(day.sunset, tz),
            morning: TwilightResponse::new(&day.morning, tz),
            evening: TwilightResponse::new(&day.evening, tz),
            moonrise: opt_local(day.moonrise, tz),
            moonset: opt_local(day.moonset, tz),
            sun_altitude: day.sun_altitude,
            sun_distance: day.sun_distance,
            sun_azimuth: day.sun_azimuth,
            moon_altitude: day.moon_altitude,
            moon_distance: day.moon_distance,
            moon_azimuth: day.moon_azimuth,
            moon_parallactic_angle: day.moon_parallactic_angle,
            moon_illumination_pct: day.moon_illumination_pct,
            lunar_age_days: day.lunar_age_days,
            moon_phase: day.moon_phase,
            moon_phase_resource_key: day.moon_phase.resource_key().to_string(),
        }
    }
}

/// Seven days of sun and moon events, from yesterday to five days ahead.
#[derive(Debug, Serialize, ToSchema)]
pub struct WeeklyResponse {
    /// IANA timezone the local values refer to
    pub timezone: String,
    pub days: Vec<DailyResponse>,
    /// When this snapshot was fetched (ISO 8601)
    pub updated_at: String,
}

impl WeeklyResponse {
    pub fn new(record: &WeeklyRecord, tz: &Tz) -> Self {
        Self {
            timezone: tz.name().to_string(),
            days: record.days.iter().map(|day| DailyResponse::new(day, tz)).collect(),
            updated_at: record.updated_at.to_rfc3339(),
        }
    }
}

/// Current sun and moon state.
///
/// Served from cache while younger than the configured TTL. If a refresh
/// fails and an older snapshot exists, that snapshot is returned with the
/// `X-Astronomy-Stale: true` header.
#[utoipa::path(
    get,
    path = "/api/v1/astronomy/instant",
    tag = "Astronomy",
    responses(
        (status = 200, description = "Current sun and moon state", body = InstantResponse,
         headers(
             ("X-Astronomy-Stale" = String, description = "Set to 'true' when serving cached data because the provider is unreachable")
         )),
        (status = 502, description = "Provider unreachable or returned invalid data, nothing cached", body = ErrorResponse),
    )
)]
pub async fn get_instant(
    State(state): State<AppState>,
) -> Result<(HeaderMap, Json<InstantResponse>), AppError> {
    let refreshed = state.fresh_instant().await?;
    let location = state.location();
    let response = InstantResponse::new(&refreshed.record, &location.timezone);
    Ok((stale_headers(refreshed.is_stale()), Json(response)))
}

/// Sun and moon events for the surrounding week.
///
/// Refreshed once per UTC day. Stale fallback as for the instant endpoint.
#[utoipa::path(
    get,
    path = "/api/v1/astronomy/weekly",
    tag = "Astronomy",
    responses(
        (status = 200, description = "Daily sun and moon events", body = WeeklyResponse,
         headers(
             ("X-Astronomy-Stale" = String, description = "Set to 'true' when serving cached data because the provider is unreachable")
         )),
        (status = 502, description = "Provider unreachable or returned invalid data, nothing cached", body = ErrorResponse),
    )
)]
pub async fn get_weekly(
    State(state): State<AppState>,
) -> Result<(HeaderMap, Json<WeeklyResponse>), AppError> {
    let refreshed = state.fresh_weekly().await?;
    let location = state.location();
    let response = WeeklyResponse::new(&refreshed.record, &location.timezone);
    Ok((stale_headers(refreshed.is_stale()), Json(response)))
}
