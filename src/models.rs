//! Immutable cache records.
//!
//! Records are built once by the mapper and shared as `Arc<T>`; a refresh
//! publishes a whole new record instead of touching fields of the old one.
//! Every instant stored here is UTC.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use utoipa::ToSchema;

use crate::errors::AppError;

/// Number of daily records in a weekly snapshot (yesterday through five days ahead).
pub const WEEK_LEN: usize = 7;

/// Moon phase category, in cyclic order starting at new moon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MoonPhase {
    NewMoon,
    WaxingCrescent,
    FirstQuarter,
    WaxingGibbous,
    FullMoon,
    WaningGibbous,
    LastQuarter,
    WaningCrescent,
}

impl MoonPhase {
    /// The four principal phases, in cycle order.
    pub const MAJOR: [MoonPhase; 4] = [
        MoonPhase::NewMoon,
        MoonPhase::FirstQuarter,
        MoonPhase::FullMoon,
        MoonPhase::LastQuarter,
    ];

    /// Opaque key a presentation layer can resolve to an icon or image.
    pub fn resource_key(self) -> &'static str {
        match self {
            MoonPhase::NewMoon => "moon/new_moon",
            MoonPhase::WaxingCrescent => "moon/waxing_crescent",
            MoonPhase::FirstQuarter => "moon/first_quarter",
            MoonPhase::WaxingGibbous => "moon/waxing_gibbous",
            MoonPhase::FullMoon => "moon/full_moon",
            MoonPhase::WaningGibbous => "moon/waning_gibbous",
            MoonPhase::LastQuarter => "moon/last_quarter",
            MoonPhase::WaningCrescent => "moon/waning_crescent",
        }
    }
}

/// Next occurrence of a major moon phase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoonPhaseEvent {
    pub phase: MoonPhase,
    pub at: DateTime<Utc>,
}

/// Reject coordinates outside −90..90 / −180..180 (and non-finite values).
pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), AppError> {
    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
        return Err(AppError::BadRequest(format!(
            "latitude must be between -90 and 90, got {}",
            latitude
        )));
    }
    if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
        return Err(AppError::BadRequest(format!(
            "longitude must be between -180 and 180, got {}",
            longitude
        )));
    }
    Ok(())
}

/// The single location astronomy data is served for.
#[derive(Debug, Clone)]
pub struct LocationRecord {
    pub latitude: f64,
    pub longitude: f64,
    /// IANA id, e.g. `Europe/Warsaw`.
    pub timezone_id: String,
    pub timezone: Tz,
    pub city: String,
    pub country: String,
    pub updated_at: DateTime<Utc>,
}

impl LocationRecord {
    pub fn new(
        latitude: f64,
        longitude: f64,
        timezone: Tz,
        city: impl Into<String>,
        country: impl Into<String>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, AppError> {
        validate_coordinates(latitude, longitude)?;
        Ok(Self {
            latitude,
            longitude,
            timezone_id: timezone.name().to_string(),
            timezone,
            city: city.into(),
            country: country.into(),
            updated_at,
        })
    }

    /// Same coordinates and timezone with a new city/country.
    pub fn with_place(&self, city: &str, country: &str, updated_at: DateTime<Utc>) -> Self {
        Self {
            city: city.to_string(),
            country: country.to_string(),
            updated_at,
            ..self.clone()
        }
    }
}

/// Sun and moon state at the moment of the last refresh.
#[derive(Debug, Clone)]
pub struct InstantRecord {
    /// Provider's local date of the snapshot.
    pub date: NaiveDate,
    /// Provider's local time of day of the snapshot.
    pub current_time: NaiveTime,
    pub sun_altitude: f64,
    pub sun_distance: f64,
    pub sun_azimuth: f64,
    pub moon_altitude: f64,
    pub moon_distance: f64,
    pub moon_azimuth: f64,
    pub moon_parallactic_angle: f64,
    pub moon_illumination_pct: f64,
    pub lunar_age_days: f64,
    pub moon_phase: MoonPhase,
    /// Sorted by time, one entry per major phase.
    pub next_moon_phases: Vec<MoonPhaseEvent>,
    pub updated_at: DateTime<Utc>,
}

/// Begin/end instants of the twilight windows on one side of the day.
///
/// Any value may be absent: the provider omits events that do not happen and
/// local times inside a DST gap have no instant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TwilightTimes {
    pub astronomical_begin: Option<DateTime<Utc>>,
    pub astronomical_end: Option<DateTime<Utc>>,
    pub nautical_begin: Option<DateTime<Utc>>,
    pub nautical_end: Option<DateTime<Utc>>,
    pub civil_begin: Option<DateTime<Utc>>,
    pub civil_end: Option<DateTime<Utc>>,
    pub blue_hour_begin: Option<DateTime<Utc>>,
    pub blue_hour_end: Option<DateTime<Utc>>,
    pub golden_hour_begin: Option<DateTime<Utc>>,
    pub golden_hour_end: Option<DateTime<Utc>>,
}

/// One local calendar day of sun and moon data.
#[derive(Debug, Clone)]
pub struct DailyRecord {
    pub date: NaiveDate,
    pub sun_altitude: f64,
    pub sun_distance: f64,
    pub sun_azimuth: f64,
    pub day_length: TimeDelta,
    pub sunrise: Option<DateTime<Utc>>,
    pub sunset: Option<DateTime<Utc>>,
    pub morning: TwilightTimes,
    pub evening: TwilightTimes,
    pub moonrise: Option<DateTime<Utc>>,
    pub moonset: Option<DateTime<Utc>>,
    pub moon_altitude: f64,
    pub moon_distance: f64,
    pub moon_azimuth: f64,
    pub moon_parallactic_angle: f64,
    pub moon_illumination_pct: f64,
    /// Always `24h - day_length`.
    pub night_length: TimeDelta,
    /// Lunar age at local noon.
    pub lunar_age_days: f64,
    /// Moon phase at local noon.
    pub moon_phase: MoonPhase,
}

/// Seven consecutive days, yesterday through five days ahead.
#[derive(Debug, Clone)]
pub struct WeeklyRecord {
    pub days: Vec<DailyRecord>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_coordinates() {
        assert!(validate_coordinates(52.2298, 21.0117).is_ok());
        assert!(validate_coordinates(-90.0, 180.0).is_ok());
        assert!(matches!(
            validate_coordinates(90.5, 0.0),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            validate_coordinates(0.0, -180.1),
            Err(AppError::BadRequest(_))
        ));
        assert!(validate_coordinates(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_location_record_takes_iana_id_from_timezone() {
        let loc = LocationRecord::new(
            52.2298,
            21.0117,
            chrono_tz::Europe::Warsaw,
            "Warsaw",
            "Poland",
            Utc::now(),
        )
        .unwrap();
        assert_eq!(loc.timezone_id, "Europe/Warsaw");
    }

    #[test]
    fn test_with_place_keeps_coordinates() {
        let loc = LocationRecord::new(
            53.0138,
            18.5984,
            chrono_tz::Europe::Warsaw,
            "Warsaw",
            "Poland",
            Utc::now(),
        )
        .unwrap();
        let renamed = loc.with_place("Torun", "Poland", Utc::now());
        assert_eq!(renamed.city, "Torun");
        assert_eq!(renamed.latitude, 53.0138);
        assert_eq!(renamed.timezone, chrono_tz::Europe::Warsaw);
    }

    #[test]
    fn test_resource_keys_are_distinct() {
        let all = [
            MoonPhase::NewMoon,
            MoonPhase::WaxingCrescent,
            MoonPhase::FirstQuarter,
            MoonPhase::WaxingGibbous,
            MoonPhase::FullMoon,
            MoonPhase::WaningGibbous,
            MoonPhase::LastQuarter,
            MoonPhase::WaningCrescent,
        ];
        let keys: std::collections::HashSet<_> = all.iter().map(|p| p.resource_key()).collect();
        assert_eq!(keys.len(), 8);
    }
}
