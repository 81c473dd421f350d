//! Builds cache records from raw provider data.
//!
//! Pure functions (no I/O). Hard errors (`AppError::InvalidData`) are reserved
//! for data the record cannot exist without: the record itself, its date, the
//! day length and the illumination percentage. Event times that are missing or
//! fall into a DST gap become `None` on the record.

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use chrono_tz::Tz;

use crate::errors::AppError;
use crate::helpers::{parse_clock_time, parse_date, parse_duration, parse_percentage};
use crate::models::{DailyRecord, InstantRecord, TwilightTimes, WeeklyRecord, WEEK_LEN};
use crate::services::astronomy::{
    classify_phase, next_major_phase_events, synodic_age, PHASE_EPSILON_DAYS,
};
use crate::services::provider::{RawAstronomy, RawTwilight};
use crate::services::wall_clock::{local_noon_utc, local_to_utc};

fn text(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("")
}

fn number(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(0.0)
}

/// Build the instant snapshot for `now`.
///
/// Lunar age, phase and upcoming major phases are computed locally for `now`;
/// sun/moon positions are copied from the provider.
pub fn map_instant(
    raw: Option<&RawAstronomy>,
    now: DateTime<Utc>,
    tz: &Tz,
) -> Result<InstantRecord, AppError> {
    let raw = raw.ok_or_else(|| AppError::InvalidData("astronomy record is missing".to_string()))?;

    Ok(InstantRecord {
        date: parse_date(text(&raw.date))?,
        current_time: parse_clock_time(text(&raw.current_time))?,
        sun_altitude: number(raw.sun_altitude),
        sun_distance: number(raw.sun_distance),
        sun_azimuth: number(raw.sun_azimuth),
        moon_altitude: number(raw.moon_altitude),
        moon_distance: number(raw.moon_distance),
        moon_azimuth: number(raw.moon_azimuth),
        moon_parallactic_angle: number(raw.moon_parallactic_angle),
        moon_illumination_pct: parse_percentage(text(&raw.moon_illumination_percentage))?,
        lunar_age_days: synodic_age(now),
        moon_phase: classify_phase(now, PHASE_EPSILON_DAYS),
        next_moon_phases: next_major_phase_events(now, tz),
        updated_at: now,
    })
}

/// Build the weekly snapshot from the provider's daily records.
///
/// The batch is all-or-nothing: the array must hold exactly `WEEK_LEN` slots,
/// none of them `null`, and every day must map cleanly.
pub fn map_weekly(
    raw_days: &[Option<RawAstronomy>],
    now: DateTime<Utc>,
    tz: &Tz,
) -> Result<WeeklyRecord, AppError> {
    if raw_days.is_empty() {
        return Err(AppError::InvalidData(
            "daily astronomy array is empty".to_string(),
        ));
    }
    if raw_days.len() != WEEK_LEN {
        return Err(AppError::InvalidData(format!(
            "expected {} daily records, got {} slots",
            WEEK_LEN,
            raw_days.len()
        )));
    }

    let present: Vec<&RawAstronomy> = raw_days.iter().flatten().collect();
    if present.len() != WEEK_LEN {
        return Err(AppError::InvalidData(format!(
            "expected {} daily records, got {} after dropping nulls",
            WEEK_LEN,
            present.len()
        )));
    }

    let days = present
        .into_iter()
        .map(|raw| map_daily(raw, tz))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(WeeklyRecord {
        days,
        updated_at: now,
    })
}

fn map_daily(raw: &RawAstronomy, tz: &Tz) -> Result<DailyRecord, AppError> {
    let date = parse_date(text(&raw.date))?;
    let noon = local_noon_utc(date, tz);

    let day_length = parse_duration(text(&raw.day_length))?;
    let full_day = TimeDelta::hours(24);
    if day_length > full_day {
        return Err(AppError::InvalidData(format!(
            "day length '{}' exceeds 24 hours on {}",
            text(&raw.day_length),
            date
        )));
    }

    Ok(DailyRecord {
        date,
        sun_altitude: number(raw.sun_altitude),
        sun_distance: number(raw.sun_distance),
        sun_azimuth: number(raw.sun_azimuth),
        day_length,
        sunrise: local_to_utc(date, text(&raw.sunrise), tz),
        sunset: local_to_utc(date, text(&raw.sunset), tz),
        morning: map_twilight(date, &raw.morning, tz),
        evening: map_twilight(date, &raw.evening, tz),
        moonrise: local_to_utc(date, text(&raw.moonrise), tz),
        moonset: local_to_utc(date, text(&raw.moonset), tz),
        moon_altitude: number(raw.moon_altitude),
        moon_distance: number(raw.moon_distance),
        moon_azimuth: number(raw.moon_azimuth),
        moon_parallactic_angle: number(raw.moon_parallactic_angle),
        moon_illumination_pct: parse_percentage(text(&raw.moon_illumination_percentage))?,
        night_length: full_day - day_length,
        lunar_age_days: synodic_age(noon),
        moon_phase: classify_phase(noon, PHASE_EPSILON_DAYS),
    })
}

fn map_twilight(date: NaiveDate, raw: &RawTwilight, tz: &Tz) -> TwilightTimes {
    let at = |value: &Option<String>| local_to_utc(date, text(value), tz);
    TwilightTimes {
        astronomical_begin: at(&raw.astronomical_twilight_begin),
        astronomical_end: at(&raw.astronomical_twilight_end),
        nautical_begin: at(&raw.nautical_twilight_begin),
        nautical_end: at(&raw.nautical_twilight_end),
        civil_begin: at(&raw.civil_twilight_begin),
        civil_end: at(&raw.civil_twilight_end),
        blue_hour_begin: at(&raw.blue_hour_begin),
        blue_hour_end: at(&raw.blue_hour_end),
        golden_hour_begin: at(&raw.golden_hour_begin),
        golden_hour_end: at(&raw.golden_hour_end),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::MoonPhase;
    use chrono_tz::Europe::Warsaw;

    fn s(v: &str) -> Option<String> {
        Some(v.to_string())
    }

    fn utc(v: &str) -> DateTime<Utc> {
        v.parse().unwrap()
    }

    /// A plausible winter day in Warsaw.
    pub(crate) fn raw_day(date: &str) -> RawAstronomy {
        RawAstronomy {
            date: s(date),
            current_time: s("09:10:58.985"),
            sunrise: s("07:10"),
            sunset: s("15:10"),
            day_length: s("08:00:00"),
            morning: RawTwilight {
                astronomical_twilight_begin: s("05:00"),
                astronomical_twilight_end: s("06:00"),
                nautical_twilight_begin: s("06:00"),
                nautical_twilight_end: s("06:30"),
                civil_twilight_begin: s("06:30"),
                civil_twilight_end: s("07:00"),
                blue_hour_begin: s("06:40"),
                blue_hour_end: s("07:05"),
                golden_hour_begin: s("07:05"),
                golden_hour_end: s("07:40"),
            },
            evening: RawTwilight {
                astronomical_twilight_begin: s("18:00"),
                astronomical_twilight_end: s("19:00"),
                nautical_twilight_begin: s("17:20"),
                nautical_twilight_end: s("18:00"),
                civil_twilight_begin: s("15:10"),
                civil_twilight_end: s("15:50"),
                blue_hour_begin: s("15:40"),
                blue_hour_end: s("16:00"),
                golden_hour_begin: s("14:30"),
                golden_hour_end: s("15:20"),
            },
            sun_altitude: Some(1.23),
            sun_distance: Some(2.34),
            sun_azimuth: Some(3.45),
            moonrise: s("10:01"),
            moonset: s("-:-"),
            moon_altitude: Some(4.56),
            moon_distance: Some(5.67),
            moon_azimuth: Some(6.78),
            moon_parallactic_angle: Some(7.89),
            moon_illumination_percentage: s("12.5%"),
        }
    }

    pub(crate) fn raw_week(first_day: u32) -> Vec<Option<RawAstronomy>> {
        (0..WEEK_LEN as u32)
            .map(|i| Some(raw_day(&format!("2025-01-{:02}", first_day + i))))
            .collect()
    }

    #[test]
    fn test_map_instant_copies_and_parses_fields() {
        let now = utc("2025-01-01T08:11:00Z");
        let record = map_instant(Some(&raw_day("2025-01-01")), now, &Warsaw).unwrap();

        assert_eq!(record.date, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(record.current_time.to_string(), "09:10:58.985");
        assert_eq!(record.sun_altitude, 1.23);
        assert_eq!(record.moon_parallactic_angle, 7.89);
        assert_eq!(record.moon_illumination_pct, 12.5);
        assert_eq!(record.updated_at, now);
    }

    #[test]
    fn test_map_instant_computes_moon_state_for_now() {
        let now = utc("2025-01-01T00:00:00Z");
        let record = map_instant(Some(&raw_day("2025-01-01")), now, &Warsaw).unwrap();

        assert_eq!(record.lunar_age_days, synodic_age(now));
        assert_eq!(record.moon_phase, MoonPhase::WaxingCrescent);
        assert_eq!(record.next_moon_phases.len(), 4);
        assert!(record.next_moon_phases.iter().all(|e| e.at > now));
        assert!(record
            .next_moon_phases
            .windows(2)
            .all(|w| w[0].at <= w[1].at));
    }

    #[test]
    fn test_map_instant_rejects_missing_record() {
        let result = map_instant(None, Utc::now(), &Warsaw);
        assert!(matches!(result, Err(AppError::InvalidData(_))));
    }

    #[test]
    fn test_map_instant_rejects_malformed_text() {
        let mut bad_date = raw_day("2025-01-01");
        bad_date.date = s("01.01.2025");
        assert!(map_instant(Some(&bad_date), Utc::now(), &Warsaw).is_err());

        let mut bad_pct = raw_day("2025-01-01");
        bad_pct.moon_illumination_percentage = s("12,5%");
        assert!(map_instant(Some(&bad_pct), Utc::now(), &Warsaw).is_err());
    }

    #[test]
    fn test_map_weekly_maps_seven_days() {
        let now = utc("2025-01-02T10:00:00Z");
        let weekly = map_weekly(&raw_week(1), now, &Warsaw).unwrap();

        assert_eq!(weekly.days.len(), WEEK_LEN);
        assert_eq!(weekly.updated_at, now);

        let first = &weekly.days[0];
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(first.sunrise, Some(utc("2025-01-01T06:10:00Z")));
        assert_eq!(first.sunset, Some(utc("2025-01-01T14:10:00Z")));
        assert_eq!(first.moonrise, Some(utc("2025-01-01T09:01:00Z")));
        assert_eq!(first.moonset, None);
        assert_eq!(
            first.morning.civil_begin,
            Some(utc("2025-01-01T05:30:00Z"))
        );
        assert_eq!(
            first.evening.golden_hour_end,
            Some(utc("2025-01-01T14:20:00Z"))
        );
        assert_eq!(first.day_length, TimeDelta::hours(8));
    }

    #[test]
    fn test_night_length_complements_day_length() {
        let mut days = raw_week(1);
        let lengths = ["08:00:00", "7:59", "08:01:30", "00:00", "24:00", "12:24:41.5", ""];
        for (slot, len) in days.iter_mut().zip(lengths) {
            slot.as_mut().unwrap().day_length = s(len);
        }

        let weekly = map_weekly(&days, Utc::now(), &Warsaw).unwrap();
        for day in &weekly.days {
            assert_eq!(day.night_length, TimeDelta::hours(24) - day.day_length);
            assert!(day.night_length >= TimeDelta::zero());
        }
    }

    #[test]
    fn test_daily_moon_state_anchored_at_local_noon() {
        let weekly = map_weekly(&raw_week(1), Utc::now(), &Warsaw).unwrap();
        let noon = utc("2025-01-01T11:00:00Z");
        assert_eq!(weekly.days[0].lunar_age_days, synodic_age(noon));
        assert_eq!(
            weekly.days[0].moon_phase,
            classify_phase(noon, PHASE_EPSILON_DAYS)
        );
    }

    #[test]
    fn test_dst_gap_time_is_absent_not_shifted() {
        let mut days = raw_week(1);
        let mut gap_day = raw_day("2024-03-31");
        gap_day.sunrise = s("02:30");
        gap_day.morning.civil_twilight_begin = s("03:30");
        days[6] = Some(gap_day);

        let weekly = map_weekly(&days, Utc::now(), &Warsaw).unwrap();
        assert_eq!(weekly.days[6].sunrise, None);
        assert_eq!(
            weekly.days[6].morning.civil_begin,
            Some(utc("2024-03-31T01:30:00Z"))
        );
    }

    #[test]
    fn test_map_weekly_rejects_empty() {
        let result = map_weekly(&[], Utc::now(), &Warsaw);
        assert!(matches!(result, Err(AppError::InvalidData(_))));
    }

    #[test]
    fn test_map_weekly_rejects_short_week() {
        let mut days = raw_week(1);
        days.truncate(5);
        assert!(matches!(
            map_weekly(&days, Utc::now(), &Warsaw),
            Err(AppError::InvalidData(_))
        ));
    }

    #[test]
    fn test_map_weekly_rejects_null_slot() {
        let mut days = raw_week(1);
        days[3] = None;
        assert!(matches!(
            map_weekly(&days, Utc::now(), &Warsaw),
            Err(AppError::InvalidData(_))
        ));
    }

    #[test]
    fn test_map_weekly_rejects_seven_days_padded_with_nulls() {
        let mut days = raw_week(1);
        days.insert(2, None);
        days.insert(6, None);
        assert_eq!(days.len(), 9);
        assert!(matches!(
            map_weekly(&days, Utc::now(), &Warsaw),
            Err(AppError::InvalidData(_))
        ));
    }

    #[test]
    fn test_map_weekly_fails_whole_batch_on_one_bad_day() {
        let mut days = raw_week(1);
        days[4].as_mut().unwrap().day_length = s("eight hours");
        assert!(map_weekly(&days, Utc::now(), &Warsaw).is_err());

        let mut days = raw_week(1);
        days[1].as_mut().unwrap().day_length = s("25:00");
        assert!(map_weekly(&days, Utc::now(), &Warsaw).is_err());
    }
}
