//! Lunar age and moon phase calculations.
//!
//! Uses a mean synodic month measured from a fixed reference new moon
//! (2000-01-06 18:13 UTC). Accurate to a few hours, which is enough to label
//! phases; precise event times come from the provider.

use chrono::{DateTime, TimeDelta, TimeZone, Utc};

use crate::models::{MoonPhase, MoonPhaseEvent};

/// Mean length of a synodic month in days.
pub const SYNODIC_MONTH: f64 = 29.530588;

/// Default tolerance around the exact moment of a major phase (2.5 hours).
pub const PHASE_EPSILON_DAYS: f64 = 2.5 / 24.0;

/// Julian date of the Unix epoch.
const UNIX_EPOCH_JD: f64 = 2_440_587.5;

/// Reference new moon: 2000-01-06 18:13:00 UTC, in Unix milliseconds.
const NEW_MOON_REF_MS: i64 = 947_182_380_000;

const MS_PER_DAY: f64 = 86_400_000.0;

fn to_julian_date(instant: DateTime<Utc>) -> f64 {
    UNIX_EPOCH_JD + instant.timestamp_millis() as f64 / MS_PER_DAY
}

fn reference_julian_date() -> f64 {
    UNIX_EPOCH_JD + NEW_MOON_REF_MS as f64 / MS_PER_DAY
}

/// Floored modulo: result is always in `[0, m)` for positive `m`.
fn floored_mod(a: f64, m: f64) -> f64 {
    let r = a.rem_euclid(m);
    // rem_euclid can round up to exactly `m` for tiny negative inputs
    if r >= m {
        0.0
    } else {
        r
    }
}

/// Days elapsed since the most recent (mean) new moon, in `[0, SYNODIC_MONTH)`.
pub fn synodic_age(instant: DateTime<Utc>) -> f64 {
    floored_mod(
        to_julian_date(instant) - reference_julian_date(),
        SYNODIC_MONTH,
    )
}

/// Classify the moon phase at `instant`.
///
/// A major phase is reported when `instant` lies within `epsilon_days` of its
/// exact moment; otherwise the waxing/waning category of the enclosing range.
pub fn classify_phase(instant: DateTime<Utc>, epsilon_days: f64) -> MoonPhase {
    let age = synodic_age(instant);
    let now = to_julian_date(instant);
    let last_new_moon = now - age;

    let first_quarter = last_new_moon + 0.25 * SYNODIC_MONTH;
    let full_moon = last_new_moon + 0.5 * SYNODIC_MONTH;
    let last_quarter = last_new_moon + 0.75 * SYNODIC_MONTH;
    let next_new_moon = last_new_moon + SYNODIC_MONTH;

    if (now - last_new_moon).abs() < epsilon_days {
        MoonPhase::NewMoon
    } else if (now - first_quarter).abs() < epsilon_days {
        MoonPhase::FirstQuarter
    } else if now < first_quarter {
        MoonPhase::WaxingCrescent
    } else if (now - full_moon).abs() < epsilon_days {
        MoonPhase::FullMoon
    } else if now < full_moon {
        MoonPhase::WaxingGibbous
    } else if (now - last_quarter).abs() < epsilon_days {
        MoonPhase::LastQuarter
    } else if now < last_quarter {
        MoonPhase::WaningGibbous
    } else if (now - next_new_moon).abs() < epsilon_days {
        MoonPhase::NewMoon
    } else {
        MoonPhase::WaningCrescent
    }
}

/// Age (days into the cycle) at which each major phase occurs.
fn major_phase_age(phase: MoonPhase) -> f64 {
    match phase {
        MoonPhase::FirstQuarter => SYNODIC_MONTH / 4.0,
        MoonPhase::FullMoon => SYNODIC_MONTH / 2.0,
        MoonPhase::LastQuarter => 3.0 * SYNODIC_MONTH / 4.0,
        // a new moon is always ahead: the next one closes the cycle
        _ => SYNODIC_MONTH,
    }
}

/// Next occurrence of each major phase after `now`, expressed in `tz`.
///
/// The localisation is presentational only; callers that store the result
/// convert back with `.with_timezone(&Utc)`. Results are sorted by time.
pub fn next_major_phases<Tz: TimeZone>(now: DateTime<Utc>, tz: &Tz) -> Vec<(MoonPhase, DateTime<Tz>)> {
    let age = synodic_age(now);

    let mut result: Vec<(MoonPhase, DateTime<Tz>)> = MoonPhase::MAJOR
        .iter()
        .map(|&phase| {
            let target = major_phase_age(phase);
            let delta_days = if target >= age {
                target - age
            } else {
                target - age + SYNODIC_MONTH
            };
            let at = now + days_to_delta(delta_days);
            (phase, at.with_timezone(tz))
        })
        .collect();

    result.sort_by_key(|(_, at)| at.timestamp_millis());
    result
}

/// `next_major_phases` normalised to UTC events.
pub fn next_major_phase_events<Tz: TimeZone>(now: DateTime<Utc>, tz: &Tz) -> Vec<MoonPhaseEvent> {
    next_major_phases(now, tz)
        .into_iter()
        .map(|(phase, at)| MoonPhaseEvent {
            phase,
            at: at.with_timezone(&Utc),
        })
        .collect()
}

fn days_to_delta(days: f64) -> TimeDelta {
    TimeDelta::milliseconds((days * MS_PER_DAY).round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn utc(s: &str) -> DateTime<Utc> {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M")
            .unwrap()
            .and_utc()
    }

    #[test]
    fn test_reference_epoch_constant() {
        assert_eq!(utc("2000-01-06 18:13").timestamp_millis(), NEW_MOON_REF_MS);
        assert_eq!(synodic_age(utc("2000-01-06 18:13")), 0.0);
    }

    #[test]
    fn test_synodic_age_in_range() {
        for s in [
            "2025-01-01 00:00",
            "2003-06-15 00:00",
            "2026-12-31 00:00",
            "1987-04-03 00:00",
            "1970-01-01 00:00",
            "2099-12-31 23:59",
        ] {
            let age = synodic_age(utc(s));
            assert!(
                (0.0..SYNODIC_MONTH).contains(&age),
                "age {} out of range for {}",
                age,
                s
            );
        }
    }

    #[test]
    fn test_synodic_age_before_reference_is_positive() {
        // one hour before the reference new moon
        let age = synodic_age(utc("2000-01-06 17:13"));
        assert!((age - (SYNODIC_MONTH - 1.0 / 24.0)).abs() < 1e-6);
    }

    #[test]
    fn test_identifies_full_moon() {
        for s in ["2024-09-18 02:34", "2024-10-17 11:26"] {
            assert_eq!(classify_phase(utc(s), 0.5), MoonPhase::FullMoon, "{}", s);
        }
    }

    #[test]
    fn test_identifies_new_moon() {
        for s in ["2024-09-03 05:55", "2024-10-02 18:49"] {
            assert_eq!(classify_phase(utc(s), 0.5), MoonPhase::NewMoon, "{}", s);
        }
    }

    #[test]
    fn test_identifies_first_quarter() {
        assert_eq!(
            classify_phase(utc("2024-09-11 06:06"), 0.5),
            MoonPhase::FirstQuarter
        );
    }

    #[test]
    fn test_intermediate_phases_follow_cycle_order() {
        let ref_time = utc("2000-01-06 18:13");
        let at_age = |days: f64| ref_time + days_to_delta(days);

        let cases = [
            (1.0, MoonPhase::WaxingCrescent),
            (SYNODIC_MONTH * 0.25, MoonPhase::FirstQuarter),
            (SYNODIC_MONTH * 0.375, MoonPhase::WaxingGibbous),
            (SYNODIC_MONTH * 0.5, MoonPhase::FullMoon),
            (SYNODIC_MONTH * 0.625, MoonPhase::WaningGibbous),
            (SYNODIC_MONTH * 0.75, MoonPhase::LastQuarter),
            (SYNODIC_MONTH * 0.875, MoonPhase::WaningCrescent),
            (SYNODIC_MONTH - 0.05, MoonPhase::NewMoon),
        ];
        for (age, expected) in cases {
            assert_eq!(
                classify_phase(at_age(age), PHASE_EPSILON_DAYS),
                expected,
                "age {}",
                age
            );
        }
    }

    #[test]
    fn test_classification_is_periodic() {
        let start = utc("2025-01-01 00:00");
        let month = days_to_delta(SYNODIC_MONTH);
        for step in 0..60 {
            // avoid sampling right on a boundary: offset by a few minutes
            let t = start + TimeDelta::hours(12 * step) + TimeDelta::minutes(7);
            let phase = classify_phase(t, PHASE_EPSILON_DAYS);
            assert_eq!(classify_phase(t + month, PHASE_EPSILON_DAYS), phase);
            assert_eq!(classify_phase(t - month * 3, PHASE_EPSILON_DAYS), phase);
        }
    }

    #[test]
    fn test_next_major_phases_within_one_month() {
        let now = utc("2025-01-01 00:00");
        let phases = next_major_phases(now, &chrono_tz::Europe::Warsaw);

        assert_eq!(phases.len(), 4);
        for (_, at) in &phases {
            let at = at.with_timezone(&Utc);
            assert!(at >= now);
            assert!(at - now <= days_to_delta(SYNODIC_MONTH));
        }
        for pair in phases.windows(2) {
            assert!(pair[0].1 <= pair[1].1);
        }
        let mut seen: Vec<MoonPhase> = phases.iter().map(|(p, _)| *p).collect();
        seen.sort_by_key(|p| *p as u8);
        assert_eq!(seen, MoonPhase::MAJOR.to_vec());
    }

    #[test]
    fn test_next_major_phases_wraps_past_moments() {
        // age ~1.29 days: every major phase is still ahead in this cycle
        // except the new moon, which lies one full cycle minus the age away
        let now = utc("2025-01-01 00:00");
        let age = synodic_age(now);
        let events = next_major_phase_events(now, &Utc);

        let new_moon = events
            .iter()
            .find(|e| e.phase == MoonPhase::NewMoon)
            .unwrap();
        let expected = now + days_to_delta(SYNODIC_MONTH - age);
        assert!((new_moon.at - expected).num_seconds().abs() <= 1);
        assert_eq!(events[0].phase, MoonPhase::FirstQuarter);
    }

    #[test]
    fn test_next_major_phase_events_are_utc_normalised() {
        let now = utc("2024-09-20 12:00");
        let local = next_major_phases(now, &chrono_tz::America::New_York);
        let events = next_major_phase_events(now, &chrono_tz::America::New_York);
        for ((phase, at), event) in local.iter().zip(events.iter()) {
            assert_eq!(*phase, event.phase);
            assert_eq!(at.timestamp(), event.at.timestamp());
        }
    }
}
