//! Mapping of provider wall-clock strings to UTC instants.
//!
//! The provider reports event times as local civil time in the requested
//! timezone, either as a bare time of day or as a full `yyyy-MM-dd HH:mm[:ss[.fff]]`
//! string. A local time inside a spring-forward gap does not exist and maps to
//! `None`; fall-back ambiguity is resolved to the earlier instant.
//!
//! The earlier instant is the one still on the daylight-saving offset. Resolvers
//! that prefer the standard offset land one hour later for those wall times,
//! e.g. 02:30 on 2024-10-27 in Europe/Warsaw is 00:30Z here rather than 01:30Z.

use chrono::{DateTime, LocalResult, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc};

use crate::helpers::parse_time_of_day;

const LOCAL_DATETIME_FORMATS: [&str; 3] = [
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.3f",
];

/// Convert a local wall-clock string on `date` in `tz` to UTC.
///
/// Never fails: empty, unparseable or non-existent local times yield `None`.
pub fn local_to_utc<Tz: TimeZone>(date: NaiveDate, value: &str, tz: &Tz) -> Option<DateTime<Utc>> {
    let s = value.trim();
    if s.is_empty() {
        return None;
    }

    let naive = parse_local_datetime(s)
        .or_else(|| parse_time_of_day(s).map(|time| date.and_time(time)))?;

    resolve_local(naive, tz)
}

/// Resolve a naive local datetime in `tz`, `None` inside a DST gap.
pub fn resolve_local<Tz: TimeZone>(naive: NaiveDateTime, tz: &Tz) -> Option<DateTime<Utc>> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
        LocalResult::None => None,
    }
}

/// Local noon on `date` as a UTC instant.
///
/// Noon exists on practically every date; for the rare zone that skipped a
/// whole day the offset in force at that UTC wall time is used instead.
pub fn local_noon_utc<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> DateTime<Utc> {
    let noon = date.and_hms_opt(12, 0, 0).unwrap_or_default();
    resolve_local(noon, tz).unwrap_or_else(|| {
        let offset = tz.offset_from_utc_datetime(&noon).fix();
        (noon - offset).and_utc()
    })
}

fn parse_local_datetime(s: &str) -> Option<NaiveDateTime> {
    LOCAL_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}
