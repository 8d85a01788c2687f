//! Timestamp parsing and hour arithmetic.
//!
//! Inbound timestamps accept:
//! - RFC 3339 (`2025-11-10T12:00:00Z`, `2025-11-10T13:00:00+01:00`)
//! - naive date-times taken as UTC (`2025-11-10T12:00:00`, `2025-11-10 12:00:00`)
//! - dates (`2025-11-10`), meaning midnight UTC
//! - the keywords `now`, `today`, `yesterday` and `tomorrow`, resolved
//!   against the caller's notion of "now"
//!
//! Anything else is a [`ValidationError::InvalidTimestamp`].

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::types::ValidationError;

const SECONDS_PER_HOUR: f64 = 3600.0;

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// A parsed timestamp, remembering whether only a day was given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Parsed {
    Instant(DateTime<Utc>),
    Day(NaiveDate),
}

fn parse(field: &'static str, value: &str, now: DateTime<Utc>) -> Result<Parsed, ValidationError> {
    let trimmed = value.trim();
    let invalid = || ValidationError::InvalidTimestamp {
        field,
        value: value.to_string(),
    };
    if trimmed.is_empty() {
        return Err(invalid());
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(Parsed::Instant(dt.with_timezone(&Utc)));
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(Parsed::Instant(naive.and_utc()));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(Parsed::Day(date));
    }

    let today = now.date_naive();
    match trimmed.to_ascii_lowercase().as_str() {
        "now" => Ok(Parsed::Instant(now)),
        "today" => Ok(Parsed::Day(today)),
        "yesterday" => today.pred_opt().map(Parsed::Day).ok_or_else(invalid),
        "tomorrow" => today.succ_opt().map(Parsed::Day).ok_or_else(invalid),
        _ => Err(invalid()),
    }
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Parses an inbound timestamp. Dates resolve to midnight UTC.
pub fn parse_timestamp(
    field: &'static str,
    value: &str,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, ValidationError> {
    Ok(match parse(field, value, now)? {
        Parsed::Instant(dt) => dt,
        Parsed::Day(date) => start_of_day(date),
    })
}

/// Parses the inclusive upper bound of a date range.
///
/// A bare date covers the whole day, so `end_date=2025-11-10` includes
/// entries started at 17:00 that day.
pub fn parse_range_end(
    field: &'static str,
    value: &str,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, ValidationError> {
    match parse(field, value, now)? {
        Parsed::Instant(dt) => Ok(dt),
        Parsed::Day(date) => match date.succ_opt() {
            Some(next) => start_of_day(next)
                .checked_sub_signed(Duration::nanoseconds(1))
                .ok_or_else(|| ValidationError::InvalidTimestamp {
                    field,
                    value: value.to_string(),
                }),
            // The last representable day runs to the end of time.
            None => Ok(DateTime::<Utc>::MAX_UTC),
        },
    }
}

/// Rounds to two decimal places.
pub fn round_hours(hours: f64) -> f64 {
    (hours * 100.0).round() / 100.0
}

/// Converts seconds to hours, rounded to two decimal places.
#[expect(
    clippy::cast_precision_loss,
    reason = "durations are far below 2^52 seconds"
)]
pub fn seconds_to_hours(seconds: i64) -> f64 {
    round_hours(seconds as f64 / SECONDS_PER_HOUR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 11, 10, 15, 30, 0).unwrap()
    }

    #[test]
    fn parses_rfc3339_with_zulu_and_offset() {
        let expected = Utc.with_ymd_and_hms(2025, 11, 10, 12, 0, 0).unwrap();
        assert_eq!(
            parse_timestamp("started_at", "2025-11-10T12:00:00Z", now()).unwrap(),
            expected
        );
        assert_eq!(
            parse_timestamp("started_at", "2025-11-10T13:00:00+01:00", now()).unwrap(),
            expected
        );
    }

    #[test]
    fn parses_naive_datetimes_as_utc() {
        let expected = Utc.with_ymd_and_hms(2025, 11, 10, 12, 0, 0).unwrap();
        assert_eq!(
            parse_timestamp("started_at", "2025-11-10T12:00:00", now()).unwrap(),
            expected
        );
        assert_eq!(
            parse_timestamp("started_at", "2025-11-10 12:00:00", now()).unwrap(),
            expected
        );
    }

    #[test]
    fn date_only_is_midnight() {
        assert_eq!(
            parse_timestamp("start_date", "2025-11-01", now()).unwrap(),
            Utc.with_ymd_and_hms(2025, 11, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn range_end_covers_whole_day() {
        let end = parse_range_end("end_date", "2025-11-01", now()).unwrap();
        assert!(end > Utc.with_ymd_and_hms(2025, 11, 1, 23, 59, 59).unwrap());
        assert!(end < Utc.with_ymd_and_hms(2025, 11, 2, 0, 0, 0).unwrap());
    }

    #[test]
    fn range_end_keeps_explicit_instant() {
        assert_eq!(
            parse_range_end("end_date", "2025-11-01T08:00:00Z", now()).unwrap(),
            Utc.with_ymd_and_hms(2025, 11, 1, 8, 0, 0).unwrap()
        );
    }

    #[test]
    fn range_end_on_last_representable_day() {
        let last = NaiveDate::MAX.format("%Y-%m-%d").to_string();
        assert_eq!(
            parse_range_end("end_date", &last, now()).unwrap(),
            DateTime::<Utc>::MAX_UTC
        );
        assert_eq!(
            parse_timestamp("start_date", &last, now()).unwrap(),
            start_of_day(NaiveDate::MAX)
        );
    }

    #[test]
    fn keywords_resolve_against_now() {
        assert_eq!(parse_timestamp("t", "now", now()).unwrap(), now());
        assert_eq!(
            parse_timestamp("t", "Yesterday", now()).unwrap(),
            Utc.with_ymd_and_hms(2025, 11, 9, 0, 0, 0).unwrap()
        );
        assert_eq!(
            parse_timestamp("t", "today", now()).unwrap(),
            Utc.with_ymd_and_hms(2025, 11, 10, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn rejects_garbage() {
        let err = parse_timestamp("started_at", "next tuesday-ish", now()).unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidTimestamp {
                field: "started_at",
                value: "next tuesday-ish".to_string(),
            }
        );
        assert!(parse_timestamp("started_at", "", now()).is_err());
    }

    #[test]
    #[expect(
        clippy::float_cmp,
        reason = "rounded values are exact decimal literals"
    )]
    fn hours_round_to_two_places() {
        assert_eq!(seconds_to_hours(0), 0.0);
        assert_eq!(seconds_to_hours(3600), 1.0);
        assert_eq!(seconds_to_hours(5400), 1.5);
        assert_eq!(seconds_to_hours(100), 0.03);
        assert_eq!(seconds_to_hours(4000), 1.11);
    }
}
