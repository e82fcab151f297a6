//! Bidirectional mapping between wall-clock milliseconds and per-granularity
//! integer values (C1).
//!
//! Round-trip law: for any `millis` at the start of its day/month/year in
//! UTC, `from_epoch(to_epoch(millis, g), g) == millis`. `MONTH` round-trips
//! only to the first-of-month UTC midnight; `YEAR` to Jan-1 UTC midnight —
//! the codec does not attempt to preserve intra-unit time.

use chrono::{Datelike, NaiveDate, TimeZone, Utc};
use e4s_core::{EpochValue, Granularity};
use thiserror::Error;

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Error converting between milliseconds and an epoch value.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EpochCodecError {
    /// `millis` does not correspond to a valid UTC calendar date (only
    /// possible for pathological out-of-range inputs).
    #[error("millis {0} is out of the representable calendar range")]
    OutOfRange(i64),

    /// The computed epoch value would be negative, violating the
    /// non-negative 32-bit `EpochValue` contract.
    #[error("millis {0} maps to a negative epoch value at granularity {1}")]
    NegativeEpoch(i64, Granularity),
}

/// Convert wall-clock milliseconds (since the Unix epoch, UTC) to the
/// integer value for the given granularity.
///
/// DAY: integer days since 1970-01-01 UTC, via floor division of `millis`.
/// MONTH: `(year - 1970) * 12 + (month_of_year - 1)`, UTC calendar.
/// YEAR: `year - 1970`, UTC calendar.
pub fn to_epoch(millis: i64, granularity: Granularity) -> Result<EpochValue, EpochCodecError> {
    match granularity {
        Granularity::Day => {
            let days = millis.div_euclid(MILLIS_PER_DAY);
            u32::try_from(days).map_err(|_| EpochCodecError::NegativeEpoch(millis, granularity))
        }
        Granularity::Month => {
            let dt = Utc
                .timestamp_millis_opt(millis)
                .single()
                .ok_or(EpochCodecError::OutOfRange(millis))?;
            let months = (dt.year() - 1970) * 12 + (dt.month() as i32 - 1);
            u32::try_from(months).map_err(|_| EpochCodecError::NegativeEpoch(millis, granularity))
        }
        Granularity::Year => {
            let dt = Utc
                .timestamp_millis_opt(millis)
                .single()
                .ok_or(EpochCodecError::OutOfRange(millis))?;
            let years = dt.year() - 1970;
            u32::try_from(years).map_err(|_| EpochCodecError::NegativeEpoch(millis, granularity))
        }
    }
}

/// Convert an epoch value back to the wall-clock millisecond timestamp at
/// the start of that day/month/year in UTC.
pub fn from_epoch(value: EpochValue, granularity: Granularity) -> i64 {
    match granularity {
        Granularity::Day => i64::from(value) * MILLIS_PER_DAY,
        Granularity::Month => {
            let total_months = value as i64;
            let year = 1970 + total_months.div_euclid(12);
            let month = total_months.rem_euclid(12) as u32 + 1;
            midnight_millis(year as i32, month, 1)
        }
        Granularity::Year => {
            let year = 1970 + value as i64;
            midnight_millis(year as i32, 1, 1)
        }
    }
}

fn midnight_millis(year: i32, month: u32, day: u32) -> i64 {
    let date = NaiveDate::from_ymd_opt(year, month, day)
        .expect("year/month/day constructed from a valid epoch value must be a valid date");
    date.and_hms_opt(0, 0, 0)
        .expect("midnight is always a valid time")
        .and_utc()
        .timestamp_millis()
}
