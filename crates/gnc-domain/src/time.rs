//! Engine timestamps.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::ValueError;

/// Hour and minute (UTC) the engine pins date-only postings to, so the
/// calendar date survives every timezone from UTC-10 to UTC+13.
const NEUTRAL_HOUR: u32 = 10;
const NEUTRAL_MINUTE: u32 = 59;

/// Seconds since the Unix epoch, as the engine stores them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Time64(i64);

impl Time64 {
    pub const fn from_secs(secs: i64) -> Self {
        Self(secs)
    }

    pub const fn secs(&self) -> i64 {
        self.0
    }

    pub fn now() -> Self {
        Self(Utc::now().timestamp())
    }

    pub fn from_datetime(value: DateTime<Utc>) -> Self {
        Self(value.timestamp())
    }

    /// Timestamp for a calendar day at the engine's timezone-neutral time.
    pub fn from_ymd_neutral(year: i32, month: u32, day: u32) -> Result<Self, ValueError> {
        let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
            ValueError::InvalidDate(format!("{year:04}-{month:02}-{day:02} is not a calendar date"))
        })?;
        Ok(Self::from_date_neutral(date))
    }

    pub fn from_date_neutral(date: NaiveDate) -> Self {
        let time = NaiveTime::from_hms_opt(NEUTRAL_HOUR, NEUTRAL_MINUTE, 0).unwrap_or_default();
        Self(Utc.from_utc_datetime(&date.and_time(time)).timestamp())
    }

    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.0, 0)
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.to_datetime().map(|dt| dt.date_naive())
    }
}

impl From<DateTime<Utc>> for Time64 {
    fn from(value: DateTime<Utc>) -> Self {
        Self::from_datetime(value)
    }
}

impl fmt::Display for Time64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            None => write!(f, "@{}", self.0),
        }
    }
}
