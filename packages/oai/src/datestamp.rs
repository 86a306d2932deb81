//! OAI-PMH datestamps.
//!
//! A datestamp is a timezone-naive UTC instant with seconds precision,
//! written as `YYYY-MM-DDTHH:MM:SSZ`. The upstream database speaks a
//! slightly different dialect (no trailing `Z`), handled here as well so
//! that no other module formats or parses dates by hand.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use regex::Regex;
use serde::{Serialize, Serializer};

use crate::config::{HARVEST_EPOCH, SENTINEL_DATESTAMP, UNBOUNDED_UNTIL};
use crate::error::DatestampError;

/// Wire format of a datestamp.
pub const DATESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Date format expected by the upstream database API.
pub const UPSTREAM_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Full datestamp: YYYY-MM-DDTHH:MM:SSZ.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static DATESTAMP_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}Z$").expect("valid regex")
});

/// Day granularity: YYYY-MM-DD.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static DAY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid regex"));

#[allow(clippy::expect_used)] // Static datestamp that is guaranteed to be valid
static EPOCH: LazyLock<Datestamp> =
    LazyLock::new(|| Datestamp::parse(HARVEST_EPOCH).expect("valid datestamp"));

#[allow(clippy::expect_used)] // Static datestamp that is guaranteed to be valid
static UNBOUNDED: LazyLock<Datestamp> =
    LazyLock::new(|| Datestamp::parse(UNBOUNDED_UNTIL).expect("valid datestamp"));

#[allow(clippy::expect_used)] // Static datestamp that is guaranteed to be valid
static SENTINEL: LazyLock<Datestamp> =
    LazyLock::new(|| Datestamp::parse(SENTINEL_DATESTAMP).expect("valid datestamp"));

/// Date-time layouts seen in upstream record fields.
const UPSTREAM_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%SZ",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Date-only layouts seen in upstream record fields.
const UPSTREAM_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d-%b-%y"];

/// Which end of a range a day-granularity argument denotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    /// `from`: start of the day.
    Lower,
    /// `until`: end of the day, inclusive.
    Upper,
}

/// A UTC instant with seconds precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Datestamp(NaiveDateTime);

impl Datestamp {
    /// Wrap a naive date-time, dropping fractional seconds.
    #[must_use]
    pub fn new(value: NaiveDateTime) -> Self {
        Self(value.with_nanosecond(0).unwrap_or(value))
    }

    /// Current time.
    #[must_use]
    pub fn now() -> Self {
        Self::new(Utc::now().naive_utc())
    }

    /// Default lower bound of a harvest.
    #[must_use]
    pub fn harvest_epoch() -> Self {
        *EPOCH
    }

    /// Default upper bound of a harvest.
    #[must_use]
    pub fn unbounded() -> Self {
        *UNBOUNDED
    }

    /// Datestamp reported for records without a modification date.
    #[must_use]
    pub fn sentinel() -> Self {
        *SENTINEL
    }

    /// Parse a full datestamp (`YYYY-MM-DDTHH:MM:SSZ`) strictly.
    ///
    /// # Examples
    /// ```
    /// use samples_oai::datestamp::Datestamp;
    ///
    /// let ds = Datestamp::parse("2017-03-27T19:20:53Z").unwrap();
    /// assert_eq!(ds.to_string(), "2017-03-27T19:20:53Z");
    /// assert!(Datestamp::parse("2017-03-27T19:20:53").is_err());
    /// assert!(Datestamp::parse("2017-03-27T19:20:53.120Z").is_err());
    /// ```
    pub fn parse(value: &str) -> Result<Self, DatestampError> {
        if !DATESTAMP_PATTERN.is_match(value) {
            return Err(DatestampError(value.to_string()));
        }
        NaiveDateTime::parse_from_str(value, DATESTAMP_FORMAT)
            .map(Self)
            .map_err(|_| DatestampError(value.to_string()))
    }

    /// Parse a `from`/`until` request argument.
    ///
    /// Accepts a full datestamp or a day (`YYYY-MM-DD`). A day used as the
    /// upper bound covers the whole day.
    pub fn parse_argument(value: &str, bound: Bound) -> Result<Self, DatestampError> {
        if DAY_PATTERN.is_match(value) {
            let day = NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .map_err(|_| DatestampError(value.to_string()))?;
            let time = match bound {
                Bound::Lower => NaiveTime::MIN,
                Bound::Upper => NaiveTime::from_hms_opt(23, 59, 59)
                    .ok_or_else(|| DatestampError(value.to_string()))?,
            };
            return Ok(Self(day.and_time(time)));
        }
        Self::parse(value)
    }

    /// Parse a date as found in upstream record fields.
    pub fn from_upstream(value: &str) -> Result<Self, DatestampError> {
        let trimmed = value.trim();
        for format in UPSTREAM_DATETIME_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
                return Ok(Self::new(dt));
            }
        }
        for format in UPSTREAM_DATE_FORMATS {
            if let Ok(day) = NaiveDate::parse_from_str(trimmed, format) {
                return Ok(Self(day.and_time(NaiveTime::MIN)));
            }
        }
        Err(DatestampError(value.to_string()))
    }

    /// Format for the upstream database API.
    #[must_use]
    pub fn to_upstream(&self) -> String {
        self.0.format(UPSTREAM_FORMAT).to_string()
    }

    /// This instant shifted by whole hours; unchanged if the result is out of range.
    #[must_use]
    pub fn plus_hours(&self, hours: i64) -> Self {
        self.0
            .checked_add_signed(Duration::hours(hours))
            .map(Self)
            .unwrap_or(*self)
    }

    #[must_use]
    pub fn as_naive(&self) -> NaiveDateTime {
        self.0
    }
}

impl fmt::Display for Datestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DATESTAMP_FORMAT))
    }
}

impl FromStr for Datestamp {
    type Err = DatestampError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<NaiveDateTime> for Datestamp {
    fn from(value: NaiveDateTime) -> Self {
        Self::new(value)
    }
}

impl Serialize for Datestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_format() {
        let ds = Datestamp::parse("2011-06-01T00:00:00Z").unwrap();
        assert_eq!(ds.to_string(), "2011-06-01T00:00:00Z");
        assert_eq!(ds, Datestamp::harvest_epoch());
    }

    #[test]
    fn test_parse_rejects_other_layouts() {
        assert!(Datestamp::parse("").is_err());
        assert!(Datestamp::parse("2011-06-01").is_err());
        assert!(Datestamp::parse("2011-06-01 00:00:00Z").is_err());
        assert!(Datestamp::parse("2011-06-01T00:00:00+01:00").is_err());
        assert!(Datestamp::parse("2011-13-01T00:00:00Z").is_err());
    }

    #[test]
    fn test_new_drops_fractional_seconds() {
        let dt = NaiveDateTime::parse_from_str("2017-03-27T19:20:53.987", "%Y-%m-%dT%H:%M:%S%.f")
            .unwrap();
        assert_eq!(Datestamp::new(dt).to_string(), "2017-03-27T19:20:53Z");
    }

    #[test]
    fn test_parse_argument_day_granularity() {
        let from = Datestamp::parse_argument("2017-03-27", Bound::Lower).unwrap();
        let until = Datestamp::parse_argument("2017-03-27", Bound::Upper).unwrap();
        assert_eq!(from.to_string(), "2017-03-27T00:00:00Z");
        assert_eq!(until.to_string(), "2017-03-27T23:59:59Z");
    }

    #[test]
    fn test_parse_argument_full_datestamp() {
        let ds = Datestamp::parse_argument("2017-03-27T10:00:00Z", Bound::Upper).unwrap();
        assert_eq!(ds.to_string(), "2017-03-27T10:00:00Z");
        assert!(Datestamp::parse_argument("yesterday", Bound::Lower).is_err());
        assert!(Datestamp::parse_argument("2017-02-30", Bound::Lower).is_err());
    }

    #[test]
    fn test_from_upstream_formats() {
        assert_eq!(
            Datestamp::from_upstream("2017-03-27 19:20:53").unwrap().to_string(),
            "2017-03-27T19:20:53Z"
        );
        assert_eq!(
            Datestamp::from_upstream("2017-03-27T19:20:53").unwrap().to_string(),
            "2017-03-27T19:20:53Z"
        );
        assert_eq!(
            Datestamp::from_upstream("2017-03-27T19:20:53.5").unwrap().to_string(),
            "2017-03-27T19:20:53Z"
        );
        assert_eq!(
            Datestamp::from_upstream("2017-03-27").unwrap().to_string(),
            "2017-03-27T00:00:00Z"
        );
        assert_eq!(
            Datestamp::from_upstream(" 27-Mar-17 ").unwrap().to_string(),
            "2017-03-27T00:00:00Z"
        );
        assert!(Datestamp::from_upstream("March 2017").is_err());
    }

    #[test]
    fn test_to_upstream() {
        let ds = Datestamp::parse("2099-12-31T23:59:59Z").unwrap();
        assert_eq!(ds.to_upstream(), "2099-12-31T23:59:59");
    }

    #[test]
    fn test_plus_hours() {
        let ds = Datestamp::parse("2017-02-08T06:01:12Z").unwrap();
        assert_eq!(ds.plus_hours(1).to_string(), "2017-02-08T07:01:12Z");
        assert_eq!(ds.plus_hours(-7).to_string(), "2017-02-07T23:01:12Z");
    }

    #[test]
    fn test_sentinel_and_unbounded() {
        assert_eq!(Datestamp::sentinel().to_string(), "1900-01-01T00:00:00Z");
        assert_eq!(Datestamp::unbounded().to_string(), "9999-12-31T23:59:59Z");
        assert!(Datestamp::harvest_epoch() < Datestamp::unbounded());
    }
}
