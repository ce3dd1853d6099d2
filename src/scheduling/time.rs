//! Conversion between business-local wall-clock values and absolute instants.
//!
//! Every date and time a client sends or receives is business-local; every
//! instant stored is UTC. Nothing here looks at the server's own timezone.

use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{BookingError, Result};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M";

/// The shop's timezone and the projections in and out of it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusinessTime {
    tz: Tz,
}

impl BusinessTime {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    /// Look up an IANA zone name such as `America/New_York`
    pub fn parse(name: &str) -> Result<Self> {
        name.parse::<Tz>()
            .map(Self::new)
            .map_err(|_| BookingError::validation(format!("Unknown timezone: {}", name)))
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Business-local calendar date of an instant
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.tz).date_naive()
    }

    /// Business-local wall-clock time of an instant
    pub fn local_time(&self, instant: DateTime<Utc>) -> NaiveTime {
        instant.with_timezone(&self.tz).time()
    }

    /// `YYYY-MM-DD` key of the business day containing `instant`
    pub fn date_key(&self, instant: DateTime<Utc>) -> String {
        self.local_date(instant).format(DATE_FORMAT).to_string()
    }

    /// `HH:mm` business-local time of `instant`
    pub fn time_key(&self, instant: DateTime<Utc>) -> String {
        format_wall_clock(self.local_time(instant))
    }

    /// Instant at which the business day starts. When local midnight does not
    /// exist (a DST jump at 00:00) this is the first instant of the day.
    pub fn start_of_day(&self, date: NaiveDate) -> DateTime<Utc> {
        let mut naive = date.and_time(NaiveTime::MIN);
        // Gaps never exceed a couple of hours; step until we land on a real time.
        for _ in 0..=24 {
            if let Some(instant) = self.resolve(naive) {
                return instant;
            }
            naive += Duration::minutes(30);
        }
        self.tz.from_utc_datetime(&date.and_time(NaiveTime::MIN)).with_timezone(&Utc)
    }

    /// Half-open `[start, end)` instant range covering the business day.
    /// 23 or 25 hours long across DST transitions.
    pub fn day_range(&self, date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = self.start_of_day(date);
        let end = match date.succ_opt() {
            Some(next) => self.start_of_day(next),
            None => start + Duration::days(1),
        };
        (start, end)
    }

    /// Same as [`day_range`](Self::day_range) for a `YYYY-MM-DD` key
    pub fn day_range_for_key(&self, key: &str) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
        Ok(self.day_range(parse_date_key(key)?))
    }

    /// Interpret a wall-clock time on a business date. Returns `None` for
    /// times skipped by a DST gap; ambiguous times resolve to the earlier
    /// instant.
    pub fn combine(&self, date: NaiveDate, time: NaiveTime) -> Option<DateTime<Utc>> {
        self.resolve(date.and_time(time))
    }

    /// [`combine`](Self::combine) over wire-format strings
    pub fn combine_keys(&self, date_key: &str, time_key: &str) -> Result<DateTime<Utc>> {
        let date = parse_date_key(date_key)?;
        let time = parse_wall_clock(time_key)?;
        self.combine(date, time).ok_or_else(|| {
            BookingError::validation(format!(
                "{} does not exist on {} in {}",
                time_key,
                date_key,
                self.tz.name()
            ))
        })
    }

    fn resolve(&self, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
        match self.tz.from_local_datetime(&naive) {
            LocalResult::Single(t) => Some(t.with_timezone(&Utc)),
            LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
            LocalResult::None => None,
        }
    }
}

/// Parse a strict `YYYY-MM-DD` date
pub fn parse_date_key(s: &str) -> Result<NaiveDate> {
    let bytes = s.as_bytes();
    let shaped = bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());
    if !shaped {
        return Err(BookingError::validation(format!(
            "Invalid date format: {:?}. Use YYYY-MM-DD",
            s
        )));
    }
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .map_err(|_| BookingError::validation(format!("Invalid date: {}", s)))
}

/// Parse a strict 24-hour `HH:mm` wall-clock time
pub fn parse_wall_clock(s: &str) -> Result<NaiveTime> {
    let bytes = s.as_bytes();
    let shaped = bytes.len() == 5
        && bytes[2] == b':'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 2 || b.is_ascii_digit());
    if !shaped {
        return Err(BookingError::validation(format!(
            "Invalid time format: {:?}. Use HH:mm",
            s
        )));
    }
    NaiveTime::parse_from_str(s, TIME_FORMAT)
        .map_err(|_| BookingError::validation(format!("Invalid time: {}", s)))
}

pub fn format_wall_clock(time: NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

pub fn format_date_key(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}
