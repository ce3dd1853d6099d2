//! Open windows for a business date.
//!
//! Two sources exist: explicit per-date `AvailableSlot` windows, and the
//! weekly working hours with blocked dates carved out. A deployment runs on
//! exactly one of them (see `AvailabilityModel`).

use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;

use super::time::{format_wall_clock, parse_wall_clock};
use crate::models::{AvailableSlot, BlockedDate, WorkingHours};

/// Contiguous business-local span during which bookings may happen
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Window {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl Window {
    /// `None` unless `start < end`
    pub fn new(start: NaiveTime, end: NaiveTime) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }

    pub fn parse(start: &str, end: &str) -> Option<Self> {
        let start = parse_wall_clock(start).ok()?;
        let end = parse_wall_clock(end).ok()?;
        Self::new(start, end)
    }

    /// `HH:mm` of the start
    pub fn start_key(&self) -> String {
        format_wall_clock(self.start)
    }

    /// `HH:mm` of the end
    pub fn end_key(&self) -> String {
        format_wall_clock(self.end)
    }

    /// Minutes from midnight to the window start
    pub fn start_minute(&self) -> i64 {
        minute_of_day(self.start)
    }

    /// Minutes from midnight to the window end
    pub fn end_minute(&self) -> i64 {
        minute_of_day(self.end)
    }

    /// Remove `[block_start, block_end)` from the window, keeping whatever is
    /// left on either side.
    pub fn subtract(&self, block_start: NaiveTime, block_end: NaiveTime) -> Vec<Window> {
        if block_end <= self.start || block_start >= self.end {
            return vec![*self];
        }
        [
            Window::new(self.start, block_start.min(self.end)),
            Window::new(block_end.max(self.start), self.end),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

impl std::fmt::Display for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}-{}",
            format_wall_clock(self.start),
            format_wall_clock(self.end)
        )
    }
}

pub fn minute_of_day(time: NaiveTime) -> i64 {
    use chrono::Timelike;
    i64::from(time.hour()) * 60 + i64::from(time.minute())
}

/// Why a date offers no windows at all
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Closure {
    Past,
    BeyondHorizon { max_days: i64 },
    NoSlotsConfigured,
    Closed,
}

impl Closure {
    pub fn reason(&self) -> String {
        match self {
            Closure::Past => "Cannot book appointments in the past".to_string(),
            Closure::BeyondHorizon { max_days } => {
                format!("Cannot book more than {} days in advance", max_days)
            }
            Closure::NoSlotsConfigured => {
                "No available time slots configured for this date".to_string()
            }
            Closure::Closed => "Closed on this day".to_string(),
        }
    }
}

impl std::fmt::Display for Closure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.reason())
    }
}

/// Reject dates before today or past the advance-booking horizon
pub fn check_booking_horizon(
    date: NaiveDate,
    today: NaiveDate,
    max_advance_days: i64,
) -> Result<(), Closure> {
    if date < today {
        return Err(Closure::Past);
    }
    if (date - today).num_days() > max_advance_days {
        return Err(Closure::BeyondHorizon {
            max_days: max_advance_days,
        });
    }
    Ok(())
}

/// Windows from the explicit `AvailableSlot` rows of one date, sorted with
/// exact duplicates removed.
pub fn windows_from_slots(slots: &[AvailableSlot]) -> Result<Vec<Window>, Closure> {
    let mut windows: Vec<Window> = slots
        .iter()
        .filter_map(|slot| {
            let window = Window::parse(&slot.start_time, &slot.end_time);
            if window.is_none() {
                tracing::warn!(
                    slot_id = %slot.id,
                    "Ignoring malformed available slot {}-{}",
                    slot.start_time,
                    slot.end_time
                );
            }
            window
        })
        .collect();

    windows.sort();
    windows.dedup();

    if windows.is_empty() {
        return Err(Closure::NoSlotsConfigured);
    }
    Ok(windows)
}

/// Windows from the weekday's working hours minus the date's blocks.
///
/// Partial blocks split a window in two rather than merely masking the
/// blocked span.
pub fn windows_from_weekly(
    hours: Option<&WorkingHours>,
    blocks: &[BlockedDate],
) -> Result<Vec<Window>, Closure> {
    let hours = match hours {
        Some(h) if h.is_active => h,
        _ => return Err(Closure::Closed),
    };

    let base = Window::parse(&hours.start_time, &hours.end_time).ok_or_else(|| {
        tracing::warn!(
            day_of_week = hours.day_of_week,
            "Working hours {}-{} are malformed; treating day as closed",
            hours.start_time,
            hours.end_time
        );
        Closure::Closed
    })?;

    let mut windows = vec![base];
    for block in blocks {
        if block.is_full_day {
            return Err(Closure::Closed);
        }
        let span = match (block.start_time.as_deref(), block.end_time.as_deref()) {
            (Some(start), Some(end)) => Window::parse(start, end),
            _ => None,
        };
        let Some(span) = span else {
            // A partial block we cannot read closes the day rather than
            // letting bookings through.
            tracing::warn!(block_id = %block.id, "Malformed partial block; closing day");
            return Err(Closure::Closed);
        };
        windows = windows
            .iter()
            .flat_map(|w| w.subtract(span.start, span.end))
            .collect();
    }

    if windows.is_empty() {
        return Err(Closure::Closed);
    }
    Ok(windows)
}
