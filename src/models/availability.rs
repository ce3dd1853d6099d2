use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A period between two instants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeSlot {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    /// The same slot with its end pushed out by `extra`
    pub fn extended_by(&self, extra: chrono::Duration) -> TimeSlot {
        TimeSlot::new(self.start, self.end + extra)
    }
}

/// An explicit open window on a business date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableSlot {
    pub id: String,
    /// Business-local midnight of the date
    pub date: DateTime<Utc>,
    /// `HH:mm`, business-local
    pub start_time: String,
    /// `HH:mm`, business-local
    pub end_time: String,
    pub reason: Option<String>,
    pub created_at: i64,
}

/// Full- or partial-day closure used by the weekly model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockedDate {
    pub id: String,
    pub date: DateTime<Utc>,
    pub is_full_day: bool,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub reason: Option<String>,
    pub created_at: i64,
}

/// Default schedule for one weekday (0 = Sunday)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingHours {
    pub day_of_week: u32,
    pub start_time: String,
    pub end_time: String,
    pub is_active: bool,
}

/// Admin request to open a window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAvailableSlotRequest {
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Admin request to copy a run of days' windows onto later weeks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateSlotsRequest {
    /// First source date, `YYYY-MM-DD`
    pub source_start: String,
    /// Number of source days, starting at `source_start`
    #[serde(default = "default_source_days")]
    pub days: u32,
    /// Number of following weeks to fill
    pub weeks: u32,
}

fn default_source_days() -> u32 {
    7
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateSlotsResponse {
    pub created: usize,
    pub skipped: usize,
}

/// Admin request to close a whole or part of a day
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBlockedDateRequest {
    pub date: String,
    #[serde(default = "default_full_day")]
    pub is_full_day: bool,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

fn default_full_day() -> bool {
    true
}

/// Window as presented to admins, with the business date rendered
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailableSlotView {
    pub id: String,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockedDateView {
    pub id: String,
    pub date: String,
    pub is_full_day: bool,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_extended_slot_keeps_start() {
        let start = Utc.with_ymd_and_hms(2026, 3, 3, 15, 0, 0).unwrap();
        let slot = TimeSlot::new(start, start + chrono::Duration::minutes(45));
        let extended = slot.extended_by(chrono::Duration::minutes(30));

        assert_eq!(extended.start, start);
        assert_eq!(extended.duration_minutes(), 75);
    }

    #[test]
    fn test_blocked_date_request_defaults_to_full_day() {
        let req: CreateBlockedDateRequest =
            serde_json::from_str(r#"{"date":"2026-03-03"}"#).unwrap();
        assert!(req.is_full_day);
        assert!(req.start_time.is_none());

        let dup: DuplicateSlotsRequest =
            serde_json::from_str(r#"{"source_start":"2026-03-02","weeks":2}"#).unwrap();
        assert_eq!(dup.days, 7);
    }
}
