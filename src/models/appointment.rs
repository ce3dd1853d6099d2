use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::TimeSlot;
use crate::scheduling::BusinessTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    #[default]
    Confirmed,
    Cancelled,
    Completed,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "confirmed" => Some(AppointmentStatus::Confirmed),
            "cancelled" => Some(AppointmentStatus::Cancelled),
            "completed" => Some(AppointmentStatus::Completed),
            _ => None,
        }
    }

    /// Only confirmed appointments occupy time
    pub fn blocks_slots(&self) -> bool {
        matches!(self, AppointmentStatus::Confirmed)
    }
}

impl std::fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A booked appointment stored in the database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    pub client_name: String,
    /// Canonical `+<country><number>` form
    pub phone_number: String,
    /// Business-local midnight of the appointment's day
    pub date: DateTime<Utc>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub google_event_id: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Appointment {
    pub fn interval(&self) -> TimeSlot {
        TimeSlot::new(self.start_time, self.end_time)
    }

    /// Confirmed and not yet started
    pub fn is_upcoming(&self, now: DateTime<Utc>) -> bool {
        self.status == AppointmentStatus::Confirmed && self.start_time > now
    }
}

/// Appointment as presented to clients: business-local date and time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentView {
    pub id: String,
    pub client_name: String,
    pub phone_number: String,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub calendar_synced: bool,
}

impl AppointmentView {
    pub fn new(appointment: &Appointment, business: &BusinessTime) -> Self {
        Self {
            id: appointment.id.clone(),
            client_name: appointment.client_name.clone(),
            phone_number: appointment.phone_number.clone(),
            date: business.date_key(appointment.start_time),
            start_time: business.time_key(appointment.start_time),
            end_time: business.time_key(appointment.end_time),
            starts_at: appointment.start_time,
            ends_at: appointment.end_time,
            status: appointment.status,
            calendar_synced: appointment.google_event_id.is_some(),
        }
    }
}

/// Request to book an appointment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppointmentRequest {
    pub client_name: String,
    pub phone_number: String,
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HH:mm`
    pub time: String,
}

/// Request to move an appointment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleRequest {
    pub date: String,
    pub time: String,
}

/// Response after booking or rescheduling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingResponse {
    pub appointment: AppointmentView,
    /// Lets the client manage the appointment without an account
    pub manage_token: String,
}

/// Read-path answer for a single business date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityResponse {
    pub date: String,
    pub available: bool,
    pub slots: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_status_round_trip_and_blocking() {
        for status in [
            AppointmentStatus::Confirmed,
            AppointmentStatus::Cancelled,
            AppointmentStatus::Completed,
        ] {
            assert_eq!(AppointmentStatus::parse(status.as_str()), Some(status));
        }
        assert!(AppointmentStatus::Confirmed.blocks_slots());
        assert!(!AppointmentStatus::Cancelled.blocks_slots());
        assert!(!AppointmentStatus::Completed.blocks_slots());
        assert_eq!(AppointmentStatus::parse("pending"), None);
    }

    #[test]
    fn test_view_uses_business_local_values() {
        let business = BusinessTime::new(chrono_tz::America::New_York);
        let start = Utc.with_ymd_and_hms(2026, 3, 3, 15, 0, 0).unwrap();
        let appointment = Appointment {
            id: "apt_1".to_string(),
            client_name: "Sam".to_string(),
            phone_number: "+15555550100".to_string(),
            date: business.start_of_day(business.local_date(start)),
            start_time: start,
            end_time: start + chrono::Duration::minutes(45),
            status: AppointmentStatus::Confirmed,
            google_event_id: None,
            created_at: 0,
            updated_at: 0,
        };

        let view = AppointmentView::new(&appointment, &business);
        assert_eq!(view.date, "2026-03-03");
        assert_eq!(view.start_time, "10:00");
        assert_eq!(view.end_time, "10:45");
        assert!(!view.calendar_synced);
    }
}
