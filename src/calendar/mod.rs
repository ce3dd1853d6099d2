mod google;

pub use google::*;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::Appointment;

/// Trait for calendar providers
#[async_trait]
pub trait CalendarProvider: Send + Sync {
    /// Create a calendar event
    async fn create_event(&self, event: &EventDetails) -> Result<CreatedEvent>;

    /// Delete a calendar event. Deleting an event that is already gone
    /// succeeds.
    async fn delete_event(&self, event_id: &str) -> Result<()>;
}

/// Event to be written to the shop's calendar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDetails {
    pub title: String,
    pub description: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// IANA zone the event is displayed in
    pub timezone: String,
}

impl EventDetails {
    pub fn for_appointment(appointment: &Appointment, business_name: &str, timezone: &str) -> Self {
        Self {
            title: format!("{} - {}", appointment.client_name, business_name),
            description: format!(
                "Client: {}\nPhone: {}\nAppointment: {}",
                appointment.client_name, appointment.phone_number, appointment.id
            ),
            start: appointment.start_time,
            end: appointment.end_time,
            timezone: timezone.to_string(),
        }
    }
}

/// Result of creating a calendar event
#[derive(Debug, Clone)]
pub struct CreatedEvent {
    pub id: String,
    pub html_link: Option<String>,
}
