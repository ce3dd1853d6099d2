use anyhow::{Context, Result};

use super::{get_admin_key, get_api_client, get_server_url, read_json, OutputFormat};
use crate::models::{
    AppointmentView, AvailabilityResponse, BookingResponse, CreateAppointmentRequest,
    RescheduleRequest,
};

impl std::fmt::Display for AvailabilityResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.available {
            return write!(
                f,
                "{}: closed ({})",
                self.date,
                self.reason.as_deref().unwrap_or("no availability")
            );
        }
        if self.slots.is_empty() {
            return write!(f, "{}: fully booked", self.date);
        }
        writeln!(f, "Available on {}:", self.date)?;
        for chunk in self.slots.chunks(8) {
            writeln!(f, "  {}", chunk.join("  "))?;
        }
        Ok(())
    }
}

impl std::fmt::Display for AppointmentView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Appointment {}", self.id)?;
        writeln!(f, "  Client: {} ({})", self.client_name, self.phone_number)?;
        writeln!(
            f,
            "  When:   {} {}-{}",
            self.date, self.start_time, self.end_time
        )?;
        write!(f, "  Status: {}", self.status)?;
        if self.calendar_synced {
            write!(f, " (on calendar)")?;
        }
        Ok(())
    }
}

impl std::fmt::Display for BookingResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self.appointment)?;
        write!(f, "  Manage token: {}", self.manage_token)
    }
}

/// Show bookable start times for a date
pub async fn run_availability(date: &str, format: OutputFormat) -> Result<()> {
    let client = get_api_client()?;
    let resp = client
        .get(format!("{}/api/availability", get_server_url()))
        .query(&[("date", date)])
        .send()
        .await
        .context("Failed to query availability")?;

    let availability: AvailabilityResponse = read_json(resp, "query availability").await?;
    format.print(&availability);
    Ok(())
}

/// Book an appointment
pub async fn run_book(
    client_name: &str,
    phone_number: &str,
    date: &str,
    time: &str,
    format: OutputFormat,
) -> Result<()> {
    let request = CreateAppointmentRequest {
        client_name: client_name.to_string(),
        phone_number: phone_number.to_string(),
        date: date.to_string(),
        time: time.to_string(),
    };

    let client = get_api_client()?;
    let resp = client
        .post(format!("{}/api/appointments", get_server_url()))
        .json(&request)
        .send()
        .await
        .context("Failed to book appointment")?;

    let booked: BookingResponse = read_json(resp, "book appointment").await?;
    format.print(&booked);
    Ok(())
}

/// Cancel an appointment with its manage token, or with the admin key when
/// no token is given
pub async fn run_cancel(id: &str, token: Option<&str>, format: OutputFormat) -> Result<()> {
    let client = get_api_client()?;
    let server_url = get_server_url();

    let request = match token {
        Some(token) => client
            .post(format!("{}/api/appointments/{}/cancel", server_url, id))
            .query(&[("token", token)]),
        None => client
            .post(format!("{}/api/admin/appointments/{}/cancel", server_url, id))
            .bearer_auth(get_admin_key()?),
    };
    let resp = request
        .send()
        .await
        .context("Failed to cancel appointment")?;

    let appointment: AppointmentView = read_json(resp, "cancel appointment").await?;
    format.print(&appointment);
    Ok(())
}

/// Move an appointment, authorized the same way as `run_cancel`
pub async fn run_reschedule(
    id: &str,
    date: &str,
    time: &str,
    token: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let client = get_api_client()?;
    let server_url = get_server_url();
    let body = RescheduleRequest {
        date: date.to_string(),
        time: time.to_string(),
    };

    let request = match token {
        Some(token) => client
            .post(format!("{}/api/appointments/{}/reschedule", server_url, id))
            .query(&[("token", token)]),
        None => client
            .post(format!(
                "{}/api/admin/appointments/{}/reschedule",
                server_url, id
            ))
            .bearer_auth(get_admin_key()?),
    };
    let resp = request
        .json(&body)
        .send()
        .await
        .context("Failed to reschedule appointment")?;

    let moved: BookingResponse = read_json(resp, "reschedule appointment").await?;
    format.print(&moved);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AppointmentStatus;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_closed_day_display() {
        let closed = AvailabilityResponse {
            date: "2026-03-08".to_string(),
            available: false,
            slots: vec![],
            reason: Some("No availability set for this date".to_string()),
        };
        assert_eq!(
            closed.to_string(),
            "2026-03-08: closed (No availability set for this date)"
        );
    }

    #[test]
    fn test_open_day_display_wraps_slots() {
        let slots: Vec<String> = (0..10).map(|i| format!("09:{:02}", i)).collect();
        let open = AvailabilityResponse {
            date: "2026-03-03".to_string(),
            available: true,
            slots,
            reason: None,
        };
        let text = open.to_string();
        assert_eq!(text.lines().count(), 3);
        assert!(text.starts_with("Available on 2026-03-03:"));
    }

    #[test]
    fn test_appointment_display() {
        let start = Utc.with_ymd_and_hms(2026, 3, 3, 15, 0, 0).unwrap();
        let view = AppointmentView {
            id: "apt-1".to_string(),
            client_name: "Sam".to_string(),
            phone_number: "+15550102000".to_string(),
            date: "2026-03-03".to_string(),
            start_time: "10:00".to_string(),
            end_time: "10:45".to_string(),
            starts_at: start,
            ends_at: start + chrono::Duration::minutes(45),
            status: AppointmentStatus::Confirmed,
            calendar_synced: false,
        };
        let text = view.to_string();
        assert!(text.contains("2026-03-03 10:00-10:45"));
        assert!(text.ends_with("Status: confirmed"));
    }
}
