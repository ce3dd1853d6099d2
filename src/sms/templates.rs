use chrono::{DateTime, Utc};

use crate::models::{Appointment, SmsKind};
use crate::scheduling::BusinessTime;

/// Values every message needs besides the appointment
#[derive(Debug, Clone)]
pub struct MessageContext<'a> {
    pub business: &'a BusinessTime,
    pub business_name: &'a str,
    /// Absent for cancellations
    pub manage_url: Option<&'a str>,
}

/// e.g. `Tue, Mar 3 at 10:00 AM`, business-local
pub fn describe_start(business: &BusinessTime, start: DateTime<Utc>) -> String {
    start
        .with_timezone(&business.timezone())
        .format("%a, %b %-d at %-I:%M %p")
        .to_string()
}

/// Message body for a notification about `appointment`
pub fn render(kind: SmsKind, appointment: &Appointment, ctx: &MessageContext<'_>) -> String {
    let when = describe_start(ctx.business, appointment.start_time);
    let mut body = match kind {
        SmsKind::Confirmation => format!(
            "Hi {}, your appointment at {} is confirmed for {}.",
            appointment.client_name, ctx.business_name, when
        ),
        SmsKind::Rescheduled => format!(
            "Hi {}, your appointment at {} has been moved to {}.",
            appointment.client_name, ctx.business_name, when
        ),
        SmsKind::Cancelled => format!(
            "Hi {}, your appointment at {} on {} has been cancelled.",
            appointment.client_name, ctx.business_name, when
        ),
    };
    if let Some(url) = ctx.manage_url {
        body.push_str(&format!(" Manage it here: {}", url));
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AppointmentStatus;
    use chrono::TimeZone;

    fn appointment() -> Appointment {
        let start = Utc.with_ymd_and_hms(2026, 3, 3, 15, 0, 0).unwrap();
        Appointment {
            id: "apt_1".to_string(),
            client_name: "Sam".to_string(),
            phone_number: "+15555550100".to_string(),
            date: Utc.with_ymd_and_hms(2026, 3, 3, 5, 0, 0).unwrap(),
            start_time: start,
            end_time: start + chrono::Duration::minutes(45),
            status: AppointmentStatus::Confirmed,
            google_event_id: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_confirmation_uses_business_local_time() {
        let business = BusinessTime::new(chrono_tz::America::New_York);
        let ctx = MessageContext {
            business: &business,
            business_name: "Fade Street",
            manage_url: Some("https://book.example.com/appointments/apt_1?token=abc"),
        };

        let body = render(SmsKind::Confirmation, &appointment(), &ctx);
        assert_eq!(
            body,
            "Hi Sam, your appointment at Fade Street is confirmed for Tue, Mar 3 at 10:00 AM. \
             Manage it here: https://book.example.com/appointments/apt_1?token=abc"
        );
    }

    #[test]
    fn test_cancellation_has_no_link() {
        let business = BusinessTime::new(chrono_tz::America::New_York);
        let ctx = MessageContext {
            business: &business,
            business_name: "Fade Street",
            manage_url: None,
        };

        let body = render(SmsKind::Cancelled, &appointment(), &ctx);
        assert!(body.ends_with("has been cancelled."));
    }
}
