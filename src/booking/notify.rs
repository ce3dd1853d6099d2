//! Side effects that follow a committed booking change: calendar events and
//! SMS. They run after the transaction, on their own task, and never fail
//! the request that caused them.

use anyhow::Result;
use std::sync::Arc;

use crate::calendar::{CalendarProvider, EventDetails};
use crate::crypto;
use crate::db::{self, Database};
use crate::models::{Appointment, SmsKind, SmsLog};
use crate::scheduling::{BusinessTime, Clock};
use crate::sms::{self, MessageContext, SmsProvider};

/// What happened to an appointment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationKind {
    Booked,
    /// Carries the calendar event of the old time, if there was one
    Rescheduled { previous_event_id: Option<String> },
    Cancelled { event_id: Option<String> },
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Booked => "appointment.booked",
            NotificationKind::Rescheduled { .. } => "appointment.rescheduled",
            NotificationKind::Cancelled { .. } => "appointment.cancelled",
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A committed change, with the appointment as it now stands
#[derive(Debug, Clone)]
pub struct NotificationEvent {
    pub kind: NotificationKind,
    pub appointment: Appointment,
}

impl NotificationEvent {
    pub fn new(kind: NotificationKind, appointment: Appointment) -> Self {
        Self { kind, appointment }
    }
}

/// Delivers notification events to the configured collaborators
#[derive(Clone)]
pub struct Notifier {
    db: Database,
    business: BusinessTime,
    clock: Arc<dyn Clock>,
    business_name: String,
    public_url: String,
    manage_secret: String,
    sms_daily_limit: i64,
    sms: Option<Arc<dyn SmsProvider>>,
    calendar: Option<Arc<dyn CalendarProvider>>,
}

impl Notifier {
    pub fn new(
        db: Database,
        business: BusinessTime,
        clock: Arc<dyn Clock>,
        business_name: String,
        public_url: String,
        manage_secret: String,
        sms_daily_limit: i64,
    ) -> Self {
        Self {
            db,
            business,
            clock,
            business_name,
            public_url,
            manage_secret,
            sms_daily_limit,
            sms: None,
            calendar: None,
        }
    }

    pub fn with_sms(mut self, sms: Arc<dyn SmsProvider>) -> Self {
        self.sms = Some(sms);
        self
    }

    pub fn with_calendar(mut self, calendar: Arc<dyn CalendarProvider>) -> Self {
        self.calendar = Some(calendar);
        self
    }

    pub fn calendar(&self) -> Option<&Arc<dyn CalendarProvider>> {
        self.calendar.as_ref()
    }

    fn is_noop(&self) -> bool {
        self.sms.is_none() && self.calendar.is_none()
    }

    /// Fire-and-forget delivery on the current Tokio runtime
    pub fn dispatch(&self, event: NotificationEvent) {
        if self.is_noop() {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(
                appointment_id = %event.appointment.id,
                "No async runtime; dropping {} notification",
                event.kind
            );
            return;
        };
        let notifier = self.clone();
        handle.spawn(async move {
            notifier.handle(event).await;
        });
    }

    /// Deliver one event. Failures are logged, never returned.
    pub async fn handle(&self, event: NotificationEvent) {
        let appointment = &event.appointment;
        tracing::debug!(appointment_id = %appointment.id, "Handling {}", event.kind);

        if let Err(e) = self.sync_calendar_for(&event).await {
            tracing::warn!(
                appointment_id = %appointment.id,
                "Calendar sync failed for {}: {:#}",
                event.kind,
                e
            );
        }

        let kind = match event.kind {
            NotificationKind::Booked => SmsKind::Confirmation,
            NotificationKind::Rescheduled { .. } => SmsKind::Rescheduled,
            NotificationKind::Cancelled { .. } => SmsKind::Cancelled,
        };
        if let Err(e) = self.send_sms(kind, appointment).await {
            tracing::warn!(
                appointment_id = %appointment.id,
                "Failed to record {} SMS: {:#}",
                kind,
                e
            );
        }
    }

    async fn sync_calendar_for(&self, event: &NotificationEvent) -> Result<()> {
        let Some(calendar) = &self.calendar else {
            return Ok(());
        };
        let appointment = &event.appointment;

        match &event.kind {
            NotificationKind::Booked => {
                self.create_event(calendar.as_ref(), appointment).await?;
                Ok(())
            }
            NotificationKind::Rescheduled { previous_event_id } => {
                if let Some(previous) = previous_event_id {
                    // The new event is created even if the old one lingers
                    if let Err(e) = calendar.delete_event(previous).await {
                        tracing::warn!(
                            appointment_id = %appointment.id,
                            event_id = %previous,
                            "Failed to delete previous calendar event: {:#}",
                            e
                        );
                    }
                }
                self.create_event(calendar.as_ref(), appointment).await?;
                Ok(())
            }
            NotificationKind::Cancelled { event_id } => match event_id {
                Some(event_id) => {
                    self.remove_event(calendar.as_ref(), appointment, event_id)
                        .await
                }
                None => Ok(()),
            },
        }
    }

    /// Create the calendar event of a confirmed appointment and store its id.
    ///
    /// The appointment may have been cancelled or moved while the event was
    /// being created. The id is only stored if the row is still confirmed at
    /// the same start with no event; otherwise the new event is deleted again
    /// and `Ok(false)` is returned.
    pub async fn create_event(
        &self,
        calendar: &dyn CalendarProvider,
        appointment: &Appointment,
    ) -> Result<bool> {
        let details = EventDetails::for_appointment(
            appointment,
            &self.business_name,
            self.business.timezone().name(),
        );
        let created = calendar.create_event(&details).await?;
        let attached = self.db.with_conn(|conn| {
            db::appointments::attach_calendar_event(
                conn,
                &appointment.id,
                &created.id,
                appointment.start_time,
            )
        })?;

        if attached {
            tracing::info!(
                appointment_id = %appointment.id,
                event_id = %created.id,
                "Created calendar event"
            );
            return Ok(true);
        }

        tracing::info!(
            appointment_id = %appointment.id,
            event_id = %created.id,
            "Appointment changed while creating its calendar event; removing it"
        );
        if let Err(e) = calendar.delete_event(&created.id).await {
            tracing::warn!(
                appointment_id = %appointment.id,
                event_id = %created.id,
                "Failed to remove stale calendar event: {:#}",
                e
            );
        }
        Ok(false)
    }

    /// Delete an appointment's calendar event, then drop the reference if it
    /// still points at that event
    pub async fn remove_event(
        &self,
        calendar: &dyn CalendarProvider,
        appointment: &Appointment,
        event_id: &str,
    ) -> Result<()> {
        calendar.delete_event(event_id).await?;
        self.db.with_conn(|conn| {
            db::appointments::detach_calendar_event(conn, &appointment.id, event_id)
        })?;
        tracing::info!(
            appointment_id = %appointment.id,
            event_id = %event_id,
            "Deleted calendar event"
        );
        Ok(())
    }

    fn manage_url(&self, appointment_id: &str) -> Result<String> {
        let token = crypto::manage_token(appointment_id, &self.manage_secret)?;
        Ok(format!(
            "{}/api/appointments/{}?token={}",
            self.public_url, appointment_id, token
        ))
    }

    async fn send_sms(&self, kind: SmsKind, appointment: &Appointment) -> Result<()> {
        let Some(provider) = &self.sms else {
            return Ok(());
        };

        let now = self.clock.now();
        let day_start = self.business.start_of_day(self.business.local_date(now));
        let phone = appointment.phone_number.clone();
        let sent_today = self
            .db
            .with_conn(|conn| db::sms::sent_since(conn, &phone, day_start))?;

        let mut log = SmsLog {
            id: uuid::Uuid::new_v4().to_string(),
            appointment_id: Some(appointment.id.clone()),
            phone_number: phone,
            kind,
            status: "sent".to_string(),
            provider_id: None,
            error: None,
            created_at: now.timestamp(),
        };

        if sent_today >= self.sms_daily_limit {
            tracing::warn!(
                appointment_id = %appointment.id,
                "Daily SMS limit reached for {}; skipping {}",
                log.phone_number,
                kind
            );
            log.status = "skipped".to_string();
            log.error = Some("daily limit reached".to_string());
            return self.db.with_conn(|conn| db::sms::insert_log(conn, &log));
        }

        let manage_url = match kind {
            SmsKind::Cancelled => None,
            _ => Some(self.manage_url(&appointment.id)?),
        };
        let ctx = MessageContext {
            business: &self.business,
            business_name: &self.business_name,
            manage_url: manage_url.as_deref(),
        };
        let body = sms::render(kind, appointment, &ctx);

        match provider.send(&log.phone_number, &body).await {
            Ok(sent) => {
                tracing::info!(appointment_id = %appointment.id, "Sent {} SMS", kind);
                log.provider_id = sent.provider_id;
            }
            Err(e) => {
                tracing::warn!(
                    appointment_id = %appointment.id,
                    "Failed to send {} SMS: {:#}",
                    kind,
                    e
                );
                log.status = "failed".to_string();
                log.error = Some(e.to_string());
            }
        }

        self.db.with_conn(|conn| db::sms::insert_log(conn, &log))
    }
}
