//! Booking, rescheduling and cancellation on top of the scheduling engine.
//!
//! Every write validates and persists inside one `IMMEDIATE` transaction,
//! re-running the same candidate and conflict checks the read path uses.
//! Calendar and SMS work is dispatched only after the commit.

mod notify;

pub use notify::{NotificationEvent, NotificationKind, Notifier};

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use rusqlite::Connection;
use serde::Serialize;
use std::sync::Arc;

use crate::calendar::CalendarProvider;
use crate::config::{AvailabilityModel, SchedulingRules, Settings};
use crate::crypto;
use crate::db::{self, Database};
use crate::error::{BookingError, ExistingBooking, Result};
use crate::models::{
    Appointment, AppointmentStatus, AppointmentView, AvailabilityResponse, AvailableSlot,
    AvailableSlotView, BlockedDate, BlockedDateView, BookingResponse, CreateAppointmentRequest,
    CreateAvailableSlotRequest, CreateBlockedDateRequest, DuplicateSlotsRequest,
    DuplicateSlotsResponse, RescheduleRequest, TimeSlot, WorkingHours,
};
use crate::scheduling::{
    check_booking_horizon, first_conflict, format_date_key, parse_date_key, parse_wall_clock,
    windows_from_slots, windows_from_weekly, BusinessTime, Clock, Closure, SlotGenerator, Window,
};
use crate::sms::{normalize_phone, SmsProvider};

const MAX_CLIENT_NAME_LEN: usize = 100;

/// Outcome of a calendar reconciliation run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub created: usize,
    /// Events of cancelled appointments that were deleted
    pub removed: usize,
    pub failed: usize,
}

/// The booking core: read path, write path and admin configuration
pub struct BookingService {
    db: Database,
    business: BusinessTime,
    rules: SchedulingRules,
    clock: Arc<dyn Clock>,
    default_country_code: String,
    manage_secret: String,
    notifier: Notifier,
}

impl BookingService {
    pub fn new(db: Database, settings: &Settings, clock: Arc<dyn Clock>) -> Self {
        let manage_secret = settings.manage_token_secret.clone().unwrap_or_else(|| {
            tracing::warn!("MANAGE_TOKEN_SECRET not set; manage links expire on restart");
            crypto::generate_secret()
        });
        let business = settings.business_time();
        let notifier = Notifier::new(
            db.clone(),
            business,
            clock.clone(),
            settings.business_name.clone(),
            settings.public_url.clone(),
            manage_secret.clone(),
            settings.sms_daily_limit,
        );

        Self {
            db,
            business,
            rules: settings.rules,
            clock,
            default_country_code: settings.default_country_code.clone(),
            manage_secret,
            notifier,
        }
    }

    pub fn with_sms(mut self, sms: Arc<dyn SmsProvider>) -> Self {
        self.notifier = self.notifier.with_sms(sms);
        self
    }

    pub fn with_calendar(mut self, calendar: Arc<dyn CalendarProvider>) -> Self {
        self.notifier = self.notifier.with_calendar(calendar);
        self
    }

    pub fn business(&self) -> &BusinessTime {
        &self.business
    }

    pub fn rules(&self) -> &SchedulingRules {
        &self.rules
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn view(&self, appointment: &Appointment) -> AppointmentView {
        AppointmentView::new(appointment, &self.business)
    }

    pub fn manage_token(&self, appointment_id: &str) -> Result<String> {
        Ok(crypto::manage_token(appointment_id, &self.manage_secret)?)
    }

    pub fn verify_manage_token(&self, appointment_id: &str, token: &str) -> bool {
        crypto::verify_manage_token(appointment_id, token, &self.manage_secret)
    }

    pub fn booking_response(&self, appointment: &Appointment) -> Result<BookingResponse> {
        Ok(BookingResponse {
            appointment: self.view(appointment),
            manage_token: self.manage_token(&appointment.id)?,
        })
    }

    // ==================== Read path ====================

    /// Bookable start times for a business date
    pub fn get_availability(&self, date_key: &str) -> Result<AvailabilityResponse> {
        let date = parse_date_key(date_key)?;
        let now = self.clock.now();

        let resolved = self.db.with_conn(|conn| {
            let windows = match self.resolve_windows(conn, date, now)? {
                Ok(windows) => windows,
                Err(closure) => return Ok(Err(closure)),
            };
            let booked = self.booked_on(conn, date)?;
            Ok(Ok((windows, booked)))
        })?;

        let (windows, booked) = match resolved {
            Ok(found) => found,
            Err(closure) => {
                tracing::debug!(date = date_key, "Closed: {}", closure);
                return Ok(AvailabilityResponse {
                    date: format_date_key(date),
                    available: false,
                    slots: Vec::new(),
                    reason: Some(closure.reason()),
                });
            }
        };

        let slots = SlotGenerator::new(&self.business, &self.rules)
            .bookable_times(date, &windows, &booked, now);

        Ok(AvailabilityResponse {
            date: format_date_key(date),
            available: !slots.is_empty(),
            slots,
            reason: None,
        })
    }

    /// Open windows for a date under the configured availability model
    fn resolve_windows(
        &self,
        conn: &Connection,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> anyhow::Result<std::result::Result<Vec<Window>, Closure>> {
        let today = self.business.local_date(now);
        if let Err(closure) = check_booking_horizon(date, today, self.rules.max_advance_booking_days)
        {
            return Ok(Err(closure));
        }

        let (day_start, day_end) = self.business.day_range(date);
        let windows = match self.rules.availability_model {
            AvailabilityModel::Slots => {
                let slots = db::availability::slots_between(conn, day_start, day_end)?;
                windows_from_slots(&slots)
            }
            AvailabilityModel::Weekly => {
                let hours = db::availability::working_hours_for(
                    conn,
                    date.weekday().num_days_from_sunday(),
                )?;
                let blocks = db::availability::blocked_between(conn, day_start, day_end)?;
                windows_from_weekly(hours.as_ref(), &blocks)
            }
        };
        Ok(windows)
    }

    /// Confirmed intervals that can collide with any candidate on `date`
    fn booked_on(&self, conn: &Connection, date: NaiveDate) -> anyhow::Result<Vec<TimeSlot>> {
        let (day_start, day_end) = self.business.day_range(date);
        self.booked_near(
            conn,
            TimeSlot::new(day_start, day_end + self.rules.duration()),
            None,
        )
    }

    /// Confirmed intervals that can collide with `span`: anything starting
    /// at or before its end whose buffered end is after its start
    fn booked_near(
        &self,
        conn: &Connection,
        span: TimeSlot,
        exclude_id: Option<&str>,
    ) -> anyhow::Result<Vec<TimeSlot>> {
        let appointments = db::appointments::confirmed_overlapping(
            conn,
            span.start - self.rules.buffer_duration(),
            span.end + Duration::seconds(1),
            exclude_id,
        )?;
        Ok(appointments.iter().map(Appointment::interval).collect())
    }

    /// Check a requested start against windows, the grid and existing
    /// bookings, returning the interval it would occupy
    fn validate_slot(
        &self,
        conn: &Connection,
        date: NaiveDate,
        time: NaiveTime,
        now: DateTime<Utc>,
        exclude_id: Option<&str>,
    ) -> Result<TimeSlot> {
        let windows = match self.resolve_windows(conn, date, now)? {
            Ok(windows) => windows,
            Err(closure) => return Err(BookingError::unavailable(closure.reason())),
        };

        let candidate = SlotGenerator::new(&self.business, &self.rules)
            .candidates(date, &windows, now)
            .into_iter()
            .find(|c| c.time == time);

        let Some(candidate) = candidate else {
            let started = self
                .business
                .combine(date, time)
                .is_some_and(|start| start <= now);
            if started {
                return Err(BookingError::unavailable(Closure::Past.reason()));
            }
            return Err(BookingError::unavailable(
                "Requested time is outside available hours",
            ));
        };

        let booked = self.booked_near(conn, candidate.slot, exclude_id)?;
        if let Some(taken) = first_conflict(&candidate.slot, &booked, self.rules.buffer_duration())
        {
            tracing::debug!(
                requested = %candidate.slot.start,
                booked = %taken.start,
                "Requested slot collides with a confirmed appointment"
            );
            return Err(BookingError::conflict("This time slot is no longer available"));
        }

        Ok(candidate.slot)
    }

    fn existing_booking(&self, appointment: &Appointment) -> ExistingBooking {
        ExistingBooking {
            id: appointment.id.clone(),
            date: self.business.date_key(appointment.start_time),
            time: self.business.time_key(appointment.start_time),
        }
    }

    // ==================== Write path ====================

    /// Book a new appointment
    pub fn create_appointment(&self, req: &CreateAppointmentRequest) -> Result<Appointment> {
        let client_name = validate_client_name(&req.client_name)?;
        let phone_number = normalize_phone(&req.phone_number, &self.default_country_code)?;
        let date = parse_date_key(&req.date)?;
        let time = parse_wall_clock(&req.time)?;
        let now = self.clock.now();

        let appointment = self.db.transaction(|conn| -> Result<Appointment> {
            if let Some(existing) =
                db::appointments::upcoming_for_phone(conn, &phone_number, now)?
            {
                return Err(BookingError::ActiveBooking(self.existing_booking(&existing)));
            }

            let slot = self.validate_slot(conn, date, time, now, None)?;
            let appointment = Appointment {
                id: uuid::Uuid::new_v4().to_string(),
                client_name,
                phone_number,
                date: self.business.start_of_day(date),
                start_time: slot.start,
                end_time: slot.end,
                status: AppointmentStatus::Confirmed,
                google_event_id: None,
                created_at: now.timestamp(),
                updated_at: now.timestamp(),
            };
            db::appointments::insert(conn, &appointment)?;
            Ok(appointment)
        })?;

        tracing::info!(
            appointment_id = %appointment.id,
            "Booked {} {}",
            req.date,
            req.time
        );
        self.notifier.dispatch(NotificationEvent::new(
            NotificationKind::Booked,
            appointment.clone(),
        ));
        Ok(appointment)
    }

    /// Move an appointment to a new date and time, in place
    pub fn reschedule_appointment(&self, id: &str, req: &RescheduleRequest) -> Result<Appointment> {
        let date = parse_date_key(&req.date)?;
        let time = parse_wall_clock(&req.time)?;
        let now = self.clock.now();

        let (appointment, previous_event_id) =
            self.db.transaction(|conn| -> Result<(Appointment, Option<String>)> {
            let current = db::appointments::get(conn, id)?
                .ok_or_else(|| BookingError::not_found("Appointment not found"))?;
            match current.status {
                AppointmentStatus::Confirmed => {}
                status => {
                    return Err(BookingError::validation(format!(
                        "Cannot reschedule a {} appointment",
                        status
                    )))
                }
            }

            let requested = self.business.combine_keys(&req.date, &req.time)?;
            if requested <= now {
                return Err(BookingError::validation(
                    "New appointment time must be in the future",
                ));
            }

            let slot = self.validate_slot(conn, date, time, now, Some(id))?;
            db::appointments::update_schedule(
                conn,
                id,
                self.business.start_of_day(date),
                slot.start,
                slot.end,
                now.timestamp(),
            )?;
            // The old event is replaced after commit; until then sync-calendar
            // sees this appointment as unsynced
            db::appointments::clear_calendar_event(conn, id)?;

            let updated = Appointment {
                date: self.business.start_of_day(date),
                start_time: slot.start,
                end_time: slot.end,
                status: AppointmentStatus::Confirmed,
                google_event_id: None,
                updated_at: now.timestamp(),
                ..current.clone()
            };
            Ok((updated, current.google_event_id))
        })?;

        tracing::info!(
            appointment_id = %appointment.id,
            "Rescheduled to {} {}",
            req.date,
            req.time
        );
        self.notifier.dispatch(NotificationEvent::new(
            NotificationKind::Rescheduled { previous_event_id },
            appointment.clone(),
        ));
        Ok(appointment)
    }

    /// Cancel an appointment. Cancelling twice is a no-op.
    pub fn cancel_appointment(&self, id: &str) -> Result<Appointment> {
        let now = self.clock.now();

        let (appointment, changed) = self.db.transaction(|conn| -> Result<(Appointment, bool)> {
            let current = db::appointments::get(conn, id)?
                .ok_or_else(|| BookingError::not_found("Appointment not found"))?;
            match current.status {
                AppointmentStatus::Cancelled => Ok((current, false)),
                AppointmentStatus::Completed => Err(BookingError::validation(
                    "Cannot cancel a completed appointment",
                )),
                AppointmentStatus::Confirmed => {
                    db::appointments::update_status(
                        conn,
                        id,
                        AppointmentStatus::Cancelled,
                        now.timestamp(),
                    )?;
                    let cancelled = Appointment {
                        status: AppointmentStatus::Cancelled,
                        updated_at: now.timestamp(),
                        ..current
                    };
                    Ok((cancelled, true))
                }
            }
        })?;

        if changed {
            tracing::info!(appointment_id = %appointment.id, "Cancelled appointment");
            self.notifier.dispatch(NotificationEvent::new(
                NotificationKind::Cancelled {
                    event_id: appointment.google_event_id.clone(),
                },
                appointment.clone(),
            ));
        }
        Ok(appointment)
    }

    pub fn get_appointment(&self, id: &str) -> Result<Appointment> {
        self.db
            .with_conn(|conn| db::appointments::get(conn, id))?
            .ok_or_else(|| BookingError::not_found("Appointment not found"))
    }

    /// Every appointment starting on a business date, any status
    pub fn list_appointments(&self, date_key: &str) -> Result<Vec<Appointment>> {
        let (start, end) = self.business.day_range_for_key(date_key)?;
        Ok(self
            .db
            .with_conn(|conn| db::appointments::starting_between(conn, start, end))?)
    }

    // ==================== Maintenance ====================

    /// Mark confirmed appointments that have ended as completed
    pub fn complete_past_appointments(&self) -> Result<usize> {
        let now = self.clock.now();
        let count = self
            .db
            .transaction(|conn| db::appointments::complete_past(conn, now))?;
        if count > 0 {
            tracing::info!("Marked {} appointments completed", count);
        }
        Ok(count)
    }

    /// Create calendar events for upcoming confirmed appointments that have
    /// none, and delete events still held by cancelled appointments
    pub async fn sync_calendar(&self) -> Result<SyncReport> {
        let calendar = self
            .notifier
            .calendar()
            .cloned()
            .ok_or_else(|| BookingError::validation("Calendar sync is not configured"))?;

        let now = self.clock.now();
        let (missing, leftover) = self.db.with_conn(|conn| {
            Ok((
                db::appointments::missing_calendar_event(conn, now)?,
                db::appointments::cancelled_with_calendar_event(conn)?,
            ))
        })?;

        let mut report = SyncReport::default();
        for appointment in &missing {
            match self
                .notifier
                .create_event(calendar.as_ref(), appointment)
                .await
            {
                Ok(true) => report.created += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(
                        appointment_id = %appointment.id,
                        "Calendar sync failed: {:#}",
                        e
                    );
                    report.failed += 1;
                }
            }
        }

        for appointment in &leftover {
            let Some(event_id) = appointment.google_event_id.as_deref() else {
                continue;
            };
            match self
                .notifier
                .remove_event(calendar.as_ref(), appointment, event_id)
                .await
            {
                Ok(()) => report.removed += 1,
                Err(e) => {
                    tracing::warn!(
                        appointment_id = %appointment.id,
                        event_id = %event_id,
                        "Calendar cleanup failed: {:#}",
                        e
                    );
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            created = report.created,
            removed = report.removed,
            failed = report.failed,
            "Calendar reconciliation finished"
        );
        Ok(report)
    }

    // ==================== Admin configuration ====================

    /// Inclusive business date range, defaulting to today through the
    /// booking horizon
    fn date_range(
        &self,
        from: Option<&str>,
        to: Option<&str>,
    ) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
        let today = self.business.local_date(self.clock.now());
        let from = match from {
            Some(key) => parse_date_key(key)?,
            None => today,
        };
        let to = match to {
            Some(key) => parse_date_key(key)?,
            None => today
                .checked_add_signed(Duration::days(self.rules.max_advance_booking_days))
                .ok_or_else(|| BookingError::validation("Booking horizon is out of range"))?,
        };
        if to < from {
            return Err(BookingError::validation("`to` must not be before `from`"));
        }
        Ok((self.business.start_of_day(from), self.business.day_range(to).1))
    }

    fn slot_view(&self, slot: &AvailableSlot) -> AvailableSlotView {
        AvailableSlotView {
            id: slot.id.clone(),
            date: self.business.date_key(slot.date),
            start_time: slot.start_time.clone(),
            end_time: slot.end_time.clone(),
            reason: slot.reason.clone(),
        }
    }

    fn blocked_view(&self, block: &BlockedDate) -> BlockedDateView {
        BlockedDateView {
            id: block.id.clone(),
            date: self.business.date_key(block.date),
            is_full_day: block.is_full_day,
            start_time: block.start_time.clone(),
            end_time: block.end_time.clone(),
            reason: block.reason.clone(),
        }
    }

    pub fn list_available_slots(
        &self,
        from: Option<&str>,
        to: Option<&str>,
    ) -> Result<Vec<AvailableSlotView>> {
        let (start, end) = self.date_range(from, to)?;
        let slots = self
            .db
            .with_conn(|conn| db::availability::slots_between(conn, start, end))?;
        Ok(slots.iter().map(|s| self.slot_view(s)).collect())
    }

    pub fn create_available_slot(
        &self,
        req: &CreateAvailableSlotRequest,
    ) -> Result<AvailableSlotView> {
        let date = parse_date_key(&req.date)?;
        let window = parse_window(&req.start_time, &req.end_time)?;

        let slot = AvailableSlot {
            id: uuid::Uuid::new_v4().to_string(),
            date: self.business.start_of_day(date),
            start_time: window.start_key(),
            end_time: window.end_key(),
            reason: req.reason.clone(),
            created_at: self.clock.now().timestamp(),
        };
        self.db
            .with_conn(|conn| db::availability::insert_slot(conn, &slot))?;

        tracing::info!(slot_id = %slot.id, "Opened {} {}", req.date, window);
        Ok(self.slot_view(&slot))
    }

    pub fn delete_available_slot(&self, id: &str) -> Result<()> {
        if !self
            .db
            .with_conn(|conn| db::availability::delete_slot(conn, id))?
        {
            return Err(BookingError::not_found("Available slot not found"));
        }
        Ok(())
    }

    /// Copy the windows of `days` days starting at `source_start` onto each
    /// of the following `weeks` weeks, skipping windows that already exist
    pub fn duplicate_available_slots(
        &self,
        req: &DuplicateSlotsRequest,
    ) -> Result<DuplicateSlotsResponse> {
        let source_start = parse_date_key(&req.source_start)?;
        if !(1..=31).contains(&req.days) {
            return Err(BookingError::validation("days must be between 1 and 31"));
        }
        if !(1..=52).contains(&req.weeks) {
            return Err(BookingError::validation("weeks must be between 1 and 52"));
        }

        let source_end = source_start + Duration::days(i64::from(req.days));
        let start = self.business.start_of_day(source_start);
        let end = self.business.start_of_day(source_end);
        let now = self.clock.now().timestamp();

        let result = self.db.transaction(|conn| -> Result<DuplicateSlotsResponse> {
            let sources = db::availability::slots_between(conn, start, end)?;
            let mut result = DuplicateSlotsResponse {
                created: 0,
                skipped: 0,
            };

            for week in 1..=i64::from(req.weeks) {
                for source in &sources {
                    let day = self.business.local_date(source.date) + Duration::weeks(week);
                    let date = self.business.start_of_day(day);
                    if db::availability::slot_exists(
                        conn,
                        date,
                        &source.start_time,
                        &source.end_time,
                    )? {
                        result.skipped += 1;
                        continue;
                    }
                    db::availability::insert_slot(
                        conn,
                        &AvailableSlot {
                            id: uuid::Uuid::new_v4().to_string(),
                            date,
                            start_time: source.start_time.clone(),
                            end_time: source.end_time.clone(),
                            reason: source.reason.clone(),
                            created_at: now,
                        },
                    )?;
                    result.created += 1;
                }
            }
            Ok(result)
        })?;

        tracing::info!(
            created = result.created,
            skipped = result.skipped,
            "Duplicated available slots from {}",
            req.source_start
        );
        Ok(result)
    }

    pub fn list_blocked_dates(
        &self,
        from: Option<&str>,
        to: Option<&str>,
    ) -> Result<Vec<BlockedDateView>> {
        let (start, end) = self.date_range(from, to)?;
        let blocks = self
            .db
            .with_conn(|conn| db::availability::blocked_between(conn, start, end))?;
        Ok(blocks.iter().map(|b| self.blocked_view(b)).collect())
    }

    pub fn create_blocked_date(&self, req: &CreateBlockedDateRequest) -> Result<BlockedDateView> {
        let date = parse_date_key(&req.date)?;
        let (start_time, end_time) = if req.is_full_day {
            (None, None)
        } else {
            let (Some(start), Some(end)) = (req.start_time.as_deref(), req.end_time.as_deref())
            else {
                return Err(BookingError::validation(
                    "Partial-day blocks need start_time and end_time",
                ));
            };
            let window = parse_window(start, end)?;
            (Some(window.start_key()), Some(window.end_key()))
        };

        let block = BlockedDate {
            id: uuid::Uuid::new_v4().to_string(),
            date: self.business.start_of_day(date),
            is_full_day: req.is_full_day,
            start_time,
            end_time,
            reason: req.reason.clone(),
            created_at: self.clock.now().timestamp(),
        };
        self.db
            .with_conn(|conn| db::availability::insert_blocked(conn, &block))?;

        tracing::info!(block_id = %block.id, "Blocked {}", req.date);
        Ok(self.blocked_view(&block))
    }

    pub fn delete_blocked_date(&self, id: &str) -> Result<()> {
        if !self
            .db
            .with_conn(|conn| db::availability::delete_blocked(conn, id))?
        {
            return Err(BookingError::not_found("Blocked date not found"));
        }
        Ok(())
    }

    pub fn list_working_hours(&self) -> Result<Vec<WorkingHours>> {
        Ok(self.db.with_conn(db::availability::all_working_hours)?)
    }

    /// Replace the schedule of each weekday given
    pub fn set_working_hours(&self, hours: &[WorkingHours]) -> Result<Vec<WorkingHours>> {
        let mut normalized = Vec::with_capacity(hours.len());
        for day in hours {
            if day.day_of_week > 6 {
                return Err(BookingError::validation(
                    "day_of_week must be between 0 (Sunday) and 6",
                ));
            }
            let window = parse_window(&day.start_time, &day.end_time)?;
            normalized.push(WorkingHours {
                day_of_week: day.day_of_week,
                start_time: window.start_key(),
                end_time: window.end_key(),
                is_active: day.is_active,
            });
        }

        self.db.transaction(|conn| -> Result<()> {
            for day in &normalized {
                db::availability::upsert_working_hours(conn, day)?;
            }
            Ok(())
        })?;
        self.list_working_hours()
    }
}

fn validate_client_name(raw: &str) -> Result<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(BookingError::validation("Client name is required"));
    }
    if name.chars().count() > MAX_CLIENT_NAME_LEN {
        return Err(BookingError::validation(format!(
            "Client name must be at most {} characters",
            MAX_CLIENT_NAME_LEN
        )));
    }
    Ok(name.to_string())
}

fn parse_window(start: &str, end: &str) -> Result<Window> {
    let start = parse_wall_clock(start)?;
    let end = parse_wall_clock(end)?;
    Window::new(start, end)
        .ok_or_else(|| BookingError::validation("start_time must be before end_time"))
}
