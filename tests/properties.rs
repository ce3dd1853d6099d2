use std::sync::Arc;

use chairbook::booking::BookingService;
use chairbook::config::{SchedulingRules, Settings};
use chairbook::db::Database;
use chairbook::error::BookingError;
use chairbook::models::{
    Appointment, CreateAppointmentRequest, CreateAvailableSlotRequest, RescheduleRequest,
};
use chairbook::scheduling::{BusinessTime, FixedClock, SlotGenerator, Window};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};
use proptest::prelude::*;

const TUESDAY: &str = "2026-03-03";

/// Noon in New York on Monday 2026-03-02
fn monday_noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 17, 0, 0).unwrap()
}

fn tuesday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 3).unwrap()
}

fn service() -> BookingService {
    let mut settings = Settings::from_lookup(|_| None).unwrap();
    settings.manage_token_secret = Some("secret".to_string());
    BookingService::new(
        Database::open_in_memory().unwrap(),
        &settings,
        Arc::new(FixedClock::new(monday_noon())),
    )
}

fn hhmm(minute: u32) -> String {
    format!("{:02}:{:02}", minute / 60, minute % 60)
}

fn open(service: &BookingService, start: u32, end: u32) {
    service
        .create_available_slot(&CreateAvailableSlotRequest {
            date: TUESDAY.to_string(),
            start_time: hhmm(start),
            end_time: hhmm(end),
            reason: None,
        })
        .unwrap();
}

fn book(service: &BookingService, phone: usize, minute: u32) -> Result<Appointment, BookingError> {
    service.create_appointment(&CreateAppointmentRequest {
        client_name: "Prop Client".to_string(),
        phone_number: format!("+1555{:07}", phone),
        date: TUESDAY.to_string(),
        time: hhmm(minute),
    })
}

fn window(start: u32, len: u32) -> Window {
    let end = (start + len).min(23 * 60 + 59);
    Window::new(
        NaiveTime::from_hms_opt(start / 60, start % 60, 0).unwrap(),
        NaiveTime::from_hms_opt(end / 60, end % 60, 0).unwrap(),
    )
    .unwrap()
}

/// Windows with starts on a 5-minute grid, each at least 15 minutes long
fn windows_strategy() -> impl Strategy<Value = Vec<(u32, u32)>> {
    prop::collection::vec((0u32..276, 3u32..120), 1..4)
        .prop_map(|raw| raw.into_iter().map(|(s, l)| (s * 5, l * 5)).collect())
}

#[derive(Debug, Clone)]
enum Op {
    Book(u32),
    Reschedule(usize, u32),
    Cancel(usize),
}

/// Minutes from 08:00 to 18:55, mostly on the 15-minute grid
fn minute_strategy() -> impl Strategy<Value = u32> {
    prop_oneof![
        4 => (32u32..76).prop_map(|q| q * 15),
        1 => 480u32..1135,
    ]
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        5 => minute_strategy().prop_map(Op::Book),
        2 => (any::<usize>(), minute_strategy()).prop_map(|(i, m)| Op::Reschedule(i, m)),
        1 => any::<usize>().prop_map(Op::Cancel),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Any appointment accepted later never collides with the buffered
    /// interval of one accepted earlier, and confirmed appointments never
    /// overlap or touch.
    #[test]
    fn accepted_appointments_respect_buffer(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let service = service();
        open(&service, 9 * 60, 18 * 60);
        let buffer = service.rules().buffer_duration();

        // (acceptance sequence, appointment); cancelled ones are dropped
        let mut live: Vec<(usize, Appointment)> = Vec::new();
        let mut seq = 0;

        for (phone, op) in ops.iter().enumerate() {
            match op {
                Op::Book(minute) => {
                    if let Ok(apt) = book(&service, phone, *minute) {
                        seq += 1;
                        live.push((seq, apt));
                    }
                }
                Op::Reschedule(pick, minute) if !live.is_empty() => {
                    let idx = pick % live.len();
                    let req = RescheduleRequest { date: TUESDAY.to_string(), time: hhmm(*minute) };
                    if let Ok(apt) = service.reschedule_appointment(&live[idx].1.id, &req) {
                        seq += 1;
                        live[idx] = (seq, apt);
                    }
                }
                Op::Cancel(pick) if !live.is_empty() => {
                    let idx = pick % live.len();
                    let (_, apt) = live.remove(idx);
                    service.cancel_appointment(&apt.id).unwrap();
                }
                _ => {}
            }
        }

        for (i, (seq_a, a)) in live.iter().enumerate() {
            for (seq_b, b) in live.iter().skip(i + 1) {
                let (first, second) = if seq_a < seq_b { (a, b) } else { (b, a) };
                if second.start_time >= first.start_time {
                    prop_assert!(second.start_time >= first.end_time + buffer);
                } else {
                    prop_assert!(second.end_time < first.start_time);
                }
            }
        }
    }

    /// Every offered start can be booked right away; every other start on the
    /// day is refused as unavailable or conflicting.
    #[test]
    fn offered_slots_match_write_path(
        windows in windows_strategy(),
        prebooked in prop::collection::vec(32u32..76, 0..4),
        off_grid in 0u32..1440,
    ) {
        let service = service();
        for (start, len) in &windows {
            let w = window(*start, *len);
            open(&service, w.start_minute() as u32, w.end_minute() as u32);
        }
        let mut phone = 0;
        for q in &prebooked {
            phone += 1;
            let _ = book(&service, phone, q * 15);
        }

        let offered = service.get_availability(TUESDAY).unwrap().slots;

        let mut starts: Vec<u32> = (0..96).map(|q| q * 15).collect();
        starts.push(off_grid);

        for minute in starts {
            phone += 1;
            let key = hhmm(minute);
            let result = book(&service, phone, minute);
            if offered.contains(&key) {
                let apt = result.unwrap();
                service.cancel_appointment(&apt.id).unwrap();
            } else {
                prop_assert!(
                    matches!(result, Err(BookingError::Unavailable(_)) | Err(BookingError::Conflict(_))),
                    "{} was not offered but got {:?}",
                    key,
                    result
                );
            }
        }
    }

    /// Every candidate's full duration fits inside the window that produced it
    #[test]
    fn candidates_fit_their_window(
        windows in windows_strategy(),
        duration in 5i64..120,
        interval in 1i64..60,
    ) {
        let business = BusinessTime::new(chrono_tz::America::New_York);
        let rules = SchedulingRules {
            appointment_duration: duration,
            slot_interval: interval,
            ..SchedulingRules::default()
        };
        let windows: Vec<Window> = windows.iter().map(|(s, l)| window(*s, *l)).collect();

        let generator = SlotGenerator::new(&business, &rules);
        for candidate in generator.candidates(tuesday(), &windows, monday_noon()) {
            prop_assert!(windows.contains(&candidate.window));
            let start = i64::from(candidate.time.hour() * 60 + candidate.time.minute());
            prop_assert!(start >= candidate.window.start_minute());
            prop_assert!(start + duration <= candidate.window.end_minute());
            prop_assert_eq!(candidate.slot.end - candidate.slot.start, Duration::minutes(duration));
        }
    }

    /// On the current business day nothing before now, rounded up to the
    /// slot grid, is offered
    #[test]
    fn today_never_offers_past_starts(
        windows in windows_strategy(),
        seconds_into_day in 0i64..86_400,
    ) {
        let business = BusinessTime::new(chrono_tz::America::New_York);
        let rules = SchedulingRules::default();
        let windows: Vec<Window> = windows.iter().map(|(s, l)| window(*s, *l)).collect();
        let now = business.start_of_day(tuesday()) + Duration::seconds(seconds_into_day);

        let step = rules.slot_interval * 60;
        let rounded_up = (seconds_into_day + step - 1) / step * step;

        let generator = SlotGenerator::new(&business, &rules);
        for candidate in generator.bookable(tuesday(), &windows, &[], now) {
            let start = i64::from(candidate.time.num_seconds_from_midnight());
            prop_assert!(start >= rounded_up, "{} offered at {}", candidate.time, now);
            prop_assert!(candidate.slot.start >= now);
        }
    }
}
