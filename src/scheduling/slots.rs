use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Timelike, Utc};

use super::conflict::overlaps;
use super::time::{format_wall_clock, BusinessTime};
use super::windows::Window;
use crate::config::SchedulingRules;
use crate::models::TimeSlot;

/// A start time that fits inside a window, with the interval it would occupy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub time: NaiveTime,
    pub slot: TimeSlot,
    /// The window that produced this start
    pub window: Window,
}

/// Turns open windows into bookable start times
pub struct SlotGenerator<'a> {
    business: &'a BusinessTime,
    rules: &'a SchedulingRules,
}

impl<'a> SlotGenerator<'a> {
    pub fn new(business: &'a BusinessTime, rules: &'a SchedulingRules) -> Self {
        Self { business, rules }
    }

    /// Every start on the slot grid whose full duration fits a window,
    /// ignoring existing bookings. On the current business day, starts
    /// earlier than now rounded up to the grid are dropped. Sorted, one entry
    /// per start time.
    pub fn candidates(
        &self,
        date: NaiveDate,
        windows: &[Window],
        now: DateTime<Utc>,
    ) -> Vec<Candidate> {
        let today = self.business.local_date(now);
        if date < today {
            return Vec::new();
        }
        let earliest = if date == today {
            self.earliest_minute_today(now)
        } else {
            0
        };

        let duration = self.rules.appointment_duration;
        let step = self.rules.slot_interval;
        let mut found: BTreeMap<NaiveTime, Candidate> = BTreeMap::new();

        for window in windows {
            let Some(close) = self.window_close(date, window) else {
                continue;
            };
            let mut cursor = window.start_minute().max(earliest);
            while cursor + duration <= window.end_minute() {
                if let Some(candidate) = self.candidate_at(date, cursor, *window) {
                    // Wall-clock fit is not enough on a spring-forward day
                    if candidate.slot.end <= close {
                        found.entry(candidate.time).or_insert(candidate);
                    }
                }
                cursor += step;
            }
        }

        found.into_values().collect()
    }

    /// Candidates that do not collide with any booked interval
    pub fn bookable(
        &self,
        date: NaiveDate,
        windows: &[Window],
        booked: &[TimeSlot],
        now: DateTime<Utc>,
    ) -> Vec<Candidate> {
        let buffer = self.rules.buffer_duration();
        self.candidates(date, windows, now)
            .into_iter()
            .filter(|c| !overlaps(&c.slot, booked, buffer))
            .collect()
    }

    /// [`bookable`](Self::bookable) rendered as `HH:mm` strings
    pub fn bookable_times(
        &self,
        date: NaiveDate,
        windows: &[Window],
        booked: &[TimeSlot],
        now: DateTime<Utc>,
    ) -> Vec<String> {
        self.bookable(date, windows, booked, now)
            .iter()
            .map(|c| format_wall_clock(c.time))
            .collect()
    }

    /// Current business-local time rounded up to the next grid boundary,
    /// in minutes from midnight
    fn earliest_minute_today(&self, now: DateTime<Utc>) -> i64 {
        let local = self.business.local_time(now);
        let mut minute = i64::from(local.hour()) * 60 + i64::from(local.minute());
        if local.second() > 0 || local.nanosecond() > 0 {
            minute += 1;
        }
        let step = self.rules.slot_interval;
        (minute + step - 1) / step * step
    }

    /// The instant a window closes. An end inside a DST gap closes at the
    /// first real instant after it.
    fn window_close(&self, date: NaiveDate, window: &Window) -> Option<DateTime<Utc>> {
        let mut end = window.end;
        for _ in 0..=180 {
            if let Some(close) = self.business.combine(date, end) {
                return Some(close);
            }
            let next = end + Duration::minutes(1);
            if next < end {
                break;
            }
            end = next;
        }
        None
    }

    fn candidate_at(&self, date: NaiveDate, minute: i64, window: Window) -> Option<Candidate> {
        let time = NaiveTime::from_hms_opt(
            u32::try_from(minute / 60).ok()?,
            u32::try_from(minute % 60).ok()?,
            0,
        )?;
        // Wall-clock times inside a DST gap are never offered
        let start = self.business.combine(date, time)?;
        Some(Candidate {
            time,
            slot: TimeSlot::new(start, start + self.rules.duration()),
            window,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduling::time::parse_wall_clock;
    use chrono::TimeZone;
    use chrono_tz::America::New_York;

    fn business() -> BusinessTime {
        BusinessTime::new(New_York)
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 3).unwrap()
    }

    /// Noon UTC the day before `date()`
    fn yesterday_noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 17, 0, 0).unwrap()
    }

    fn window(start: &str, end: &str) -> Window {
        Window::parse(start, end).unwrap()
    }

    fn booked(start: &str, minutes: i64) -> TimeSlot {
        let start = business()
            .combine(date(), parse_wall_clock(start).unwrap())
            .unwrap();
        TimeSlot::new(start, start + chrono::Duration::minutes(minutes))
    }

    #[test]
    fn test_full_day_window_without_bookings() {
        let rules = SchedulingRules::default();
        let business = business();
        let gen = SlotGenerator::new(&business, &rules);

        let slots = gen.bookable_times(date(), &[window("09:00", "18:00")], &[], yesterday_noon());

        assert_eq!(slots.first().map(String::as_str), Some("09:00"));
        assert_eq!(slots.last().map(String::as_str), Some("17:15"));
        // 09:00 through 17:15 every 15 minutes
        assert_eq!(slots.len(), 34);
    }

    #[test]
    fn test_booking_suppresses_neighbouring_slots() {
        let rules = SchedulingRules::default();
        let business = business();
        let gen = SlotGenerator::new(&business, &rules);

        let slots = gen.bookable_times(
            date(),
            &[window("09:00", "18:00")],
            &[booked("10:00", 45)],
            yesterday_noon(),
        );

        assert!(slots.contains(&"09:00".to_string()));
        for blocked in ["09:15", "09:30", "10:00", "10:45", "11:00"] {
            assert!(!slots.contains(&blocked.to_string()), "{} offered", blocked);
        }
        assert!(slots.contains(&"11:15".to_string()));
    }

    #[test]
    fn test_today_truncation_rounds_up() {
        let rules = SchedulingRules::default();
        let business = business();
        let gen = SlotGenerator::new(&business, &rules);

        // 10:07:30 local
        let now = Utc.with_ymd_and_hms(2026, 3, 3, 15, 7, 30).unwrap();
        let slots = gen.bookable_times(date(), &[window("09:00", "18:00")], &[], now);
        assert_eq!(slots.first().map(String::as_str), Some("10:15"));

        // Exactly on a boundary keeps that boundary
        let now = Utc.with_ymd_and_hms(2026, 3, 3, 15, 30, 0).unwrap();
        let slots = gen.bookable_times(date(), &[window("09:00", "18:00")], &[], now);
        assert_eq!(slots.first().map(String::as_str), Some("10:30"));

        // One second past a boundary moves to the next one
        let now = Utc.with_ymd_and_hms(2026, 3, 3, 15, 30, 1).unwrap();
        let slots = gen.bookable_times(date(), &[window("09:00", "18:00")], &[], now);
        assert_eq!(slots.first().map(String::as_str), Some("10:45"));
    }

    #[test]
    fn test_past_date_and_closed_evening() {
        let rules = SchedulingRules::default();
        let business = business();
        let gen = SlotGenerator::new(&business, &rules);

        let tomorrow = Utc.with_ymd_and_hms(2026, 3, 4, 15, 0, 0).unwrap();
        assert!(gen
            .candidates(date(), &[window("09:00", "18:00")], tomorrow)
            .is_empty());

        // 17:40 local: nothing left that fits before 18:00
        let evening = Utc.with_ymd_and_hms(2026, 3, 3, 22, 40, 0).unwrap();
        assert!(gen
            .candidates(date(), &[window("09:00", "18:00")], evening)
            .is_empty());
    }

    #[test]
    fn test_duration_must_fit_window() {
        let rules = SchedulingRules::default();
        let business = business();
        let gen = SlotGenerator::new(&business, &rules);

        let candidates = gen.candidates(date(), &[window("09:00", "10:00")], yesterday_noon());
        let times: Vec<String> = candidates.iter().map(|c| format_wall_clock(c.time)).collect();
        assert_eq!(times, vec!["09:00", "09:15"]);

        for c in &candidates {
            let end = business.combine(date(), c.window.end).unwrap();
            assert!(c.slot.end <= end);
        }

        assert!(gen
            .candidates(date(), &[window("09:00", "09:30")], yesterday_noon())
            .is_empty());
    }

    #[test]
    fn test_overlapping_windows_are_merged_without_duplicates() {
        let rules = SchedulingRules::default();
        let business = business();
        let gen = SlotGenerator::new(&business, &rules);

        let slots = gen.bookable_times(
            date(),
            &[window("13:00", "15:00"), window("09:00", "10:00"), window("13:30", "14:30")],
            &[],
            yesterday_noon(),
        );

        assert_eq!(
            slots,
            vec![
                "09:00", "09:15", "13:00", "13:15", "13:30", "13:45", "14:00", "14:15"
            ]
        );
    }

    #[test]
    fn test_dst_gap_times_are_skipped() {
        let rules = SchedulingRules {
            appointment_duration: 30,
            ..SchedulingRules::default()
        };
        let business = business();
        let gen = SlotGenerator::new(&business, &rules);
        let spring_forward = NaiveDate::from_ymd_opt(2026, 3, 8).unwrap();
        let before = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();

        let slots = gen.bookable_times(spring_forward, &[window("01:00", "04:00")], &[], before);

        assert!(slots.contains(&"01:30".to_string()));
        assert!(!slots.iter().any(|s| s.starts_with("02:")));
        assert!(slots.contains(&"03:00".to_string()));
    }

    #[test]
    fn test_slots_end_before_window_closes_on_spring_forward() {
        let rules = SchedulingRules::default();
        let business = business();
        let gen = SlotGenerator::new(&business, &rules);
        let spring_forward = NaiveDate::from_ymd_opt(2026, 3, 8).unwrap();
        let before = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();

        // 01:00 to 03:00 wall clock is one real hour
        let candidates = gen.candidates(spring_forward, &[window("01:00", "03:00")], before);
        let times: Vec<String> = candidates.iter().map(|c| format_wall_clock(c.time)).collect();
        assert_eq!(times, vec!["01:00", "01:15"]);

        let close = business
            .combine(spring_forward, parse_wall_clock("03:00").unwrap())
            .unwrap();
        for c in &candidates {
            assert!(c.slot.end <= close);
        }

        // A window ending inside the gap closes when the clock jumps
        let candidates = gen.candidates(spring_forward, &[window("00:30", "02:30")], before);
        let times: Vec<String> = candidates.iter().map(|c| format_wall_clock(c.time)).collect();
        assert_eq!(times, vec!["00:30", "00:45", "01:00", "01:15"]);
    }
}
