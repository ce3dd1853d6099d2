//! Overlap test between a requested interval and booked appointments.
//!
//! Both the slot generator and the booking write path call [`overlaps`], so a
//! time that is offered is a time that can be booked.

use chrono::{DateTime, Duration, Utc};

use crate::models::TimeSlot;

/// `start <= instant < end`
fn falls_within(instant: DateTime<Utc>, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
    start <= instant && instant < end
}

/// Whether `candidate` collides with a single booked interval once the
/// buffer is appended to the booked end.
///
/// The booked interval becomes `[a.start, a.end + buffer)`. A collision is
/// any of:
/// 1. the candidate start falls within it;
/// 2. the candidate end falls within it, so finishing exactly when a booked
///    appointment starts still collides;
/// 3. the booked start falls within the candidate;
/// 4. the buffered booked end falls strictly after the candidate start and
///    no later than the candidate end.
///
/// Clauses 3 and 4 catch a booked interval contained in the candidate, which
/// clauses 1 and 2 alone miss. A candidate starting exactly at the buffered
/// end is free.
pub fn conflicts_with(candidate: &TimeSlot, booked: &TimeSlot, buffer: Duration) -> bool {
    let busy = booked.extended_by(buffer);

    falls_within(candidate.start, busy.start, busy.end)
        || falls_within(candidate.end, busy.start, busy.end)
        || falls_within(busy.start, candidate.start, candidate.end)
        || (candidate.start < busy.end && busy.end <= candidate.end)
}

/// Whether `candidate` collides with any of the confirmed appointments in
/// `booked`. Callers filter out cancelled and completed appointments.
pub fn overlaps(candidate: &TimeSlot, booked: &[TimeSlot], buffer: Duration) -> bool {
    booked.iter().any(|b| conflicts_with(candidate, b, buffer))
}

/// First booked interval `candidate` collides with
pub fn first_conflict<'a>(
    candidate: &TimeSlot,
    booked: &'a [TimeSlot],
    buffer: Duration,
) -> Option<&'a TimeSlot> {
    booked.iter().find(|b| conflicts_with(candidate, b, buffer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 3, hour, min, 0).unwrap()
    }

    fn slot(start: DateTime<Utc>, minutes: i64) -> TimeSlot {
        TimeSlot::new(start, start + Duration::minutes(minutes))
    }

    fn buffer() -> Duration {
        Duration::minutes(30)
    }

    #[test]
    fn test_candidate_ending_before_booked_start_is_free() {
        let booked = [slot(at(10, 0), 45)];
        assert!(!overlaps(&slot(at(9, 0), 45), &booked, buffer()));
    }

    #[test]
    fn test_candidate_ending_at_booked_start_conflicts() {
        let booked = [slot(at(10, 0), 45)];
        assert!(overlaps(&slot(at(9, 15), 45), &booked, buffer()));
    }

    #[test]
    fn test_buffer_blocks_until_booked_end_plus_buffer() {
        let booked = [slot(at(10, 0), 45)];
        assert!(overlaps(&slot(at(11, 0), 45), &booked, buffer()));
        assert!(overlaps(&slot(at(11, 14), 45), &booked, buffer()));
        assert!(!overlaps(&slot(at(11, 15), 45), &booked, buffer()));
    }

    #[test]
    fn test_zero_buffer_back_to_back() {
        let booked = [slot(at(10, 0), 45)];
        assert!(!overlaps(&slot(at(10, 45), 45), &booked, Duration::zero()));
        assert!(overlaps(&slot(at(10, 30), 45), &booked, Duration::zero()));
    }

    #[test]
    fn test_containment_both_directions() {
        // Booked interval inside the candidate
        let booked = [slot(at(10, 15), 15)];
        assert!(overlaps(&slot(at(10, 0), 120), &booked, Duration::zero()));

        // Candidate inside the booked interval
        let booked = [slot(at(9, 0), 180)];
        assert!(overlaps(&slot(at(10, 0), 15), &booked, Duration::zero()));
    }

    #[test]
    fn test_identical_interval_conflicts() {
        let booked = [slot(at(10, 0), 45)];
        assert!(overlaps(&slot(at(10, 0), 45), &booked, buffer()));
    }

    #[test]
    fn test_first_conflict_picks_colliding_entry() {
        let booked = [slot(at(8, 0), 45), slot(at(12, 0), 45)];
        let hit = first_conflict(&slot(at(12, 30), 45), &booked, buffer()).unwrap();
        assert_eq!(hit.start, at(12, 0));
        assert!(first_conflict(&slot(at(9, 15), 45), &booked, buffer()).is_none());
    }

    #[test]
    fn test_empty_booked_list() {
        assert!(!overlaps(&slot(at(10, 0), 45), &[], buffer()));
    }
}
