//! Appointment rows. Functions take a `&Connection` so the booking path can
//! run them inside one transaction.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::instant;
use crate::models::{Appointment, AppointmentStatus};

const COLUMNS: &str = "id, client_name, phone_number, date, start_time, end_time, status,
                       google_event_id, created_at, updated_at";

fn from_row(row: &Row<'_>) -> rusqlite::Result<Appointment> {
    Ok(Appointment {
        id: row.get(0)?,
        client_name: row.get(1)?,
        phone_number: row.get(2)?,
        date: instant(row.get(3)?),
        start_time: instant(row.get(4)?),
        end_time: instant(row.get(5)?),
        status: AppointmentStatus::parse(&row.get::<_, String>(6)?).unwrap_or_default(),
        google_event_id: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

/// Insert a new appointment
pub fn insert(conn: &Connection, appointment: &Appointment) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO appointments (id, client_name, phone_number, date, start_time, end_time,
                                  status, google_event_id, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
        params![
            appointment.id,
            appointment.client_name,
            appointment.phone_number,
            appointment.date.timestamp(),
            appointment.start_time.timestamp(),
            appointment.end_time.timestamp(),
            appointment.status.as_str(),
            appointment.google_event_id,
            appointment.created_at,
            appointment.updated_at,
        ],
    )
    .context("Failed to insert appointment")?;
    Ok(())
}

/// Get an appointment by ID
pub fn get(conn: &Connection, id: &str) -> Result<Option<Appointment>> {
    let sql = format!("SELECT {} FROM appointments WHERE id = ?1", COLUMNS);
    conn.query_row(&sql, params![id], from_row)
        .optional()
        .context("Failed to get appointment")
}

/// Confirmed appointments whose interval intersects `[start, end)`,
/// optionally leaving one appointment out
pub fn confirmed_overlapping(
    conn: &Connection,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    exclude_id: Option<&str>,
) -> Result<Vec<Appointment>> {
    let sql = format!(
        "SELECT {} FROM appointments
         WHERE status = 'confirmed' AND start_time < ?1 AND end_time > ?2
           AND (?3 IS NULL OR id != ?3)
         ORDER BY start_time ASC",
        COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(
        params![end.timestamp(), start.timestamp(), exclude_id],
        from_row,
    )?;
    rows.collect::<Result<Vec<_>, _>>()
        .context("Failed to get confirmed appointments")
}

/// Every appointment, whatever its status, starting in `[start, end)`
pub fn starting_between(
    conn: &Connection,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<Appointment>> {
    let sql = format!(
        "SELECT {} FROM appointments
         WHERE start_time >= ?1 AND start_time < ?2
         ORDER BY start_time ASC",
        COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![start.timestamp(), end.timestamp()], from_row)?;
    rows.collect::<Result<Vec<_>, _>>()
        .context("Failed to list appointments")
}

/// Earliest confirmed appointment for a phone number that has not started yet
pub fn upcoming_for_phone(
    conn: &Connection,
    phone_number: &str,
    now: DateTime<Utc>,
) -> Result<Option<Appointment>> {
    let sql = format!(
        "SELECT {} FROM appointments
         WHERE phone_number = ?1 AND status = 'confirmed' AND start_time > ?2
         ORDER BY start_time ASC LIMIT 1",
        COLUMNS
    );
    conn.query_row(&sql, params![phone_number, now.timestamp()], from_row)
        .optional()
        .context("Failed to look up upcoming appointment")
}

/// Move an appointment in place and mark it confirmed
pub fn update_schedule(
    conn: &Connection,
    id: &str,
    date: DateTime<Utc>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    updated_at: i64,
) -> Result<()> {
    conn.execute(
        "UPDATE appointments
         SET date = ?1, start_time = ?2, end_time = ?3, status = 'confirmed', updated_at = ?4
         WHERE id = ?5",
        params![
            date.timestamp(),
            start.timestamp(),
            end.timestamp(),
            updated_at,
            id
        ],
    )
    .context("Failed to reschedule appointment")?;
    Ok(())
}

/// Update appointment status
pub fn update_status(
    conn: &Connection,
    id: &str,
    status: AppointmentStatus,
    updated_at: i64,
) -> Result<()> {
    conn.execute(
        "UPDATE appointments SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), updated_at, id],
    )
    .context("Failed to update appointment status")?;
    Ok(())
}

/// Store a freshly created calendar event, but only while the appointment is
/// still confirmed at `start` and has no event yet. Returns false when the
/// appointment moved on, in which case the caller owns the orphaned event.
pub fn attach_calendar_event(
    conn: &Connection,
    id: &str,
    event_id: &str,
    start: DateTime<Utc>,
) -> Result<bool> {
    let changed = conn
        .execute(
            "UPDATE appointments SET google_event_id = ?1
             WHERE id = ?2 AND status = 'confirmed' AND start_time = ?3
               AND google_event_id IS NULL",
            params![event_id, id, start.timestamp()],
        )
        .context("Failed to store calendar event id")?;
    Ok(changed == 1)
}

/// Drop the calendar reference of an appointment
pub fn clear_calendar_event(conn: &Connection, id: &str) -> Result<()> {
    conn.execute(
        "UPDATE appointments SET google_event_id = NULL WHERE id = ?1",
        params![id],
    )
    .context("Failed to clear calendar event id")?;
    Ok(())
}

/// Drop the calendar reference only if it still points at `event_id`
pub fn detach_calendar_event(conn: &Connection, id: &str, event_id: &str) -> Result<bool> {
    let changed = conn
        .execute(
            "UPDATE appointments SET google_event_id = NULL
             WHERE id = ?1 AND google_event_id = ?2",
            params![id, event_id],
        )
        .context("Failed to clear calendar event id")?;
    Ok(changed == 1)
}

/// Mark confirmed appointments that have ended as completed
pub fn complete_past(conn: &Connection, now: DateTime<Utc>) -> Result<usize> {
    let count = conn.execute(
        "UPDATE appointments SET status = 'completed', updated_at = ?1
         WHERE status = 'confirmed' AND end_time <= ?2",
        params![now.timestamp(), now.timestamp()],
    )?;
    Ok(count)
}

/// Confirmed appointments still ahead that never got a calendar event
pub fn missing_calendar_event(conn: &Connection, now: DateTime<Utc>) -> Result<Vec<Appointment>> {
    let sql = format!(
        "SELECT {} FROM appointments
         WHERE status = 'confirmed' AND google_event_id IS NULL AND end_time > ?1
         ORDER BY start_time ASC",
        COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![now.timestamp()], from_row)?;
    rows.collect::<Result<Vec<_>, _>>()
        .context("Failed to list unsynced appointments")
}

/// Cancelled appointments whose calendar event was never removed
pub fn cancelled_with_calendar_event(conn: &Connection) -> Result<Vec<Appointment>> {
    let sql = format!(
        "SELECT {} FROM appointments
         WHERE status = 'cancelled' AND google_event_id IS NOT NULL
         ORDER BY start_time ASC",
        COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], from_row)?;
    rows.collect::<Result<Vec<_>, _>>()
        .context("Failed to list cancelled appointments with events")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use chrono::{Datelike, TimeZone};

    fn at(day: u32, hour: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, hour, min, 0).unwrap()
    }

    fn appointment(id: &str, phone: &str, start: DateTime<Utc>) -> Appointment {
        Appointment {
            id: id.to_string(),
            client_name: "Test Client".to_string(),
            phone_number: phone.to_string(),
            date: at(start.day(), 5, 0),
            start_time: start,
            end_time: start + chrono::Duration::minutes(45),
            status: AppointmentStatus::Confirmed,
            google_event_id: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_insert_and_get() {
        let db = Database::open_in_memory().unwrap();
        let apt = appointment("apt_1", "+15555550100", at(3, 15, 0));

        db.with_conn(|conn| insert(conn, &apt)).unwrap();
        let loaded = db.with_conn(|conn| get(conn, "apt_1")).unwrap().unwrap();
        assert_eq!(loaded, apt);

        assert!(db.with_conn(|conn| get(conn, "missing")).unwrap().is_none());
    }

    #[test]
    fn test_confirmed_overlapping_filters_status_and_exclusion() {
        let db = Database::open_in_memory().unwrap();
        let a = appointment("a", "+15555550100", at(3, 15, 0));
        let b = appointment("b", "+15555550101", at(3, 17, 0));
        let c = appointment("c", "+15555550102", at(4, 15, 0));
        db.with_conn(|conn| {
            insert(conn, &a)?;
            insert(conn, &b)?;
            insert(conn, &c)?;
            update_status(conn, "b", AppointmentStatus::Cancelled, 1)
        })
        .unwrap();

        let found = db
            .with_conn(|conn| confirmed_overlapping(conn, at(3, 0, 0), at(4, 0, 0), None))
            .unwrap();
        assert_eq!(found.iter().map(|a| a.id.as_str()).collect::<Vec<_>>(), vec!["a"]);

        let found = db
            .with_conn(|conn| confirmed_overlapping(conn, at(3, 0, 0), at(4, 0, 0), Some("a")))
            .unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_upcoming_for_phone() {
        let db = Database::open_in_memory().unwrap();
        let past = appointment("past", "+15555550100", at(1, 15, 0));
        let next = appointment("next", "+15555550100", at(5, 15, 0));
        db.with_conn(|conn| {
            insert(conn, &past)?;
            insert(conn, &next)
        })
        .unwrap();

        let found = db
            .with_conn(|conn| upcoming_for_phone(conn, "+15555550100", at(2, 0, 0)))
            .unwrap()
            .unwrap();
        assert_eq!(found.id, "next");

        assert!(db
            .with_conn(|conn| upcoming_for_phone(conn, "+15555550199", at(2, 0, 0)))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_complete_past_only_touches_finished_confirmed() {
        let db = Database::open_in_memory().unwrap();
        let done = appointment("done", "+15555550100", at(3, 9, 0));
        let running = appointment("running", "+15555550101", at(3, 9, 30));
        db.with_conn(|conn| {
            insert(conn, &done)?;
            insert(conn, &running)
        })
        .unwrap();

        // 09:50: first ended at 09:45, second ends at 10:15
        let count = db.with_conn(|conn| complete_past(conn, at(3, 9, 50))).unwrap();
        assert_eq!(count, 1);

        let done = db.with_conn(|conn| get(conn, "done")).unwrap().unwrap();
        assert_eq!(done.status, AppointmentStatus::Completed);
        let running = db.with_conn(|conn| get(conn, "running")).unwrap().unwrap();
        assert_eq!(running.status, AppointmentStatus::Confirmed);
    }

    #[test]
    fn test_missing_calendar_event() {
        let db = Database::open_in_memory().unwrap();
        let synced = appointment("synced", "+15555550100", at(5, 15, 0));
        let unsynced = appointment("unsynced", "+15555550101", at(6, 15, 0));
        db.with_conn(|conn| {
            insert(conn, &synced)?;
            insert(conn, &unsynced)?;
            attach_calendar_event(conn, "synced", "evt_1", at(5, 15, 0))
        })
        .unwrap();

        let missing = db.with_conn(|conn| missing_calendar_event(conn, at(2, 0, 0))).unwrap();
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].id, "unsynced");
    }

    #[test]
    fn test_attach_calendar_event_only_to_unchanged_confirmed_rows() {
        let db = Database::open_in_memory().unwrap();
        let apt = appointment("apt_1", "+15555550100", at(5, 15, 0));
        db.with_conn(|conn| insert(conn, &apt)).unwrap();

        // Moved since the event was requested
        assert!(!db
            .with_conn(|conn| attach_calendar_event(conn, "apt_1", "evt_stale", at(5, 14, 0)))
            .unwrap());
        assert!(db
            .with_conn(|conn| attach_calendar_event(conn, "apt_1", "evt_1", at(5, 15, 0)))
            .unwrap());
        // Already has one
        assert!(!db
            .with_conn(|conn| attach_calendar_event(conn, "apt_1", "evt_2", at(5, 15, 0)))
            .unwrap());
        assert_eq!(
            db.with_conn(|conn| get(conn, "apt_1")).unwrap().unwrap().google_event_id.as_deref(),
            Some("evt_1")
        );

        // Cancelled rows never take an event
        db.with_conn(|conn| {
            clear_calendar_event(conn, "apt_1")?;
            update_status(conn, "apt_1", AppointmentStatus::Cancelled, 1)
        })
        .unwrap();
        assert!(!db
            .with_conn(|conn| attach_calendar_event(conn, "apt_1", "evt_3", at(5, 15, 0)))
            .unwrap());
    }

    #[test]
    fn test_cancelled_with_calendar_event() {
        let db = Database::open_in_memory().unwrap();
        let mut leftover = appointment("leftover", "+15555550100", at(5, 15, 0));
        leftover.status = AppointmentStatus::Cancelled;
        leftover.google_event_id = Some("evt_9".to_string());
        let mut clean = appointment("clean", "+15555550101", at(6, 15, 0));
        clean.status = AppointmentStatus::Cancelled;
        db.with_conn(|conn| {
            insert(conn, &leftover)?;
            insert(conn, &clean)
        })
        .unwrap();

        let found = db.with_conn(cancelled_with_calendar_event).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "leftover");

        assert!(!db
            .with_conn(|conn| detach_calendar_event(conn, "leftover", "evt_other"))
            .unwrap());
        assert!(db
            .with_conn(|conn| detach_calendar_event(conn, "leftover", "evt_9"))
            .unwrap());
        assert!(db.with_conn(cancelled_with_calendar_event).unwrap().is_empty());
    }
}
