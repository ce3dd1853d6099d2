use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::instant;
use crate::models::{AvailableSlot, BlockedDate, WorkingHours};

// ==================== Available Slots ====================

/// Insert an available-slot window
pub fn insert_slot(conn: &Connection, slot: &AvailableSlot) -> Result<()> {
    conn.execute(
        "INSERT INTO available_slots (id, date, start_time, end_time, reason, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            slot.id,
            slot.date.timestamp(),
            slot.start_time,
            slot.end_time,
            slot.reason,
            slot.created_at,
        ],
    )
    .context("Failed to insert available slot")?;
    Ok(())
}

/// Windows whose date falls in `[start, end)`
pub fn slots_between(
    conn: &Connection,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<AvailableSlot>> {
    let mut stmt = conn.prepare(
        "SELECT id, date, start_time, end_time, reason, created_at
         FROM available_slots WHERE date >= ?1 AND date < ?2
         ORDER BY date ASC, start_time ASC",
    )?;

    let slots = stmt.query_map(params![start.timestamp(), end.timestamp()], |row| {
        Ok(AvailableSlot {
            id: row.get(0)?,
            date: instant(row.get(1)?),
            start_time: row.get(2)?,
            end_time: row.get(3)?,
            reason: row.get(4)?,
            created_at: row.get(5)?,
        })
    })?;

    slots
        .collect::<Result<Vec<_>, _>>()
        .context("Failed to get available slots")
}

/// Whether an identical window already exists for the date
pub fn slot_exists(
    conn: &Connection,
    date: DateTime<Utc>,
    start_time: &str,
    end_time: &str,
) -> Result<bool> {
    let mut stmt = conn.prepare(
        "SELECT 1 FROM available_slots WHERE date = ?1 AND start_time = ?2 AND end_time = ?3",
    )?;
    Ok(stmt.exists(params![date.timestamp(), start_time, end_time])?)
}

/// Delete a window, returning whether it existed
pub fn delete_slot(conn: &Connection, id: &str) -> Result<bool> {
    let count = conn.execute("DELETE FROM available_slots WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

// ==================== Blocked Dates ====================

/// Insert a blocked date
pub fn insert_blocked(conn: &Connection, block: &BlockedDate) -> Result<()> {
    conn.execute(
        "INSERT INTO blocked_dates (id, date, is_full_day, start_time, end_time, reason, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            block.id,
            block.date.timestamp(),
            block.is_full_day,
            block.start_time,
            block.end_time,
            block.reason,
            block.created_at,
        ],
    )
    .context("Failed to insert blocked date")?;
    Ok(())
}

/// Blocks whose date falls in `[start, end)`
pub fn blocked_between(
    conn: &Connection,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<BlockedDate>> {
    let mut stmt = conn.prepare(
        "SELECT id, date, is_full_day, start_time, end_time, reason, created_at
         FROM blocked_dates WHERE date >= ?1 AND date < ?2
         ORDER BY date ASC, start_time ASC",
    )?;

    let blocks = stmt.query_map(params![start.timestamp(), end.timestamp()], |row| {
        Ok(BlockedDate {
            id: row.get(0)?,
            date: instant(row.get(1)?),
            is_full_day: row.get(2)?,
            start_time: row.get(3)?,
            end_time: row.get(4)?,
            reason: row.get(5)?,
            created_at: row.get(6)?,
        })
    })?;

    blocks
        .collect::<Result<Vec<_>, _>>()
        .context("Failed to get blocked dates")
}

/// Delete a blocked date, returning whether it existed
pub fn delete_blocked(conn: &Connection, id: &str) -> Result<bool> {
    let count = conn.execute("DELETE FROM blocked_dates WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

// ==================== Working Hours ====================

/// Insert or replace the schedule of one weekday
pub fn upsert_working_hours(conn: &Connection, hours: &WorkingHours) -> Result<()> {
    conn.execute(
        "INSERT INTO working_hours (day_of_week, start_time, end_time, is_active)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(day_of_week) DO UPDATE SET
            start_time = excluded.start_time,
            end_time = excluded.end_time,
            is_active = excluded.is_active",
        params![
            hours.day_of_week,
            hours.start_time,
            hours.end_time,
            hours.is_active
        ],
    )
    .context("Failed to save working hours")?;
    Ok(())
}

/// Schedule of one weekday (0 = Sunday)
pub fn working_hours_for(conn: &Connection, day_of_week: u32) -> Result<Option<WorkingHours>> {
    conn.query_row(
        "SELECT day_of_week, start_time, end_time, is_active
         FROM working_hours WHERE day_of_week = ?1",
        params![day_of_week],
        |row| {
            Ok(WorkingHours {
                day_of_week: row.get(0)?,
                start_time: row.get(1)?,
                end_time: row.get(2)?,
                is_active: row.get(3)?,
            })
        },
    )
    .optional()
    .context("Failed to get working hours")
}

/// All configured weekdays, Sunday first
pub fn all_working_hours(conn: &Connection) -> Result<Vec<WorkingHours>> {
    let mut stmt = conn.prepare(
        "SELECT day_of_week, start_time, end_time, is_active
         FROM working_hours ORDER BY day_of_week ASC",
    )?;

    let hours = stmt.query_map([], |row| {
        Ok(WorkingHours {
            day_of_week: row.get(0)?,
            start_time: row.get(1)?,
            end_time: row.get(2)?,
            is_active: row.get(3)?,
        })
    })?;

    hours
        .collect::<Result<Vec<_>, _>>()
        .context("Failed to list working hours")
}
