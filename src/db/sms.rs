use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use crate::models::{SmsKind, SmsLog};

/// Record an outbound SMS attempt
pub fn insert_log(conn: &Connection, log: &SmsLog) -> Result<()> {
    conn.execute(
        "INSERT INTO sms_logs (id, appointment_id, phone_number, kind, status, provider_id, error, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            log.id,
            log.appointment_id,
            log.phone_number,
            log.kind.as_str(),
            log.status,
            log.provider_id,
            log.error,
            log.created_at,
        ],
    )
    .context("Failed to insert SMS log")?;
    Ok(())
}

/// Messages actually delivered to a phone number since `since`
pub fn sent_since(conn: &Connection, phone_number: &str, since: DateTime<Utc>) -> Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM sms_logs
         WHERE phone_number = ?1 AND status = 'sent' AND created_at >= ?2",
        params![phone_number, since.timestamp()],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Log entries for an appointment, oldest first
pub fn for_appointment(conn: &Connection, appointment_id: &str) -> Result<Vec<SmsLog>> {
    let mut stmt = conn.prepare(
        "SELECT id, appointment_id, phone_number, kind, status, provider_id, error, created_at
         FROM sms_logs WHERE appointment_id = ?1 ORDER BY created_at ASC, rowid ASC",
    )?;

    let logs = stmt.query_map(params![appointment_id], |row| {
        let kind: String = row.get(3)?;
        Ok(SmsLog {
            id: row.get(0)?,
            appointment_id: row.get(1)?,
            phone_number: row.get(2)?,
            kind: SmsKind::parse(&kind).unwrap_or(SmsKind::Confirmation),
            status: row.get(4)?,
            provider_id: row.get(5)?,
            error: row.get(6)?,
            created_at: row.get(7)?,
        })
    })?;

    logs.collect::<Result<Vec<_>, _>>()
        .context("Failed to get SMS logs")
}
