//! Maintenance jobs that run directly against the database file, for cron
//! or one-off use alongside a running server.

use anyhow::Result;
use serde::Serialize;

use super::{OutputFormat, SuccessResponse};
use crate::booking::SyncReport;
use crate::config::Settings;
use crate::crypto::{generate_admin_key, hash_admin_key};
use crate::models::{DuplicateSlotsRequest, DuplicateSlotsResponse};
use crate::server::open_service;

/// Mark ended appointments completed
pub fn run_complete_past(db_path: &str, format: OutputFormat) -> Result<()> {
    let settings = Settings::from_env()?;
    let booking = open_service(db_path, &settings)?;
    let completed = booking.complete_past_appointments()?;

    format.print(&SuccessResponse {
        message: format!("Marked {} appointment(s) completed", completed),
    });
    Ok(())
}

impl std::fmt::Display for SyncReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Calendar events created: {}, removed: {}, failed: {}",
            self.created, self.removed, self.failed
        )
    }
}

/// Create calendar events for upcoming appointments that have none
pub async fn run_sync_calendar(db_path: &str, format: OutputFormat) -> Result<()> {
    let settings = Settings::from_env()?;
    let booking = open_service(db_path, &settings)?;
    let report = booking.sync_calendar().await?;

    format.print(&report);
    Ok(())
}

impl std::fmt::Display for DuplicateSlotsResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Created {} window(s), skipped {} existing",
            self.created, self.skipped
        )
    }
}

/// Copy a run of days' windows onto the following weeks
pub fn run_duplicate_slots(
    db_path: &str,
    source_start: &str,
    days: u32,
    weeks: u32,
    format: OutputFormat,
) -> Result<()> {
    let settings = Settings::from_env()?;
    let booking = open_service(db_path, &settings)?;
    let result = booking.duplicate_available_slots(&DuplicateSlotsRequest {
        source_start: source_start.to_string(),
        days,
        weeks,
    })?;

    format.print(&result);
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct AdminKeyResponse {
    pub admin_key: String,
    pub admin_key_hash: String,
}

impl std::fmt::Display for AdminKeyResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Admin key (keep this secret): {}", self.admin_key)?;
        writeln!(f)?;
        writeln!(f, "Set on the server:")?;
        write!(f, "  ADMIN_API_KEY_HASH='{}'", self.admin_key_hash)
    }
}

/// Generate an admin key and the hash the server is configured with
pub fn run_gen_admin_key(format: OutputFormat) -> Result<()> {
    let admin_key = generate_admin_key();
    let admin_key_hash = hash_admin_key(&admin_key)?;

    format.print(&AdminKeyResponse {
        admin_key,
        admin_key_hash,
    });
    Ok(())
}
