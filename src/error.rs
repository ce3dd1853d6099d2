use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identity of an appointment that already occupies a phone number's single
/// active booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistingBooking {
    pub id: String,
    /// Business-local date, `YYYY-MM-DD`
    pub date: String,
    /// Business-local start time, `HH:mm`
    pub time: String,
}

/// Errors returned by the booking core.
///
/// Notification and calendar failures never show up here; they are logged
/// after the booking has been committed.
#[derive(Error, Debug)]
pub enum BookingError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unavailable(String),

    #[error("{0}")]
    Conflict(String),

    #[error("You already have an upcoming appointment on {} at {}", .0.date, .0.time)]
    ActiveBooking(ExistingBooking),

    #[error("{0}")]
    NotFound(String),

    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl BookingError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable(reason.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Short machine-readable kind, used in HTTP bodies and logs
    pub fn kind(&self) -> &'static str {
        match self {
            BookingError::Validation(_) => "validation",
            BookingError::Unavailable(_) => "unavailable",
            BookingError::Conflict(_) => "conflict",
            BookingError::ActiveBooking(_) => "active_booking",
            BookingError::NotFound(_) => "not_found",
            BookingError::Storage(_) => "storage",
        }
    }
}

impl From<rusqlite::Error> for BookingError {
    fn from(err: rusqlite::Error) -> Self {
        BookingError::Storage(err.into())
    }
}

pub type Result<T> = std::result::Result<T, BookingError>;
