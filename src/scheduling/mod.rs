//! The scheduling engine: timezone normalization, open windows, conflict
//! detection and slot generation. Everything here is pure and synchronous;
//! persistence happens in `booking` and `db`.

pub mod clock;
pub mod conflict;
pub mod slots;
pub mod time;
pub mod windows;

pub use clock::{Clock, FixedClock, SystemClock};
pub use conflict::{conflicts_with, first_conflict, overlaps};
pub use slots::{Candidate, SlotGenerator};
pub use time::{
    format_date_key, format_wall_clock, parse_date_key, parse_wall_clock, BusinessTime,
};
pub use windows::{
    check_booking_horizon, windows_from_slots, windows_from_weekly, Closure, Window,
};
