pub mod booking;
pub mod calendar;
pub mod cli;
pub mod config;
pub mod crypto;
pub mod db;
pub mod error;
pub mod models;
pub mod scheduling;
pub mod server;
pub mod sms;

pub use models::*;

/// Default server URL for client commands
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8080";

/// Default database file for `serve` and the maintenance jobs
pub const DEFAULT_DB_PATH: &str = "./chairbook.db";
