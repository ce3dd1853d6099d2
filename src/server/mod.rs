mod handlers;
mod middleware;
mod routes;

pub use routes::create_router;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::booking::BookingService;
use crate::calendar::GoogleCalendar;
use crate::config::Settings;
use crate::db::Database;
use crate::scheduling::SystemClock;
use crate::sms::TwilioSms;

/// Shared application state
pub struct AppState {
    pub booking: BookingService,
    /// bcrypt hash of the admin key; admin API is disabled when unset
    pub admin_key_hash: Option<String>,
}

impl AppState {
    pub fn new(booking: BookingService, admin_key_hash: Option<String>) -> Self {
        Self {
            booking,
            admin_key_hash,
        }
    }
}

/// Open the database and wire the booking service with whichever
/// collaborators are configured
pub fn open_service(db_path: &str, settings: &Settings) -> Result<BookingService> {
    let db = Database::open(db_path)?;
    let mut booking = BookingService::new(db, settings, Arc::new(SystemClock));

    match &settings.twilio {
        Some(twilio) => booking = booking.with_sms(Arc::new(TwilioSms::new(twilio))),
        None => tracing::info!("Twilio not configured; SMS disabled"),
    }
    match &settings.google {
        Some(google) => booking = booking.with_calendar(Arc::new(GoogleCalendar::new(google))),
        None => tracing::info!("Google Calendar not configured; calendar sync disabled"),
    }

    Ok(booking)
}

/// Run the API server
pub async fn run_server(addr: SocketAddr, db_path: &str, settings: Settings) -> Result<()> {
    let booking = open_service(db_path, &settings)?;

    if settings.admin_key_hash.is_none() {
        tracing::warn!("ADMIN_API_KEY_HASH not set; admin API disabled");
    }

    let state = Arc::new(AppState::new(booking, settings.admin_key_hash.clone()));
    let app = create_router(state);

    tracing::info!(
        timezone = %settings.timezone,
        model = %settings.rules.availability_model,
        "Server listening on {}",
        addr
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
