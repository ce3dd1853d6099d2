use anyhow::Result;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;

use chairbook::cli::{self, OutputFormat};
use chairbook::config::Settings;
use chairbook::DEFAULT_DB_PATH;

#[derive(Parser)]
#[command(name = "chairbook")]
#[command(about = "Appointment booking for a single-chair barbershop", version)]
struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the API server
    Serve {
        /// Port to listen on
        #[arg(long, default_value = "8080")]
        port: u16,
        /// Database file path
        #[arg(long, default_value = DEFAULT_DB_PATH)]
        db: String,
    },
    /// Mark appointments that have ended as completed
    CompletePast {
        #[arg(long, default_value = DEFAULT_DB_PATH)]
        db: String,
    },
    /// Create calendar events for upcoming appointments missing one
    SyncCalendar {
        #[arg(long, default_value = DEFAULT_DB_PATH)]
        db: String,
    },
    /// Copy available-slot windows onto the following weeks
    DuplicateSlots {
        /// First source date (e.g., "2026-03-02")
        #[arg(long)]
        from: String,
        /// Number of source days
        #[arg(long, default_value = "7")]
        days: u32,
        /// Number of following weeks to fill
        #[arg(long)]
        weeks: u32,
        #[arg(long, default_value = DEFAULT_DB_PATH)]
        db: String,
    },
    /// Generate an admin API key and its hash
    GenAdminKey,
    /// Configure client settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Show bookable times for a date
    Availability {
        /// Business-local date (e.g., "2026-03-03")
        #[arg(long)]
        date: String,
    },
    /// Book an appointment
    Book {
        #[arg(long)]
        name: String,
        #[arg(long)]
        phone: String,
        #[arg(long)]
        date: String,
        /// Start time, HH:mm
        #[arg(long)]
        time: String,
    },
    /// Cancel an appointment
    Cancel {
        /// Appointment ID
        id: String,
        /// Manage token (uses the admin key when omitted)
        #[arg(long)]
        token: Option<String>,
    },
    /// Move an appointment to a new date and time
    Reschedule {
        /// Appointment ID
        id: String,
        #[arg(long)]
        date: String,
        #[arg(long)]
        time: String,
        /// Manage token (uses the admin key when omitted)
        #[arg(long)]
        token: Option<String>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Set server URL
    Server {
        /// Server URL
        url: String,
    },
    /// Store the admin key for admin commands
    AdminKey {
        /// Admin key (leave empty to remove)
        key: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("chairbook=info")),
        )
        .init();

    let cli = Cli::parse();
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };

    match cli.command {
        Commands::Serve { port, db } => {
            let settings = Settings::from_env()?;
            let addr: SocketAddr = format!("0.0.0.0:{}", port).parse()?;
            chairbook::server::run_server(addr, &db, settings).await?;
        }
        Commands::CompletePast { db } => {
            cli::run_complete_past(&db, format)?;
        }
        Commands::SyncCalendar { db } => {
            cli::run_sync_calendar(&db, format).await?;
        }
        Commands::DuplicateSlots {
            from,
            days,
            weeks,
            db,
        } => {
            cli::run_duplicate_slots(&db, &from, days, weeks, format)?;
        }
        Commands::GenAdminKey => {
            cli::run_gen_admin_key(format)?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                cli::run_config_show(format)?;
            }
            ConfigAction::Server { url } => {
                cli::run_config_server(&url, format)?;
            }
            ConfigAction::AdminKey { key } => {
                cli::run_config_admin_key(key.as_deref(), format)?;
            }
        },
        Commands::Availability { date } => {
            cli::run_availability(&date, format).await?;
        }
        Commands::Book {
            name,
            phone,
            date,
            time,
        } => {
            cli::run_book(&name, &phone, &date, &time, format).await?;
        }
        Commands::Cancel { id, token } => {
            cli::run_cancel(&id, token.as_deref(), format).await?;
        }
        Commands::Reschedule {
            id,
            date,
            time,
            token,
        } => {
            cli::run_reschedule(&id, &date, &time, token.as_deref(), format).await?;
        }
    }

    Ok(())
}
