mod templates;
mod twilio;

pub use templates::*;
pub use twilio::*;

use anyhow::Result;
use async_trait::async_trait;

use crate::error::BookingError;

/// Trait for outbound SMS providers
#[async_trait]
pub trait SmsProvider: Send + Sync {
    /// Send `body` to an E.164 number
    async fn send(&self, to: &str, body: &str) -> Result<SentMessage>;
}

/// Result of handing a message to the provider
#[derive(Debug, Clone, Default)]
pub struct SentMessage {
    pub provider_id: Option<String>,
}

/// Normalize a phone number to `+<digits>`.
///
/// Formatting characters are dropped. Numbers without an international
/// prefix get `default_country_code`, after stripping a national trunk `0`.
pub fn normalize_phone(raw: &str, default_country_code: &str) -> crate::error::Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(BookingError::validation("Phone number is required"));
    }
    if trimmed
        .chars()
        .any(|c| !(c.is_ascii_digit() || matches!(c, '+' | ' ' | '-' | '.' | '(' | ')')))
    {
        return Err(BookingError::validation(format!(
            "Invalid phone number: {}",
            trimmed
        )));
    }

    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();

    let international = if trimmed.starts_with('+') {
        digits
    } else if let Some(rest) = digits.strip_prefix("00") {
        rest.to_string()
    } else if digits.starts_with('0') {
        format!("{}{}", default_country_code, digits.trim_start_matches('0'))
    } else if digits.len() > 10 && digits.starts_with(default_country_code) {
        digits
    } else {
        format!("{}{}", default_country_code, digits)
    };

    if !(8..=15).contains(&international.len()) || international.starts_with('0') {
        return Err(BookingError::validation(format!(
            "Invalid phone number: {}",
            trimmed
        )));
    }

    Ok(format!("+{}", international))
}
