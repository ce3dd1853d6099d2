use anyhow::{Context, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::scheduling::BusinessTime;

/// Where open windows for a business date come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AvailabilityModel {
    /// Explicit per-date `AvailableSlot` windows
    #[default]
    Slots,
    /// Legacy weekday working hours minus blocked dates
    Weekly,
}

impl AvailabilityModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AvailabilityModel::Slots => "slots",
            AvailabilityModel::Weekly => "weekly",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "slots" => Some(AvailabilityModel::Slots),
            "weekly" => Some(AvailabilityModel::Weekly),
            _ => None,
        }
    }
}

impl std::fmt::Display for AvailabilityModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Longest booking horizon accepted, about ten years
pub const MAX_BOOKING_HORIZON_DAYS: i64 = 3650;

const MINUTES_PER_DAY: i64 = 24 * 60;

/// Numbers that drive slot generation and booking validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulingRules {
    /// Service length in minutes
    pub appointment_duration: i64,
    /// Idle minutes enforced after every appointment
    pub buffer: i64,
    /// Granularity of offered start times in minutes
    pub slot_interval: i64,
    pub max_advance_booking_days: i64,
    pub availability_model: AvailabilityModel,
}

impl Default for SchedulingRules {
    fn default() -> Self {
        Self {
            appointment_duration: 45,
            buffer: 30,
            slot_interval: 15,
            max_advance_booking_days: 30,
            availability_model: AvailabilityModel::Slots,
        }
    }
}

impl SchedulingRules {
    pub fn validate(&self) -> Result<()> {
        if self.appointment_duration <= 0 {
            anyhow::bail!("APPOINTMENT_DURATION must be positive");
        }
        if self.slot_interval <= 0 {
            anyhow::bail!("SLOT_INTERVAL must be positive");
        }
        if self.buffer < 0 {
            anyhow::bail!("BUFFER_TIME cannot be negative");
        }
        if self.max_advance_booking_days < 0 {
            anyhow::bail!("MAX_ADVANCE_BOOKING_DAYS cannot be negative");
        }
        if self.max_advance_booking_days > MAX_BOOKING_HORIZON_DAYS {
            anyhow::bail!(
                "MAX_ADVANCE_BOOKING_DAYS cannot exceed {}",
                MAX_BOOKING_HORIZON_DAYS
            );
        }
        for (name, minutes) in [
            ("APPOINTMENT_DURATION", self.appointment_duration),
            ("BUFFER_TIME", self.buffer),
            ("SLOT_INTERVAL", self.slot_interval),
        ] {
            if minutes > MINUTES_PER_DAY {
                anyhow::bail!("{} cannot exceed {} minutes", name, MINUTES_PER_DAY);
            }
        }
        Ok(())
    }

    pub fn duration(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.appointment_duration)
    }

    pub fn buffer_duration(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.buffer)
    }
}

#[derive(Debug, Clone)]
pub struct TwilioSettings {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
}

#[derive(Debug, Clone)]
pub struct GoogleSettings {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    pub calendar_id: String,
}

/// Server configuration, read from the environment at startup
#[derive(Debug, Clone)]
pub struct Settings {
    pub rules: SchedulingRules,
    pub timezone: Tz,
    pub business_name: String,
    pub public_url: String,
    pub default_country_code: String,
    pub sms_daily_limit: i64,
    pub admin_key_hash: Option<String>,
    pub manage_token_secret: Option<String>,
    pub twilio: Option<TwilioSettings>,
    pub google: Option<GoogleSettings>,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let number = |key: &str, default: i64| -> Result<i64> {
            match get(key) {
                Some(v) => v
                    .trim()
                    .parse::<i64>()
                    .with_context(|| format!("{} must be an integer, got {:?}", key, v)),
                None => Ok(default),
            }
        };

        let defaults = SchedulingRules::default();
        let availability_model = match get("AVAILABILITY_MODEL") {
            Some(v) => AvailabilityModel::parse(v.trim()).with_context(|| {
                format!("AVAILABILITY_MODEL must be 'slots' or 'weekly', got {:?}", v)
            })?,
            None => defaults.availability_model,
        };

        let rules = SchedulingRules {
            appointment_duration: number("APPOINTMENT_DURATION", defaults.appointment_duration)?,
            buffer: number("BUFFER_TIME", defaults.buffer)?,
            slot_interval: number("SLOT_INTERVAL", defaults.slot_interval)?,
            max_advance_booking_days: number(
                "MAX_ADVANCE_BOOKING_DAYS",
                defaults.max_advance_booking_days,
            )?,
            availability_model,
        };
        rules.validate()?;

        let tz_name = get("BUSINESS_TIMEZONE").unwrap_or_else(|| "America/New_York".to_string());
        let timezone = BusinessTime::parse(&tz_name)
            .with_context(|| format!("BUSINESS_TIMEZONE is not a known IANA zone: {}", tz_name))?
            .timezone();

        let public_url = get("PUBLIC_URL").unwrap_or_else(|| "http://localhost:8080".to_string());
        url::Url::parse(&public_url).with_context(|| format!("Invalid PUBLIC_URL: {}", public_url))?;

        let default_country_code = get("DEFAULT_COUNTRY_CODE")
            .map(|c| c.trim().trim_start_matches('+').to_string())
            .unwrap_or_else(|| "1".to_string());
        if default_country_code.is_empty()
            || !default_country_code.chars().all(|c| c.is_ascii_digit())
        {
            anyhow::bail!("DEFAULT_COUNTRY_CODE must be digits");
        }

        let twilio = match (
            get("TWILIO_ACCOUNT_SID"),
            get("TWILIO_AUTH_TOKEN"),
            get("TWILIO_FROM_NUMBER"),
        ) {
            (Some(account_sid), Some(auth_token), Some(from_number)) => Some(TwilioSettings {
                account_sid,
                auth_token,
                from_number,
            }),
            _ => None,
        };

        let google = match (
            get("GOOGLE_CLIENT_ID"),
            get("GOOGLE_CLIENT_SECRET"),
            get("GOOGLE_REFRESH_TOKEN"),
        ) {
            (Some(client_id), Some(client_secret), Some(refresh_token)) => Some(GoogleSettings {
                client_id,
                client_secret,
                refresh_token,
                calendar_id: get("GOOGLE_CALENDAR_ID").unwrap_or_else(|| "primary".to_string()),
            }),
            _ => None,
        };

        Ok(Self {
            rules,
            timezone,
            business_name: get("BUSINESS_NAME").unwrap_or_else(|| "The Barbershop".to_string()),
            public_url: public_url.trim_end_matches('/').to_string(),
            default_country_code,
            sms_daily_limit: number("SMS_DAILY_LIMIT", 5)?,
            admin_key_hash: get("ADMIN_API_KEY_HASH"),
            manage_token_secret: get("MANAGE_TOKEN_SECRET"),
            twilio,
            google,
        })
    }

    pub fn business_time(&self) -> BusinessTime {
        BusinessTime::new(self.timezone)
    }
}

/// Configuration stored locally for the CLI client commands
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LocalConfig {
    pub server_url: Option<String>,
    pub admin_key: Option<String>,
}

impl LocalConfig {
    pub fn config_path() -> std::path::PathBuf {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        std::path::PathBuf::from(home)
            .join(".config")
            .join("chairbook")
            .join("config.json")
    }

    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings_from(pairs: &[(&str, &str)]) -> Result<Settings> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults_match_deployed_config() {
        let settings = settings_from(&[]).unwrap();
        assert_eq!(settings.rules.appointment_duration, 45);
        assert_eq!(settings.rules.buffer, 30);
        assert_eq!(settings.rules.slot_interval, 15);
        assert_eq!(settings.rules.availability_model, AvailabilityModel::Slots);
        assert_eq!(settings.timezone, chrono_tz::America::New_York);
        assert!(settings.twilio.is_none());
        assert!(settings.google.is_none());
    }

    #[test]
    fn test_overrides_and_optional_integrations() {
        let settings = settings_from(&[
            ("APPOINTMENT_DURATION", "30"),
            ("BUFFER_TIME", "0"),
            ("AVAILABILITY_MODEL", "weekly"),
            ("BUSINESS_TIMEZONE", "Europe/London"),
            ("TWILIO_ACCOUNT_SID", "AC123"),
            ("TWILIO_AUTH_TOKEN", "secret"),
            ("TWILIO_FROM_NUMBER", "+15550001111"),
            ("GOOGLE_CLIENT_ID", "id"),
            ("GOOGLE_CLIENT_SECRET", ""),
            ("GOOGLE_REFRESH_TOKEN", "refresh"),
        ])
        .unwrap();

        assert_eq!(settings.rules.appointment_duration, 30);
        assert_eq!(settings.rules.buffer, 0);
        assert_eq!(settings.rules.availability_model, AvailabilityModel::Weekly);
        assert_eq!(settings.timezone, chrono_tz::Europe::London);
        assert!(settings.twilio.is_some());
        // Empty secret counts as unset
        assert!(settings.google.is_none());
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(settings_from(&[("SLOT_INTERVAL", "0")]).is_err());
        assert!(settings_from(&[("BUFFER_TIME", "abc")]).is_err());
        assert!(settings_from(&[("BUSINESS_TIMEZONE", "Mars/Olympus")]).is_err());
        assert!(settings_from(&[("AVAILABILITY_MODEL", "both")]).is_err());
        assert!(settings_from(&[("PUBLIC_URL", "not a url")]).is_err());
    }

    #[test]
    fn test_oversized_values_rejected() {
        assert!(settings_from(&[("MAX_ADVANCE_BOOKING_DAYS", "100000000")]).is_err());
        assert!(settings_from(&[("APPOINTMENT_DURATION", "1441")]).is_err());
        assert!(settings_from(&[("BUFFER_TIME", "999999999999")]).is_err());

        let settings = settings_from(&[("MAX_ADVANCE_BOOKING_DAYS", "3650")]).unwrap();
        assert_eq!(settings.rules.max_advance_booking_days, MAX_BOOKING_HORIZON_DAYS);
    }
}
