use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use url::Url;

use super::{CalendarProvider, CreatedEvent, EventDetails};
use crate::config::GoogleSettings;

const CALENDAR_API: &str = "https://www.googleapis.com/calendar/v3/";

/// Google Calendar implementation using direct API calls
pub struct GoogleCalendar {
    client: reqwest::Client,
    calendar_id: String,
    token_manager: Arc<RwLock<TokenManager>>,
}

struct TokenManager {
    client_id: String,
    client_secret: String,
    refresh_token: String,
    access_token: Option<String>,
    expires_at: Option<DateTime<Utc>>,
}

impl TokenManager {
    fn new(client_id: String, client_secret: String, refresh_token: String) -> Self {
        Self {
            client_id,
            client_secret,
            refresh_token,
            access_token: None,
            expires_at: None,
        }
    }

    async fn get_access_token(&mut self, client: &reqwest::Client) -> Result<String> {
        // Check if we have a valid token
        if let (Some(token), Some(expires)) = (&self.access_token, self.expires_at) {
            if Utc::now() < expires - chrono::Duration::minutes(5) {
                return Ok(token.clone());
            }
        }

        let resp = client
            .post("https://oauth2.googleapis.com/token")
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", self.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .context("Failed to refresh token")?;

        if !resp.status().is_success() {
            let error = resp.text().await.unwrap_or_default();
            anyhow::bail!("Token refresh failed: {}", error);
        }

        #[derive(Deserialize)]
        struct TokenResponse {
            access_token: String,
            expires_in: i64,
        }

        let tokens: TokenResponse = resp
            .json()
            .await
            .context("Failed to parse token response")?;

        self.access_token = Some(tokens.access_token.clone());
        self.expires_at = Some(Utc::now() + chrono::Duration::seconds(tokens.expires_in));

        Ok(tokens.access_token)
    }
}

impl GoogleCalendar {
    pub fn new(settings: &GoogleSettings) -> Self {
        Self {
            client: reqwest::Client::new(),
            calendar_id: settings.calendar_id.clone(),
            token_manager: Arc::new(RwLock::new(TokenManager::new(
                settings.client_id.clone(),
                settings.client_secret.clone(),
                settings.refresh_token.clone(),
            ))),
        }
    }

    async fn get_token(&self) -> Result<String> {
        let mut manager = self.token_manager.write().await;
        manager.get_access_token(&self.client).await
    }

    /// `.../calendars/{calendar_id}/events[/{event_id}]` with each segment
    /// percent-encoded
    fn events_url(&self, event_id: Option<&str>) -> Result<Url> {
        let mut url = Url::parse(CALENDAR_API)?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| anyhow::anyhow!("Calendar API URL cannot be a base"))?;
            segments
                .pop_if_empty()
                .push("calendars")
                .push(&self.calendar_id)
                .push("events");
            if let Some(id) = event_id {
                segments.push(id);
            }
        }
        Ok(url)
    }
}

#[async_trait::async_trait]
impl CalendarProvider for GoogleCalendar {
    async fn create_event(&self, event: &EventDetails) -> Result<CreatedEvent> {
        let token = self.get_token().await?;

        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct EventRequest<'a> {
            summary: &'a str,
            description: &'a str,
            start: EventDateTime<'a>,
            end: EventDateTime<'a>,
        }

        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct EventDateTime<'a> {
            date_time: DateTime<Utc>,
            time_zone: &'a str,
        }

        let request = EventRequest {
            summary: &event.title,
            description: &event.description,
            start: EventDateTime {
                date_time: event.start,
                time_zone: &event.timezone,
            },
            end: EventDateTime {
                date_time: event.end,
                time_zone: &event.timezone,
            },
        };

        let resp = self
            .client
            .post(self.events_url(None)?)
            .bearer_auth(&token)
            .json(&request)
            .send()
            .await
            .context("Failed to create event")?;

        if !resp.status().is_success() {
            let error = resp.text().await.unwrap_or_default();
            anyhow::bail!("Event creation failed: {}", error);
        }

        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct EventResponse {
            id: Option<String>,
            html_link: Option<String>,
        }

        let created: EventResponse = resp
            .json()
            .await
            .context("Failed to parse event response")?;

        Ok(CreatedEvent {
            id: created.id.context("Event response has no id")?,
            html_link: created.html_link,
        })
    }

    async fn delete_event(&self, event_id: &str) -> Result<()> {
        let token = self.get_token().await?;

        let resp = self
            .client
            .delete(self.events_url(Some(event_id))?)
            .bearer_auth(&token)
            .send()
            .await
            .context("Failed to delete event")?;

        match resp.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND | StatusCode::GONE => {
                tracing::debug!(event_id, "Calendar event already deleted");
                Ok(())
            }
            status => {
                let error = resp.text().await.unwrap_or_default();
                anyhow::bail!("Event deletion failed: {} - {}", status, error);
            }
        }
    }
}
