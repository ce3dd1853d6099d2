use anyhow::{Context, Result};
use serde::Deserialize;

use super::{SentMessage, SmsProvider};
use crate::config::TwilioSettings;

const TWILIO_API: &str = "https://api.twilio.com/2010-04-01";

/// Twilio Programmable Messaging over its REST API
pub struct TwilioSms {
    client: reqwest::Client,
    account_sid: String,
    auth_token: String,
    from_number: String,
}

impl TwilioSms {
    pub fn new(settings: &TwilioSettings) -> Self {
        Self {
            client: reqwest::Client::new(),
            account_sid: settings.account_sid.clone(),
            auth_token: settings.auth_token.clone(),
            from_number: settings.from_number.clone(),
        }
    }

    fn messages_url(&self) -> String {
        format!("{}/Accounts/{}/Messages.json", TWILIO_API, self.account_sid)
    }
}

#[async_trait::async_trait]
impl SmsProvider for TwilioSms {
    async fn send(&self, to: &str, body: &str) -> Result<SentMessage> {
        let resp = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("To", to), ("From", self.from_number.as_str()), ("Body", body)])
            .timeout(std::time::Duration::from_secs(10))
            .send()
            .await
            .context("Failed to send SMS")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let error = resp.text().await.unwrap_or_default();
            anyhow::bail!("SMS send failed: {} - {}", status, error);
        }

        #[derive(Deserialize)]
        struct MessageResponse {
            sid: Option<String>,
        }

        let message: MessageResponse = resp
            .json()
            .await
            .context("Failed to parse SMS response")?;

        Ok(SentMessage {
            provider_id: message.sid,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_url_includes_account() {
        let sms = TwilioSms::new(&TwilioSettings {
            account_sid: "AC123".to_string(),
            auth_token: "token".to_string(),
            from_number: "+15550001111".to_string(),
        });
        assert_eq!(
            sms.messages_url(),
            "https://api.twilio.com/2010-04-01/Accounts/AC123/Messages.json"
        );
    }
}
