mod client;
mod config;
mod jobs;

pub use client::*;
pub use config::*;
pub use jobs::*;

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::config::LocalConfig;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

impl OutputFormat {
    pub fn print<T: Serialize + std::fmt::Display>(&self, value: &T) {
        match self {
            OutputFormat::Human => println!("{}", value),
            OutputFormat::Json => print_pretty(value),
        }
    }

    pub fn print_json<T: Serialize>(&self, value: &T) {
        match self {
            OutputFormat::Human => print_pretty(value),
            OutputFormat::Json => match serde_json::to_string(value) {
                Ok(json) => println!("{}", json),
                Err(e) => eprintln!("Failed to serialize output: {}", e),
            },
        }
    }
}

fn print_pretty<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize output: {}", e),
    }
}

/// Success response
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub message: String,
}

impl std::fmt::Display for SuccessResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Error body returned by the server
#[derive(Debug, Deserialize)]
struct ApiError {
    error: String,
}

/// Get the API client for making requests to the server
pub fn get_api_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()
        .context("Failed to create HTTP client")
}

/// Get the server URL from config or default
pub fn get_server_url() -> String {
    LocalConfig::load()
        .ok()
        .and_then(|c| c.server_url)
        .unwrap_or_else(|| crate::DEFAULT_SERVER_URL.to_string())
}

/// Get the admin key from local config
pub fn get_admin_key() -> Result<String> {
    let config = LocalConfig::load()?;
    config.admin_key.ok_or_else(|| {
        anyhow::anyhow!("No admin key configured. Run 'chairbook config admin-key <KEY>' first.")
    })
}

/// Decode a successful response, or turn the server's error body into an
/// error
async fn read_json<T: DeserializeOwned>(resp: reqwest::Response, action: &str) -> Result<T> {
    let status = resp.status();
    if !status.is_success() {
        let text = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiError>(&text)
            .map(|e| e.error)
            .unwrap_or(text);
        anyhow::bail!("Failed to {} ({}): {}", action, status, message);
    }
    resp.json()
        .await
        .with_context(|| format!("Invalid response while trying to {}", action))
}
