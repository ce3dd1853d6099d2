use anyhow::Result;
use serde::Serialize;

use super::{OutputFormat, SuccessResponse};
use crate::config::LocalConfig;

/// Config show response
#[derive(Debug, Serialize)]
pub struct ConfigShowResponse {
    pub server_url: String,
    pub admin_key_set: bool,
    pub path: String,
}

impl std::fmt::Display for ConfigShowResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Server: {}", self.server_url)?;
        writeln!(
            f,
            "Admin key: {}",
            if self.admin_key_set { "set" } else { "not set" }
        )?;
        write!(f, "Config file: {}", self.path)
    }
}

/// Show local client configuration
pub fn run_config_show(format: OutputFormat) -> Result<()> {
    let config = LocalConfig::load()?;
    let response = ConfigShowResponse {
        server_url: config
            .server_url
            .unwrap_or_else(|| crate::DEFAULT_SERVER_URL.to_string()),
        admin_key_set: config.admin_key.is_some(),
        path: LocalConfig::config_path().display().to_string(),
    };
    format.print(&response);
    Ok(())
}

/// Set server URL (local only)
pub fn run_config_server(url: &str, format: OutputFormat) -> Result<()> {
    url::Url::parse(url).map_err(|e| anyhow::anyhow!("Invalid server URL {}: {}", url, e))?;

    let mut config = LocalConfig::load().unwrap_or_default();
    config.server_url = Some(url.trim_end_matches('/').to_string());
    config.save()?;

    format.print(&SuccessResponse {
        message: format!("Server URL set to: {}", url),
    });
    Ok(())
}

/// Store the admin key used by admin client commands
pub fn run_config_admin_key(key: Option<&str>, format: OutputFormat) -> Result<()> {
    let mut config = LocalConfig::load().unwrap_or_default();
    config.admin_key = key.map(str::to_string);
    config.save()?;

    let message = match key {
        Some(_) => "Admin key saved".to_string(),
        None => "Admin key removed".to_string(),
    };
    format.print(&SuccessResponse { message });
    Ok(())
}
