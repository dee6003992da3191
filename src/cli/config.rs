use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::client::CrmClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    Up,
    Down,
    Unknown,
}

/// Persistent CLI selection, stored as `env.json` in the config dir.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    pub server_url: Option<String>,
    pub api_key: Option<String>,
    pub last_ping: Option<DateTime<Utc>>,
    pub status: ServerStatus,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            server_url: None,
            api_key: None,
            last_ping: None,
            status: ServerStatus::Unknown,
        }
    }
}

impl EnvironmentConfig {
    pub fn update_ping(&mut self, status: ServerStatus) {
        self.last_ping = Some(Utc::now());
        self.status = status;
    }

    /// Client for the selected server, carrying the stored API key if any.
    pub fn client(&self) -> anyhow::Result<CrmClient> {
        let url = self
            .server_url
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("No server selected; run `crm server use <url>` first"))?;
        let client = CrmClient::new(url);
        Ok(match &self.api_key {
            Some(key) => client.with_api_key(key.clone()),
            None => client,
        })
    }
}

pub fn get_config_dir() -> anyhow::Result<PathBuf> {
    let config_dir = if let Ok(custom_dir) = std::env::var("CRM_CLI_CONFIG_DIR") {
        PathBuf::from(custom_dir)
    } else {
        let home = std::env::var("HOME").map_err(|_| anyhow::anyhow!("HOME environment variable not set"))?;
        PathBuf::from(home).join(".config").join("agent-crm").join("cli")
    };

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

pub fn load_environment_config() -> anyhow::Result<EnvironmentConfig> {
    let env_file = get_config_dir()?.join("env.json");

    if !env_file.exists() {
        return Ok(EnvironmentConfig::default());
    }

    let content = fs::read_to_string(env_file)?;
    let config: EnvironmentConfig = serde_json::from_str(&content)?;
    Ok(config)
}

pub fn save_environment_config(config: &EnvironmentConfig) -> anyhow::Result<()> {
    let env_file = get_config_dir()?.join("env.json");

    let content = serde_json::to_string_pretty(config)?;
    fs::write(env_file, content)?;
    Ok(())
}

pub async fn ping_server(client: &CrmClient) -> ServerStatus {
    match client.status().await {
        Ok(_) => ServerStatus::Up,
        Err(_) => ServerStatus::Down,
    }
}
