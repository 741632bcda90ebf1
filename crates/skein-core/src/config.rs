use std::path::Path;

use serde::{Deserialize, Serialize};

/// A channel watched by discovery, with the triggers that surface
/// candidate threads from it.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MonitoredSource {
    pub channel_id: String,
    pub channel_name: String,
    #[serde(default)]
    pub mention_users: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// Background sync settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyncSettings {
    #[serde(default = "default_auto_sync")]
    pub auto_sync_enabled: bool,
    #[serde(default = "default_sync_interval")]
    pub sync_interval_minutes: u64,
}

fn default_auto_sync() -> bool {
    true
}

fn default_sync_interval() -> u64 {
    30
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            auto_sync_enabled: default_auto_sync(),
            sync_interval_minutes: default_sync_interval(),
        }
    }
}

/// Application configuration. Read-only to the engines; secrets are
/// env-provided and never live in this file.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub workspace: String,
    #[serde(default)]
    pub monitored: Vec<MonitoredSource>,
    #[serde(default)]
    pub sync: SyncSettings,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(String),
    #[error("failed to parse config: {0}")]
    Parse(String),
}

impl AppConfig {
    /// Load from a JSON file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        serde_json::from_str(&raw).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Monitored sources, optionally restricted to the given channel ids.
    pub fn resolve_sources(&self, channel_ids: Option<&[String]>) -> Vec<&MonitoredSource> {
        match channel_ids {
            Some(ids) if !ids.is_empty() => self
                .monitored
                .iter()
                .filter(|s| ids.contains(&s.channel_id))
                .collect(),
            _ => self.monitored.iter().collect(),
        }
    }
}
