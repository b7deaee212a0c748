use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

pub static CONFIG: OnceLock<EngineConfig> = OnceLock::new();

/// Path of the TOML configuration, overridable via `LUMOS_CONFIG`.
const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Telegram bot token used by the dispatcher.
    #[serde(default)]
    pub bot_token: String,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Seconds between change-poll cycles per region.
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,

    /// Seconds between queues within one poll cycle.
    #[serde(default = "default_queue_pause")]
    pub queue_pause_secs: u64,

    /// Milliseconds between messages to the same recipient.
    #[serde(default = "default_send_pause")]
    pub send_pause_ms: u64,

    /// Directory for the JSON state documents.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    #[serde(default)]
    pub sources: SourceEndpoints,
}

/// Per-region schedule API endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceEndpoints {
    #[serde(default)]
    pub prykarpattia_url: String,
    #[serde(default)]
    pub chernivtsi_url: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_check_interval() -> u64 {
    45
}

fn default_queue_pause() -> u64 {
    1
}

fn default_send_pause() -> u64 {
    200
}

fn default_data_dir() -> String {
    "data".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            log_level: default_log_level(),
            check_interval_secs: default_check_interval(),
            queue_pause_secs: default_queue_pause(),
            send_pause_ms: default_send_pause(),
            data_dir: default_data_dir(),
            sources: SourceEndpoints::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: EngineConfig = toml::from_str(&content)?;
        Ok(config)
    }
}

/// Load the configuration into [`CONFIG`]. A missing file falls back to
/// defaults so the engine can start in a fresh environment.
pub fn read_config() -> anyhow::Result<()> {
    let path = std::env::var("LUMOS_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config = if std::path::Path::new(&path).exists() {
        EngineConfig::from_file(&path)?
    } else {
        EngineConfig::default()
    };
    let _ = CONFIG.set(config);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sparse_toml_fills_defaults() {
        let config: EngineConfig = toml::from_str(
            r#"
            bot_token = "123:abc"

            [sources]
            prykarpattia_url = "https://example.test/gpv"
            "#,
        )
        .unwrap();
        assert_eq!(config.bot_token, "123:abc");
        assert_eq!(config.check_interval_secs, 45);
        assert_eq!(config.queue_pause_secs, 1);
        assert_eq!(config.data_dir, "data");
        assert_eq!(config.sources.prykarpattia_url, "https://example.test/gpv");
        assert!(config.sources.chernivtsi_url.is_empty());
    }

    #[test]
    fn empty_toml_is_valid() {
        let config: EngineConfig = toml::from_str("").unwrap();
        assert_eq!(config.log_level, "info");
    }
}
