use std::time::Duration;

use serde::{Deserialize, Serialize};

use common::config::{ConfigManager, FileContentConfigProvider, Validate, YamlConfigSerializer};
use common::session::SessionTimings;

pub const DEFAULT_CONFIG_FILE: &str = "duel_client.yaml";
pub const DEFAULT_SERVER_URL: &str = "ws://127.0.0.1:4000/ws";
const MAX_DELAY_MS: u64 = 60_000;

pub fn get_config_manager(
    path: &str,
) -> ConfigManager<FileContentConfigProvider, ClientConfig, YamlConfigSerializer> {
    ConfigManager::from_yaml_file(path)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// WebSocket endpoint used for online mode.
    pub server_url: String,
    pub ai_first_move_delay_ms: u64,
    pub ai_reply_delay_ms: u64,
    pub auto_restart_delay_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let timings = SessionTimings::default();
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            ai_first_move_delay_ms: timings.ai_first_move_delay.as_millis() as u64,
            ai_reply_delay_ms: timings.ai_reply_delay.as_millis() as u64,
            auto_restart_delay_ms: timings.auto_restart_delay.as_millis() as u64,
        }
    }
}

impl ClientConfig {
    pub fn timings(&self) -> SessionTimings {
        SessionTimings {
            ai_first_move_delay: Duration::from_millis(self.ai_first_move_delay_ms),
            ai_reply_delay: Duration::from_millis(self.ai_reply_delay_ms),
            auto_restart_delay: Duration::from_millis(self.auto_restart_delay_ms),
        }
    }
}

impl Validate for ClientConfig {
    fn validate(&self) -> Result<(), String> {
        // Only plain WebSocket is built in; terminate TLS in front of the server.
        if !self.server_url.starts_with("ws://") {
            return Err(format!("server_url must start with ws://, got '{}'", self.server_url));
        }
        for (name, value) in [
            ("ai_first_move_delay_ms", self.ai_first_move_delay_ms),
            ("ai_reply_delay_ms", self.ai_reply_delay_ms),
            ("auto_restart_delay_ms", self.auto_restart_delay_ms),
        ] {
            if value > MAX_DELAY_MS {
                return Err(format!("{} must be at most {}", name, MAX_DELAY_MS));
            }
        }
        Ok(())
    }
}
