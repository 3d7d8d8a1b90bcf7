use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

use common::config::Validate;

pub const DEFAULT_CONFIG_FILE: &str = "duel_server.yaml";
pub const DEFAULT_LISTEN_ADDRESS: &str = "0.0.0.0:4000";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_address: String,
    /// Browser origins allowed by CORS. Empty allows any origin.
    pub allowed_origins: Vec<String>,
    /// Directory served under `/play` when set.
    pub static_files_path: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: DEFAULT_LISTEN_ADDRESS.to_string(),
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
            static_files_path: None,
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, String> {
        self.listen_address
            .parse()
            .map_err(|e| format!("Invalid listen_address '{}': {}", self.listen_address, e))
    }
}

impl Validate for ServerConfig {
    fn validate(&self) -> Result<(), String> {
        self.socket_addr()?;
        if let Some(origin) = self.allowed_origins.iter().find(|origin| origin.trim().is_empty()) {
            return Err(format!("Invalid allowed origin '{}'", origin));
        }
        if let Some(path) = &self.static_files_path
            && path.trim().is_empty()
        {
            return Err("static_files_path must not be empty".to_string());
        }
        Ok(())
    }
}
