//! Server configuration.

use std::path::Path;

use coinrush_session::SessionConfig;
use serde::{Deserialize, Serialize};

use crate::CoinrushError;

/// Everything needed to run a server.
///
/// Every field has a default, so a JSON file may override only what it
/// needs:
///
/// ```json
/// {
///   "bind_addr": "0.0.0.0:9000",
///   "session": { "duration_secs": 30 }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,

    /// Authority tick rate while a session is active.
    pub tick_rate_hz: u32,

    /// Capacity of the authority's command channel. When it is full,
    /// connection tasks wait (backpressure).
    pub channel_size: usize,

    pub session: SessionConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            tick_rate_hz: 20,
            channel_size: 256,
            session: SessionConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Loads a config from a JSON file.
    ///
    /// # Errors
    /// [`CoinrushError::Config`] if the file cannot be read or parsed.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, CoinrushError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| CoinrushError::Config(format!("{}: {e}", path.display())))?;
        serde_json::from_str(&text)
            .map_err(|e| CoinrushError::Config(format!("{}: {e}", path.display())))
    }

    pub fn from_json_str(text: &str) -> Result<Self, CoinrushError> {
        serde_json::from_str(text).map_err(|e| CoinrushError::Config(e.to_string()))
    }

    /// Checks the server-level fields.
    ///
    /// Session settings are not checked here. A bad session config is
    /// reported when the session starts and the server stays up.
    pub fn validate(&self) -> Result<(), CoinrushError> {
        if self.tick_rate_hz == 0 {
            return Err(CoinrushError::Config("tick_rate_hz must be > 0".into()));
        }
        if self.channel_size == 0 {
            return Err(CoinrushError::Config("channel_size must be > 0".into()));
        }
        Ok(())
    }
}
