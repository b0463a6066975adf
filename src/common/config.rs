//! Configuration file handling

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use super::paths::config_path;
use super::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// Request/reply settings
    #[serde(default)]
    pub request: RequestConfig,

    /// Local socket settings
    #[serde(default)]
    pub socket: SocketConfig,
}

/// Request/reply settings
#[derive(Debug, Deserialize, Clone)]
pub struct RequestConfig {
    /// How long a request waits for each datagram before giving up
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Receive buffer size for replies and events
    #[serde(default = "default_reply_buffer_size")]
    pub reply_buffer_size: usize,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            reply_buffer_size: default_reply_buffer_size(),
        }
    }
}

fn default_timeout_ms() -> u64 {
    2000
}
fn default_reply_buffer_size() -> usize {
    4096
}

/// Local bind socket settings
#[derive(Debug, Deserialize, Clone)]
pub struct SocketConfig {
    /// Directory the local socket is bound in (defaults to the OS temp dir)
    #[serde(default)]
    pub local_dir: Option<PathBuf>,

    /// File name prefix of the local socket
    #[serde(default = "default_local_prefix")]
    pub local_prefix: String,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            local_dir: None,
            local_prefix: default_local_prefix(),
        }
    }
}

fn default_local_prefix() -> String {
    "wpa_ctrl".to_string()
}

impl SocketConfig {
    /// Directory for local sockets, falling back to the temp dir
    pub fn local_dir(&self) -> PathBuf {
        self.local_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = config_path() {
            if path.exists() {
                let content = std::fs::read_to_string(&path).map_err(|e| {
                    super::Error::FileRead {
                        path: path.display().to_string(),
                        error: e.to_string(),
                    }
                })?;
                return Self::from_toml_str(&content);
            }
        }
        Ok(Self::default())
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| super::Error::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check settings that would make the client unusable
    pub fn validate(&self) -> Result<()> {
        if self.request.timeout_ms == 0 {
            return Err(super::Error::Config(
                "request.timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.request.reply_buffer_size == 0 {
            return Err(super::Error::Config(
                "request.reply_buffer_size must be greater than zero".to_string(),
            ));
        }
        if self.socket.local_prefix.is_empty() || self.socket.local_prefix.contains('/') {
            return Err(super::Error::Config(format!(
                "socket.local_prefix '{}' must be a non-empty file name",
                self.socket.local_prefix
            )));
        }
        Ok(())
    }

    /// Per-datagram timeout used by requests
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request.timeout_ms)
    }
}
