//! Error types for the control interface client
//!
//! A receive that simply sees no data in time is not an error at the
//! transport level (see [`crate::ctrl::Received`]); only a whole request
//! round-trip that runs out of time surfaces as [`Error::Timeout`].

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Step of [`crate::Transport::open`] that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenStage {
    /// Creating the datagram socket and binding it to the local path
    Bind,
    /// Connecting to the daemon's control socket
    Connect,
    /// Handing the socket over to the tokio reactor
    Register,
}

impl fmt::Display for OpenStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            OpenStage::Bind => "bind",
            OpenStage::Connect => "connect",
            OpenStage::Register => "register",
        };
        f.write_str(stage)
    }
}

/// Main error type for the control interface client
#[derive(Error, Debug)]
pub enum Error {
    // === Connection Errors ===
    #[error("Failed to open control interface ({stage} {}): {source}", .path.display())]
    Open {
        stage: OpenStage,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Control interface is closed")]
    Closed,

    // === Protocol Errors ===
    #[error("Request '{command}' timed out after {:.1} seconds. The daemon may still process it", .after.as_secs_f64())]
    Timeout { command: String, after: Duration },

    #[error("Control protocol error: {0}")]
    Protocol(String),

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Create an open error for the given stage and path
    pub fn open_failed(stage: OpenStage, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Open {
            stage,
            path: path.into(),
            source,
        }
    }

    /// Create a request timeout error
    pub fn timeout(command: &str, after: Duration) -> Self {
        Self::Timeout {
            command: command.to_string(),
            after,
        }
    }

    /// Whether this error came from opening the control socket
    pub fn is_connect_error(&self) -> bool {
        matches!(self, Error::Open { .. })
    }

    /// Whether a request ran out of time waiting for its reply
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_error_names_stage_and_path() {
        let err = Error::open_failed(
            OpenStage::Connect,
            "/var/run/wpa_supplicant/wlan0",
            io::Error::from(io::ErrorKind::NotFound),
        );
        let msg = err.to_string();
        assert!(msg.contains("connect /var/run/wpa_supplicant/wlan0"), "{msg}");
        assert!(err.is_connect_error());
        assert!(!err.is_timeout());
    }

    #[test]
    fn test_timeout_is_distinct() {
        let err = Error::timeout("SCAN", Duration::from_secs(2));
        assert!(err.is_timeout());
        assert!(!err.is_connect_error());
        assert!(err.to_string().contains("'SCAN' timed out after 2.0 seconds"));
    }
}
