//! Local socket and configuration paths
//!
//! The client binds its end of the datagram socket to
//! `<local_dir>/<prefix>_<pid>-<counter>` so the daemon has an address to
//! reply to. The counter is process-wide and bumped on every open attempt.

use std::io;
use std::os::unix::net::UnixDatagram;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use super::config::SocketConfig;

/// Name used for the configuration directory
const APP_NAME: &str = "wpactrl";

/// Counter shared by every allocator that doesn't bring its own
static OPEN_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Allocator of unique local bind paths
#[derive(Debug)]
pub struct LocalPaths<'c> {
    dir: PathBuf,
    prefix: String,
    pid: u32,
    counter: &'c AtomicU64,
}

impl LocalPaths<'static> {
    /// Allocator using the process-wide counter
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self::with_counter(dir, prefix, &OPEN_COUNTER)
    }

    /// Allocator for the given socket settings
    pub fn from_config(config: &SocketConfig) -> Self {
        Self::new(config.local_dir(), config.local_prefix.clone())
    }
}

impl<'c> LocalPaths<'c> {
    /// Allocator drawing from a caller-supplied counter
    pub fn with_counter(
        dir: impl Into<PathBuf>,
        prefix: impl Into<String>,
        counter: &'c AtomicU64,
    ) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
            pid: std::process::id(),
            counter,
        }
    }

    /// Allocate the next path. Never hands out the same path twice for one counter.
    pub fn next_path(&self) -> PathBuf {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        self.dir.join(format!("{}_{}-{}", self.prefix, self.pid, n))
    }
}

/// Remove a leftover socket file if it exists
pub fn remove_stale(path: &Path) -> io::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Whether a socket file still has a live socket bound behind it
///
/// Connecting to a leftover file whose owner is gone is refused.
pub fn is_live_socket(path: &Path) -> bool {
    match UnixDatagram::unbound().and_then(|client| client.connect(path)) {
        Ok(()) => true,
        Err(e) => !matches!(
            e.kind(),
            io::ErrorKind::ConnectionRefused | io::ErrorKind::NotFound
        ),
    }
}

/// Get the configuration directory path
///
/// Uses the directories crate for platform-appropriate locations:
/// - Linux: `~/.config/wpactrl/`
/// - macOS: `~/Library/Application Support/wpactrl/`
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the configuration file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}
