//! UNIX datagram transport to the daemon's control socket
//!
//! The socket is bound to a unique local path (the daemon replies to it)
//! and connected to the daemon's control path. Closing removes the local
//! path from the filesystem.

use std::io;
use std::os::unix::io::{AsRawFd, RawFd};
use std::os::unix::net::UnixDatagram as StdUnixDatagram;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::net::UnixDatagram;

use crate::common::paths::{self, LocalPaths};
use crate::common::{Error, OpenStage, Result};

/// Outcome of a bounded receive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    /// One datagram, truncated to the requested size
    Datagram(Vec<u8>),
    /// Nothing arrived within the timeout
    TimedOut,
}

/// Connected datagram socket owning its local bind path
#[derive(Debug)]
pub struct Transport {
    /// `None` once closed
    socket: Option<UnixDatagram>,
    local_path: PathBuf,
    remote_path: PathBuf,
}

impl Transport {
    /// Open a transport to the daemon control socket at `remote`
    ///
    /// Must be called from within a tokio runtime. Whatever step fails,
    /// the socket is closed and a bound local path is removed before the
    /// error is returned.
    pub fn open(remote: impl AsRef<Path>, local_paths: &LocalPaths<'_>) -> Result<Self> {
        let remote_path = remote.as_ref().to_path_buf();
        let local_path = local_paths.next_path();

        let std_socket = bind_local(&local_path)?;

        if let Err(e) = std_socket.connect(&remote_path) {
            discard(std_socket, &local_path);
            return Err(Error::open_failed(OpenStage::Connect, remote_path, e));
        }

        if let Err(e) = std_socket.set_nonblocking(true) {
            discard(std_socket, &local_path);
            return Err(Error::open_failed(OpenStage::Register, local_path, e));
        }
        // from_std closes the socket itself when it fails
        let socket = match UnixDatagram::from_std(std_socket) {
            Ok(socket) => socket,
            Err(e) => {
                remove_local(&local_path);
                return Err(Error::open_failed(OpenStage::Register, local_path, e));
            }
        };

        tracing::info!(
            "Opened control interface {} (local {})",
            remote_path.display(),
            local_path.display()
        );

        Ok(Self {
            socket: Some(socket),
            local_path,
            remote_path,
        })
    }

    fn socket(&self) -> Result<&UnixDatagram> {
        self.socket.as_ref().ok_or(Error::Closed)
    }

    /// Send one command datagram. Not retried.
    pub async fn send(&self, data: &[u8]) -> Result<()> {
        let socket = self.socket()?;
        let sent = socket.send(data).await?;
        if sent != data.len() {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("short datagram write: {} of {} bytes", sent, data.len()),
            )));
        }
        Ok(())
    }

    /// Receive one datagram of at most `max_size` bytes
    ///
    /// `None` waits indefinitely. A zero timeout polls: it returns
    /// [`Received::TimedOut`] right away when nothing is queued.
    pub async fn receive(&self, max_size: usize, timeout: Option<Duration>) -> Result<Received> {
        let socket = self.socket()?;
        let mut buf = vec![0u8; max_size];

        let len = match timeout {
            Some(timeout) if timeout.is_zero() => match recv_now(socket.as_raw_fd(), &mut buf) {
                Ok(len) => len,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(Received::TimedOut),
                Err(e) => return Err(e.into()),
            },
            Some(timeout) => match tokio::time::timeout(timeout, socket.recv(&mut buf)).await {
                Ok(len) => len?,
                Err(_) => return Ok(Received::TimedOut),
            },
            None => socket.recv(&mut buf).await?,
        };

        buf.truncate(len);
        Ok(Received::Datagram(buf))
    }

    /// Whether a datagram is queued right now
    pub fn pending(&self) -> Result<bool> {
        let fd = self.socket()?.as_raw_fd();
        let mut pfd = libc::pollfd {
            fd,
            events: libc::POLLIN,
            revents: 0,
        };

        // zero timeout: never blocks, pfd outlives the call
        let rc = unsafe { libc::poll(&mut pfd, 1, 0) };
        if rc < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(false);
            }
            return Err(err.into());
        }

        Ok(rc > 0 && pfd.revents & libc::POLLIN != 0)
    }

    /// Raw descriptor for external event loops, `None` once closed
    pub fn fd(&self) -> Option<RawFd> {
        self.socket.as_ref().map(|s| s.as_raw_fd())
    }

    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    pub fn remote_path(&self) -> &Path {
        &self.remote_path
    }

    pub fn is_closed(&self) -> bool {
        self.socket.is_none()
    }

    /// Remove the local path and close the socket
    ///
    /// Idempotent. Failures are logged, never returned.
    pub fn close(&mut self) {
        let Some(socket) = self.socket.take() else {
            return;
        };

        remove_local(&self.local_path);
        drop(socket);

        tracing::info!("Closed control interface {}", self.remote_path.display());
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        if !self.is_closed() {
            tracing::debug!(
                "Transport to {} dropped without close",
                self.remote_path.display()
            );
            self.close();
        }
    }
}

/// Create the socket bound to `path`, clearing one stale file left behind
/// by an earlier process with the same pid
///
/// A path that a live socket is still bound to is never taken over.
fn bind_local(path: &Path) -> Result<StdUnixDatagram> {
    match StdUnixDatagram::bind(path) {
        Ok(socket) => Ok(socket),
        Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
            if paths::is_live_socket(path) {
                return Err(Error::open_failed(OpenStage::Bind, path, e));
            }
            tracing::warn!("Removing stale local socket {}", path.display());
            paths::remove_stale(path)
                .and_then(|()| StdUnixDatagram::bind(path))
                .map_err(|e| Error::open_failed(OpenStage::Bind, path, e))
        }
        Err(e) => Err(Error::open_failed(OpenStage::Bind, path, e)),
    }
}

/// Non-blocking read straight from the descriptor
///
/// Bypasses the reactor's cached readiness, which may not have caught up
/// with a datagram that was queued a moment ago.
fn recv_now(fd: RawFd, buf: &mut [u8]) -> io::Result<usize> {
    let rc = unsafe { libc::recv(fd, buf.as_mut_ptr().cast(), buf.len(), libc::MSG_DONTWAIT) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(rc as usize)
}

/// Tear down a half-opened socket
fn discard(socket: StdUnixDatagram, local_path: &Path) {
    remove_local(local_path);
    drop(socket);
}

fn remove_local(local_path: &Path) {
    if let Err(e) = std::fs::remove_file(local_path) {
        tracing::warn!(
            "Failed to remove local socket {}: {}",
            local_path.display(),
            e
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU64;

    #[tokio::test]
    async fn test_connect_failure_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let counter = AtomicU64::new(0);
        let paths = LocalPaths::with_counter(dir.path(), "wpa_ctrl", &counter);

        let err = Transport::open(dir.path().join("no-daemon"), &paths).unwrap_err();
        assert!(matches!(
            err,
            Error::Open {
                stage: OpenStage::Connect,
                ..
            }
        ));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_bind_failure_reports_bind() {
        let dir = tempfile::tempdir().unwrap();
        let counter = AtomicU64::new(0);
        let paths = LocalPaths::with_counter(dir.path().join("missing-dir"), "wpa_ctrl", &counter);

        let err = Transport::open(dir.path().join("ctrl"), &paths).unwrap_err();
        assert!(matches!(
            err,
            Error::Open {
                stage: OpenStage::Bind,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_failed_attempts_still_advance_counter() {
        let dir = tempfile::tempdir().unwrap();
        let counter = AtomicU64::new(0);
        let paths = LocalPaths::with_counter(dir.path(), "wpa_ctrl", &counter);

        assert!(Transport::open(dir.path().join("no-daemon"), &paths).is_err());
        assert!(Transport::open(dir.path().join("no-daemon"), &paths).is_err());
        assert_eq!(counter.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_stale_local_path_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let daemon_path = dir.path().join("ctrl");
        let _daemon = UnixDatagram::bind(&daemon_path).unwrap();

        let counter = AtomicU64::new(0);
        let paths = LocalPaths::with_counter(dir.path(), "wpa_ctrl", &counter);
        let stale = paths.next_path();
        // owner gone, file left behind
        drop(StdUnixDatagram::bind(&stale).unwrap());
        assert!(stale.exists());

        // reset so the next open lands on the stale path
        counter.store(0, std::sync::atomic::Ordering::SeqCst);
        let mut transport = Transport::open(&daemon_path, &paths).unwrap();
        assert_eq!(transport.local_path(), stale);
        transport.close();
        assert!(!stale.exists());
    }

    #[tokio::test]
    async fn test_live_local_path_is_not_taken_over() {
        let dir = tempfile::tempdir().unwrap();
        let daemon_path = dir.path().join("ctrl");
        let daemon = UnixDatagram::bind(&daemon_path).unwrap();

        let first_counter = AtomicU64::new(0);
        let first_paths = LocalPaths::with_counter(dir.path(), "wpa_ctrl", &first_counter);
        let first = Transport::open(&daemon_path, &first_paths).unwrap();

        let second_counter = AtomicU64::new(0);
        let second_paths = LocalPaths::with_counter(dir.path(), "wpa_ctrl", &second_counter);
        let err = Transport::open(&daemon_path, &second_paths).unwrap_err();
        assert!(matches!(
            err,
            Error::Open {
                stage: OpenStage::Bind,
                ..
            }
        ));

        // the first transport still owns its address
        daemon.send_to(b"PONG\n", first.local_path()).await.unwrap();
        let received = first.receive(64, Some(Duration::from_secs(1))).await.unwrap();
        assert_eq!(received, Received::Datagram(b"PONG\n".to_vec()));
        assert!(first.local_path().exists());
    }

    #[tokio::test]
    async fn test_operations_after_close() {
        let dir = tempfile::tempdir().unwrap();
        let daemon_path = dir.path().join("ctrl");
        let _daemon = UnixDatagram::bind(&daemon_path).unwrap();
        let paths = LocalPaths::new(dir.path(), "wpa_ctrl");

        let mut transport = Transport::open(&daemon_path, &paths).unwrap();
        assert!(transport.fd().is_some());
        transport.close();
        transport.close();

        assert!(transport.is_closed());
        assert!(transport.fd().is_none());
        assert!(matches!(transport.pending(), Err(Error::Closed)));
        assert!(matches!(transport.send(b"PING").await, Err(Error::Closed)));
    }

    #[tokio::test]
    async fn test_drop_removes_local_path() {
        let dir = tempfile::tempdir().unwrap();
        let daemon_path = dir.path().join("ctrl");
        let _daemon = UnixDatagram::bind(&daemon_path).unwrap();
        let paths = LocalPaths::new(dir.path(), "wpa_ctrl");

        let transport = Transport::open(&daemon_path, &paths).unwrap();
        let local = transport.local_path().to_path_buf();
        assert!(local.exists());
        drop(transport);
        assert!(!local.exists());
    }

    #[tokio::test]
    async fn test_zero_timeout_polls() {
        let dir = tempfile::tempdir().unwrap();
        let daemon_path = dir.path().join("ctrl");
        let daemon = UnixDatagram::bind(&daemon_path).unwrap();
        let paths = LocalPaths::new(dir.path(), "wpa_ctrl");
        let transport = Transport::open(&daemon_path, &paths).unwrap();

        let polled = transport.receive(64, Some(Duration::ZERO)).await.unwrap();
        assert_eq!(polled, Received::TimedOut);

        daemon
            .send_to(b"<2>CTRL-EVENT-TERMINATING\n", transport.local_path())
            .await
            .unwrap();
        let polled = transport.receive(8, Some(Duration::ZERO)).await.unwrap();
        assert_eq!(polled, Received::Datagram(b"<2>CTRL-".to_vec()));
    }
}
