//! Control session: commands, replies and the event monitor
//!
//! A session wraps one [`Transport`] and tracks whether it is attached as an
//! event monitor. Requests borrow the session mutably, so at most one command
//! is ever waiting for its reply. The protocol does not tag replies, so this
//! is what keeps them matched to their commands.

use std::os::unix::io::RawFd;
use std::path::Path;
use std::time::Duration;

use crate::common::config::Config;
use crate::common::paths::LocalPaths;
use crate::common::{Error, Result};

use super::frame::{self, Event, Frame};
use super::transport::{Received, Transport};

/// Client session on a wpa_supplicant/hostapd control interface
#[derive(Debug)]
pub struct Session {
    transport: Transport,
    /// Last known monitor state, only changed by acknowledged ATTACH/DETACH
    attached: bool,
    request_timeout: Duration,
    reply_buffer_size: usize,
}

impl Session {
    /// Open a session with default settings
    ///
    /// `ctrl_path` is the daemon's control socket, for example
    /// `/var/run/wpa_supplicant/wlan0`. Must be called from within a tokio
    /// runtime.
    pub fn open(ctrl_path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(ctrl_path, &Config::default())
    }

    /// Open a session with the given settings
    ///
    /// Must be called from within a tokio runtime.
    pub fn open_with_config(ctrl_path: impl AsRef<Path>, config: &Config) -> Result<Self> {
        let local_paths = LocalPaths::from_config(&config.socket);
        Self::open_with_paths(ctrl_path, config, &local_paths)
    }

    /// Open a session drawing its local path from `local_paths`
    ///
    /// Must be called from within a tokio runtime. The config is validated
    /// before any socket is created.
    pub fn open_with_paths(
        ctrl_path: impl AsRef<Path>,
        config: &Config,
        local_paths: &LocalPaths<'_>,
    ) -> Result<Self> {
        config.validate()?;
        let transport = Transport::open(ctrl_path, local_paths)?;

        Ok(Self {
            transport,
            attached: false,
            request_timeout: config.request_timeout(),
            reply_buffer_size: config.request.reply_buffer_size,
        })
    }

    /// Send a command and wait for its reply
    ///
    /// Event lines that arrive first are dropped.
    pub async fn request(&mut self, cmd: &str) -> Result<String> {
        self.request_with(cmd, |event| {
            tracing::trace!("Dropping event during request: {}", event);
        })
        .await
    }

    /// Send a command and wait for its reply, handing interleaved events to `on_event`
    ///
    /// Each wait for a datagram is bounded by the request timeout, but the
    /// number of events drained before the reply is not. A daemon that keeps
    /// emitting events can hold the reply back indefinitely.
    pub async fn request_with<F>(&mut self, cmd: &str, mut on_event: F) -> Result<String>
    where
        F: FnMut(&Event),
    {
        if cmd.is_empty() || cmd.contains('\0') {
            return Err(Error::Protocol(format!(
                "Invalid command {:?}: must be non-empty and contain no NUL bytes",
                cmd
            )));
        }

        tracing::debug!("ctrl >>> {}", cmd);
        self.transport.send(cmd.as_bytes()).await?;

        loop {
            let datagram = match self
                .transport
                .receive(self.reply_buffer_size, Some(self.request_timeout))
                .await?
            {
                Received::Datagram(data) => data,
                Received::TimedOut => return Err(Error::timeout(cmd, self.request_timeout)),
            };

            match frame::classify(&datagram) {
                Frame::Event(data) => {
                    let event = Event::from_datagram(data);
                    tracing::trace!("ctrl <<< event while waiting for '{}': {}", cmd, event);
                    on_event(&event);
                }
                Frame::Reply(data) => {
                    let reply = String::from_utf8(data.to_vec()).map_err(|e| {
                        Error::Protocol(format!("Reply to '{}' is not valid UTF-8: {}", cmd, e))
                    })?;
                    tracing::debug!("ctrl <<< {}", reply.trim_end());
                    return Ok(reply);
                }
            }
        }
    }

    /// Register as an event monitor
    ///
    /// Returns whether the session is attached afterwards. A negative reply
    /// from the daemon is not an error; the state just stays unchanged.
    pub async fn attach(&mut self) -> Result<bool> {
        if self.attached {
            return Ok(true);
        }
        self.set_monitor(true).await
    }

    /// Unregister as an event monitor
    ///
    /// Returns whether the session is detached afterwards. Does nothing when
    /// not attached.
    pub async fn detach(&mut self) -> Result<bool> {
        if !self.attached {
            return Ok(true);
        }
        self.set_monitor(false).await
    }

    async fn set_monitor(&mut self, attach: bool) -> Result<bool> {
        let cmd = if attach { "ATTACH" } else { "DETACH" };
        let reply = self.request(cmd).await?;

        if frame::is_ack(&reply) {
            self.attached = attach;
            tracing::debug!("{} acknowledged", cmd);
            Ok(true)
        } else {
            tracing::warn!("{} rejected by daemon: {}", cmd, reply.trim_end());
            Ok(false)
        }
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Whether an event or message is queued
    pub fn pending(&self) -> Result<bool> {
        self.transport.pending()
    }

    /// Receive one queued message, waiting as long as it takes
    ///
    /// Meant to be called after [`Session::pending`] reports data.
    pub async fn recv(&self, max_size: usize) -> Result<Vec<u8>> {
        match self.transport.receive(max_size, None).await? {
            Received::Datagram(data) => Ok(data),
            Received::TimedOut => Err(Error::Protocol(
                "Unbounded receive reported a timeout".to_string(),
            )),
        }
    }

    /// Receive one message, waiting at most `timeout`
    pub async fn recv_timeout(&self, max_size: usize, timeout: Duration) -> Result<Received> {
        self.transport.receive(max_size, Some(timeout)).await
    }

    /// Receive one message with the configured buffer size as an [`Event`]
    pub async fn recv_event(&self) -> Result<Event> {
        let data = self.recv(self.reply_buffer_size).await?;
        Ok(Event::from_datagram(&data))
    }

    /// Socket descriptor for external event loops, `None` once closed
    pub fn fd(&self) -> Option<RawFd> {
        self.transport.fd()
    }

    pub fn ctrl_path(&self) -> &Path {
        self.transport.remote_path()
    }

    pub fn local_path(&self) -> &Path {
        self.transport.local_path()
    }

    pub fn is_closed(&self) -> bool {
        self.transport.is_closed()
    }

    /// Detach if attached, then close the transport
    ///
    /// Idempotent. A failed DETACH is logged and does not stop the shutdown.
    pub async fn close(&mut self) {
        if self.transport.is_closed() {
            return;
        }

        if self.attached {
            match self.detach().await {
                Ok(true) => {}
                Ok(false) => tracing::warn!("Closing while still registered as monitor"),
                Err(e) => tracing::warn!("DETACH failed during close: {}", e),
            }
            self.attached = false;
        }

        self.transport.close();
    }
}
