//! Client for the wpa_supplicant/hostapd control interface
//!
//! The daemons expose a UNIX domain datagram socket that takes plain-text
//! commands and answers with plain-text replies. A client that attaches as
//! a monitor also receives unsolicited event lines on that socket.
//!
//! ```no_run
//! # async fn example() -> wpactrl::Result<()> {
//! let mut ctrl = wpactrl::Session::open("/var/run/wpa_supplicant/wlan0")?;
//!
//! let status = ctrl.request_with("STATUS", |event| println!("event: {}", event)).await?;
//! println!("{}", status);
//!
//! ctrl.attach().await?;
//! while ctrl.pending()? {
//!     println!("{}", ctrl.recv_event().await?);
//! }
//!
//! ctrl.close().await;
//! # Ok(())
//! # }
//! ```
//!
//! Close sessions explicitly: only [`Session::close`] can send DETACH. A
//! dropped session still removes its local socket file.

pub mod common;
pub mod ctrl;
pub mod scan;

pub use common::config::Config;
pub use common::{Error, OpenStage, Result};
pub use ctrl::{Event, Frame, Received, Session, Transport};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
