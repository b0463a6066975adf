//! wpa_supplicant/hostapd control interface protocol
//!
//! Commands and replies are plain-text datagrams on a UNIX domain socket.
//! Once attached, the daemon also sends unsolicited event lines on the same
//! socket, so replies have to be told apart from events.

pub mod frame;
pub mod session;
pub mod transport;

pub use frame::{Event, Frame};
pub use session::Session;
pub use transport::{Received, Transport};
