//! Control interface datagram framing
//!
//! Every datagram from the daemon is either the reply to the last command
//! or an unsolicited event line. Event lines start with `<`, followed by the
//! message priority and `>`:
//! ```text
//! <3>CTRL-EVENT-CONNECTED - Connection to 00:11:22:33:44:55 completed
//! ```

use std::fmt;

/// Leading byte that marks an event line
pub const EVENT_MARKER: u8 = b'<';

/// Reply the daemon sends when a control command such as ATTACH succeeds
pub const ACK_OK: &str = "OK\n";

/// A classified datagram
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame<'a> {
    /// Unsolicited event line
    Event(&'a [u8]),
    /// Reply to the command in flight
    Reply(&'a [u8]),
}

/// Classify a datagram as event or reply
///
/// An empty datagram is a reply.
pub fn classify(datagram: &[u8]) -> Frame<'_> {
    match datagram.first() {
        Some(&EVENT_MARKER) => Frame::Event(datagram),
        _ => Frame::Reply(datagram),
    }
}

/// Whether a reply is the positive acknowledgement
pub fn is_ack(reply: &str) -> bool {
    reply == ACK_OK
}

/// An unsolicited event line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    raw: String,
}

impl Event {
    /// Wrap a received datagram. Invalid UTF-8 is replaced, events are informational.
    pub fn from_datagram(datagram: &[u8]) -> Self {
        Self {
            raw: String::from_utf8_lossy(datagram).into_owned(),
        }
    }

    /// The event exactly as received
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Priority from the `<N>` tag, if it is well formed
    pub fn level(&self) -> Option<u8> {
        let (tag, _) = self.split_tag()?;
        tag.parse().ok()
    }

    /// Text after the priority tag
    pub fn message(&self) -> &str {
        match self.split_tag() {
            Some((_, rest)) => rest,
            None => &self.raw,
        }
    }

    fn split_tag(&self) -> Option<(&str, &str)> {
        let rest = self.raw.strip_prefix('<')?;
        rest.split_once('>')
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.raw.trim_end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_event() {
        let data = b"<3>CTRL-EVENT-CONNECTED\n";
        assert_eq!(classify(data), Frame::Event(data));
    }

    #[test]
    fn test_classify_reply() {
        assert_eq!(classify(b"PONG\n"), Frame::Reply(b"PONG\n"));
        assert_eq!(classify(b""), Frame::Reply(b""));
        // only the first byte counts
        assert_eq!(classify(b"FAIL <bad>\n"), Frame::Reply(b"FAIL <bad>\n"));
    }

    #[test]
    fn test_ack_is_exact() {
        assert!(is_ack("OK\n"));
        assert!(!is_ack("OK"));
        assert!(!is_ack("FAIL\n"));
        assert!(!is_ack("OK\nOK\n"));
    }

    #[test]
    fn test_event_parts() {
        let event = Event::from_datagram(b"<3>CTRL-EVENT-SCAN-RESULTS \n");
        assert_eq!(event.raw(), "<3>CTRL-EVENT-SCAN-RESULTS \n");
        assert_eq!(event.level(), Some(3));
        assert_eq!(event.message(), "CTRL-EVENT-SCAN-RESULTS \n");
        assert_eq!(event.to_string(), "<3>CTRL-EVENT-SCAN-RESULTS");
    }

    #[test]
    fn test_event_without_priority() {
        let event = Event::from_datagram(b"<garbage");
        assert_eq!(event.level(), None);
        assert_eq!(event.message(), "<garbage");

        let event = Event::from_datagram(b"<x>text");
        assert_eq!(event.level(), None);
        assert_eq!(event.message(), "text");
    }
}
