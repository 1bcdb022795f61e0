//! Fragment and complete-message value types.

use std::fmt;

use chrono::{DateTime, Local};

use crate::identity::ClientIdentity;
use crate::time::format_timestamp;

// ============================================================================
// Fragment
// ============================================================================

/// One sanitized chunk of bytes read from a socket.
///
/// Kept as raw bytes so a UTF-8 sequence split across reads is only decoded
/// after folding. Owned by a single `ReassemblyBuffer` until then.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub data: Vec<u8>,
    pub author: ClientIdentity,
    pub received_at: DateTime<Local>,
}

impl Fragment {
    /// Creates a fragment stamped with the current local time.
    pub fn new(data: impl Into<Vec<u8>>, author: ClientIdentity) -> Self {
        Self::at(data, author, Local::now())
    }

    /// Creates a fragment with an explicit arrival time.
    pub fn at(data: impl Into<Vec<u8>>, author: ClientIdentity, received_at: DateTime<Local>) -> Self {
        Self {
            data: data.into(),
            author,
            received_at,
        }
    }
}

// ============================================================================
// Complete Message
// ============================================================================

/// One logical chat message, ready for history and broadcast.
///
/// Immutable once built. Recipients share it behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompleteMessage {
    pub body: String,
    pub author: ClientIdentity,
    pub created_at: DateTime<Local>,
}

impl CompleteMessage {
    pub fn new(body: impl Into<String>, author: ClientIdentity, created_at: DateTime<Local>) -> Self {
        Self {
            body: body.into(),
            author,
            created_at,
        }
    }

    /// Builds a system-authored announcement, e.g. `Client <id> has joined`.
    pub fn announcement(subject: &ClientIdentity, action: impl fmt::Display) -> Self {
        Self::new(
            format!("Client {subject} has {action}"),
            ClientIdentity::server(),
            Local::now(),
        )
    }

    /// Renders the wire form: `[HH:MM:SS] <author> <body>\n`.
    ///
    /// Newlines embedded in the body are written as-is.
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CompleteMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "[{}] {} {}",
            format_timestamp(&self.created_at),
            self.author,
            self.body
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_render_wire_format() {
        let at = Local.with_ymd_and_hms(2024, 1, 2, 9, 8, 7).unwrap();
        let msg = CompleteMessage::new("hello", ClientIdentity::new("abc123"), at);
        assert_eq!(msg.render(), "[09:08:07] abc123 hello\n");
    }

    #[test]
    fn test_render_does_not_escape_newlines() {
        let at = Local.with_ymd_and_hms(2024, 1, 2, 9, 8, 7).unwrap();
        let msg = CompleteMessage::new("a\nb", ClientIdentity::new("x"), at);
        assert_eq!(msg.render(), "[09:08:07] x a\nb\n");
    }

    #[test]
    fn test_announcement_is_server_authored() {
        let msg = CompleteMessage::announcement(&ClientIdentity::new("deadbeef"), "joined");
        assert_eq!(msg.author, ClientIdentity::server());
        assert_eq!(msg.body, "Client deadbeef has joined");
    }
}
