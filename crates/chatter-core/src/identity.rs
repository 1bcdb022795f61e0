//! Per-connection client identity.

use std::fmt;
use std::net::SocketAddr;

use sha2::{Digest, Sha256};

/// Author name used for join/leave announcements.
pub const SERVER_IDENTITY: &str = "**SERVER**";

/// Stable fingerprint of a connection.
///
/// Derived once from the remote peer's `host:port` as a hex-encoded SHA-256
/// digest. It names the author of messages and appears in log lines; it is
/// not an authentication mechanism and is never supplied by the client.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientIdentity(String);

impl ClientIdentity {
    /// Derives the identity for a remote peer.
    pub fn from_peer(addr: &SocketAddr) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(addr.ip().to_string().as_bytes());
        hasher.update(b":");
        hasher.update(addr.port().to_string().as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    /// The identity used for system-authored announcements.
    pub fn server() -> Self {
        Self(SERVER_IDENTITY.to_string())
    }

    /// Wraps an arbitrary string (tests and synthetic authors).
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the underlying string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns a shortened display form (first 12 characters) for logs.
    #[must_use]
    pub fn short(&self) -> &str {
        self.0.get(..12).unwrap_or(&self.0)
    }
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ClientIdentity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_is_stable_per_peer() {
        let addr: SocketAddr = "127.0.0.1:40000".parse().unwrap();
        let a = ClientIdentity::from_peer(&addr);
        let b = ClientIdentity::from_peer(&addr);
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_identity_differs_by_port() {
        let a = ClientIdentity::from_peer(&"127.0.0.1:40000".parse().unwrap());
        let b = ClientIdentity::from_peer(&"127.0.0.1:40001".parse().unwrap());
        assert_ne!(a, b);
    }

    #[test]
    fn test_identity_matches_digest_of_host_port() {
        let addr: SocketAddr = "10.0.0.7:5555".parse().unwrap();
        let expected = hex::encode(Sha256::digest(b"10.0.0.7:5555"));
        assert_eq!(ClientIdentity::from_peer(&addr).as_str(), expected);
    }

    #[test]
    fn test_server_identity() {
        assert_eq!(ClientIdentity::server().as_str(), "**SERVER**");
        assert_eq!(ClientIdentity::new("abc").short(), "abc");
    }
}
