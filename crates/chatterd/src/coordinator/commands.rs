//! Coordinator commands, errors, and disconnect bookkeeping.
//!
//! This module defines the message types for communicating with the `Coordinator`:
//! - `CoordinatorCommand`: events sent to the coordinator loop
//! - `CoordinatorError`: errors surfaced through the handle
//! - `DisconnectReason` / `ReadOutcome`: how a connection ended
//!
//! All types are designed for async message passing and follow the panic-free policy.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chatter_core::{ClientIdentity, CompleteMessage};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

// ============================================================================
// Identifiers
// ============================================================================

/// Process-unique client number, assigned by the coordinator on registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(u64);

impl ClientId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sending half of a client's bounded outbound queue.
pub type Outbound = mpsc::Sender<Arc<CompleteMessage>>;

// ============================================================================
// Socket Closing
// ============================================================================

/// Forcibly ends a client's socket from outside its actor.
///
/// The reaper path uses this instead of removing the client directly: the
/// actor's read loop observes the close and runs ordinary termination.
pub trait SocketCloser: Send + 'static {
    fn close(&self);
}

/// Everything the coordinator needs to take ownership of a new client.
pub struct Registration {
    pub identity: ClientIdentity,
    pub outbound: Outbound,
    pub closer: Box<dyn SocketCloser>,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Coordinator Commands
// ============================================================================

/// Events processed one at a time, in arrival order, by the coordinator.
#[derive(Debug)]
pub enum CoordinatorCommand {
    /// Add a client, replay history to it, announce the join.
    Register {
        registration: Registration,
        respond_to: oneshot::Sender<ClientId>,
    },

    /// Remove a client and announce why it left.
    ///
    /// # Errors
    /// - `CoordinatorError::ClientNotFound` if already removed
    Unregister {
        client_id: ClientId,
        outcome: ReadOutcome,
        respond_to: oneshot::Sender<Result<(), CoordinatorError>>,
    },

    /// Liveness refresh from a client's read loop. Fire-and-forget.
    Touch { client_id: ClientId },

    /// Record a completed message and fan it out.
    Broadcast { message: Arc<CompleteMessage> },

    /// Diagnostic only; logged, never mutates state.
    Error { error: String },

    /// Evict clients silent for longer than `idle_threshold`.
    ReapIdle {
        idle_threshold: Duration,
        respond_to: oneshot::Sender<usize>,
    },

    GetHistory {
        respond_to: oneshot::Sender<Vec<Arc<CompleteMessage>>>,
    },

    ClientCount {
        respond_to: oneshot::Sender<usize>,
    },

    /// Stop the loop. No further events are processed.
    Shutdown,
}

// ============================================================================
// Coordinator Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordinatorError {
    /// The coordinator loop has stopped.
    #[error("coordinator channel closed")]
    ChannelClosed,

    /// The client is not (or no longer) registered.
    #[error("client not registered: {0}")]
    ClientNotFound(ClientId),
}

// ============================================================================
// Disconnect Reasons
// ============================================================================

/// Why a client left, as shown in its leave announcement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The peer went away (reset or orderly close)
    Left,
    /// Evicted by the idle reaper
    TimedOut,
    /// Any other transport failure, as raw error text
    Io(String),
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Left => write!(f, "left"),
            Self::TimedOut => write!(f, "timed out"),
            Self::Io(text) => write!(f, "{text}"),
        }
    }
}

/// What a read loop observed when it stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Connection reset by peer
    Reset,
    /// Read returned zero bytes
    Eof,
    /// Any other I/O error
    Failed(String),
}

impl ReadOutcome {
    /// Classifies a read error.
    pub fn from_io(err: &std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::ConnectionReset => Self::Reset,
            _ => Self::Failed(err.to_string()),
        }
    }

    /// Combines the observation with a reason tagged earlier (by the reaper).
    ///
    /// A reset always reads as "left"; otherwise an earlier tag wins.
    pub fn resolve(self, tagged: Option<DisconnectReason>) -> DisconnectReason {
        match (self, tagged) {
            (Self::Reset, _) => DisconnectReason::Left,
            (_, Some(reason)) => reason,
            (Self::Eof, None) => DisconnectReason::Left,
            (Self::Failed(text), None) => DisconnectReason::Io(text),
        }
    }
}
