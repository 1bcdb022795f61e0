//! Connection actor for individual chat clients.
//!
//! Each accepted socket gets one `Connection` that:
//! - Derives the client identity from the peer address
//! - Registers with the coordinator (history replay + join announcement)
//! - Runs a read loop feeding the reassembly buffer
//! - Runs a write loop draining the outbound queue to the socket
//! - Unregisters exactly once, from the write loop, after the read loop ends
//!
//! # Panic-Free Guarantees
//!
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Socket errors end this connection only; they never reach the coordinator as faults

use std::net::Shutdown;
use std::sync::Arc;
use std::time::Duration;

use chatter_core::{
    sanitize, ClientIdentity, CompleteMessage, ConfigError, Fragment, ReassemblyBuffer,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::coordinator::{
    ClientId, CoordinatorError, CoordinatorHandle, ReadOutcome, Registration, SocketCloser,
};

/// Bytes requested per socket read.
const READ_BUFFER_SIZE: usize = 2048;

// ============================================================================
// Socket Closer
// ============================================================================

/// Duplicate of the client's socket descriptor, used by the reaper to force
/// the read loop out of a blocking read.
pub struct TcpCloser(std::net::TcpStream);

impl SocketCloser for TcpCloser {
    fn close(&self) {
        if let Err(e) = self.0.shutdown(Shutdown::Both) {
            debug!(error = %e, "Socket already closed");
        }
    }
}

// ============================================================================
// Connection
// ============================================================================

/// A registered client connection, ready to run.
pub struct Connection {
    client_id: ClientId,
    identity: ClientIdentity,
    coordinator: CoordinatorHandle,
    reader: OwnedReadHalf,
    writer: OwnedWriteHalf,
    outbound: mpsc::Receiver<Arc<CompleteMessage>>,
    buffer: ReassemblyBuffer,
    flush_after: Option<Duration>,
}

impl Connection {
    /// Registers a freshly accepted socket with the coordinator.
    ///
    /// # Errors
    ///
    /// - `ConnectionError::PeerAddr` if the peer address is unavailable
    /// - `ConnectionError::Io` if the socket cannot be duplicated
    /// - `ConnectionError::Config` if the fragment capacity is unusable
    /// - `ConnectionError::Registration` if the coordinator has stopped
    pub async fn accept(
        stream: TcpStream,
        coordinator: CoordinatorHandle,
        config: &ServerConfig,
    ) -> Result<Self, ConnectionError> {
        let peer = stream
            .peer_addr()
            .map_err(|e| ConnectionError::PeerAddr(e.to_string()))?;
        let identity = ClientIdentity::from_peer(&peer);
        let buffer = ReassemblyBuffer::new(config.fragment_capacity)?;

        // Keep a second descriptor so the coordinator can close the socket
        let std_stream = stream
            .into_std()
            .map_err(|e| ConnectionError::Io(e.to_string()))?;
        let closer = std_stream
            .try_clone()
            .map_err(|e| ConnectionError::Io(e.to_string()))?;
        let stream =
            TcpStream::from_std(std_stream).map_err(|e| ConnectionError::Io(e.to_string()))?;

        let (outbound_tx, outbound_rx) = mpsc::channel(config.outbound_queue);
        let client_id = coordinator
            .register(Registration {
                identity: identity.clone(),
                outbound: outbound_tx,
                closer: Box::new(TcpCloser(closer)),
            })
            .await?;

        debug!(
            client_id = %client_id,
            peer = %peer,
            identity = %identity.short(),
            "Client connected"
        );

        let (reader, writer) = stream.into_split();

        Ok(Self {
            client_id,
            identity,
            coordinator,
            reader,
            writer,
            outbound: outbound_rx,
            buffer,
            flush_after: config.fragment_flush_after(),
        })
    }

    /// Runs both loops until the socket ends.
    pub async fn run(self) {
        let Self {
            client_id,
            identity,
            coordinator,
            reader,
            writer,
            outbound,
            buffer,
            flush_after,
        } = self;

        let (done_tx, done_rx) = oneshot::channel();

        let writer_task = tokio::spawn(write_loop(
            client_id,
            writer,
            outbound,
            done_rx,
            coordinator.clone(),
        ));

        let mut read_side = ReadLoop {
            client_id,
            identity,
            coordinator,
            reader,
            buffer,
            flush_after,
        };
        let outcome = read_side.run().await;

        debug!(client_id = %client_id, outcome = ?outcome, "Read loop finished");

        // Write loop is the only place that unregisters
        let _ = done_tx.send(outcome);
        if let Err(e) = writer_task.await {
            warn!(client_id = %client_id, error = %e, "Write loop task failed");
        }
    }
}

// ============================================================================
// Read Loop
// ============================================================================

struct ReadLoop {
    client_id: ClientId,
    identity: ClientIdentity,
    coordinator: CoordinatorHandle,
    reader: OwnedReadHalf,
    buffer: ReassemblyBuffer,
    flush_after: Option<Duration>,
}

impl ReadLoop {
    async fn run(&mut self) -> ReadOutcome {
        let mut buf = [0u8; READ_BUFFER_SIZE];

        loop {
            let read = match self.flush_after {
                Some(delay) if !self.buffer.is_empty() => {
                    tokio::select! {
                        result = self.reader.read(&mut buf) => result,
                        _ = tokio::time::sleep(delay) => {
                            if let Some(msg) = self.buffer.flush() {
                                debug!(client_id = %self.client_id, "Idle flush of partial message");
                                if self.coordinator.broadcast(msg).await.is_err() {
                                    return ReadOutcome::Failed(CoordinatorError::ChannelClosed.to_string());
                                }
                            }
                            continue;
                        }
                    }
                }
                _ => self.reader.read(&mut buf).await,
            };

            let n = match read {
                Ok(0) => return ReadOutcome::Eof,
                Ok(n) => n,
                Err(e) => return ReadOutcome::from_io(&e),
            };

            self.coordinator.touch(self.client_id).await;

            let data = sanitize(buf.get(..n).unwrap_or_default());
            if data.is_empty() {
                continue;
            }

            if let Some(msg) = self.buffer.add(Fragment::new(data, self.identity.clone())) {
                if self.coordinator.broadcast(msg).await.is_err() {
                    return ReadOutcome::Failed(CoordinatorError::ChannelClosed.to_string());
                }
            }
        }
    }
}

// ============================================================================
// Write Loop
// ============================================================================

/// Drains the outbound queue until the read loop signals termination, then
/// unregisters.
async fn write_loop(
    client_id: ClientId,
    mut writer: OwnedWriteHalf,
    mut outbound: mpsc::Receiver<Arc<CompleteMessage>>,
    mut done: oneshot::Receiver<ReadOutcome>,
    coordinator: CoordinatorHandle,
) {
    let mut queue_open = true;

    let outcome = loop {
        tokio::select! {
            outcome = &mut done => {
                break outcome.unwrap_or_else(|_| ReadOutcome::Failed("read loop aborted".to_string()));
            }

            msg = outbound.recv(), if queue_open => {
                match msg {
                    Some(msg) => {
                        if let Err(e) = writer.write_all(msg.render().as_bytes()).await {
                            debug!(client_id = %client_id, error = %e, "Failed to write message");
                        }
                    }
                    None => queue_open = false,
                }
            }
        }
    };

    match coordinator.unregister(client_id, outcome).await {
        Ok(()) => info!(client_id = %client_id, "Client disconnected"),
        Err(e) => debug!(client_id = %client_id, error = %e, "Unregister skipped"),
    }
}

/// Errors that can occur while setting up a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("Failed to read peer address: {0}")]
    PeerAddr(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Invalid connection settings: {0}")]
    Config(#[from] ConfigError),

    #[error("Registration failed: {0}")]
    Registration(#[from] CoordinatorError),
}
