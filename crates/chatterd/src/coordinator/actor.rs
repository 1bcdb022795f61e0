//! Coordinator actor - owns the client registry and message history.
//!
//! The Coordinator is the single writer of shared state in the system.
//! It receives commands via an mpsc channel and applies them strictly in
//! arrival order, so no two mutations ever interleave.
//!
//! # Panic-Free Guarantees
//!
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Response channel send failures are ignored (the caller went away)
//! - Outbound queue failures are logged and the message dropped

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chatter_core::{ClientIdentity, CompleteMessage, ConfigResult, History};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::commands::{
    ClientId, CoordinatorCommand, CoordinatorError, DisconnectReason, Outbound, ReadOutcome,
    Registration, SocketCloser,
};

/// Action text of the announcement sent when a client registers.
pub const JOINED: &str = "joined";

// ============================================================================
// Client Entry
// ============================================================================

/// Coordinator-side record of one registered client.
struct ClientEntry {
    identity: ClientIdentity,
    outbound: Outbound,
    closer: Box<dyn SocketCloser>,
    last_activity: Instant,
    /// Set by the reaper before it closes the socket
    disconnect_reason: Option<DisconnectReason>,
}

impl ClientEntry {
    /// Non-blocking enqueue; a full queue drops the message.
    fn enqueue(&self, client_id: ClientId, msg: &Arc<CompleteMessage>) -> bool {
        match self.outbound.try_send(Arc::clone(msg)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(
                    client_id = %client_id,
                    identity = %self.identity.short(),
                    "Outbound queue full, dropping message"
                );
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!(
                    client_id = %client_id,
                    "Outbound queue closed, dropping message"
                );
                false
            }
        }
    }
}

// ============================================================================
// Coordinator
// ============================================================================

/// The coordinator actor.
///
/// Owns:
/// - `clients`: registry of connected clients keyed by `ClientId`
/// - `history`: the bounded transcript replayed on registration
/// - `next_id`: the id generator; ids are never reused
pub struct Coordinator {
    receiver: mpsc::Receiver<CoordinatorCommand>,
    clients: HashMap<ClientId, ClientEntry>,
    history: History,
    next_id: u64,
    shutdown: CancellationToken,
}

impl Coordinator {
    /// Creates a coordinator with an empty registry.
    ///
    /// `shutdown` is cancelled when the loop exits, for any reason.
    pub fn new(
        receiver: mpsc::Receiver<CoordinatorCommand>,
        history_capacity: usize,
        shutdown: CancellationToken,
    ) -> ConfigResult<Self> {
        Ok(Self {
            receiver,
            clients: HashMap::new(),
            history: History::new(history_capacity)?,
            next_id: 0,
            shutdown,
        })
    }

    /// Runs the event loop until Shutdown or until every sender is dropped.
    pub async fn run(mut self) {
        info!("Coordinator starting");

        while let Some(cmd) = self.receiver.recv().await {
            if !self.handle_command(cmd) {
                break;
            }
        }

        self.receiver.close();
        self.shutdown.cancel();
        info!(
            clients = self.clients.len(),
            history = self.history.len(),
            "Coordinator stopped"
        );
    }

    /// Dispatches a command. Returns `false` to stop the loop.
    fn handle_command(&mut self, cmd: CoordinatorCommand) -> bool {
        match cmd {
            CoordinatorCommand::Register {
                registration,
                respond_to,
            } => {
                let id = self.handle_register(registration);
                let _ = respond_to.send(id);
            }
            CoordinatorCommand::Unregister {
                client_id,
                outcome,
                respond_to,
            } => {
                let result = self.handle_unregister(client_id, outcome);
                let _ = respond_to.send(result);
            }
            CoordinatorCommand::Touch { client_id } => {
                if let Some(entry) = self.clients.get_mut(&client_id) {
                    entry.last_activity = Instant::now();
                }
            }
            CoordinatorCommand::Broadcast { message } => {
                self.handle_broadcast(message);
            }
            CoordinatorCommand::Error { error } => {
                error!(error = %error, "Coordinator received error");
            }
            CoordinatorCommand::ReapIdle {
                idle_threshold,
                respond_to,
            } => {
                let evicted = self.handle_reap_idle(idle_threshold);
                let _ = respond_to.send(evicted);
            }
            CoordinatorCommand::GetHistory { respond_to } => {
                let _ = respond_to.send(self.history.snapshot());
            }
            CoordinatorCommand::ClientCount { respond_to } => {
                let _ = respond_to.send(self.clients.len());
            }
            CoordinatorCommand::Shutdown => {
                info!("Coordinator shutdown requested");
                return false;
            }
        }
        true
    }

    // ========================================================================
    // Command Handlers
    // ========================================================================

    fn handle_register(&mut self, registration: Registration) -> ClientId {
        self.next_id += 1;
        let client_id = ClientId::new(self.next_id);

        let entry = ClientEntry {
            identity: registration.identity,
            outbound: registration.outbound,
            closer: registration.closer,
            last_activity: Instant::now(),
            disconnect_reason: None,
        };

        // Replay strictly before the entry can see live broadcasts, leaving
        // one queue slot for the client's own join announcement
        let room = entry.outbound.capacity().saturating_sub(1);
        let skipped = self.history.len().saturating_sub(room);
        let mut replayed = 0;
        for msg in self.history.iter().skip(skipped) {
            if entry.enqueue(client_id, msg) {
                replayed += 1;
            }
        }

        let announcement = CompleteMessage::announcement(&entry.identity, JOINED);

        info!(
            client_id = %client_id,
            identity = %entry.identity.short(),
            replayed,
            skipped,
            total_clients = self.clients.len() + 1,
            "Client registered"
        );

        self.clients.insert(client_id, entry);
        self.handle_broadcast(Arc::new(announcement));

        client_id
    }

    fn handle_unregister(
        &mut self,
        client_id: ClientId,
        outcome: ReadOutcome,
    ) -> Result<(), CoordinatorError> {
        let Some(entry) = self.clients.remove(&client_id) else {
            debug!(client_id = %client_id, "Unregister for unknown client, ignoring");
            return Err(CoordinatorError::ClientNotFound(client_id));
        };

        let reason = outcome.resolve(entry.disconnect_reason);

        info!(
            client_id = %client_id,
            identity = %entry.identity.short(),
            reason = %reason,
            total_clients = self.clients.len(),
            "Client unregistered"
        );

        let announcement = CompleteMessage::announcement(&entry.identity, &reason);
        self.handle_broadcast(Arc::new(announcement));

        Ok(())
    }

    fn handle_broadcast(&mut self, message: Arc<CompleteMessage>) {
        if let Some(evicted) = self.history.push(Arc::clone(&message)) {
            debug!(author = %evicted.author.short(), "Evicted oldest history entry");
        }

        let mut delivered = 0;
        for (client_id, entry) in &self.clients {
            if entry.enqueue(*client_id, &message) {
                delivered += 1;
            }
        }

        debug!(
            author = %message.author.short(),
            delivered,
            recipients = self.clients.len(),
            "Broadcast message"
        );
    }

    /// Tags and closes clients idle past the threshold.
    ///
    /// Entries stay registered; their actors unregister once the read loop
    /// sees the closed socket. Already-tagged clients are skipped.
    fn handle_reap_idle(&mut self, idle_threshold: Duration) -> usize {
        let now = Instant::now();
        let mut evicted = 0;

        for (client_id, entry) in self.clients.iter_mut() {
            if entry.disconnect_reason.is_some() {
                continue;
            }
            let idle = now.saturating_duration_since(entry.last_activity);
            if idle > idle_threshold {
                warn!(
                    client_id = %client_id,
                    identity = %entry.identity.short(),
                    idle_secs = idle.as_secs(),
                    "Client idle past threshold, closing connection"
                );
                entry.disconnect_reason = Some(DisconnectReason::TimedOut);
                entry.closer.close();
                evicted += 1;
            }
        }

        evicted
    }
}
