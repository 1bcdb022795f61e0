//! Client interface for interacting with the Coordinator.
//!
//! The `CoordinatorHandle` is cheap to clone and shared by every connection
//! actor, the reaper, and the listener.
//!
//! # Panic-Free Guarantees
//!
//! - Channel errors are mapped to `CoordinatorError::ChannelClosed`
//! - Fire-and-forget sends ignore a stopped coordinator

use std::sync::Arc;
use std::time::Duration;

use chatter_core::CompleteMessage;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use super::commands::{
    ClientId, CoordinatorCommand, CoordinatorError, ReadOutcome, Registration,
};

/// Handle for sending events to the coordinator.
#[derive(Clone)]
pub struct CoordinatorHandle {
    sender: mpsc::Sender<CoordinatorCommand>,
    shutdown: CancellationToken,
}

impl CoordinatorHandle {
    /// Create a new coordinator handle.
    ///
    /// `shutdown` must be the token the coordinator cancels when it stops.
    pub fn new(sender: mpsc::Sender<CoordinatorCommand>, shutdown: CancellationToken) -> Self {
        Self { sender, shutdown }
    }

    /// Register a client and receive its id.
    ///
    /// By the time this returns, the history replay and the join
    /// announcement are already in the client's outbound queue.
    ///
    /// # Errors
    ///
    /// - `CoordinatorError::ChannelClosed` if the coordinator has stopped
    pub async fn register(&self, registration: Registration) -> Result<ClientId, CoordinatorError> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(CoordinatorCommand::Register {
                registration,
                respond_to: tx,
            })
            .await
            .map_err(|_| CoordinatorError::ChannelClosed)?;

        rx.await.map_err(|_| CoordinatorError::ChannelClosed)
    }

    /// Remove a client, announcing the resolved disconnect reason.
    ///
    /// # Errors
    ///
    /// - `CoordinatorError::ClientNotFound` if it was already removed
    /// - `CoordinatorError::ChannelClosed` if the coordinator has stopped
    pub async fn unregister(
        &self,
        client_id: ClientId,
        outcome: ReadOutcome,
    ) -> Result<(), CoordinatorError> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(CoordinatorCommand::Unregister {
                client_id,
                outcome,
                respond_to: tx,
            })
            .await
            .map_err(|_| CoordinatorError::ChannelClosed)?;

        rx.await.map_err(|_| CoordinatorError::ChannelClosed)?
    }

    /// Refresh a client's liveness. Fire-and-forget.
    pub async fn touch(&self, client_id: ClientId) {
        let _ = self
            .sender
            .send(CoordinatorCommand::Touch { client_id })
            .await;
    }

    /// Record and fan out a completed message.
    ///
    /// # Errors
    ///
    /// - `CoordinatorError::ChannelClosed` if the coordinator has stopped
    pub async fn broadcast(&self, message: CompleteMessage) -> Result<(), CoordinatorError> {
        self.sender
            .send(CoordinatorCommand::Broadcast {
                message: Arc::new(message),
            })
            .await
            .map_err(|_| CoordinatorError::ChannelClosed)
    }

    /// Report a diagnostic to the coordinator log. Fire-and-forget.
    pub async fn report_error(&self, error: impl Into<String>) {
        let _ = self
            .sender
            .send(CoordinatorCommand::Error {
                error: error.into(),
            })
            .await;
    }

    /// Run one idle scan, returning how many clients were closed.
    ///
    /// # Errors
    ///
    /// - `CoordinatorError::ChannelClosed` if the coordinator has stopped
    pub async fn reap_idle(&self, idle_threshold: Duration) -> Result<usize, CoordinatorError> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(CoordinatorCommand::ReapIdle {
                idle_threshold,
                respond_to: tx,
            })
            .await
            .map_err(|_| CoordinatorError::ChannelClosed)?;

        rx.await.map_err(|_| CoordinatorError::ChannelClosed)
    }

    /// Snapshot of the history, oldest first.
    ///
    /// Returns an empty vector if the coordinator has stopped.
    pub async fn history(&self) -> Vec<Arc<CompleteMessage>> {
        let (tx, rx) = oneshot::channel();

        if self
            .sender
            .send(CoordinatorCommand::GetHistory { respond_to: tx })
            .await
            .is_err()
        {
            return Vec::new();
        }

        rx.await.unwrap_or_default()
    }

    /// Number of registered clients (0 if the coordinator has stopped).
    pub async fn client_count(&self) -> usize {
        let (tx, rx) = oneshot::channel();

        if self
            .sender
            .send(CoordinatorCommand::ClientCount { respond_to: tx })
            .await
            .is_err()
        {
            return 0;
        }

        rx.await.unwrap_or(0)
    }

    /// Ask the coordinator to stop. Fire-and-forget.
    pub async fn shutdown(&self) {
        let _ = self.sender.send(CoordinatorCommand::Shutdown).await;
    }

    /// Token cancelled once the coordinator loop has exited.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }
}
