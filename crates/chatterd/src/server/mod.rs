//! TCP listener for the chat daemon.
//!
//! The server:
//! - Binds the configured address (failure is fatal to the caller)
//! - Spawns one `Connection` per accepted socket
//! - Supports graceful shutdown via CancellationToken
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   ChatServer    │
//! │   TcpListener   │
//! └───────┬─────────┘
//!         │ accept()
//!         ▼
//! ┌─────────────────┐     ┌───────────────────┐
//! │   Connection    │────▶│ CoordinatorHandle │
//! │  (per client)   │◀────│  outbound queue   │
//! └─────────────────┘     └───────────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Accept errors are logged and the loop keeps accepting

mod connection;

pub use connection::{Connection, ConnectionError, TcpCloser};

use std::net::SocketAddr;
use std::sync::Arc;

use chatter_core::ConfigError;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::coordinator::CoordinatorHandle;

/// TCP server accepting chat clients.
pub struct ChatServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    config: Arc<ServerConfig>,
    coordinator: CoordinatorHandle,
    cancel_token: CancellationToken,
}

impl ChatServer {
    /// Binds the listen address from `config`.
    ///
    /// # Errors
    ///
    /// - `ServerError::Config` if the address does not resolve
    /// - `ServerError::Bind` if the socket cannot be bound
    pub async fn bind(
        config: ServerConfig,
        coordinator: CoordinatorHandle,
        cancel_token: CancellationToken,
    ) -> Result<Self, ServerError> {
        config.validate()?;
        let addr = config.listen_addr()?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind {
                addr: config.listen.clone(),
                error: e.to_string(),
            })?;
        let local_addr = listener.local_addr().map_err(|e| ServerError::Bind {
            addr: config.listen.clone(),
            error: e.to_string(),
        })?;

        info!(addr = %local_addr, "Chat server listening");

        Ok(Self {
            listener,
            local_addr,
            config: Arc::new(config),
            coordinator,
            cancel_token,
        })
    }

    /// The address actually bound (useful with port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accepts connections until the cancellation token fires, then stops
    /// the coordinator.
    pub async fn run(self) -> Result<(), ServerError> {
        loop {
            tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    info!("Server shutdown requested");
                    break;
                }

                result = self.listener.accept() => {
                    match result {
                        Ok((stream, peer)) => {
                            info!(peer = %peer, "Accepted connection");
                            self.handle_connection(stream);
                        }
                        Err(e) => {
                            error!(error = %e, "Failed to accept connection");
                        }
                    }
                }
            }
        }

        self.coordinator.shutdown().await;
        info!("Server stopped");
        Ok(())
    }

    /// Spawns the connection actor for an accepted socket.
    fn handle_connection(&self, stream: TcpStream) {
        let coordinator = self.coordinator.clone();
        let config = Arc::clone(&self.config);

        tokio::spawn(async move {
            match Connection::accept(stream, coordinator.clone(), &config).await {
                Ok(connection) => connection.run().await,
                Err(e) => {
                    warn!(error = %e, "Failed to set up connection");
                    coordinator.report_error(e.to_string()).await;
                }
            }
        });
    }
}

/// Errors that can occur in server operations.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {error}")]
    Bind { addr: String, error: String },

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}
