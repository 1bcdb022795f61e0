//! Coordinator using the Actor pattern.
//!
//! The coordinator is the single writer for all shared state: the client
//! registry and the message history. Connection actors and the reaper never
//! touch that state directly; every mutation is a command on one mpsc
//! channel, processed in arrival order.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐  CoordinatorCommand  ┌──────────────────┐
//! │ Connection actor │─────────────────────▶│   Coordinator    │
//! │  (per socket)    │   (mpsc channel)     │ registry+history │
//! └──────────────────┘                      └────────┬─────────┘
//!          ▲                                         │ try_send
//!          │ outbound queue (bounded, drop on full)  │
//!          └─────────────────────────────────────────┘
//!
//! ┌──────────────────┐  ReapIdle every tick
//! │   Idle reaper    │─────────────────────▶ Coordinator
//! └──────────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! - No `.unwrap()` or `.expect()` in production code
//! - Channel operations handle closure gracefully

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use chatter_core::ConfigError;

use crate::config::ServerConfig;

mod actor;
mod commands;
mod handle;
mod reaper;

pub use actor::{Coordinator, JOINED};
pub use commands::{
    ClientId, CoordinatorCommand, CoordinatorError, DisconnectReason, Outbound, ReadOutcome,
    Registration, SocketCloser,
};
pub use handle::CoordinatorHandle;
pub use reaper::spawn_reaper;

/// Command channel buffer size
const COMMAND_BUFFER: usize = 256;

/// Spawn the coordinator and its idle reaper, returning a handle.
///
/// # Errors
///
/// Returns `ConfigError` if the configuration is unusable.
///
/// # Example
///
/// ```no_run
/// use chatterd::config::ServerConfig;
/// use chatterd::coordinator::spawn_coordinator;
///
/// #[tokio::main]
/// async fn main() {
///     let handle = spawn_coordinator(&ServerConfig::default()).unwrap();
///     let history = handle.history().await;
///     assert!(history.is_empty());
/// }
/// ```
pub fn spawn_coordinator(config: &ServerConfig) -> Result<CoordinatorHandle, ConfigError> {
    config.validate()?;

    let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER);
    let shutdown = CancellationToken::new();

    let coordinator = Coordinator::new(cmd_rx, config.history_capacity, shutdown.clone())?;
    tokio::spawn(coordinator.run());

    let handle = CoordinatorHandle::new(cmd_tx, shutdown);

    spawn_reaper(handle.clone(), config.reap_interval(), config.idle_timeout());

    Ok(handle)
}
