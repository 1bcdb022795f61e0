//! chatter core - Shared domain types for the broadcast chat service
//!
//! This crate provides the pure, I/O-free building blocks used by the
//! daemon (chatterd):
//! - `Fragment` / `CompleteMessage` - raw reads and logical chat messages
//! - `ReassemblyBuffer` - folds fragments into messages at a fixed capacity
//! - `History` - bounded FIFO transcript replayed to new clients
//! - `ClientIdentity` - per-connection fingerprint derived from the peer address
//! - `sanitize` / `format_timestamp` - stateless wire helpers
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

pub mod error;
pub mod history;
pub mod identity;
pub mod message;
pub mod reassembly;
pub mod sanitize;
pub mod time;

// Re-exports for convenience
pub use error::{ConfigError, ConfigResult};
pub use history::{History, DEFAULT_HISTORY_CAPACITY};
pub use identity::{ClientIdentity, SERVER_IDENTITY};
pub use message::{CompleteMessage, Fragment};
pub use reassembly::{ReassemblyBuffer, DEFAULT_FRAGMENT_CAPACITY};
pub use sanitize::sanitize;
pub use time::format_timestamp;
