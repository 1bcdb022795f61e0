//! chatter daemon - TCP broadcast chat server
//!
//! This crate provides the runtime pieces of the chat service:
//! - `coordinator` - single-writer actor owning the client registry and history
//! - `server` - TCP listener and per-connection actors
//! - `config` - layered server configuration
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         chatterd                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │  ┌─────────────────┐     ┌─────────────────────────────┐    │
//! │  │   ChatServer    │────▶│        Coordinator          │    │
//! │  │  (TcpListener)  │     │ (registry + history owner)  │    │
//! │  └────────┬────────┘     └──────────────┬──────────────┘    │
//! │           │                             │                   │
//! │           │ accept                      │ fan-out           │
//! │           ▼                             ▼                   │
//! │  ┌─────────────────┐     ┌─────────────────────────────┐    │
//! │  │   Connection    │◀────│  bounded outbound queues    │    │
//! │  │ (read + write)  │     │  (drop on overflow)         │    │
//! │  └─────────────────┘     └─────────────────────────────┘    │
//! │                                                             │
//! │  ┌─────────────────┐  ReapIdle                              │
//! │  │   Idle reaper   │──────────▶ Coordinator                 │
//! │  └─────────────────┘                                        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! All production code in this crate follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations return `Result` or `Option`
//! - Channel operations handle closure gracefully

pub mod config;
pub mod coordinator;
pub mod server;
