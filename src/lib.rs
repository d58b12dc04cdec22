//! Relay server for shared whiteboards.
//!
//! Clients speak a newline-delimited text protocol. Each connection becomes a
//! session with its own reader and writer task; every state change funnels
//! through a single hub task, which owns the boards, the username registry
//! and the outbound queues.

pub mod board;
pub mod broadcast;
pub mod client;
pub mod codec;
pub mod config;
pub mod conn;
pub mod error;
pub mod hub;
pub mod protocol;
pub mod router;
pub mod server;
pub mod state;

pub use config::{ClientArgs, ServerArgs};
pub use error::ProtocolError;
pub use protocol::{Command, Reply, parse_command};
pub use server::Server;
pub use state::SessionId;
