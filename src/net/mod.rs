//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, one task per connection)
//!     → connection.rs (id, live-count guard)
//!     → Hand off to proxy::ConnectionHandler
//! ```
//!
//! # Design Decisions
//! - No connection limit: every accepted socket gets a task
//! - Each connection tracked so shutdown can wait for in-flight work

pub mod connection;
pub mod listener;

pub use connection::{ConnectionId, ConnectionState, ConnectionTracker};
pub use listener::{Listener, ListenerError};
