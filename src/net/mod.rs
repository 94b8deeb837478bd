//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, connection limit)
//!     → connection.rs (connection ID for the span)
//!     → Hand off to HTTP layer
//!
//! Outgoing upstream connection
//!     → tls.rs (optional TLS handshake under the trust policy)
//! ```
//!
//! # Design Decisions
//! - The accept loop only takes a connection when a slot is free; the
//!   default single slot makes the proxy strictly sequential
//! - TLS is only used towards the backend; devices speak plain HTTP

pub mod connection;
pub mod listener;
pub mod tls;

pub use connection::ConnectionId;
pub use listener::{ConnectionPermit, Listener, ListenerError};
