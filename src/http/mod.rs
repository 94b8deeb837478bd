//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (hyper HTTP/1.1, one request per connection)
//!     → request.rs (spoof Host, strip User-Agent, build target URL)
//!     → upstream (forward to the backend)
//!     → rewrite (route-service body substitution)
//!     → response.rs (filter headers, recompute Content-Length)
//!     → Send to device
//! ```

pub mod request;
pub mod response;
pub mod server;

use std::time::Duration;

use thiserror::Error;

use crate::upstream::BoxError;

pub use request::{InboundRequest, OutboundRequest};
pub use server::{BridgeProxy, HttpServer};

/// Failures that abort a device connection without a response.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("failed to read request body: {0}")]
    ReadBody(#[source] BoxError),

    #[error("request body not received within {}s", .0.as_secs_f64())]
    BodyTimeout(Duration),

    #[error("target host '{0}' is not a valid Host header value")]
    InvalidHost(String),
}
