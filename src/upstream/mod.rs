//! Upstream forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! OutboundRequest
//!     → client.rs (connect, optional TLS, HTTP/1.1 exchange under timeouts)
//!     → UpstreamResponse (status, headers, fully buffered body)
//!     or ForwardError (ConnectTimeout | Upstream)
//! ```
//!
//! # Design Decisions
//! - One fresh connection per request, closed afterwards; nothing is pooled
//! - Redirects are returned as ordinary responses, never followed
//! - No retries

pub mod client;

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use thiserror::Error;

use crate::http::request::OutboundRequest;
use crate::resilience::StageTimeout;

pub use client::HttpForwarder;

/// Boxed error used for failures whose concrete type does not matter.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A fully buffered backend response.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Classified forwarding failure.
#[derive(Debug, Error)]
pub enum ForwardError {
    /// The connection could not be established within the connect budget.
    #[error("connection to {addr} timed out after {}s", .timeout.as_secs_f64())]
    ConnectTimeout { addr: String, timeout: Duration },

    /// Any other network or protocol failure.
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

impl ForwardError {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ForwardError::ConnectTimeout { .. } => "connect_timeout",
            ForwardError::Upstream(_) => "upstream_error",
        }
    }
}

/// Network or protocol failure talking to the backend.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("invalid upstream target '{0}'")]
    InvalidTarget(String),

    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("TLS handshake with {addr} failed: {source}")]
    Tls {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TLS server name '{0}'")]
    ServerName(String),

    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    #[error("could not build upstream request: {0}")]
    Request(#[from] http::Error),

    #[error("upstream {} timed out after {}s", .0.stage, .0.after.as_secs_f64())]
    Timeout(StageTimeout),
}

impl From<StageTimeout> for UpstreamError {
    fn from(timeout: StageTimeout) -> Self {
        UpstreamError::Timeout(timeout)
    }
}

/// Sends one outbound request to the backend.
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn forward(&self, request: OutboundRequest) -> Result<UpstreamResponse, ForwardError>;
}
