//! Timeout enforcement.
//!
//! # Responsibilities
//! - Hold the upstream timeout budget (connect, pool, write, read)
//! - Wrap each upstream stage with its deadline
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Connect timeout errors are distinct from other errors
//! - hyper writes the request and reads the response head in one future, so
//!   that stage gets the write and read budgets combined

use std::future::Future;
use std::time::Duration;

use crate::config::schema::TimeoutConfig;

/// Per-stage deadlines for a single upstream exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpstreamTimeouts {
    /// TCP connect plus TLS and HTTP handshakes.
    pub connect: Duration,
    /// Waiting for the connection to accept the request.
    pub pool: Duration,
    /// Writing the request.
    pub write: Duration,
    /// Reading the response.
    pub read: Duration,
}

impl UpstreamTimeouts {
    /// Deadline for sending the request and receiving the response head.
    pub fn response_head(&self) -> Duration {
        self.write + self.read
    }
}

impl From<&TimeoutConfig> for UpstreamTimeouts {
    fn from(config: &TimeoutConfig) -> Self {
        Self {
            connect: Duration::from_secs(config.connect_secs),
            pool: Duration::from_secs(config.pool_secs),
            write: Duration::from_secs(config.write_secs),
            read: Duration::from_secs(config.read_secs),
        }
    }
}

/// A deadline that elapsed during `stage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageTimeout {
    pub stage: &'static str,
    pub after: Duration,
}

/// Run `future` under `limit`, tagging an expiry with the stage name.
pub async fn within<F, T>(stage: &'static str, limit: Duration, future: F) -> Result<T, StageTimeout>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(limit, future)
        .await
        .map_err(|_| StageTimeout { stage, after: limit })
}
