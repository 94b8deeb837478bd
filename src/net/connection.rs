//! Connection identity for tracing.
//!
//! Every accepted socket gets a `ConnectionId` that is attached to the
//! connection's span, so the request, upstream, and response events of one
//! device exchange can be correlated in the logs.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Next id to hand out. Ids only label log lines, so no ordering with other
/// memory is required.
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Label for one accepted device connection, rendered as `conn-N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Take the next id from the process-wide sequence.
    pub fn new() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}
