//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to backend:
//!     → timeouts.rs (enforce connect/pool/write/read deadlines)
//!     → On expiry: classified failure, answered with a 500
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every upstream stage has a deadline
//! - No retries: the device gets exactly one upstream attempt per request

pub mod timeouts;

pub use timeouts::{within, StageTimeout, UpstreamTimeouts};
