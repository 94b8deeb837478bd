//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Build forwarder → Bind listener → Serve
//!
//! Shutdown (shutdown.rs):
//!     Ctrl+C received → Stop accepting → Exit
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - No drain phase; an in-flight exchange is bounded by its own timeouts

pub mod shutdown;

pub use shutdown::Shutdown;
