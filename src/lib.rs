//! IoT bridge proxy library.
//!
//! Sits between a device and its vendor backend, forwards every POST
//! unchanged (apart from a spoofed `Host`), and rewrites the broker address
//! in the route-service answer so the device connects to a local broker.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod resilience;
pub mod rewrite;
pub mod upstream;

pub use config::schema::ProxyConfig;
pub use crate::http::{BridgeProxy, HttpServer};
pub use lifecycle::Shutdown;
pub use upstream::{HttpForwarder, Upstream};
