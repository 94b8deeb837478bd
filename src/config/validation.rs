//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses (bind address, override IP, substitute IP)
//! - Validate value ranges (timeouts > 0, limits > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::{IpAddr, SocketAddr};

use http::HeaderValue;
use thiserror::Error;

use crate::config::schema::{is_ip_literal, ProxyConfig};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: '{value}' is not a valid socket address")]
    InvalidSocketAddr { field: &'static str, value: String },

    #[error("{field}: '{value}' is not a valid IP address")]
    InvalidIp { field: &'static str, value: String },

    #[error("upstream.target_host: '{0}' cannot be used as a Host header")]
    InvalidHost(String),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidSocketAddr {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.listener.max_concurrent_connections == 0 {
        errors.push(ValidationError::Zero("listener.max_concurrent_connections"));
    }

    let host = &config.upstream.target_host;
    if host.is_empty() || host.contains('/') || HeaderValue::from_str(host).is_err() {
        errors.push(ValidationError::InvalidHost(host.clone()));
    }

    if let Some(ip) = &config.upstream.upstream_ip {
        if !is_ip_literal(ip) {
            errors.push(ValidationError::InvalidIp {
                field: "upstream.upstream_ip",
                value: ip.clone(),
            });
        }
    }

    if config.rewrite.substitute_ip.parse::<IpAddr>().is_err() {
        errors.push(ValidationError::InvalidIp {
            field: "rewrite.substitute_ip",
            value: config.rewrite.substitute_ip.clone(),
        });
    }

    let timeouts = [
        ("timeouts.connect_secs", config.timeouts.connect_secs),
        ("timeouts.read_secs", config.timeouts.read_secs),
        ("timeouts.write_secs", config.timeouts.write_secs),
        ("timeouts.pool_secs", config.timeouts.pool_secs),
        ("timeouts.inbound_body_secs", config.timeouts.inbound_body_secs),
        ("timeouts.header_read_secs", config.timeouts.header_read_secs),
    ];
    for (field, value) in timeouts {
        if value == 0 {
            errors.push(ValidationError::Zero(field));
        }
    }

    if config.limits.max_body_bytes == 0 {
        errors.push(ValidationError::Zero("limits.max_body_bytes"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidSocketAddr {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
