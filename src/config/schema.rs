//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the bridge.
//! All types derive Serde traits for deserialization from config files.

use std::borrow::Cow;
use std::fmt;
use std::net::{IpAddr, Ipv6Addr};
use std::time::Duration;

use http::uri::Authority;
use serde::{Deserialize, Serialize};

/// Root configuration for the bridge proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, concurrency).
    pub listener: ListenerConfig,

    /// Real backend the device believes it is talking to.
    pub upstream: UpstreamConfig,

    /// Response rewrite settings.
    pub rewrite: RewriteConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Inbound request limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:80").
    pub bind_address: String,

    /// Connections served at once. `1` keeps the listener strictly sequential.
    pub max_concurrent_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:80".to_string(),
            max_concurrent_connections: 1,
        }
    }
}

/// URL scheme used towards the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    #[default]
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            Scheme::Http => 80,
            Scheme::Https => 443,
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Scheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Ok(Scheme::Http),
            "https" => Ok(Scheme::Https),
            other => Err(format!("unsupported scheme '{}'", other)),
        }
    }
}

/// Certificate trust applied to TLS connections towards the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsPolicy {
    /// Verify the certificate chain and hostname against the web PKI roots.
    Verify,
    /// Accept any certificate. Used whenever the connection targets a raw IP,
    /// since certificate hostnames never match one.
    AcceptInvalid,
}

/// Backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Official backend domain. Always sent as the outbound `Host` header.
    pub target_host: String,

    /// Scheme used to reach the backend.
    pub scheme: Scheme,

    /// Address to connect to instead of resolving `target_host`
    /// (an IP, optionally with a port).
    pub upstream_ip: Option<String>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            target_host: "api.fotile.com".to_string(),
            scheme: Scheme::Http,
            upstream_ip: Some("101.37.40.179".to_string()),
        }
    }
}

impl UpstreamConfig {
    /// Authority used for the TCP connection: the override IP if configured,
    /// else the target host. A bare IPv6 address is bracketed.
    pub fn connect_authority(&self) -> Cow<'_, str> {
        let raw = self.upstream_ip.as_deref().unwrap_or(&self.target_host);
        if raw.parse::<Ipv6Addr>().is_ok() {
            Cow::Owned(format!("[{}]", raw))
        } else {
            Cow::Borrowed(raw)
        }
    }

    /// Absolute URL for an inbound path, used verbatim.
    pub fn target_url(&self, path: &str) -> String {
        format!("{}://{}{}", self.scheme, self.connect_authority(), path)
    }

    /// Trust policy for upstream TLS.
    pub fn tls_policy(&self) -> TlsPolicy {
        if self.upstream_ip.is_some()
            || (self.scheme == Scheme::Https && is_ip_literal(&self.target_host))
        {
            TlsPolicy::AcceptInvalid
        } else {
            TlsPolicy::Verify
        }
    }
}

/// True when the host part of `authority` is a bare IPv4/IPv6 address.
pub fn is_ip_literal(authority: &str) -> bool {
    if authority.parse::<IpAddr>().is_ok() {
        return true;
    }
    match authority.parse::<Authority>() {
        Ok(parsed) => parsed
            .host()
            .trim_start_matches('[')
            .trim_end_matches(']')
            .parse::<IpAddr>()
            .is_ok(),
        Err(_) => false,
    }
}

/// Response rewrite configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RewriteConfig {
    /// Address injected into the route-service response so the device
    /// connects to the local broker.
    pub substitute_ip: String,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            substitute_ip: "127.0.0.1".to_string(),
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream connection establishment (TCP + TLS) in seconds.
    pub connect_secs: u64,

    /// Upstream response read in seconds.
    pub read_secs: u64,

    /// Upstream request write in seconds.
    pub write_secs: u64,

    /// Wait for the upstream connection to accept a request, in seconds.
    pub pool_secs: u64,

    /// Time allowed for a device to deliver its request body, in seconds.
    pub inbound_body_secs: u64,

    /// Time allowed for a device to deliver its request head, in seconds.
    pub header_read_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            read_secs: 15,
            write_secs: 10,
            pool_secs: 5,
            inbound_body_secs: 15,
            header_read_secs: 10,
        }
    }
}

impl TimeoutConfig {
    pub fn inbound_body(&self) -> Duration {
        Duration::from_secs(self.inbound_body_secs)
    }

    pub fn header_read(&self) -> Duration {
        Duration::from_secs(self.header_read_secs)
    }
}

/// Inbound request limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
