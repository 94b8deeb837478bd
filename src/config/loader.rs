//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::{ProxyConfig, Scheme};
use crate::config::validation::{validate_config, ValidationError};

/// Environment variables consulted at startup, in the order they are applied.
///
/// `TARGET_HOST` is the address connected to, not the `Host` header value;
/// the spoofed domain comes from `TARGET_DOMAIN`.
pub const ENV_TARGET_DOMAIN: &str = "TARGET_DOMAIN";
pub const ENV_TARGET_HOST: &str = "TARGET_HOST";
pub const ENV_TARGET_SCHEME: &str = "TARGET_SCHEME";
pub const ENV_SUPERVISOR_IP: &str = "SUPERVISOR_IP";
pub const ENV_LISTEN_ADDRESS: &str = "LISTEN_ADDRESS";
pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {var}: {reason}")]
    Env { var: &'static str, reason: String },

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Read a TOML configuration file, or the built-in defaults when no path is given.
///
/// The result is not validated yet; overrides are expected to be applied first.
pub fn read_config(path: Option<&Path>) -> Result<ProxyConfig, ConfigError> {
    let Some(path) = path else {
        return Ok(ProxyConfig::default());
    };

    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(toml::from_str(&content)?)
}

/// Apply environment overrides using `lookup` to resolve variables.
///
/// An empty `TARGET_HOST` clears the connect override so the target domain is
/// resolved normally.
pub fn apply_env_overrides<F>(config: &mut ProxyConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(domain) = lookup(ENV_TARGET_DOMAIN) {
        config.upstream.target_host = domain;
    }
    if let Some(ip) = lookup(ENV_TARGET_HOST) {
        config.upstream.upstream_ip = if ip.trim().is_empty() { None } else { Some(ip) };
    }
    if let Some(scheme) = lookup(ENV_TARGET_SCHEME) {
        config.upstream.scheme = scheme.parse::<Scheme>().map_err(|reason| ConfigError::Env {
            var: ENV_TARGET_SCHEME,
            reason,
        })?;
    }
    if let Some(ip) = lookup(ENV_SUPERVISOR_IP) {
        config.rewrite.substitute_ip = ip;
    }
    if let Some(addr) = lookup(ENV_LISTEN_ADDRESS) {
        config.listener.bind_address = addr;
    }
    if let Some(level) = lookup(ENV_LOG_LEVEL) {
        config.observability.log_level = level;
    }
    Ok(())
}

/// Validate a fully overridden configuration, making it final.
pub fn finalize(config: ProxyConfig) -> Result<ProxyConfig, ConfigError> {
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}
