//! Route-service response rewriting.
//!
//! # Responsibilities
//! - Recognise the route-service endpoint (exact path match)
//! - Replace the broker address in its JSON answer with the substitute IP
//! - Fall back to the untouched bytes whenever the body is not understood
//!
//! # Design Decisions
//! - Only the first array element is considered
//! - Anything unexpected is passthrough, never an error: the proxy must not
//!   corrupt traffic it cannot parse
//! - Key order of the rewritten object is preserved (`preserve_order`)
//! - Numbers are re-emitted exactly as received (`arbitrary_precision`)

use bytes::Bytes;
use serde_json::Value;

/// The endpoint the device queries for its MQTT broker.
pub const ROUTE_SERVICE_PATH: &str = "/iot-mqttManager/routeService";

/// Field holding the broker address.
const IP_FIELD: &str = "ip";

/// Why a body was forwarded unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Passthrough {
    /// The request path is not the route-service endpoint.
    OtherPath,
    NotUtf8,
    NotJson,
    /// Top-level value is not a non-empty array.
    NotNonEmptyArray,
    /// First element is not an object with an `ip` key.
    MissingIp,
    /// The address already equals the substitute.
    AlreadySubstituted,
}

impl Passthrough {
    pub fn as_str(&self) -> &'static str {
        match self {
            Passthrough::OtherPath => "other_path",
            Passthrough::NotUtf8 => "not_utf8",
            Passthrough::NotJson => "not_json",
            Passthrough::NotNonEmptyArray => "not_non_empty_array",
            Passthrough::MissingIp => "missing_ip",
            Passthrough::AlreadySubstituted => "already_substituted",
        }
    }
}

/// Result of running a response body through the rewriter.
#[derive(Debug, Clone, PartialEq)]
pub enum Rewrite {
    Rewritten { body: Bytes, previous: Value },
    Passthrough { body: Bytes, reason: Passthrough },
}

impl Rewrite {
    /// The bytes to send to the device.
    pub fn body(&self) -> &Bytes {
        match self {
            Rewrite::Rewritten { body, .. } | Rewrite::Passthrough { body, .. } => body,
        }
    }

    pub fn into_body(self) -> Bytes {
        match self {
            Rewrite::Rewritten { body, .. } | Rewrite::Passthrough { body, .. } => body,
        }
    }

    pub fn is_rewritten(&self) -> bool {
        matches!(self, Rewrite::Rewritten { .. })
    }
}

/// Rewrite `body` if `path` is the route-service endpoint.
pub fn rewrite_response(path: &str, body: Bytes, substitute_ip: &str) -> Rewrite {
    if path != ROUTE_SERVICE_PATH {
        return Rewrite::Passthrough {
            body,
            reason: Passthrough::OtherPath,
        };
    }

    match substitute_broker(&body, substitute_ip) {
        Ok((rewritten, previous)) => Rewrite::Rewritten {
            body: Bytes::from(rewritten),
            previous,
        },
        Err(reason) => Rewrite::Passthrough { body, reason },
    }
}

/// Replace `[0].ip` in a route-service body, returning the new bytes and the
/// previous value.
fn substitute_broker(body: &[u8], substitute_ip: &str) -> Result<(Vec<u8>, Value), Passthrough> {
    let text = std::str::from_utf8(body).map_err(|_| Passthrough::NotUtf8)?;
    let mut data: Value = serde_json::from_str(text).map_err(|_| Passthrough::NotJson)?;

    let first = data
        .as_array_mut()
        .and_then(|routes| routes.first_mut())
        .ok_or(Passthrough::NotNonEmptyArray)?;
    let ip = first
        .as_object_mut()
        .and_then(|route| route.get_mut(IP_FIELD))
        .ok_or(Passthrough::MissingIp)?;

    if ip.as_str() == Some(substitute_ip) {
        return Err(Passthrough::AlreadySubstituted);
    }
    let previous = std::mem::replace(ip, Value::String(substitute_ip.to_string()));

    // Serializing a `Value` cannot fail; treat a failure like any other
    // unexpected body.
    let bytes = serde_json::to_vec(&data).map_err(|_| Passthrough::NotJson)?;
    Ok((bytes, previous))
}
