//! Structured logging.
//!
//! # Responsibilities
//! - Initialize logging subsystem
//! - Dump forwarded requests and emitted responses at debug level
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - `RUST_LOG` wins over the configured level when set
//! - Dumps are skipped entirely unless debug is enabled

use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::http::request::OutboundRequest;
use crate::http::response::canonical_header_name;

/// Install the global subscriber.
pub fn init(level: &str) {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("iot_bridge_proxy={}", level))),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Log the request as it is sent to the backend.
pub fn log_forwarded_request(request: &OutboundRequest) {
    if !tracing::enabled!(Level::DEBUG) {
        return;
    }
    tracing::debug!(
        method = %request.method,
        url = %request.url,
        headers = %format_headers(&request.headers),
        body = %describe_body(&request.body),
        "Forwarding request"
    );
}

/// Log the response as it is sent to the device.
pub fn log_emitted_response(status: StatusCode, headers: &HeaderMap, body: &Bytes) {
    if !tracing::enabled!(Level::DEBUG) {
        return;
    }
    tracing::debug!(
        status = status.as_u16(),
        headers = %format_headers(headers),
        body = %describe_body(body),
        "Emitting response"
    );
}

fn format_headers(headers: &HeaderMap) -> String {
    headers
        .iter()
        .map(|(name, value)| {
            format!(
                "{}: {}",
                canonical_header_name(name.as_str()),
                String::from_utf8_lossy(value.as_bytes())
            )
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Human-readable rendering of a body: pretty JSON, text, or a size summary.
pub fn describe_body(body: &[u8]) -> String {
    if body.is_empty() {
        return "<empty>".to_string();
    }
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) {
        if let Ok(pretty) = serde_json::to_string_pretty(&value) {
            return pretty;
        }
    }
    match std::str::from_utf8(body) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<{} bytes of binary data>", body.len()),
    }
}
