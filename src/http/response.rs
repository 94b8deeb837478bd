//! Response handling and transformation.
//!
//! # Responsibilities
//! - Re-emit the backend response to the device
//! - Drop headers the proxy re-derives (`transfer-encoding`, `server`,
//!   `content-length`)
//! - Recompute `Content-Length` for the final body
//! - Build synthetic error responses
//!
//! # Design Decisions
//! - Bodies are fully buffered, so the length is always known
//! - Header names leave the socket in canonical casing; hyper's title-case
//!   writer produces the same casing as [`canonical_header_name`]

use bytes::Bytes;
use http::header::{HeaderName, CONTENT_LENGTH, CONTENT_TYPE, SERVER, TRANSFER_ENCODING};
use http::{HeaderMap, HeaderValue, Method, Response, StatusCode};
use http_body_util::Full;

/// Upstream headers never copied to the device.
const BLOCKED_HEADERS: [HeaderName; 3] = [TRANSFER_ENCODING, SERVER, CONTENT_LENGTH];

/// Header names with a fixed spelling.
const CANONICAL_NAMES: [(&str, &str); 5] = [
    ("date", "Date"),
    ("content-length", "Content-Length"),
    ("set-cookie", "Set-Cookie"),
    ("content-type", "Content-Type"),
    ("x-frame-options", "X-Frame-Options"),
];

/// Canonical spelling of a header name: the fixed table first, otherwise
/// each hyphen-separated word capitalized.
pub fn canonical_header_name(name: &str) -> String {
    let lower = name.to_ascii_lowercase();
    if let Some((_, canonical)) = CANONICAL_NAMES.iter().find(|(key, _)| *key == lower) {
        return (*canonical).to_string();
    }

    lower
        .split('-')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

/// Build the response sent to the device from the upstream status and
/// headers plus the final (possibly rewritten) body.
pub fn emit(status: StatusCode, upstream_headers: &HeaderMap, body: Bytes) -> Response<Full<Bytes>> {
    let mut headers = HeaderMap::with_capacity(upstream_headers.len() + 1);
    for (name, value) in upstream_headers.iter() {
        if BLOCKED_HEADERS.contains(name) {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }
    headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));

    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

/// A plain-text response generated by the proxy itself.
pub fn error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    let body = Bytes::from(message.to_string());
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    emit(status, &headers, body)
}

/// Answer for any method other than POST.
pub fn not_implemented(method: &Method) -> Response<Full<Bytes>> {
    error_response(
        StatusCode::NOT_IMPLEMENTED,
        &format!("Unsupported method ('{}')", method),
    )
}
