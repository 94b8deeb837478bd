//! Request handling and transformation.
//!
//! # Responsibilities
//! - Hold the buffered inbound request
//! - Forge the outbound header set (spoofed `Host`, no `User-Agent`)
//! - Compose the upstream URL from the configured target
//!
//! # Design Decisions
//! - The inbound path is used verbatim, query included
//! - Duplicate inbound headers collapse to the last value
//! - Pure: nothing here touches the network

use bytes::Bytes;
use http::header::{ACCEPT, ACCEPT_ENCODING, CONNECTION, HOST, USER_AGENT};
use http::{HeaderMap, HeaderValue, Method};

use crate::config::UpstreamConfig;

/// A fully buffered request received from the device.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub method: Method,
    /// Path and query exactly as sent on the request line.
    pub path: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// The request sent to the backend.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    /// `{scheme}://{upstream ip or target host}{path}`.
    pub url: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Headers removed before dispatch so the backend answers in a plain
/// encoding the rewriter can parse.
const NEGOTIATION_HEADERS: [http::header::HeaderName; 2] = [ACCEPT, ACCEPT_ENCODING];

/// Build the outbound request for `inbound`.
///
/// `host_header` is the target host as a header value; it is validated once
/// with the configuration.
pub fn transform(
    inbound: &InboundRequest,
    upstream: &UpstreamConfig,
    host_header: &HeaderValue,
) -> OutboundRequest {
    let mut headers = HeaderMap::with_capacity(inbound.headers.len() + 1);

    for (name, value) in inbound.headers.iter() {
        if *name == USER_AGENT || *name == HOST {
            continue;
        }
        headers.insert(name.clone(), value.clone());
    }

    headers.insert(HOST, host_header.clone());
    headers.insert(CONNECTION, HeaderValue::from_static("close"));

    for name in NEGOTIATION_HEADERS {
        headers.remove(name);
    }

    OutboundRequest {
        method: inbound.method.clone(),
        url: upstream.target_url(&inbound.path),
        headers,
        body: inbound.body.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Scheme;
    use http::header::CONTENT_TYPE;

    fn upstream(ip: Option<&str>) -> UpstreamConfig {
        UpstreamConfig {
            target_host: "api.example.com".into(),
            scheme: Scheme::Http,
            upstream_ip: ip.map(str::to_string),
        }
    }

    fn inbound(headers: &[(&str, &str)]) -> InboundRequest {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            map.append(
                http::header::HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        InboundRequest {
            method: Method::POST,
            path: "/iot-mqttManager/routeService".into(),
            headers: map,
            body: Bytes::from_static(b"{\"deviceId\":\"abc\"}"),
        }
    }

    fn host_value() -> HeaderValue {
        HeaderValue::from_static("api.example.com")
    }

    #[test]
    fn test_host_is_spoofed() {
        let out = transform(&inbound(&[("Host", "10.0.0.5")]), &upstream(None), &host_value());
        assert_eq!(out.headers.get(HOST).unwrap(), "api.example.com");
        assert_eq!(out.headers.get_all(HOST).iter().count(), 1);
    }

    #[test]
    fn test_host_added_when_missing() {
        let out = transform(&inbound(&[]), &upstream(None), &host_value());
        assert_eq!(out.headers.get(HOST).unwrap(), "api.example.com");
    }

    #[test]
    fn test_user_agent_and_negotiation_headers_dropped() {
        let out = transform(
            &inbound(&[
                ("User-Agent", "firmware/2.1"),
                ("Accept", "*/*"),
                ("Accept-Encoding", "gzip"),
                ("Content-Type", "application/json"),
            ]),
            &upstream(None),
            &host_value(),
        );

        assert!(out.headers.get(USER_AGENT).is_none());
        assert!(out.headers.get(ACCEPT).is_none());
        assert!(out.headers.get(ACCEPT_ENCODING).is_none());
        assert_eq!(out.headers.get(CONTENT_TYPE).unwrap(), "application/json");
    }

    #[test]
    fn test_connection_close_forced() {
        let out = transform(
            &inbound(&[("Connection", "keep-alive")]),
            &upstream(None),
            &host_value(),
        );
        assert_eq!(out.headers.get(CONNECTION).unwrap(), "close");
    }

    #[test]
    fn test_duplicate_headers_last_value_wins() {
        let out = transform(
            &inbound(&[("X-Token", "first"), ("X-Token", "second")]),
            &upstream(None),
            &host_value(),
        );
        let values: Vec<_> = out
            .headers
            .get_all("x-token")
            .iter()
            .map(|v| v.to_str().unwrap())
            .collect();
        assert_eq!(values, vec!["second"]);
    }

    #[test]
    fn test_url_uses_override_and_keeps_path() {
        let mut request = inbound(&[]);
        request.path = "/iot-mqttManager/routeService?sn=42".into();

        let out = transform(&request, &upstream(Some("101.37.40.179")), &host_value());
        assert_eq!(out.url, "http://101.37.40.179/iot-mqttManager/routeService?sn=42");
        assert_eq!(out.headers.get(HOST).unwrap(), "api.example.com");
        assert_eq!(out.body, request.body);
        assert_eq!(out.method, Method::POST);
    }
}
