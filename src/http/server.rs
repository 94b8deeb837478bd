//! HTTP server setup and request pipeline.
//!
//! # Responsibilities
//! - Accept device connections and serve one HTTP/1.1 request on each
//! - Reject methods other than POST without contacting the backend
//! - Buffer the request body under a size limit and deadline
//! - Transform, forward, rewrite, and emit
//! - Convert every upstream failure into a 500 for the device
//! - Observability (logs, metrics, connection IDs)

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use http::{HeaderValue, Method, Request, Response, StatusCode};
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::{Body, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::{TokioIo, TokioTimer};
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tracing::Instrument;

use crate::config::ProxyConfig;
use crate::http::request::{transform, InboundRequest};
use crate::http::response::{emit, error_response, not_implemented};
use crate::http::ProxyError;
use crate::net::{ConnectionId, Listener, ListenerError};
use crate::observability::{logging, metrics};
use crate::rewrite::{rewrite_response, Rewrite};
use crate::upstream::{ForwardError, Upstream};

/// The per-request pipeline: transform, forward, rewrite, emit.
pub struct BridgeProxy {
    config: Arc<ProxyConfig>,
    upstream: Arc<dyn Upstream>,
    host_header: HeaderValue,
}

impl BridgeProxy {
    /// Create the pipeline for a validated configuration.
    pub fn new(config: Arc<ProxyConfig>, upstream: Arc<dyn Upstream>) -> Result<Self, ProxyError> {
        let host_header = HeaderValue::from_str(&config.upstream.target_host)
            .map_err(|_| ProxyError::InvalidHost(config.upstream.target_host.clone()))?;
        Ok(Self {
            config,
            upstream,
            host_header,
        })
    }

    /// Handle one device request.
    ///
    /// `Err` means the request itself could not be read; the connection is
    /// aborted without a response.
    pub async fn handle<B>(&self, request: Request<B>) -> Result<Response<Full<Bytes>>, ProxyError>
    where
        B: Body<Data = Bytes>,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let start_time = Instant::now();
        let (parts, body) = request.into_parts();
        let path = parts
            .uri
            .path_and_query()
            .map(|p| p.as_str().to_string())
            .unwrap_or_else(|| parts.uri.path().to_string());

        if parts.method != Method::POST {
            tracing::warn!(method = %parts.method, path = %path, "Unsupported method");
            metrics::record_request(StatusCode::NOT_IMPLEMENTED.as_u16(), "unsupported_method", start_time);
            return Ok(not_implemented(&parts.method));
        }

        let limit = self.config.limits.max_body_bytes;
        let deadline = self.config.timeouts.inbound_body();
        let body = match tokio::time::timeout(deadline, Limited::new(body, limit).collect()).await {
            Ok(Ok(collected)) => collected.to_bytes(),
            Ok(Err(e)) => {
                if e.downcast_ref::<http_body_util::LengthLimitError>().is_some() {
                    tracing::warn!(path = %path, limit, "Request body too large");
                    metrics::record_request(StatusCode::PAYLOAD_TOO_LARGE.as_u16(), "body_too_large", start_time);
                    return Ok(error_response(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large"));
                }
                return Err(ProxyError::ReadBody(e));
            }
            Err(_) => return Err(ProxyError::BodyTimeout(deadline)),
        };

        let inbound = InboundRequest {
            method: parts.method,
            path,
            headers: parts.headers,
            body,
        };
        let outbound = transform(&inbound, &self.config.upstream, &self.host_header);
        logging::log_forwarded_request(&outbound);

        let upstream_response = match self.upstream.forward(outbound).await {
            Ok(response) => response,
            Err(e) => return Ok(self.failure(&inbound.path, e, start_time)),
        };

        let status = upstream_response.status;
        let rewrite = rewrite_response(
            &inbound.path,
            upstream_response.body,
            &self.config.rewrite.substitute_ip,
        );
        let outcome = match &rewrite {
            Rewrite::Rewritten { previous, .. } => {
                tracing::info!(
                    path = %inbound.path,
                    previous = %previous,
                    substitute = %self.config.rewrite.substitute_ip,
                    "Rewrote broker address"
                );
                metrics::record_rewrite();
                "rewritten"
            }
            Rewrite::Passthrough { reason, .. } => {
                tracing::debug!(path = %inbound.path, reason = reason.as_str(), "Passthrough");
                "passthrough"
            }
        };

        let body = rewrite.into_body();
        let response = emit(status, &upstream_response.headers, body.clone());
        logging::log_emitted_response(response.status(), response.headers(), &body);

        tracing::info!(
            path = %inbound.path,
            status = status.as_u16(),
            outcome,
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "Request proxied"
        );
        metrics::record_request(status.as_u16(), outcome, start_time);

        Ok(response)
    }

    /// Synthetic 500 for a forwarding failure.
    fn failure(&self, path: &str, error: ForwardError, start_time: Instant) -> Response<Full<Bytes>> {
        tracing::error!(
            path = %path,
            kind = error.kind(),
            error = %error,
            "Upstream request failed"
        );
        metrics::record_upstream_error(error.kind());
        metrics::record_request(StatusCode::INTERNAL_SERVER_ERROR.as_u16(), error.kind(), start_time);

        let message = match &error {
            ForwardError::ConnectTimeout { .. } => format!("Proxy error: upstream connect timeout ({})", error),
            ForwardError::Upstream(_) => format!("Proxy error: {}", error),
        };
        error_response(StatusCode::INTERNAL_SERVER_ERROR, &message)
    }
}

/// HTTP server for the bridge.
pub struct HttpServer {
    proxy: Arc<BridgeProxy>,
    header_read_timeout: Duration,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration and upstream.
    pub fn new(config: Arc<ProxyConfig>, upstream: Arc<dyn Upstream>) -> Result<Self, ProxyError> {
        let header_read_timeout = config.timeouts.header_read();
        let proxy = Arc::new(BridgeProxy::new(config, upstream)?);
        Ok(Self {
            proxy,
            header_read_timeout,
        })
    }

    /// Run the accept loop until `shutdown` fires.
    ///
    /// Failures on one connection are logged and never stop the loop.
    pub async fn run(self, listener: Listener, mut shutdown: broadcast::Receiver<()>) -> Result<(), ListenerError> {
        let addr = listener.local_addr().map_err(ListenerError::Bind)?;
        tracing::info!(
            address = %addr,
            max_connections = listener.max_connections(),
            "HTTP server starting"
        );

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, peer, permit) = match accepted {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            tracing::warn!(error = %e, "Accept failed");
                            continue;
                        }
                    };

                    let proxy = Arc::clone(&self.proxy);
                    let header_read_timeout = self.header_read_timeout;
                    tokio::spawn(async move {
                        serve_connection(proxy, stream, peer, header_read_timeout).await;
                        drop(permit);
                    });
                }
                _ = shutdown.recv() => {
                    tracing::info!("HTTP server received shutdown signal");
                    break;
                }
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Serve exactly one request on `stream`, then close it.
async fn serve_connection(
    proxy: Arc<BridgeProxy>,
    stream: TcpStream,
    peer: SocketAddr,
    header_read_timeout: Duration,
) {
    let connection_id = ConnectionId::new();
    let span = tracing::info_span!("connection", id = %connection_id, peer = %peer);

    async move {
        let service = service_fn(move |request: Request<Incoming>| {
            let proxy = Arc::clone(&proxy);
            async move { proxy.handle(request).await }
        });

        let result = http1::Builder::new()
            .keep_alive(false)
            .title_case_headers(true)
            .auto_date_header(false)
            .timer(TokioTimer::new())
            .header_read_timeout(header_read_timeout)
            .serve_connection(TokioIo::new(stream), service)
            .await;

        if let Err(e) = result {
            tracing::warn!(error = %e, "Connection aborted");
        }
    }
    .instrument(span)
    .await
}
