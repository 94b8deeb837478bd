//! HTTP/1.1 client for the backend.
//!
//! # Responsibilities
//! - Open a TCP connection to the target authority, wrapped in TLS for https
//! - Run a single request/response exchange with hyper's connection API
//! - Enforce the connect, pool, write, and read deadlines
//!
//! # Design Decisions
//! - The TLS connector is built once from the trust policy
//! - Header names are written in title case, as the device itself sends them
//! - The SNI name is the target host, not the override IP

use std::str::FromStr;

use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Uri};
use http_body_util::{BodyExt, Full};
use hyper::client::conn::http1::{self, SendRequest};
use hyper_util::rt::TokioIo;
use rustls::pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;

use crate::config::{ProxyConfig, Scheme};
use crate::http::request::OutboundRequest;
use crate::net::tls::{build_connector, server_name};
use crate::resilience::{within, UpstreamTimeouts};
use crate::upstream::{ForwardError, Upstream, UpstreamError, UpstreamResponse};

/// Forwards requests to the configured backend over plain HTTP or TLS.
pub struct HttpForwarder {
    tls: TlsConnector,
    /// SNI sent on TLS connections.
    server_name: Option<ServerName<'static>>,
    timeouts: UpstreamTimeouts,
}

impl HttpForwarder {
    /// Create a forwarder for the configured backend.
    pub fn new(config: &ProxyConfig) -> Result<Self, rustls::Error> {
        let policy = config.upstream.tls_policy();
        let tls = build_connector(policy)?;
        let server_name = server_name(&config.upstream.target_host);

        tracing::info!(
            target_host = %config.upstream.target_host,
            connect = %config.upstream.connect_authority(),
            scheme = %config.upstream.scheme,
            tls_policy = ?policy,
            "Upstream forwarder ready"
        );

        Ok(Self {
            tls,
            server_name,
            timeouts: UpstreamTimeouts::from(&config.timeouts),
        })
    }

    /// Establish the connection and complete the HTTP/1.1 handshake.
    async fn open(&self, scheme: Scheme, addr: &str) -> Result<SendRequest<Full<Bytes>>, UpstreamError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|source| UpstreamError::Connect {
                addr: addr.to_string(),
                source,
            })?;
        let _ = stream.set_nodelay(true);

        match scheme {
            Scheme::Http => handshake(stream).await,
            Scheme::Https => {
                let name = match &self.server_name {
                    Some(name) => name.clone(),
                    None => return Err(UpstreamError::ServerName(addr.to_string())),
                };
                let stream = self
                    .tls
                    .connect(name, stream)
                    .await
                    .map_err(|source| UpstreamError::Tls {
                        addr: addr.to_string(),
                        source,
                    })?;
                handshake(stream).await
            }
        }
    }
}

/// Run the HTTP/1.1 handshake over `io` and drive the connection in the background.
async fn handshake<T>(io: T) -> Result<SendRequest<Full<Bytes>>, UpstreamError>
where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (sender, connection) = http1::Builder::new()
        .title_case_headers(true)
        .handshake(TokioIo::new(io))
        .await?;

    tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::debug!(error = %e, "Upstream connection ended with error");
        }
    });

    Ok(sender)
}

/// Split an absolute target URL into scheme, `host:port`, and origin-form path.
fn split_target(url: &str) -> Result<(Scheme, String, Uri), UpstreamError> {
    let invalid = || UpstreamError::InvalidTarget(url.to_string());

    let uri = Uri::from_str(url).map_err(|_| invalid())?;
    let scheme = uri
        .scheme_str()
        .ok_or_else(invalid)?
        .parse::<Scheme>()
        .map_err(|_| invalid())?;
    let host = uri.host().ok_or_else(invalid)?;
    let port = uri.port_u16().unwrap_or_else(|| scheme.default_port());
    let path = uri
        .path_and_query()
        .map(|p| p.as_str())
        .unwrap_or("/");
    let path = Uri::from_str(path).map_err(|_| invalid())?;

    Ok((scheme, format!("{}:{}", host, port), path))
}

#[async_trait]
impl Upstream for HttpForwarder {
    async fn forward(&self, request: OutboundRequest) -> Result<UpstreamResponse, ForwardError> {
        let (scheme, addr, path) = split_target(&request.url)?;

        let mut sender = match within("connect", self.timeouts.connect, self.open(scheme, &addr)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(ForwardError::ConnectTimeout {
                    addr,
                    timeout: self.timeouts.connect,
                })
            }
        };

        within("pool", self.timeouts.pool, sender.ready())
            .await
            .map_err(UpstreamError::from)?
            .map_err(UpstreamError::from)?;

        let mut outbound = Request::new(Full::new(request.body));
        *outbound.method_mut() = request.method;
        *outbound.uri_mut() = path;
        *outbound.headers_mut() = request.headers;

        let response = within("response", self.timeouts.response_head(), sender.send_request(outbound))
            .await
            .map_err(UpstreamError::from)?
            .map_err(UpstreamError::from)?;

        let (parts, body) = response.into_parts();
        let body = within("read", self.timeouts.read, body.collect())
            .await
            .map_err(UpstreamError::from)?
            .map_err(UpstreamError::from)?
            .to_bytes();

        Ok(UpstreamResponse {
            status: parts.status,
            headers: parts.headers,
            body,
        })
    }
}
