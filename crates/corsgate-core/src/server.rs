//! Native reverse proxy
//!
//! hyper server in front of a single HTTP backend:
//! - middleware `before` runs first and may answer on its own
//! - everything else is forwarded with its method, path, query, headers and body
//! - request and response bodies are buffered up to a configured limit
//! - middleware `after` runs on every response on its way back
//! - SO_REUSEPORT and TCP_NODELAY on the listening socket

use crate::middleware::MiddlewareChain;
use crate::{Error, Method, Request, Response, Result, StatusCode};
use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::{TokioExecutor, TokioIo};
use socket2::{Domain, Protocol, Socket, Type};
use std::borrow::Cow;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

/// Headers that describe a single connection and are never forwarded
const HOP_BY_HOP: [&str; 9] = [
    "connection",
    "keep-alive",
    "proxy-connection",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP.iter().any(|h| name.eq_ignore_ascii_case(h))
}

/// Default request body limit (1 MiB)
pub const DEFAULT_MAX_REQUEST_BODY: usize = 1024 * 1024;

/// Default backend response body limit (10 MiB)
pub const DEFAULT_MAX_RESPONSE_BODY: usize = 10 * 1024 * 1024;

/// Proxy configuration
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Address to accept connections on
    pub listen: SocketAddr,
    /// Backend base URI (`http://host[:port][/prefix]`)
    pub backend: String,
    /// Largest client request body buffered before forwarding, in bytes
    pub max_request_body: usize,
    /// Largest backend response body buffered before replying, in bytes
    pub max_response_body: usize,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 3000)),
            backend: "http://127.0.0.1:8080".to_string(),
            max_request_body: DEFAULT_MAX_REQUEST_BODY,
            max_response_body: DEFAULT_MAX_RESPONSE_BODY,
        }
    }
}

impl ProxyConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listen(mut self, addr: SocketAddr) -> Self {
        self.listen = addr;
        self
    }

    pub fn backend(mut self, uri: impl Into<String>) -> Self {
        self.backend = uri.into();
        self
    }

    pub fn max_request_body(mut self, bytes: usize) -> Self {
        self.max_request_body = bytes;
        self
    }

    pub fn max_response_body(mut self, bytes: usize) -> Self {
        self.max_response_body = bytes;
        self
    }
}

/// State shared across all connections
pub struct ProxyState {
    chain: MiddlewareChain,
    backend: http::Uri,
    client: Client<HttpConnector, Full<Bytes>>,
    max_request_body: usize,
    max_response_body: usize,
}

impl ProxyState {
    pub fn new(config: &ProxyConfig, chain: MiddlewareChain) -> Result<Self> {
        let backend: http::Uri = config.backend.parse().map_err(|e| {
            Error::Config(format!("invalid backend URI '{}': {}", config.backend, e))
        })?;

        if backend.scheme_str() != Some("http") || backend.authority().is_none() {
            return Err(Error::Config(format!(
                "backend must be an absolute http:// URI, got '{}'",
                backend
            )));
        }

        Ok(Self {
            chain,
            backend,
            client: Client::builder(TokioExecutor::new()).build_http(),
            max_request_body: config.max_request_body,
            max_response_body: config.max_response_body,
        })
    }

    /// Backend URI for a proxied request
    fn backend_uri(&self, req: &Request) -> Result<http::Uri> {
        let authority = self
            .backend
            .authority()
            .ok_or_else(|| Error::Internal("backend URI lost its authority".to_string()))?;
        let prefix = self.backend.path().trim_end_matches('/');

        format!("http://{}{}{}", authority, prefix, req.path_and_query())
            .parse()
            .map_err(|e| Error::Upstream(format!("invalid upstream URI: {}", e)))
    }

    /// Serve one request: both middleware phases around the backend
    ///
    /// `after` runs on every response, including body-limit rejections and
    /// backend failures.
    pub async fn handle(&self, req: hyper::Request<Incoming>) -> hyper::Response<Full<Bytes>> {
        let (parts, body) = req.into_parts();
        let mut request = request_from_parts(&parts);

        let body_error = match read_body(body, self.max_request_body).await {
            Ok(body) => {
                request.body = body;
                None
            }
            Err(e) => Some(e),
        };

        let mut response = match self.chain.run_before(&mut request) {
            Some(res) => res,
            None => match body_error {
                Some(Error::BodyTooLarge { limit }) => {
                    debug!(method = %request.method, path = %request.path, limit, "request body too large");
                    Response::payload_too_large(limit)
                }
                Some(e) => {
                    debug!(method = %request.method, path = %request.path, error = %e, "failed to read request body");
                    Response::bad_request(&e.to_string())
                }
                None => match self.forward(&request).await {
                    Ok(res) => res,
                    Err(e) => {
                        warn!(method = %request.method, path = %request.path, error = %e, "backend request failed");
                        Response::bad_gateway()
                    }
                },
            },
        };

        self.chain.run_after(&request, &mut response);
        to_hyper_response(response)
    }

    async fn forward(&self, req: &Request) -> Result<Response> {
        let uri = self.backend_uri(req)?;
        let mut builder = hyper::Request::builder()
            .method(req.method.as_str())
            .uri(uri);

        for (name, value) in &req.headers {
            if !is_hop_by_hop(name) {
                builder = builder.header(name.as_str(), encode_header_value(value).as_ref());
            }
        }

        let outbound = builder
            .body(Full::new(req.body.clone()))
            .map_err(|e| Error::InvalidHeader(e.to_string()))?;

        let res = self
            .client
            .request(outbound)
            .await
            .map_err(|e| Error::Upstream(e.to_string()))?;

        from_hyper_response(res, self.max_response_body, req.method == Method::HEAD).await
    }
}

/// Listening proxy
pub struct ProxyServer {
    listener: TcpListener,
    state: Arc<ProxyState>,
}

impl ProxyServer {
    /// Bind the listening socket
    ///
    /// Must be called from within a Tokio runtime.
    pub fn bind(config: &ProxyConfig, chain: MiddlewareChain) -> Result<Self> {
        let state = ProxyState::new(config, chain)?;
        let socket = create_optimized_socket(&config.listen)?;
        socket.set_nonblocking(true)?;
        let listener = TcpListener::from_std(socket.into())?;

        Ok(Self {
            listener,
            state: Arc::new(state),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until the process exits
    pub async fn run(self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Serve until `shutdown` resolves
    ///
    /// Connections already accepted keep running on their own tasks.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let listen = self.local_addr()?;
        info!(listen = %listen, backend = %self.state.backend, "proxy listening");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("proxy shutting down");
                    return Ok(());
                }
                accepted = self.listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(conn) => conn,
                        Err(e) => {
                            warn!(error = %e, "accept failed");
                            continue;
                        }
                    };

                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        let service = service_fn(move |req| {
                            let state = Arc::clone(&state);
                            async move { Ok::<_, Infallible>(state.handle(req).await) }
                        });

                        if let Err(e) = http1::Builder::new()
                            .serve_connection(TokioIo::new(stream), service)
                            .await
                        {
                            debug!(peer = %peer, error = %e, "connection closed with error");
                        }
                    });
                }
            }
        }
    }
}

/// Create a TCP socket with optimizations
pub fn create_optimized_socket(addr: &SocketAddr) -> std::io::Result<Socket> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;

    // SO_REUSEADDR - allow binding to address in TIME_WAIT
    socket.set_reuse_address(true)?;

    // SO_REUSEPORT - enable kernel load balancing across processes
    #[cfg(unix)]
    socket.set_reuse_port(true)?;

    // TCP_NODELAY - disable Nagle's algorithm for lower latency
    socket.set_nodelay(true)?;

    socket.bind(&(*addr).into())?;
    socket.listen(1024)?;

    Ok(socket)
}

/// Build our Request from hyper request parts
///
/// Every method is accepted as received. Header values are decoded
/// byte-for-byte (ISO-8859-1), so non-UTF-8 values survive the round trip
/// to the backend.
pub fn request_from_parts(parts: &http::request::Parts) -> Request {
    let mut request = Request::new(parts.method.clone(), parts.uri.path());
    request.query = parts.uri.query().map(|s| s.to_string());

    for (name, value) in &parts.headers {
        request
            .headers
            .push((name.to_string(), decode_header_value(value.as_bytes())));
    }

    request
}

/// Buffer a body, failing with [`Error::BodyTooLarge`] past `limit` bytes
pub async fn read_body<B>(body: B, limit: usize) -> Result<Bytes>
where
    B: hyper::body::Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            Err(Error::BodyTooLarge { limit })
        }
        Err(e) => Err(Error::Hyper(e.to_string())),
    }
}

/// Convert a backend response to our Response type, buffering the body
///
/// `head` keeps the backend's `Content-Length`, since a HEAD reply has no
/// body to recompute it from.
pub async fn from_hyper_response(
    res: hyper::Response<Incoming>,
    limit: usize,
    head: bool,
) -> Result<Response> {
    let (parts, body) = res.into_parts();
    let mut response = Response::new(StatusCode::from(parts.status.as_u16()));
    copy_backend_headers(&parts.headers, head, &mut response);

    response.body = match read_body(body, limit).await {
        Ok(body) => body,
        Err(Error::BodyTooLarge { limit }) => {
            return Err(Error::Upstream(format!("response body exceeds {} bytes", limit)))
        }
        Err(e) => return Err(Error::Upstream(e.to_string())),
    };

    Ok(response)
}

fn copy_backend_headers(headers: &http::HeaderMap, keep_length: bool, res: &mut Response) {
    for (name, value) in headers {
        if is_hop_by_hop(name.as_str()) {
            continue;
        }
        // Framing is recomputed for the buffered body
        if name == http::header::CONTENT_LENGTH && !keep_length {
            continue;
        }
        res.headers
            .push((name.to_string(), decode_header_value(value.as_bytes())));
    }
}

/// Convert our Response to hyper Response
pub fn to_hyper_response(res: Response) -> hyper::Response<Full<Bytes>> {
    let mut builder = hyper::Response::builder().status(res.status.as_u16());

    for (name, value) in &res.headers {
        builder = builder.header(name.as_str(), encode_header_value(value).as_ref());
    }

    match builder.body(Full::new(res.body)) {
        Ok(res) => res,
        Err(e) => {
            warn!(error = %e, "invalid response, replying 500");
            let mut fallback = hyper::Response::new(Full::new(Bytes::from_static(
                b"Internal Server Error",
            )));
            *fallback.status_mut() = http::StatusCode::INTERNAL_SERVER_ERROR;
            fallback
        }
    }
}

/// Header bytes as ISO-8859-1 text
fn decode_header_value(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Inverse of [`decode_header_value`]; text outside ISO-8859-1 is sent as
/// UTF-8
fn encode_header_value(value: &str) -> Cow<'_, [u8]> {
    if value.is_ascii() || value.chars().any(|c| u32::from(c) > 0xFF) {
        return Cow::Borrowed(value.as_bytes());
    }
    Cow::Owned(value.chars().map(|c| u32::from(c) as u8).collect())
}
