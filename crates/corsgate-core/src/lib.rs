//! corsgate-core: CORS policy enforcement for an HTTP reverse proxy
//!
//! Decides, per transaction, whether a cross-origin request may proceed
//! and which CORS headers to emit. Preflight `OPTIONS` requests are
//! answered directly when the host can synthesize a reply.
//!
//! ## Features
//! - `native` - Reverse proxy with tokio/hyper
//! - `cli` - The `corsgate` binary
//!
//! ## Example
//! ```
//! use corsgate_core::{Cors, CorsConfig, Method, MiddlewareChain, RequestBuilder, Response, StatusCode};
//!
//! let chain = MiddlewareChain::new().with(Cors::new(
//!     CorsConfig::new()
//!         .allow_methods("GET, POST")
//!         .allow_origins("example.com, .example.com")
//!         .allow_headers("Content-Type"),
//! ));
//!
//! let mut req = RequestBuilder::new(Method::OPTIONS, "/api")
//!     .header("Origin", "https://app.example.com")
//!     .build();
//!
//! let res = chain.handle(&mut req, |_| unreachable!("preflight is answered locally"));
//! assert_eq!(res.status, StatusCode::NO_CONTENT);
//! assert_eq!(res.header("access-control-allow-origin"), Some("https://app.example.com"));
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod cors;
pub mod error;
pub mod middleware;
pub mod request;
pub mod response;

#[cfg(feature = "native")]
pub mod server;

// Re-exports
pub use error::{Error, Result};
pub use request::{Method, Request, RequestBuilder};
pub use response::{Response, ResponseBuilder, StatusCode};

pub use cors::{CorsConfig, CorsPolicy, DeliveryMode, PreflightResponder, RequestPhase, TransactionContext};
pub use corsgate_origin::{compile, resolve, AllowList, MatchResult, OriginPattern};

// Middleware re-exports
pub use middleware::{Cors, Middleware, MiddlewareChain};

#[cfg(feature = "native")]
pub use server::{
    create_optimized_socket, from_hyper_response, read_body, request_from_parts, to_hyper_response,
};

#[cfg(feature = "native")]
pub use server::{ProxyConfig, ProxyServer, ProxyState};
