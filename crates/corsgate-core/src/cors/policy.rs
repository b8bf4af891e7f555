//! Two-phase CORS decision
//!
//! [`CorsPolicy::on_request`] runs before the backend is contacted and
//! [`CorsPolicy::on_response`] after it answers. The host carries the
//! returned [`TransactionContext`] between the two calls.

use super::{
    apply_allow_origin, is_preflight, CorsConfig, DeliveryMode, PreflightResponder,
    TransactionContext,
};
use crate::{Request, Response};
use corsgate_origin::resolve;
use tracing::debug;

/// Outcome of the request phase
#[derive(Debug)]
pub enum RequestPhase {
    /// No `Origin`; the transaction is not subject to CORS
    Skip,
    /// Forward to the backend, then call `on_response` with this context
    Proceed(TransactionContext),
    /// Preflight answered; send this and finish the transaction
    Reply(Response),
}

/// CORS policy shared by every transaction
#[derive(Debug, Clone, Default)]
pub struct CorsPolicy {
    config: CorsConfig,
}

impl CorsPolicy {
    pub fn new(config: CorsConfig) -> Self {
        Self { config }
    }

    /// Request phase
    ///
    /// `delivery` is the host capability: with `Immediate`, an `OPTIONS`
    /// request is answered here and never reaches the backend.
    pub fn on_request(&self, req: &Request, delivery: DeliveryMode) -> RequestPhase {
        let origin = match req.origin() {
            Some(origin) => origin,
            None => {
                debug!(method = %req.method, path = %req.path, "no Origin header, skipping CORS");
                return RequestPhase::Skip;
            }
        };

        let ctx = TransactionContext::capture(origin, req.method.clone(), &self.config, delivery);

        if is_preflight(&ctx.method) && delivery == DeliveryMode::Immediate {
            let matched = resolve(Some(&ctx.origin), &ctx.allowed_origins);
            debug!(
                origin = %ctx.origin,
                allowed = matched.is_allowed(),
                "CORS preflight answered without backend"
            );
            return RequestPhase::Reply(PreflightResponder::for_context(&ctx).reply(&matched));
        }

        RequestPhase::Proceed(ctx)
    }

    /// Response phase
    ///
    /// No-op without a context. A non-matching origin gets no CORS
    /// headers at all; the browser then rejects the response.
    pub fn on_response(&self, ctx: Option<&TransactionContext>, res: &mut Response) {
        let ctx = match ctx {
            Some(ctx) => ctx,
            None => return,
        };

        let matched = resolve(Some(&ctx.origin), &ctx.allowed_origins);
        if !matched.is_allowed() {
            debug!(origin = %ctx.origin, "CORS origin not allowed");
            return;
        }

        if is_preflight(&ctx.method) && ctx.delivery == DeliveryMode::Deferred {
            PreflightResponder::for_context(ctx).attach(res);
        }

        apply_allow_origin(res, &matched);
        debug!(origin = %ctx.origin, wildcard = matched.is_wildcard(), "CORS origin allowed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cors::{ALLOW_HEADERS, ALLOW_METHODS, ALLOW_ORIGIN, MAX_AGE, VARY, VARY_ORIGIN};
    use crate::{Method, RequestBuilder, StatusCode};

    fn policy(origins: &str) -> CorsPolicy {
        CorsPolicy::new(
            CorsConfig::new()
                .allow_methods("GET, POST, OPTIONS")
                .allow_origins(origins)
                .allow_headers("Content-Type"),
        )
    }

    fn request(method: Method, origin: Option<&str>) -> Request {
        let mut builder = RequestBuilder::new(method, "/api");
        if let Some(origin) = origin {
            builder = builder.header("Origin", origin);
        }
        builder.build()
    }

    fn run(policy: &CorsPolicy, req: &Request, delivery: DeliveryMode) -> Response {
        match policy.on_request(req, delivery) {
            RequestPhase::Reply(res) => res,
            RequestPhase::Proceed(ctx) => {
                let mut res = Response::ok();
                policy.on_response(Some(&ctx), &mut res);
                res
            }
            RequestPhase::Skip => {
                let mut res = Response::ok();
                policy.on_response(None, &mut res);
                res
            }
        }
    }

    #[test]
    fn test_missing_origin_skips() {
        let policy = policy("*");
        assert!(matches!(
            policy.on_request(&request(Method::GET, None), DeliveryMode::Immediate),
            RequestPhase::Skip
        ));
        assert!(matches!(
            policy.on_request(&request(Method::OPTIONS, Some("")), DeliveryMode::Immediate),
            RequestPhase::Skip
        ));
    }

    #[test]
    fn test_context_captures_configuration() {
        let policy = policy("example.com");
        let req = request(Method::POST, Some("http://example.com"));

        match policy.on_request(&req, DeliveryMode::Immediate) {
            RequestPhase::Proceed(ctx) => {
                assert_eq!(ctx.origin, "http://example.com");
                assert_eq!(ctx.method, Method::POST);
                assert_eq!(ctx.allowed_methods, "GET, POST, OPTIONS");
                assert_eq!(ctx.allowed_headers, "Content-Type");
                assert_eq!(ctx.allowed_origins.len(), 1);
                assert_eq!(ctx.delivery, DeliveryMode::Immediate);
            }
            other => panic!("expected Proceed, got {:?}", other),
        }
    }

    #[test]
    fn test_disallowed_origin_gets_no_headers() {
        let res = run(
            &policy("example.com"),
            &request(Method::GET, Some("http://evil.com")),
            DeliveryMode::Immediate,
        );
        assert_eq!(res.header(ALLOW_ORIGIN), None);
        assert_eq!(res.header(VARY), None);
        assert_eq!(res.status, StatusCode::OK);
    }

    #[test]
    fn test_matched_origin_is_echoed_with_vary() {
        let res = run(
            &policy("example.com"),
            &request(Method::GET, Some("http://example.com")),
            DeliveryMode::Immediate,
        );
        assert_eq!(res.header(ALLOW_ORIGIN), Some("http://example.com"));
        assert_eq!(res.header(VARY), Some(VARY_ORIGIN));
        assert_eq!(res.header(ALLOW_METHODS), None);
    }

    #[test]
    fn test_wildcard_origin_omits_vary() {
        let res = run(
            &policy("localhost, *"),
            &request(Method::GET, Some("https://test.com")),
            DeliveryMode::Immediate,
        );
        assert_eq!(res.header(ALLOW_ORIGIN), Some("*"));
        assert_eq!(res.header(VARY), None);
    }

    #[test]
    fn test_immediate_preflight_replies() {
        let policy = policy("example.com");
        let req = request(Method::OPTIONS, Some("http://example.com"));

        let res = match policy.on_request(&req, DeliveryMode::Immediate) {
            RequestPhase::Reply(res) => res,
            other => panic!("expected Reply, got {:?}", other),
        };

        assert_eq!(res.status, StatusCode::NO_CONTENT);
        assert_eq!(res.content_type(), Some("text/html"));
        assert_eq!(res.header(ALLOW_ORIGIN), Some("http://example.com"));
        assert_eq!(res.header(VARY), Some(VARY_ORIGIN));
        assert_eq!(res.header(ALLOW_METHODS), Some("GET, POST, OPTIONS"));
        assert_eq!(res.header(ALLOW_HEADERS), Some("Content-Type"));
        assert_eq!(res.header(MAX_AGE), Some("600"));
    }

    #[test]
    fn test_deferred_preflight_proceeds_then_attaches() {
        let policy = policy("example.com");
        let req = request(Method::OPTIONS, Some("http://example.com"));

        let ctx = match policy.on_request(&req, DeliveryMode::Deferred) {
            RequestPhase::Proceed(ctx) => ctx,
            other => panic!("expected Proceed, got {:?}", other),
        };

        let mut res = Response::ok();
        policy.on_response(Some(&ctx), &mut res);

        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.header(ALLOW_METHODS), Some("GET, POST, OPTIONS"));
        assert_eq!(res.header(ALLOW_HEADERS), Some("Content-Type"));
        assert_eq!(res.header(MAX_AGE), Some("600"));
        assert_eq!(res.header(ALLOW_ORIGIN), Some("http://example.com"));
        assert_eq!(res.header(VARY), Some(VARY_ORIGIN));
    }

    #[test]
    fn test_deferred_preflight_disallowed_origin() {
        let res = run(
            &policy("example.com"),
            &request(Method::OPTIONS, Some("http://evil.com")),
            DeliveryMode::Deferred,
        );
        assert!(res.headers.is_empty());
    }

    #[test]
    fn test_lowercase_options_is_not_preflight() {
        let policy = policy("example.com");
        let req = request("options".parse().unwrap(), Some("http://example.com"));

        let ctx = match policy.on_request(&req, DeliveryMode::Immediate) {
            RequestPhase::Proceed(ctx) => ctx,
            other => panic!("expected Proceed, got {:?}", other),
        };
        assert_eq!(ctx.method.as_str(), "options");

        let mut res = Response::ok();
        policy.on_response(Some(&ctx), &mut res);
        assert_eq!(res.header(ALLOW_ORIGIN), Some("http://example.com"));
        assert_eq!(res.header(ALLOW_METHODS), None);
        assert_eq!(res.header(MAX_AGE), None);
    }

    #[test]
    fn test_extension_method_gets_cors_headers() {
        let res = run(
            &policy("example.com"),
            &request("PROPFIND".parse().unwrap(), Some("http://example.com")),
            DeliveryMode::Immediate,
        );
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.header(ALLOW_ORIGIN), Some("http://example.com"));
        assert_eq!(res.header(ALLOW_METHODS), None);
    }

    #[test]
    fn test_missing_context_is_noop() {
        let mut res = Response::ok();
        policy("*").on_response(None, &mut res);
        assert!(res.headers.is_empty());
    }

    #[test]
    fn test_allow_origin_replaces_backend_value() {
        let policy = policy("example.com");
        let req = request(Method::GET, Some("http://example.com"));
        let ctx = match policy.on_request(&req, DeliveryMode::Immediate) {
            RequestPhase::Proceed(ctx) => ctx,
            other => panic!("expected Proceed, got {:?}", other),
        };

        let mut res = Response::ok();
        res.add_header(ALLOW_ORIGIN, "*");
        policy.on_response(Some(&ctx), &mut res);

        assert_eq!(res.header_all(ALLOW_ORIGIN), vec!["http://example.com"]);
    }
}
