//! Preflight (`OPTIONS`) responses
//!
//! Both delivery modes carry the same headers. Immediate mode builds a
//! standalone 204 reply so the backend is never contacted; deferred mode
//! appends the headers to the backend's own response.

use super::{apply_allow_origin, TransactionContext, ALLOW_HEADERS, ALLOW_METHODS, MAX_AGE, MAX_AGE_SECS};
use crate::{Response, ResponseBuilder, StatusCode};
use corsgate_origin::MatchResult;

/// Where preflight headers are delivered
///
/// Doubles as the host capability: `Immediate` for hosts that can
/// synthesize a reply during the request phase, `Deferred` for hosts that
/// always forward to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryMode {
    /// Synthesized 204 returned from the request phase
    #[default]
    Immediate,
    /// Attached to the backend response in the response phase
    Deferred,
}

/// Builds preflight headers from the configured lists
#[derive(Debug, Clone, Copy)]
pub struct PreflightResponder<'a> {
    methods: &'a str,
    headers: &'a str,
}

impl<'a> PreflightResponder<'a> {
    pub fn new(methods: &'a str, headers: &'a str) -> Self {
        Self { methods, headers }
    }

    pub fn for_context(ctx: &'a TransactionContext) -> Self {
        Self::new(&ctx.allowed_methods, &ctx.allowed_headers)
    }

    fn preflight_headers(&self) -> [(&'static str, String); 3] {
        [
            (ALLOW_METHODS, self.methods.to_string()),
            (ALLOW_HEADERS, self.headers.to_string()),
            (MAX_AGE, MAX_AGE_SECS.to_string()),
        ]
    }

    /// Immediate mode: standalone `204 No Content`
    ///
    /// `Access-Control-Allow-Origin` and `Vary` follow `matched`; the other
    /// preflight headers are always present.
    pub fn reply(&self, matched: &MatchResult) -> Response {
        let mut res = ResponseBuilder::new(StatusCode::NO_CONTENT)
            .header("Content-Type", "text/html")
            .build();
        self.attach(&mut res);
        apply_allow_origin(&mut res, matched);
        res
    }

    /// Deferred mode: append to an existing response
    pub fn attach(&self, res: &mut Response) {
        for (name, value) in self.preflight_headers() {
            res.add_header(name, value);
        }
    }
}
