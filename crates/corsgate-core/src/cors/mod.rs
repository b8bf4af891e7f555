//! CORS policy enforcement
//!
//! Two phases per transaction:
//! - request phase captures the `Origin` and configuration into a
//!   [`TransactionContext`], answering preflights directly when the host
//!   can synthesize a reply
//! - response phase resolves the origin and writes the CORS headers onto
//!   whatever the backend returned

pub mod config;
pub mod context;
pub mod policy;
pub mod preflight;

pub use config::CorsConfig;
pub use context::TransactionContext;
pub use policy::{CorsPolicy, RequestPhase};
pub use preflight::{DeliveryMode, PreflightResponder};

use crate::{Method, Response};
use corsgate_origin::MatchResult;

pub const ALLOW_ORIGIN: &str = "Access-Control-Allow-Origin";
pub const ALLOW_METHODS: &str = "Access-Control-Allow-Methods";
pub const ALLOW_HEADERS: &str = "Access-Control-Allow-Headers";
pub const MAX_AGE: &str = "Access-Control-Max-Age";
pub const VARY: &str = "Vary";

/// `Vary` value for per-origin responses
pub const VARY_ORIGIN: &str = "Accept-Encoding,Origin";

/// Preflight cache lifetime, seconds
pub const MAX_AGE_SECS: u32 = 600;

/// Only the exact token `OPTIONS` marks a preflight; method names are
/// case-sensitive.
pub(crate) fn is_preflight(method: &Method) -> bool {
    *method == Method::OPTIONS
}

/// Write `Access-Control-Allow-Origin` (and `Vary` for echoed origins)
///
/// Returns `false` and leaves the response untouched on `NoMatch`.
pub(crate) fn apply_allow_origin(res: &mut Response, matched: &MatchResult) -> bool {
    let value = match matched.allow_origin() {
        Some(value) => value,
        None => return false,
    };

    res.set_header(ALLOW_ORIGIN, value);
    // Wildcard responses are origin-independent and cacheable as-is
    if !matched.is_wildcard() {
        res.add_header(VARY, VARY_ORIGIN);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_preflight() {
        assert!(is_preflight(&Method::OPTIONS));
        assert!(!is_preflight(&"options".parse().unwrap()));
        assert!(!is_preflight(&Method::GET));
    }

    #[test]
    fn test_apply_wildcard() {
        let mut res = Response::ok();
        assert!(apply_allow_origin(&mut res, &MatchResult::Wildcard));
        assert_eq!(res.header(ALLOW_ORIGIN), Some("*"));
        assert_eq!(res.header(VARY), None);
    }

    #[test]
    fn test_apply_matched() {
        let mut res = Response::ok();
        let matched = MatchResult::Matched("http://test.com".to_string());
        assert!(apply_allow_origin(&mut res, &matched));
        assert_eq!(res.header(ALLOW_ORIGIN), Some("http://test.com"));
        assert_eq!(res.header(VARY), Some(VARY_ORIGIN));
    }

    #[test]
    fn test_apply_no_match() {
        let mut res = Response::ok();
        assert!(!apply_allow_origin(&mut res, &MatchResult::NoMatch));
        assert!(res.headers.is_empty());
    }
}
