//! corsgate-origin: Origin allow-list compiler and matcher
//!
//! Single Source of Truth (SSOT) for deciding whether a request `Origin`
//! is covered by a configured allow-list. Used by corsgate-core for both
//! the request and the response phase.
//!
//! ## Entry Syntax
//! - `*` - Allow every origin (echoed back as `*`)
//! - `example.com` - Exact host, any scheme (`//example.com`)
//! - `https://example.com` - Exact scheme and host
//! - `//example.com:8080` - Any scheme, exact host and port
//! - `.example.com` - Any subdomain of `example.com`, but not the bare domain
//! - `example.com:*` - Any numeric port
//!
//! ## Matching
//! Entries compile to end-anchored regexes and are tested in configured
//! order; the first hit wins. Matching is a suffix test, so a short entry
//! such as `.com` admits every `.com` origin.
//!
//! ## Example
//! ```
//! use corsgate_origin::{resolve, AllowList, MatchResult};
//!
//! let list = AllowList::parse("localhost, .example.com");
//!
//! assert_eq!(
//!     resolve(Some("https://api.example.com"), &list),
//!     MatchResult::Matched("https://api.example.com".to_string())
//! );
//! assert_eq!(resolve(Some("https://example.com"), &list), MatchResult::NoMatch);
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod matcher;
pub mod pattern;

pub use matcher::{resolve, AllowList, MatchResult};
pub use pattern::{compile, OriginPattern};
