//! Allow-list entry compiler
//!
//! Turns one raw allow-list entry into an [`OriginPattern`].

use regex::Regex;
use std::borrow::Cow;
use std::fmt;
use tracing::warn;

/// Replacement for a trailing `:*` (any port)
const ANY_PORT: &str = ":[0-9]+";

/// A compiled allow-list entry
#[derive(Clone)]
pub enum OriginPattern {
    /// The `*` entry, allows every origin
    Wildcard,
    /// End-anchored pattern tested against the tail of the origin
    Suffix(Regex),
}

impl OriginPattern {
    /// Pattern text (`*` for the wildcard)
    pub fn as_str(&self) -> &str {
        match self {
            OriginPattern::Wildcard => "*",
            OriginPattern::Suffix(re) => re.as_str(),
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, OriginPattern::Wildcard)
    }

    /// Test an origin against this pattern
    pub fn matches(&self, origin: &str) -> bool {
        match self {
            OriginPattern::Wildcard => true,
            OriginPattern::Suffix(re) => re.is_match(origin),
        }
    }
}

impl fmt::Debug for OriginPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OriginPattern::Wildcard => write!(f, "Wildcard"),
            OriginPattern::Suffix(re) => f.debug_tuple("Suffix").field(&re.as_str()).finish(),
        }
    }
}

impl PartialEq for OriginPattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for OriginPattern {}

/// Compile one raw allow-list entry
///
/// All whitespace is removed first, embedded whitespace included. Returns
/// `None` for an entry that is empty after that, so it contributes nothing
/// to the allow-list.
///
/// # Example
/// ```
/// use corsgate_origin::compile;
///
/// assert_eq!(compile("localhost").unwrap().as_str(), "//localhost$");
/// assert_eq!(compile(".test.com").unwrap().as_str(), r"\.test\.com$");
/// assert!(compile("   ").is_none());
/// ```
pub fn compile(raw: &str) -> Option<OriginPattern> {
    let entry: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if entry.is_empty() {
        return None;
    }
    if entry == "*" {
        return Some(OriginPattern::Wildcard);
    }

    let source = pattern_source(&entry);
    match Regex::new(&source) {
        Ok(re) => Some(OriginPattern::Suffix(re)),
        Err(e) => {
            warn!(entry = %entry, error = %e, "dropping origin pattern that failed to compile");
            None
        }
    }
}

/// Build the regex text for an already whitespace-free entry
fn pattern_source(entry: &str) -> String {
    let entry = if has_scheme(entry) || entry.starts_with("//") || entry.starts_with('.') {
        Cow::Borrowed(entry)
    } else {
        // Bare domain: any scheme
        Cow::Owned(format!("//{}", entry))
    };

    // Escapes `.` and `-` along with every other metacharacter
    let mut source = regex::escape(&entry);

    // Checked on the escaped text so the literal colon survives
    if let Some(head) = source.strip_suffix(r":\*") {
        source = format!("{}{}", head, ANY_PORT);
    }

    source.push('$');
    source
}

/// `^[A-Za-z]+://`
fn has_scheme(entry: &str) -> bool {
    match entry.find("://") {
        Some(idx) => idx > 0 && entry[..idx].chars().all(|c| c.is_ascii_alphabetic()),
        None => false,
    }
}
