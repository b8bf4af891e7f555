//! Origin matcher
//!
//! Evaluates a request `Origin` against an ordered [`AllowList`].

use crate::pattern::{compile, OriginPattern};

/// Outcome of matching an origin
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchResult {
    /// The allow-list contains `*`; respond with `*`
    Wildcard,
    /// An entry matched; respond with the request origin, unmodified
    Matched(String),
    /// Nothing matched; emit no CORS headers
    NoMatch,
}

impl MatchResult {
    /// Value for `Access-Control-Allow-Origin`, if any
    pub fn allow_origin(&self) -> Option<&str> {
        match self {
            MatchResult::Wildcard => Some("*"),
            MatchResult::Matched(origin) => Some(origin.as_str()),
            MatchResult::NoMatch => None,
        }
    }

    pub fn is_allowed(&self) -> bool {
        !matches!(self, MatchResult::NoMatch)
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, MatchResult::Wildcard)
    }
}

/// Ordered, compiled allow-list
///
/// Entry order is evaluation order. Empty entries are dropped while
/// parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    patterns: Vec<OriginPattern>,
}

impl AllowList {
    /// Create an empty allow-list (matches nothing)
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a comma-delimited allow-list
    ///
    /// # Example
    /// ```
    /// use corsgate_origin::AllowList;
    ///
    /// let list = AllowList::parse("localhost, , .test.com");
    /// assert_eq!(list.len(), 2);
    /// assert!(!list.is_wildcard());
    /// ```
    pub fn parse(raw: &str) -> Self {
        Self::from_entries(raw.split(','))
    }

    /// Compile individual entries, keeping their order
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            patterns: entries
                .into_iter()
                .filter_map(|entry| compile(entry.as_ref()))
                .collect(),
        }
    }

    /// Check whether the list contains the `*` entry
    pub fn is_wildcard(&self) -> bool {
        self.patterns.iter().any(OriginPattern::is_wildcard)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, OriginPattern> {
        self.patterns.iter()
    }
}

impl From<&str> for AllowList {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl<'a> IntoIterator for &'a AllowList {
    type Item = &'a OriginPattern;
    type IntoIter = std::slice::Iter<'a, OriginPattern>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Resolve an origin against an allow-list
///
/// A `*` entry wins regardless of its position. Otherwise entries are tried
/// in order and the first match echoes the origin back.
///
/// # Example
/// ```
/// use corsgate_origin::{resolve, AllowList, MatchResult};
///
/// let list = AllowList::parse("localhost, *");
/// assert_eq!(resolve(Some("https://test.com"), &list), MatchResult::Wildcard);
/// assert_eq!(resolve(None, &list), MatchResult::NoMatch);
/// ```
pub fn resolve(origin: Option<&str>, allowed: &AllowList) -> MatchResult {
    let origin = match origin {
        Some(origin) => origin,
        None => return MatchResult::NoMatch,
    };

    if allowed.is_wildcard() {
        return MatchResult::Wildcard;
    }

    if allowed.iter().any(|pattern| pattern.matches(origin)) {
        return MatchResult::Matched(origin.to_string());
    }

    MatchResult::NoMatch
}
