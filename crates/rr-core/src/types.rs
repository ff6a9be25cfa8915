//! Request and result types used by the matcher.

use crate::classify::RuleKind;
use crate::path::{split_path_query, strip_fragment};

// =============================================================================
// Request Context
// =============================================================================

/// The parts of an incoming request the matcher looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestContext<'a> {
    /// Request path, exactly as received (not normalized)
    pub path: &'a str,
    /// Raw query string without the leading `?`
    pub query: &'a str,
}

impl<'a> RequestContext<'a> {
    pub fn new(path: &'a str, query: &'a str) -> Self {
        Self { path, query }
    }

    /// Build a context from a request URI such as `/a/b?x=1#top`.
    pub fn from_uri(uri: &'a str) -> Self {
        let (path, query) = split_path_query(strip_fragment(uri));
        Self { path, query }
    }
}

// =============================================================================
// Match Results
// =============================================================================

/// A redirect decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Redirect<'a> {
    /// HTTP status code to answer with
    pub code: u16,
    /// Redirect target
    pub to: &'a str,
    /// Which part of the index produced the match
    pub kind: RuleKind,
}

/// Why a request was exempted from redirects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExclusionReason<'a> {
    /// Path is in the literal exclusion set
    Punctual,
    /// Path matched this exclusion pattern
    Pattern(&'a str),
}

/// Outcome of matching one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchResult<'a> {
    /// No rule applies; serve the request unmodified
    #[default]
    PassThrough,
    /// An exclusion applies; serve the request unmodified
    Excluded(ExclusionReason<'a>),
    /// Redirect the request
    Redirect(Redirect<'a>),
}

impl<'a> MatchResult<'a> {
    pub fn redirect(&self) -> Option<&Redirect<'a>> {
        match self {
            MatchResult::Redirect(redirect) => Some(redirect),
            _ => None,
        }
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self, MatchResult::Redirect(_))
    }
}
