//! Rule classification.
//!
//! A single predicate decides whether a string is a whole-string anchored
//! pattern (`^...$`) or a literal path. It is shared by rule sources,
//! exclusion entries and parent-chain tokens.

use serde::{Deserialize, Serialize};

/// How a rule source is matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    /// Full string equality on the normalized path, query matched as a term set
    Exact,
    /// Regular expression anchored at both ends
    Pattern,
}

/// Returns true if `text` starts with `^` and ends with `$`.
///
/// Only both anchors together count. `^/foo` or `/foo$` are literals.
#[inline]
pub fn is_pattern(text: &str) -> bool {
    text.len() >= 2 && text.starts_with('^') && text.ends_with('$')
}

#[inline]
pub fn classify(text: &str) -> RuleKind {
    if is_pattern(text) {
        RuleKind::Pattern
    } else {
        RuleKind::Exact
    }
}
