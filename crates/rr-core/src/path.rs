//! Path and query helpers shared by the builder and the matcher
//!
//! These functions work directly on string slices. Both sides of the index
//! must normalize the same way, so every rule of the form "strip this, split
//! that" lives here and nowhere else.

use std::collections::HashSet;

// =============================================================================
// Splitting
// =============================================================================

/// Split `text` at the first `?` into path and raw query.
/// The query is empty when there is no `?`.
#[inline]
pub fn split_path_query(text: &str) -> (&str, &str) {
    match text.split_once('?') {
        Some((path, query)) => (path, query),
        None => (text, ""),
    }
}

/// Drop a `#fragment`, if any.
#[inline]
pub fn strip_fragment(uri: &str) -> &str {
    match uri.find('#') {
        Some(pos) => &uri[..pos],
        None => uri,
    }
}

/// Iterate the `key` / `key=value` terms of a raw query string.
///
/// Empty terms (from `a&&b` or a trailing `&`) are skipped.
pub fn query_terms(query: &str) -> impl Iterator<Item = &str> {
    query.split('&').filter(|term| !term.is_empty())
}

// =============================================================================
// Normalization
// =============================================================================

/// Normalize a path for exact lookup.
///
/// With `trailing_slash == false` one trailing `/` is removed. The root path
/// `/` is never reduced to the empty string.
#[inline]
pub fn normalize_path(path: &str, trailing_slash: bool) -> &str {
    if trailing_slash || path.len() <= 1 {
        return path;
    }
    path.strip_suffix('/').unwrap_or(path)
}

/// Order-insensitive comparison of a stored term list against request terms.
pub fn same_terms<S: AsRef<str>>(stored: &[S], request: &HashSet<&str>) -> bool {
    let stored: HashSet<&str> = stored.iter().map(AsRef::as_ref).collect();
    stored == *request
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_path_query() {
        assert_eq!(split_path_query("/old"), ("/old", ""));
        assert_eq!(split_path_query("/old?a=1&b"), ("/old", "a=1&b"));
        assert_eq!(split_path_query("/old?"), ("/old", ""));
        assert_eq!(split_path_query("/old?a?b"), ("/old", "a?b"));
    }

    #[test]
    fn test_strip_fragment() {
        assert_eq!(strip_fragment("/a?b#c"), "/a?b");
        assert_eq!(strip_fragment("/a"), "/a");
    }

    #[test]
    fn test_query_terms() {
        let terms: Vec<&str> = query_terms("a=1&&b&").collect();
        assert_eq!(terms, vec!["a=1", "b"]);
        assert_eq!(query_terms("").count(), 0);
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/old/", false), "/old");
        assert_eq!(normalize_path("/old", false), "/old");
        assert_eq!(normalize_path("/old//", false), "/old/");
        assert_eq!(normalize_path("/", false), "/");
        assert_eq!(normalize_path("", false), "");
        assert_eq!(normalize_path("/old/", true), "/old/");
    }

    #[test]
    fn test_same_terms() {
        let request: HashSet<&str> = ["b", "a"].into_iter().collect();
        assert!(same_terms(&["a".to_string(), "b".to_string()], &request));
        assert!(!same_terms(&["a".to_string()], &request));
        assert!(same_terms::<String>(&[], &HashSet::new()));
    }
}
