//! Full-text search marker.
//!
//! Filtering never performs full-text search itself. A term meant for a
//! native full-text predicate is wrapped in a marker; a downstream query
//! rewriter recognizes the marker in outgoing parameters, strips it, and
//! replaces the generic substring match. Coercion and serialization pass
//! marked strings through untouched.

/// Marker text placed in front of a full-text term.
pub const FULL_TEXT_MARKER: &str = "-FullTextSearchInterceptor-";

/// Wraps `term` as `(-FullTextSearchInterceptor-term)`.
pub fn full_text(term: &str) -> String {
    format!("({FULL_TEXT_MARKER}{term})")
}

/// Returns `true` if `value` carries the marker, ignoring ASCII case.
pub fn is_full_text(value: &str) -> bool {
    value
        .to_ascii_lowercase()
        .contains(&FULL_TEXT_MARKER.to_ascii_lowercase())
}

/// Recovers the term from a marked value, or `None` if it is not marked.
pub fn strip_full_text(value: &str) -> Option<&str> {
    let inner = value.trim().strip_prefix('(')?.strip_suffix(')')?;
    let marker = inner.get(..FULL_TEXT_MARKER.len())?;
    if !marker.eq_ignore_ascii_case(FULL_TEXT_MARKER) {
        return None;
    }
    Some(&inner[FULL_TEXT_MARKER.len()..])
}
