//! Separates punctuation that merely touches a token from the token itself.

/// Punctuation that may wrap a link or address without belonging to it.
pub(crate) fn is_edge_punctuation(ch: char) -> bool {
    matches!(
        ch,
        '-' | ',' | ';' | ':' | '.' | '!' | '?' | '\'' | '"' | '<' | '>'
    )
}

/// Punctuation dropped when a text is cut in front of the ellipsis.
pub(crate) fn is_trailing_punctuation(ch: char) -> bool {
    is_edge_punctuation(ch)
        || matches!(
            ch,
            '(' | '[' | '{' | '«' | '»' | '“' | '”' | '„' | '–' | '—' | '…'
        )
}

/// The run of edge punctuation that starts `token`, if any.
pub fn leading_punctuation(token: &str) -> Option<&str> {
    let rest = token.trim_start_matches(is_edge_punctuation);
    let len = token.len() - rest.len();
    (len > 0).then(|| &token[..len])
}

/// The run of edge punctuation that ends `token`, if any.
pub fn trailing_punctuation(token: &str) -> Option<&str> {
    let rest = token.trim_end_matches(is_edge_punctuation);
    (rest.len() < token.len()).then(|| &token[rest.len()..])
}
