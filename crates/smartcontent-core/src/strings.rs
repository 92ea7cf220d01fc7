//! Grapheme-cluster aware measuring and cutting.
//!
//! Every length in this crate is a count of extended grapheme clusters, so a
//! ZWJ family emoji, a flag or a character followed by a variation selector is
//! one unit and is never split by a cut.

use unicode_segmentation::UnicodeSegmentation;

use crate::punctuation::is_trailing_punctuation;

/// Marker appended once when output was cut.
pub const ELLIPSIS: &str = "…";

/// Number of user-perceived characters in `text`.
pub fn unicode_length(text: &str) -> usize {
    text.graphemes(true).count()
}

/// The first `count` grapheme clusters of `text`.
pub fn truncate_graphemes(text: &str, count: usize) -> &str {
    match text.grapheme_indices(true).nth(count) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Cuts `text` so that it fits `limit` clusters including the trailing
/// [`ELLIPSIS`], dropping whitespace and punctuation left dangling at the cut.
///
/// The cut is unconditional: callers decide whether `text` needs shortening.
pub fn shorten_string(text: &str, limit: usize) -> String {
    if text.is_empty() || limit == 0 {
        return String::new();
    }
    let mut out = cut_at(text, limit - 1).to_string();
    out.push_str(ELLIPSIS);
    out
}

/// The first `count` clusters with trailing whitespace and punctuation removed.
pub(crate) fn cut_at(text: &str, count: usize) -> &str {
    truncate_graphemes(text, count)
        .trim_end_matches(|ch: char| ch.is_whitespace() || is_trailing_punctuation(ch))
}
