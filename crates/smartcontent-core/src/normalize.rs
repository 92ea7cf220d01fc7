//! Input clean-up applied before lexing.

/// Unifies line endings, drops tabs, turns form and line feeds into plain
/// spaces and trims the result. Applying it twice changes nothing.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\r' => {
                chars.next_if_eq(&'\n');
                out.push('\n');
            }
            '\t' => {}
            '\u{000C}' | '\u{000B}' => out.push(' '),
            _ => out.push(ch),
        }
    }
    let trimmed = out.trim();
    if trimmed.len() == out.len() {
        out
    } else {
        trimmed.to_string()
    }
}
