//! Markup serialization and the optional sanitizer pass.

use std::collections::HashSet;

use ammonia::Builder;

/// Escapes `& < > "` so text can sit inside element content or a quoted
/// attribute.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Serializes a single element. Attribute values and children are written
/// as given; escaping is the caller's job. Without children the element is
/// self-closing (`<br />`).
pub fn tag(name: &str, attributes: &[(&str, &str)], children: Option<&str>) -> String {
    let mut out = String::new();
    out.push('<');
    out.push_str(name);
    for (key, value) in attributes {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        out.push_str(value);
        out.push('"');
    }
    match children {
        Some(children) => {
            out.push('>');
            out.push_str(children);
            out.push_str("</");
            out.push_str(name);
            out.push('>');
        }
        None => out.push_str(" />"),
    }
    out
}

/// Runs generated markup through an allow-list sanitizer: only `a[href]` and
/// `br` survive, links get `rel="nofollow noopener noreferrer"`, and only
/// `http`, `https` and `mailto` hrefs are kept.
///
/// Entities and void elements are re-serialized, so `<br />` comes back as
/// `<br>`.
pub fn sanitize(raw_html: &str) -> String {
    let tags: HashSet<&'static str> = ["a", "br"].into_iter().collect();
    let schemes: HashSet<&'static str> = ["http", "https", "mailto"].into_iter().collect();
    let a_attributes: HashSet<&'static str> = ["href"].into_iter().collect();

    Builder::new()
        .tags(tags)
        .generic_attributes(HashSet::new())
        .tag_attributes([("a", a_attributes)].into_iter().collect())
        .url_schemes(schemes)
        .link_rel(Some("nofollow noopener noreferrer"))
        .clean(raw_html)
        .to_string()
}
