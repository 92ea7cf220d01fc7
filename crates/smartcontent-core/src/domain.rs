//! Heuristics that decide whether a token is a link, an e-mail address or
//! just text. There is deliberately no URI grammar here: a bare domain must
//! end in a known public suffix, while an explicit `http(s)://` is trusted.

use crate::punctuation::is_edge_punctuation;
use crate::strings::ELLIPSIS;
use crate::tld::DomainSuffixMatcher;

const SCHEMES: [&str; 2] = ["https://", "http://"];
const DEFAULT_SCHEME: &str = "http://";

/// `"http://"` or `"https://"` (as typed) when `url` starts with one.
pub fn url_prefix(url: &str) -> Option<&str> {
    SCHEMES.iter().find_map(|scheme| {
        url.get(..scheme.len())
            .filter(|head| head.eq_ignore_ascii_case(scheme))
    })
}

/// Whether `domain` looks like a public host name: at least two labels, not
/// purely numeric, ending in a known public suffix.
pub fn is_domain_ok(domain: &str) -> bool {
    let labels = domain.split('.').collect::<Vec<_>>();
    if labels.len() < 2 || !labels.iter().all(|label| is_label(label)) {
        return false;
    }
    if labels
        .iter()
        .all(|label| label.chars().all(|ch| ch.is_ascii_digit()))
    {
        return false;
    }
    let matcher = DomainSuffixMatcher::global();
    let last = labels.len() - 1;
    matcher.is_known_suffix(labels[last])
        || (labels.len() > 2 && matcher.is_known_suffix(&labels[last - 1..].join(".")))
}

/// Cheap pre-check: anything carrying an `@` is treated as (part of) an
/// e-mail address and never as a link.
pub fn is_email(token: &str) -> bool {
    token.contains('@')
}

/// The href for a detected link: the text itself when it carries a scheme,
/// otherwise the text behind `http://`.
pub fn link_href(url: &str) -> String {
    if url_prefix(url).is_some() {
        url.to_string()
    } else {
        format!("{DEFAULT_SCHEME}{url}")
    }
}

/// What a link shows: the link as typed when it is just a host, otherwise
/// `{scheme}{host}/…` with port, path, query and fragment hidden.
pub fn link_display(url: &str) -> String {
    let scheme = url_prefix(url).unwrap_or("");
    let rest = &url[scheme.len()..];
    let host_end = rest
        .find(|ch: char| matches!(ch, ':' | '/' | '?' | '#'))
        .unwrap_or(rest.len());
    let tail = &rest[host_end..];
    if tail.is_empty() || tail == "/" {
        url.to_string()
    } else {
        format!("{scheme}{}/{ELLIPSIS}", &rest[..host_end])
    }
}

/// Byte length of the link starting `rest`, if one does. `prev` is the
/// character right before `rest` in the input.
///
/// Work before the host is accepted is limited to the host run itself, and
/// the host runs of two candidate starts never overlap, so scanning every
/// position of an input stays linear.
pub(crate) fn scan_url(rest: &str, prev: Option<char>) -> Option<usize> {
    if prev.is_some_and(|ch| ch.is_alphanumeric() || ch == '@')
        || rest.starts_with(is_edge_punctuation)
    {
        return None;
    }
    let scheme = url_prefix(rest);
    if scheme.is_none() && !prev.is_none_or(is_open_boundary) {
        return None;
    }

    let host_start = scheme.map_or(0, str::len);
    let candidate = host_run(&rest[host_start..]);
    let host = match scheme {
        Some(_) => candidate,
        None => longest_domain(candidate)?,
    };
    if host.is_empty() {
        return None;
    }

    let mut end = host_start + host.len();
    if rest[end..].starts_with('@') {
        return None;
    }
    end += port_len(&rest[end..]);
    if rest[end..].starts_with(|ch: char| matches!(ch, '/' | '?' | '#')) {
        end += rest[end..].find(is_link_break).unwrap_or(rest.len() - end);
    }

    let url = trim_link_end(&rest[..end], host_start + 1);
    (url.len() > host_start).then_some(url.len())
}

/// E-mail detection over one input.
///
/// Candidates are offered in increasing offset order. All candidates in
/// front of the same `@` share the search that found it and the domain
/// behind it, so both are computed once per address token.
#[derive(Debug, Default)]
pub(crate) struct EmailScanner {
    /// Offset of the next `@` or address break, and for an `@` the byte
    /// length of the domain that follows it.
    stop: Option<(usize, Option<usize>)>,
}

impl EmailScanner {
    /// Byte length of the address starting at `offset`, if one does and it
    /// ends by `end`.
    pub(crate) fn scan(
        &mut self,
        input: &str,
        offset: usize,
        end: usize,
        prev: Option<char>,
    ) -> Option<usize> {
        if prev.is_some_and(|ch| ch.is_alphanumeric() || matches!(ch, '@' | '.'))
            || input[offset..end].starts_with(is_edge_punctuation)
        {
            return None;
        }
        let (stop, domain) = match self.stop {
            Some(found @ (stop, _)) if stop >= offset => found,
            _ => {
                let found = next_stop(input, offset);
                self.stop = Some(found);
                found
            }
        };
        // An empty local part, or a break before any `@`.
        if stop == offset || stop >= end {
            return None;
        }
        let mut domain = domain?;
        if stop + 1 + domain > end {
            domain = longest_domain(host_run(&input[stop + 1..end]))?.len();
        }
        Some(stop - offset + 1 + domain)
    }
}

fn next_stop(input: &str, offset: usize) -> (usize, Option<usize>) {
    let stop = input[offset..]
        .find(|ch: char| ch == '@' || is_address_break(ch))
        .map_or(input.len(), |idx| offset + idx);
    let domain = input[stop..]
        .strip_prefix('@')
        .and_then(|tail| longest_domain(host_run(tail)))
        .map(str::len);
    (stop, domain)
}

fn is_label(label: &str) -> bool {
    !label.is_empty()
        && !label.starts_with('-')
        && !label.ends_with('-')
        && label.chars().all(is_host_char)
}

fn is_host_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '-'
}

/// Characters after which a bare domain may start.
fn is_open_boundary(ch: char) -> bool {
    ch.is_whitespace()
        || matches!(
            ch,
            '(' | '[' | '{' | '<' | '"' | '\'' | '“' | '„' | '«' | '‘'
        )
}

/// Characters a link never contains; they would break the href attribute.
fn is_link_break(ch: char) -> bool {
    ch.is_whitespace() || matches!(ch, '<' | '>' | '"' | '“' | '”' | '«' | '»')
}

fn is_address_break(ch: char) -> bool {
    is_link_break(ch)
        || matches!(
            ch,
            '(' | ')' | '[' | ']' | '{' | '}' | ',' | ';' | ':'
        )
}

/// The leading run of host characters and dots.
fn host_run(text: &str) -> &str {
    let end = text
        .find(|ch: char| !(is_host_char(ch) || ch == '.'))
        .unwrap_or(text.len());
    &text[..end]
}

/// The longest whole-label prefix of `candidate` that is a valid domain.
/// `"ab.cd.e"` yields `"ab.cd"`. Each label is checked once.
fn longest_domain(candidate: &str) -> Option<&str> {
    // (start, end) of every label up to the first invalid one.
    let mut labels = Vec::new();
    let mut start = 0;
    for label in candidate.split('.') {
        if !is_label(label) {
            break;
        }
        labels.push((start, start + label.len()));
        start += label.len() + 1;
    }
    // A prefix qualifies only once it holds a label that is not all digits.
    let named = labels.iter().position(|&(start, end)| {
        !candidate[start..end].chars().all(|ch| ch.is_ascii_digit())
    })?;

    let matcher = DomainSuffixMatcher::global();
    (2..=labels.len()).rev().filter(|&count| count > named).find_map(|count| {
        let (last_start, end) = labels[count - 1];
        let known = matcher.is_known_suffix(&candidate[last_start..end])
            || (count > 2 && matcher.is_known_suffix(&candidate[labels[count - 2].0..end]));
        known.then(|| &candidate[..end])
    })
}

/// `:port` directly after the host, when it is followed by a path or the
/// end of the link.
fn port_len(tail: &str) -> usize {
    let Some(digits) = tail.strip_prefix(':') else {
        return 0;
    };
    let count = digits.find(|ch: char| !ch.is_ascii_digit()).unwrap_or(digits.len());
    let after = &digits[count..];
    let closes = after
        .chars()
        .next()
        .is_none_or(|ch| is_link_break(ch) || matches!(ch, '/' | '?' | '#'));
    if count > 0 && closes {
        count + 1
    } else {
        0
    }
}

/// Drops punctuation that closes the sentence rather than the link, and
/// closing brackets the link never opened.
fn trim_link_end(url: &str, floor: usize) -> &str {
    let excess = |open: char, close: char| {
        url.matches(close).count() as isize - url.matches(open).count() as isize
    };
    let mut parens = excess('(', ')');
    let mut squares = excess('[', ']');
    let mut url = url;
    while url.len() > floor {
        let Some(last) = url.chars().next_back() else {
            break;
        };
        let unbalanced = match last {
            ')' => parens > 0,
            ']' => squares > 0,
            _ => false,
        };
        if !(is_edge_punctuation(last) || unbalanced) {
            break;
        }
        match last {
            ')' => parens -= 1,
            ']' => squares -= 1,
            _ => {}
        }
        url = &url[..url.len() - last.len_utf8()];
    }
    url
}
