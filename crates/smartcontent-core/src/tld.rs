use std::borrow::Cow;
use std::collections::HashSet;

use once_cell::sync::Lazy;
use unicode_normalization::UnicodeNormalization;

static SUFFIX_LIST: &str = include_str!("tlds.txt");

static MATCHER: Lazy<DomainSuffixMatcher> =
    Lazy::new(|| DomainSuffixMatcher::from_list(SUFFIX_LIST));

/// Membership test for public top-level domains and registered multi-label
/// suffixes. Built once per process and read-only afterwards.
#[derive(Debug)]
pub struct DomainSuffixMatcher {
    suffixes: HashSet<String>,
}

impl DomainSuffixMatcher {
    /// The process-wide matcher built from the bundled suffix list.
    pub fn global() -> &'static DomainSuffixMatcher {
        &MATCHER
    }

    fn from_list(list: &str) -> Self {
        let suffixes = list
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(|line| normalize_label(line).into_owned())
            .collect::<HashSet<_>>();
        tracing::debug!(count = suffixes.len(), "domain suffix matcher built");
        Self { suffixes }
    }

    /// Whether `suffix` (`"com"`, `"berlin"`, `"co.uk"`, `"РФ"`) is a known
    /// public suffix. Case-insensitive and normalization-insensitive.
    pub fn is_known_suffix(&self, suffix: &str) -> bool {
        self.suffixes.contains(normalize_label(suffix).as_ref())
    }
}

fn normalize_label(label: &str) -> Cow<'_, str> {
    let plain = |byte: u8| {
        byte.is_ascii_lowercase() || byte.is_ascii_digit() || matches!(byte, b'-' | b'.')
    };
    if label.bytes().all(plain) {
        Cow::Borrowed(label)
    } else {
        Cow::Owned(label.nfc().collect::<String>().to_lowercase())
    }
}
