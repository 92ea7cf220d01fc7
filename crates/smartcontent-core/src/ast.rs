use std::sync::Arc;

use crate::span::Span;

/// One unit of lexed input: a text run, a link, a line break, a bracketed
/// group and so on, tagged with the name of the rule that produced it.
///
/// Spans are byte offsets into the whole input, also inside bracket groups.
#[derive(Debug)]
pub struct Node {
    rule: Arc<str>,
    source: Arc<str>,
    span: Span,
    inner: Span,
    content: Option<String>,
    width: usize,
    children: Option<Vec<Node>>,
}

impl Node {
    pub(crate) fn leaf(
        rule: Arc<str>,
        source: Arc<str>,
        span: Span,
        content: Option<String>,
        width: usize,
    ) -> Self {
        Self {
            rule,
            source,
            span,
            inner: span,
            content,
            width,
            children: None,
        }
    }

    pub(crate) fn group(
        rule: Arc<str>,
        source: Arc<str>,
        span: Span,
        inner: Span,
        content: Option<String>,
        width: usize,
        children: Vec<Node>,
    ) -> Self {
        Self {
            rule,
            source,
            span,
            inner,
            content,
            width,
            children: Some(children),
        }
    }

    /// Name of the producing rule.
    pub fn rule(&self) -> &str {
        &self.rule
    }

    pub fn span(&self) -> Span {
        self.span
    }

    /// The matched input, delimiters included.
    pub fn raw(&self) -> &str {
        self.span.text(&self.source).unwrap_or_default()
    }

    /// What the rule's parse step extracted: the href for links, the text
    /// between the delimiters for bracket groups, the matched input otherwise.
    pub fn content(&self) -> &str {
        match &self.content {
            Some(content) => content,
            None => self.inner.text(&self.source).unwrap_or_default(),
        }
    }

    /// Visible length in grapheme clusters once compiled.
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn children(&self) -> Option<&[Node]> {
        self.children.as_deref()
    }

    pub fn is_group(&self) -> bool {
        self.children.is_some()
    }

    /// Opening and closing delimiter of a bracket group.
    pub(crate) fn delimiters(&self) -> (&str, &str) {
        let raw = self.raw();
        let open = raw.chars().next().map_or(0, char::len_utf8);
        let close = raw.chars().next_back().map_or(0, char::len_utf8);
        if open + close > raw.len() {
            return (raw, "");
        }
        (&raw[..open], &raw[raw.len() - close..])
    }
}

// Bracket nesting is input-controlled; unwind it without recursion.
impl Drop for Node {
    fn drop(&mut self) {
        let Some(mut stack) = self.children.take() else {
            return;
        };
        while let Some(mut node) = stack.pop() {
            if let Some(children) = node.children.take() {
                stack.extend(children);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(text: &str) -> Arc<str> {
        Arc::from(text)
    }

    #[test]
    fn content_defaults_to_the_inner_span() {
        let text = source("(ab)");
        let inner = Node::leaf(
            Arc::from("text"),
            text.clone(),
            Span { start: 1, end: 3 },
            None,
            2,
        );
        let group = Node::group(
            Arc::from("bracket"),
            text,
            Span { start: 0, end: 4 },
            Span { start: 1, end: 3 },
            None,
            4,
            vec![inner],
        );
        assert_eq!(group.raw(), "(ab)");
        assert_eq!(group.content(), "ab");
        assert_eq!(group.delimiters(), ("(", ")"));
        assert_eq!(group.children().map(<[Node]>::len), Some(1));
    }

    #[test]
    fn owned_content_wins() {
        let node = Node::leaf(
            Arc::from("url"),
            source("x.de"),
            Span { start: 0, end: 4 },
            Some("http://x.de".to_string()),
            4,
        );
        assert_eq!(node.raw(), "x.de");
        assert_eq!(node.content(), "http://x.de");
        assert!(!node.is_group());
    }

    #[test]
    fn deep_nesting_drops_without_overflow() {
        let text = source("");
        let mut node = Node::leaf(Arc::from("text"), text.clone(), Span::default(), None, 0);
        for _ in 0..200_000 {
            node = Node::group(
                Arc::from("bracket"),
                text.clone(),
                Span::default(),
                Span::default(),
                None,
                0,
                vec![node],
            );
        }
        drop(node);
    }
}
