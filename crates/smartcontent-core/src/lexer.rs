//! Splits normalized text into nodes. Rules are tried in order at every
//! position; characters no rule claims accumulate into fallback text runs.
//! Bracket groups are lexed on an explicit frame stack, so nesting depth is
//! bounded by memory rather than the call stack.

use std::collections::HashMap;
use std::sync::Arc;

use regex::Captures;

use crate::ast::Node;
use crate::domain::{EmailScanner, link_display, link_href, scan_url};
use crate::error::{Error, Result};
use crate::rules::{Pattern, Rule, RuleKind, RuleMatch, RuleSet};
use crate::source_map::SourceMap;
use crate::span::Span;
use crate::strings::unicode_length;

/// Byte offset of every opening delimiter that has a matching closer,
/// mapped to the closer's offset.
///
/// A closer pairs with the nearest open delimiter of its kind; openers
/// above it on the stack stay unpaired. A symmetric delimiter such as `"`
/// closes an open one of its kind and opens otherwise.
///
/// Every opener is pushed and popped once, so the pass is linear in the
/// input whatever the nesting.
pub(crate) fn pair_brackets(input: &str, delimiters: &[(char, char)]) -> HashMap<usize, usize> {
    let mut pairs = HashMap::new();
    // Pending openers as (offset, kind), and per kind their depths in `open`.
    let mut open: Vec<(usize, usize)> = Vec::new();
    let mut depths: Vec<Vec<usize>> = vec![Vec::new(); delimiters.len()];
    for (offset, ch) in input.char_indices() {
        let closing = delimiters
            .iter()
            .position(|&(_, close)| close == ch)
            .and_then(|kind| depths[kind].last().copied());
        if let Some(depth) = closing {
            pairs.insert(open[depth].0, offset);
            for (_, kind) in open.drain(depth..) {
                depths[kind].pop();
            }
        } else if let Some(kind) = delimiters.iter().position(|&(opener, _)| opener == ch) {
            depths[kind].push(open.len());
            open.push((offset, kind));
        }
    }
    pairs
}

struct Frame<'t> {
    end: usize,
    text_start: Option<usize>,
    nodes: Vec<Node>,
    group: Option<OpenGroup<'t>>,
}

struct OpenGroup<'t> {
    rule: &'t Rule,
    start: usize,
    inner_start: usize,
    close_end: usize,
    content: Option<String>,
}

enum Hit<'t> {
    Leaf {
        rule: &'t Rule,
        len: usize,
        captures: Option<Captures<'t>>,
    },
    Group {
        rule: &'t Rule,
        open_len: usize,
        close_at: usize,
        close_len: usize,
        captures: Option<Captures<'t>>,
    },
}

pub(crate) struct Lexer<'t> {
    rules: &'t RuleSet,
    input: &'t str,
    source: Arc<str>,
    pairs: HashMap<usize, usize>,
    emails: EmailScanner,
}

impl<'t> Lexer<'t> {
    pub(crate) fn new(rules: &'t RuleSet, input: &'t str) -> Self {
        Self {
            rules,
            input,
            source: Arc::from(input),
            pairs: pair_brackets(input, rules.delimiters()),
            emails: EmailScanner::default(),
        }
    }

    pub(crate) fn run(mut self) -> Result<Vec<Node>> {
        let mut stack = vec![Frame {
            end: self.input.len(),
            text_start: None,
            nodes: Vec::new(),
            group: None,
        }];
        let mut offset = 0;

        while let Some(frame) = stack.last_mut() {
            if offset >= frame.end {
                self.flush_text(frame, offset);
                if stack.len() == 1 {
                    break;
                }
                let Some(frame) = stack.pop() else { break };
                let Some(group) = frame.group else { break };
                let node = self.close_group(group, frame.end, frame.nodes);
                offset = node.span().end;
                if let Some(parent) = stack.last_mut() {
                    parent.nodes.push(node);
                }
                continue;
            }

            let prev = self.input[..offset].chars().next_back();
            match self.match_at(offset, frame.end, prev)? {
                Some(Hit::Leaf {
                    rule,
                    len,
                    captures,
                }) => {
                    self.flush_text(frame, offset);
                    let span = Span {
                        start: offset,
                        end: offset + len,
                    };
                    frame.nodes.push(self.leaf(rule, span, captures));
                    offset = span.end;
                }
                Some(Hit::Group {
                    rule,
                    open_len,
                    close_at,
                    close_len,
                    captures,
                }) => {
                    self.flush_text(frame, offset);
                    let close_end = close_at + close_len;
                    let content = rule.parse.as_ref().map(|parse| {
                        parse(&RuleMatch::new(&self.input[offset..close_end], captures))
                    });
                    stack.push(Frame {
                        end: close_at,
                        text_start: None,
                        nodes: Vec::new(),
                        group: Some(OpenGroup {
                            rule,
                            start: offset,
                            inner_start: offset + open_len,
                            close_end,
                            content,
                        }),
                    });
                    offset += open_len;
                }
                None => {
                    frame.text_start.get_or_insert(offset);
                    offset += self.input[offset..]
                        .chars()
                        .next()
                        .map_or(1, char::len_utf8);
                }
            }
        }

        let nodes = stack
            .into_iter()
            .next()
            .map(|root| root.nodes)
            .unwrap_or_default();
        tracing::trace!(nodes = nodes.len(), bytes = self.input.len(), "lexed input");
        Ok(nodes)
    }

    fn match_at(
        &mut self,
        offset: usize,
        end: usize,
        prev: Option<char>,
    ) -> Result<Option<Hit<'t>>> {
        let input = self.input;
        let rules = self.rules;
        let rest = &input[offset..end];
        for rule in rules.rules() {
            let hit = match &rule.pattern {
                Pattern::Fallback => None,
                Pattern::Regex(regex) => match regex.captures(rest) {
                    Some(captures) => {
                        let len = captures.get(0).map_or(0, |m| m.end());
                        if len == 0 {
                            return Err(self.zero_length(rule, offset));
                        }
                        if rule.kind == RuleKind::Bracket {
                            regex_group(rule, &rest[..len], offset, captures)
                        } else {
                            Some(Hit::Leaf {
                                rule,
                                len,
                                captures: Some(captures),
                            })
                        }
                    }
                    None => None,
                },
                Pattern::Brackets => self.delimited_group(rule, rest, offset, end),
                Pattern::Url => scan_url(rest, prev).map(|len| Hit::Leaf {
                    rule,
                    len,
                    captures: None,
                }),
                Pattern::Email => self
                    .emails
                    .scan(input, offset, end, prev)
                    .map(|len| Hit::Leaf {
                        rule,
                        len,
                        captures: None,
                    }),
            };
            if hit.is_some() {
                return Ok(hit);
            }
        }
        Ok(None)
    }

    fn delimited_group(
        &self,
        rule: &'t Rule,
        rest: &str,
        offset: usize,
        end: usize,
    ) -> Option<Hit<'t>> {
        let open = rest.chars().next()?;
        let &close_at = self.pairs.get(&offset)?;
        if close_at >= end {
            return None;
        }
        let close_len = self.input[close_at..].chars().next()?.len_utf8();
        Some(Hit::Group {
            rule,
            open_len: open.len_utf8(),
            close_at,
            close_len,
            captures: None,
        })
    }

    fn zero_length(&self, rule: &Rule, offset: usize) -> Error {
        let position = SourceMap::new(self.input).position(offset);
        tracing::warn!(rule = %rule.name, %position, "rejected zero-length match");
        Error::ZeroLengthMatch {
            rule: rule.name.to_string(),
            position,
        }
    }

    fn leaf(&self, rule: &Rule, span: Span, captures: Option<Captures<'_>>) -> Node {
        let text = &self.input[span.start..span.end];
        let content = match &rule.parse {
            Some(parse) => Some(parse(&RuleMatch::new(text, captures))),
            None if rule.kind == RuleKind::Url => Some(link_href(text)),
            None => None,
        };
        let width = match rule.kind {
            RuleKind::Url => unicode_length(&link_display(text)),
            _ => unicode_length(text),
        };
        Node::leaf(rule.name.clone(), self.source.clone(), span, content, width)
    }

    fn flush_text(&self, frame: &mut Frame<'_>, offset: usize) {
        if let Some(start) = frame.text_start.take() {
            let span = Span { start, end: offset };
            frame
                .nodes
                .push(self.leaf(self.rules.fallback(), span, None));
        }
    }

    fn close_group(&self, group: OpenGroup<'_>, inner_end: usize, children: Vec<Node>) -> Node {
        let span = Span {
            start: group.start,
            end: group.close_end,
        };
        let inner = Span {
            start: group.inner_start,
            end: inner_end,
        };
        let delimiters = unicode_length(&self.input[group.start..group.inner_start])
            + unicode_length(&self.input[inner_end..group.close_end]);
        let width = delimiters + children.iter().map(Node::width).sum::<usize>();
        Node::group(
            group.rule.name.clone(),
            self.source.clone(),
            span,
            inner,
            group.content,
            width,
            children,
        )
    }
}

/// A bracket rule driven by a caller pattern: the first and last character of
/// the match are the delimiters, everything between is lexed as children.
fn regex_group<'t>(
    rule: &'t Rule,
    matched: &str,
    offset: usize,
    captures: Captures<'t>,
) -> Option<Hit<'t>> {
    let open_len = matched.chars().next()?.len_utf8();
    let close_len = matched.chars().next_back()?.len_utf8();
    if open_len + close_len > matched.len() {
        return None;
    }
    Some(Hit::Group {
        rule,
        open_len,
        close_at: offset + matched.len() - close_len,
        close_len,
        captures: Some(captures),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    use crate::rules::{BRACKET, EMAIL, NEWLINE, PARAGRAPH, RuleOverride, TEXT, URL, WHITESPACE};

    const PAIRS: [(char, char); 3] = [('(', ')'), ('[', ']'), ('"', '"')];

    fn rules() -> RuleSet {
        RuleSet::build(Vec::new(), PAIRS.to_vec()).unwrap()
    }

    fn lex(set: &RuleSet, input: &str) -> Vec<Node> {
        Lexer::new(set, input).run().unwrap()
    }

    fn shape(nodes: &[Node]) -> Vec<(String, String)> {
        nodes
            .iter()
            .map(|node| (node.rule().to_string(), node.raw().to_string()))
            .collect()
    }

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(rule, raw)| (rule.to_string(), raw.to_string()))
            .collect()
    }

    #[test]
    fn pairs_nested_and_broken_brackets() {
        let pairs = pair_brackets("(a [b) c]", &PAIRS);
        assert_eq!(pairs.get(&0), Some(&5));
        assert_eq!(pairs.get(&3), None);

        let pairs = pair_brackets("\"a (b\" c)", &PAIRS);
        assert_eq!(pairs.get(&0), Some(&5));
        assert_eq!(pairs.get(&3), None);
    }

    #[test]
    fn crossing_pairs_drop_the_inner_opener() {
        let pairs = pair_brackets("([)]", &PAIRS);
        assert_eq!(pairs.get(&0), Some(&2));
        assert_eq!(pairs.len(), 1);

        let pairs = pair_brackets("[(\"x\")] (\"y]", &PAIRS);
        assert_eq!(pairs.get(&0), Some(&6));
        assert_eq!(pairs.get(&1), Some(&5));
        assert_eq!(pairs.get(&2), Some(&4));
        assert_eq!(pairs.get(&8), None);
        assert_eq!(pairs.get(&9), None);
    }

    #[test]
    fn unmatched_closers_pair_in_linear_time() {
        let depth = 200_000;
        let input = format!("{}{}", "(".repeat(depth), "]".repeat(depth));
        let started = Instant::now();
        let pairs = pair_brackets(&input, &PAIRS);
        assert!(pairs.is_empty());

        let input = format!("{}{}", "(".repeat(depth), "\"".repeat(depth));
        let pairs = pair_brackets(&input, &PAIRS);
        assert_eq!(pairs.len(), depth / 2);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn splits_into_rules() {
        let set = rules();
        let nodes = lex(&set, "a google.com  b\nc\n\nd bob@x.de");
        assert_eq!(
            shape(&nodes),
            pairs(&[
                (TEXT, "a "),
                (URL, "google.com"),
                (WHITESPACE, "  "),
                (TEXT, "b"),
                (NEWLINE, "\n"),
                (TEXT, "c"),
                (PARAGRAPH, "\n\n"),
                (TEXT, "d "),
                (EMAIL, "bob@x.de"),
            ])
        );
        assert_eq!(nodes[1].content(), "http://google.com");
    }

    #[test]
    fn nests_groups() {
        let set = rules();
        let nodes = lex(&set, "x (a [google.com]) y");
        assert_eq!(
            shape(&nodes),
            pairs(&[(TEXT, "x "), (BRACKET, "(a [google.com])"), (TEXT, " y")])
        );
        let group = &nodes[1];
        assert_eq!(group.content(), "a [google.com]");
        assert_eq!(group.width(), 16);
        let children = group.children().unwrap();
        assert_eq!(shape(children), pairs(&[(TEXT, "a "), (BRACKET, "[google.com]")]));
        let inner = children[1].children().unwrap();
        assert_eq!(shape(inner), pairs(&[(URL, "google.com")]));
        assert_eq!(inner[0].span(), Span { start: 6, end: 16 });
    }

    #[test]
    fn unterminated_openers_stay_text() {
        let set = rules();
        let nodes = lex(&set, "abra (cababra");
        assert_eq!(shape(&nodes), pairs(&[(TEXT, "abra (cababra")]));
    }

    #[test]
    fn empty_input_has_no_nodes() {
        assert!(lex(&rules(), "").is_empty());
    }

    #[test]
    fn link_width_is_the_display_form() {
        let set = rules();
        let nodes = lex(&set, "google.com/awesome");
        assert_eq!(nodes[0].width(), unicode_length("google.com/…"));
    }

    #[test]
    fn custom_rules_split_text_runs() {
        let custom = RuleOverride::new()
            .pattern("suck|cock")
            .parse(|found| found.as_str().to_uppercase())
            .compile(|node| node.content().to_string());
        let set = RuleSet::build(vec![("custom".to_string(), custom)], PAIRS.to_vec()).unwrap();
        let nodes = lex(&set, "a suck b");
        assert_eq!(
            shape(&nodes),
            pairs(&[(TEXT, "a "), ("custom", "suck"), (TEXT, " b")])
        );
        assert_eq!(nodes[1].content(), "SUCK");
    }

    #[test]
    fn regex_brackets_use_the_match_edges() {
        let bracket = RuleOverride::new().pattern(r"\{[^{}]*\}");
        let set = RuleSet::build(vec![(BRACKET.to_string(), bracket)], PAIRS.to_vec()).unwrap();
        let nodes = lex(&set, "a {x.de} b");
        assert_eq!(nodes[1].rule(), BRACKET);
        assert_eq!(nodes[1].content(), "x.de");
        let children = nodes[1].children().unwrap();
        assert_eq!(shape(children), pairs(&[(URL, "x.de")]));
    }

    #[test]
    fn zero_length_matches_are_errors() {
        let custom = RuleOverride::new()
            .pattern(r"\b")
            .compile(|_| String::new());
        let set = RuleSet::build(vec![("custom".to_string(), custom)], PAIRS.to_vec()).unwrap();
        let err = Lexer::new(&set, "line\n  word").run().unwrap_err();
        match err {
            Error::ZeroLengthMatch { rule, position } => {
                assert_eq!(rule, "custom");
                assert_eq!((position.line, position.character), (0, 0));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn deep_nesting_does_not_recurse() {
        let depth = 50_000;
        let input = format!("{}x{}", "(".repeat(depth), ")".repeat(depth));
        let set = rules();
        let nodes = lex(&set, &input);
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].width(), depth * 2 + 1);
    }
}
