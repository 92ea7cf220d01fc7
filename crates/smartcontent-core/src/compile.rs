//! Turns nodes into markup, optionally within a visible-length budget.
//!
//! The budget counts grapheme clusters of what a reader sees: link display
//! text, bracket delimiters, and the source text of everything else. When
//! the whole input does not fit, one cluster is reserved for the ellipsis
//! and nodes are emitted while they fit strictly inside what is left; the
//! first one that does not is cut or replaced by the ellipsis, and nothing
//! after it is emitted.

use crate::ast::Node;
use crate::domain::link_display;
use crate::html::{escape_html, tag};
use crate::rules::{Rule, RuleKind, RuleSet};
use crate::strings::{ELLIPSIS, cut_at, unicode_length};

enum Step<'n> {
    Enter(&'n Node),
    Close(&'n Node),
}

pub(crate) struct Compiler<'r> {
    rules: &'r RuleSet,
}

impl<'r> Compiler<'r> {
    pub(crate) fn new(rules: &'r RuleSet) -> Self {
        Self { rules }
    }

    pub(crate) fn compile(&self, nodes: &[Node], limit: Option<usize>) -> String {
        match limit {
            None => self.compile_all(nodes),
            Some(0) => String::new(),
            Some(limit) if nodes.iter().map(Node::width).sum::<usize>() <= limit => {
                self.compile_all(nodes)
            }
            Some(limit) => self.compile_within(nodes, limit),
        }
    }

    fn compile_all(&self, nodes: &[Node]) -> String {
        let mut out = String::new();
        let mut stack = nodes.iter().rev().map(Step::Enter).collect::<Vec<_>>();
        while let Some(step) = stack.pop() {
            match step {
                Step::Enter(node) => {
                    if self.opens_group(node) {
                        out.push_str(&escape_html(node.delimiters().0));
                        stack.push(Step::Close(node));
                        if let Some(children) = node.children() {
                            stack.extend(children.iter().rev().map(Step::Enter));
                        }
                    } else {
                        out.push_str(&self.compile_leaf(node));
                    }
                }
                Step::Close(node) => out.push_str(&escape_html(node.delimiters().1)),
            }
        }
        out
    }

    fn compile_within(&self, nodes: &[Node], limit: usize) -> String {
        let mut out = String::new();
        let mut remaining = limit;
        let mut stack = nodes.iter().rev().map(Step::Enter).collect::<Vec<_>>();
        while let Some(step) = stack.pop() {
            match step {
                Step::Enter(node) if node.width() < remaining => {
                    out.push_str(&self.compile_all(std::slice::from_ref(node)));
                    remaining -= node.width();
                }
                Step::Enter(node) => {
                    let open = node.delimiters().0;
                    let open_width = unicode_length(open);
                    if self.opens_group(node) && open_width < remaining {
                        out.push_str(&escape_html(open));
                        remaining -= open_width;
                        stack.push(Step::Close(node));
                        if let Some(children) = node.children() {
                            stack.extend(children.iter().rev().map(Step::Enter));
                        }
                        continue;
                    }
                    out.push_str(&self.cut(node, remaining));
                    return out;
                }
                Step::Close(node) => {
                    let close = node.delimiters().1;
                    let close_width = unicode_length(close);
                    if close_width >= remaining {
                        out.push_str(ELLIPSIS);
                        return out;
                    }
                    out.push_str(&escape_html(close));
                    remaining -= close_width;
                }
            }
        }
        // Only reachable when widths under-count what was emitted.
        out.push_str(ELLIPSIS);
        out
    }

    /// Markup for a node that does not fit into `remaining`, ellipsis included.
    fn cut(&self, node: &Node, remaining: usize) -> String {
        let keep = remaining.saturating_sub(1);
        let Some(rule) = self.builtin_rule(node) else {
            return ELLIPSIS.to_string();
        };
        match rule.kind {
            RuleKind::Text | RuleKind::Email => {
                format!("{}{ELLIPSIS}", escape_html(cut_at(node.raw(), keep)))
            }
            RuleKind::Url => {
                let display = link_display(node.raw());
                let shown = cut_at(&display, keep);
                if shown.is_empty() {
                    return ELLIPSIS.to_string();
                }
                let anchor = tag("a", &[("href", node.content())], Some(&escape_html(shown)));
                format!("{anchor}{ELLIPSIS}")
            }
            _ => ELLIPSIS.to_string(),
        }
    }

    fn compile_leaf(&self, node: &Node) -> String {
        let Some(rule) = self.rules.get(node.rule()) else {
            return escape_html(node.raw());
        };
        if let Some(compile) = &rule.compile {
            return compile(node);
        }
        match rule.kind {
            RuleKind::Paragraph => format!("{br}{br}", br = tag("br", &[], None)),
            RuleKind::Newline => tag("br", &[], None),
            RuleKind::Whitespace => " ".to_string(),
            RuleKind::Url => {
                let display = escape_html(&link_display(node.raw()));
                tag("a", &[("href", node.content())], Some(&display))
            }
            RuleKind::Bracket | RuleKind::Email | RuleKind::Text | RuleKind::Custom => {
                escape_html(node.content())
            }
        }
    }

    /// Whether the node is a group compiled by the built-in bracket logic.
    fn opens_group(&self, node: &Node) -> bool {
        node.is_group()
            && self
                .builtin_rule(node)
                .is_some_and(|rule| rule.kind == RuleKind::Bracket)
    }

    /// The node's rule, unless a caller compile step replaces its markup.
    fn builtin_rule(&self, node: &Node) -> Option<&'r Rule> {
        self.rules
            .get(node.rule())
            .filter(|rule| rule.compile.is_none())
    }
}
