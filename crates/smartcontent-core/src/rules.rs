//! Rule records, caller overrides and the merge that turns both into the
//! ordered rule set a parser lexes with.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::ast::Node;
use crate::error::{Error, Result};

/// Builds a node's content from a match.
pub type ParseFn = Arc<dyn Fn(&RuleMatch<'_>) -> String + Send + Sync>;
/// Renders a node as markup.
pub type CompileFn = Arc<dyn Fn(&Node) -> String + Send + Sync>;

pub const PARAGRAPH: &str = "paragraph";
pub const NEWLINE: &str = "newline";
pub const WHITESPACE: &str = "whitespace";
pub const BRACKET: &str = "bracket";
pub const URL: &str = "url";
pub const EMAIL: &str = "email";
pub const TEXT: &str = "text";

/// Orders handed to caller rules start here, right after the built-ins.
pub(crate) const CUSTOM_ORDER_BASE: i32 = 6;

static PARAGRAPH_RE: Lazy<Regex> =
    Lazy::new(|| builtin_regex(r"[ \t]*\n(?:[ \t]*\n)+[ \t]*"));
static NEWLINE_RE: Lazy<Regex> = Lazy::new(|| builtin_regex(r"[ \t]*\n[ \t]*"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| builtin_regex(r"[ \t]{2,}"));

fn builtin_regex(pattern: &str) -> Regex {
    Regex::new(&anchored(pattern)).expect("built-in pattern is valid")
}

fn anchored(pattern: &str) -> String {
    format!("^(?:{pattern})")
}

/// What a rule does with its matches at compile time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RuleKind {
    Paragraph,
    Newline,
    Whitespace,
    Bracket,
    Url,
    Email,
    Text,
    Custom,
}

#[derive(Clone, Debug)]
pub(crate) enum Pattern {
    Regex(Regex),
    Brackets,
    Url,
    Email,
    /// Whatever no other rule claims.
    Fallback,
}

/// A match handed to a rule's parse step.
pub struct RuleMatch<'t> {
    text: &'t str,
    captures: Option<Captures<'t>>,
}

impl<'t> RuleMatch<'t> {
    pub(crate) fn new(text: &'t str, captures: Option<Captures<'t>>) -> Self {
        Self { text, captures }
    }

    /// The whole match.
    pub fn as_str(&self) -> &'t str {
        self.text
    }

    /// Capture group `index`; group 0 is the whole match. Built-in scanners
    /// only provide group 0.
    pub fn get(&self, index: usize) -> Option<&'t str> {
        match &self.captures {
            Some(captures) => captures.get(index).map(|m| m.as_str()),
            None => (index == 0).then_some(self.text),
        }
    }
}

/// A partial rule supplied by a caller. For a built-in rule name every field
/// that is set replaces the built-in one; any other name adds a rule, which
/// then needs at least a pattern and a compile step.
#[derive(Clone, Default)]
pub struct RuleOverride {
    pattern: Option<String>,
    parse: Option<ParseFn>,
    compile: Option<CompileFn>,
    order: Option<i32>,
}

impl RuleOverride {
    pub fn new() -> Self {
        Self::default()
    }

    /// A regular expression, implicitly anchored at the current position.
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn parse<F>(mut self, parse: F) -> Self
    where
        F: Fn(&RuleMatch<'_>) -> String + Send + Sync + 'static,
    {
        self.parse = Some(Arc::new(parse));
        self
    }

    pub fn compile<F>(mut self, compile: F) -> Self
    where
        F: Fn(&Node) -> String + Send + Sync + 'static,
    {
        self.compile = Some(Arc::new(compile));
        self
    }

    /// Lower orders are tried first.
    pub fn order(mut self, order: i32) -> Self {
        self.order = Some(order);
        self
    }

    pub fn explicit_order(&self) -> Option<i32> {
        self.order
    }

    fn merge(&mut self, other: RuleOverride) {
        if other.pattern.is_some() {
            self.pattern = other.pattern;
        }
        if other.parse.is_some() {
            self.parse = other.parse;
        }
        if other.compile.is_some() {
            self.compile = other.compile;
        }
        if other.order.is_some() {
            self.order = other.order;
        }
    }
}

impl fmt::Debug for RuleOverride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleOverride")
            .field("pattern", &self.pattern)
            .field("parse", &self.parse.is_some())
            .field("compile", &self.compile.is_some())
            .field("order", &self.order)
            .finish()
    }
}

/// Assigns `base + index` to every entry without an explicit order and keeps
/// explicit ones. `[None, Some(123), None]` with base 10 gives
/// `[10, 123, 12]`.
pub fn inject_order(orders: &[Option<i32>], base: i32) -> Vec<i32> {
    orders
        .iter()
        .zip(base..)
        .map(|(order, fallback)| order.unwrap_or(fallback))
        .collect()
}

#[derive(Clone)]
pub(crate) struct Rule {
    pub(crate) name: Arc<str>,
    pub(crate) kind: RuleKind,
    pub(crate) pattern: Pattern,
    pub(crate) parse: Option<ParseFn>,
    pub(crate) compile: Option<CompileFn>,
    pub(crate) order: i32,
}

impl Rule {
    fn builtin(name: &str, kind: RuleKind, pattern: Pattern, order: i32) -> Self {
        Self {
            name: Arc::from(name),
            kind,
            pattern,
            parse: None,
            compile: None,
            order,
        }
    }

    fn apply(&mut self, rule: RuleOverride) -> Result<()> {
        if let Some(pattern) = rule.pattern {
            if self.kind == RuleKind::Text {
                tracing::warn!(rule = %self.name, "pattern override ignored for the fallback rule");
            } else {
                self.pattern = Pattern::Regex(compile_pattern(&self.name, &pattern)?);
            }
        }
        if rule.parse.is_some() {
            self.parse = rule.parse;
        }
        if rule.compile.is_some() {
            self.compile = rule.compile;
        }
        if let Some(order) = rule.order {
            if self.kind == RuleKind::Text {
                tracing::warn!(rule = %self.name, "order override ignored for the fallback rule");
            } else {
                self.order = order;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("order", &self.order)
            .finish_non_exhaustive()
    }
}

fn compile_pattern(rule: &str, pattern: &str) -> Result<Regex> {
    let regex = Regex::new(&anchored(pattern)).map_err(|source| Error::InvalidPattern {
        rule: rule.to_string(),
        source,
    })?;
    if regex.is_match("") {
        return Err(Error::EmptyPattern {
            rule: rule.to_string(),
        });
    }
    Ok(regex)
}

fn default_rules() -> Vec<Rule> {
    vec![
        Rule::builtin(
            PARAGRAPH,
            RuleKind::Paragraph,
            Pattern::Regex(PARAGRAPH_RE.clone()),
            0,
        ),
        Rule::builtin(NEWLINE, RuleKind::Newline, Pattern::Regex(NEWLINE_RE.clone()), 1),
        Rule::builtin(
            WHITESPACE,
            RuleKind::Whitespace,
            Pattern::Regex(WHITESPACE_RE.clone()),
            2,
        ),
        Rule::builtin(BRACKET, RuleKind::Bracket, Pattern::Brackets, 3),
        Rule::builtin(URL, RuleKind::Url, Pattern::Url, 4),
        Rule::builtin(EMAIL, RuleKind::Email, Pattern::Email, 5),
        Rule::builtin(TEXT, RuleKind::Text, Pattern::Fallback, i32::MAX),
    ]
}

/// The resolved, ordered rules of one parser. Immutable after construction.
#[derive(Debug)]
pub(crate) struct RuleSet {
    rules: Vec<Rule>,
    index: HashMap<Arc<str>, usize>,
    fallback: usize,
    delimiters: Vec<(char, char)>,
}

impl RuleSet {
    pub(crate) fn build(
        overrides: Vec<(String, RuleOverride)>,
        delimiters: Vec<(char, char)>,
    ) -> Result<Self> {
        // Collapse repeated names first; later entries win field by field.
        let mut merged: Vec<(String, RuleOverride)> = Vec::new();
        for (name, rule) in overrides {
            match merged.iter_mut().find(|(existing, _)| *existing == name) {
                Some((_, existing)) => existing.merge(rule),
                None => merged.push((name, rule)),
            }
        }

        let mut rules = default_rules();
        let mut added = Vec::new();
        for (name, rule) in merged {
            match rules.iter_mut().find(|existing| *existing.name == *name) {
                Some(existing) => {
                    tracing::debug!(rule = %name, "overriding built-in rule");
                    existing.apply(rule)?;
                }
                None => added.push((name, rule)),
            }
        }

        let orders = inject_order(
            &added
                .iter()
                .map(|(_, rule)| rule.explicit_order())
                .collect::<Vec<_>>(),
            CUSTOM_ORDER_BASE,
        );
        for ((name, rule), order) in added.into_iter().zip(orders) {
            let pattern = rule.pattern.ok_or_else(|| Error::IncompleteRule {
                rule: name.clone(),
                field: "pattern",
            })?;
            let compile = rule.compile.ok_or_else(|| Error::IncompleteRule {
                rule: name.clone(),
                field: "compile",
            })?;
            tracing::debug!(rule = %name, order, "adding rule");
            rules.push(Rule {
                pattern: Pattern::Regex(compile_pattern(&name, &pattern)?),
                name: Arc::from(name),
                kind: RuleKind::Custom,
                parse: rule.parse,
                compile: Some(compile),
                order,
            });
        }

        Ok(Self::from_rules(rules, delimiters))
    }

    /// The built-in rules only.
    pub(crate) fn defaults(delimiters: Vec<(char, char)>) -> Self {
        Self::from_rules(default_rules(), delimiters)
    }

    fn from_rules(mut rules: Vec<Rule>, delimiters: Vec<(char, char)>) -> Self {
        // The fallback goes last whatever the orders say; ties keep
        // declaration order.
        rules.sort_by_key(|rule| (rule.kind == RuleKind::Text, rule.order));
        let index = rules
            .iter()
            .enumerate()
            .map(|(idx, rule)| (rule.name.clone(), idx))
            .collect::<HashMap<_, _>>();
        let fallback = rules.len() - 1;

        Self {
            rules,
            index,
            fallback,
            delimiters,
        }
    }

    pub(crate) fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub(crate) fn get(&self, name: &str) -> Option<&Rule> {
        self.index.get(name).map(|&idx| &self.rules[idx])
    }

    pub(crate) fn fallback(&self) -> &Rule {
        &self.rules[self.fallback]
    }

    pub(crate) fn delimiters(&self) -> &[(char, char)] {
        &self.delimiters
    }

    /// Rule names in the order they are tried.
    pub(crate) fn names(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|rule| &*rule.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs() -> Vec<(char, char)> {
        vec![('(', ')')]
    }

    #[test]
    fn injects_orders_without_touching_explicit_ones() {
        let orders = [None, Some(123), None];
        assert_eq!(inject_order(&orders, 0), vec![0, 123, 2]);
        assert_eq!(inject_order(&orders, 10), vec![10, 123, 12]);
        assert!(inject_order(&[], 10).is_empty());
        assert_eq!(orders, [None, Some(123), None]);
    }

    #[test]
    fn defaults_are_ordered_with_text_last() {
        let set = RuleSet::defaults(pairs());
        let names = set.names().collect::<Vec<_>>();
        assert_eq!(
            names,
            [PARAGRAPH, NEWLINE, WHITESPACE, BRACKET, URL, EMAIL, TEXT]
        );
        assert_eq!(&*set.fallback().name, TEXT);
    }

    #[test]
    fn new_rules_go_after_the_built_ins() {
        let rule = RuleOverride::new().pattern("x").compile(|_| String::new());
        let set = RuleSet::build(vec![("custom".to_string(), rule)], pairs()).unwrap();
        let names = set.names().collect::<Vec<_>>();
        assert_eq!(names[6], "custom");
        assert_eq!(names[7], TEXT);
        assert_eq!(set.get("custom").map(|rule| rule.order), Some(CUSTOM_ORDER_BASE));
    }

    #[test]
    fn explicit_orders_move_rules_forward() {
        let rule = RuleOverride::new()
            .pattern("x")
            .compile(|_| String::new())
            .order(-1);
        let set = RuleSet::build(vec![("first".to_string(), rule)], pairs()).unwrap();
        assert_eq!(set.names().next(), Some("first"));
    }

    #[test]
    fn overrides_replace_only_given_fields() {
        let rule = RuleOverride::new().compile(|_| "URL".to_string());
        let set = RuleSet::build(vec![(URL.to_string(), rule)], pairs()).unwrap();
        let url = set.get(URL).unwrap();
        assert!(matches!(url.pattern, Pattern::Url));
        assert!(url.compile.is_some());
        assert!(url.parse.is_none());
        assert_eq!(url.order, 4);
    }

    #[test]
    fn repeated_names_merge() {
        let set = RuleSet::build(
            vec![
                ("custom".to_string(), RuleOverride::new().pattern("x")),
                ("custom".to_string(), RuleOverride::new().compile(|_| String::new())),
            ],
            pairs(),
        )
        .unwrap();
        assert!(set.get("custom").is_some());
    }

    #[test]
    fn incomplete_rules_are_rejected() {
        let err = RuleSet::build(
            vec![("custom".to_string(), RuleOverride::new().pattern("x"))],
            pairs(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::IncompleteRule { field: "compile", .. }));

        let err = RuleSet::build(
            vec![(
                "custom".to_string(),
                RuleOverride::new().compile(|_| String::new()),
            )],
            pairs(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::IncompleteRule { field: "pattern", .. }));
    }

    #[test]
    fn bad_patterns_are_rejected() {
        let broken = RuleOverride::new().pattern("(").compile(|_| String::new());
        let err = RuleSet::build(vec![("custom".to_string(), broken)], pairs()).unwrap_err();
        assert!(matches!(err, Error::InvalidPattern { .. }));

        let empty = RuleOverride::new().pattern("a*").compile(|_| String::new());
        let err = RuleSet::build(vec![("custom".to_string(), empty)], pairs()).unwrap_err();
        assert!(matches!(err, Error::EmptyPattern { .. }));
    }

    #[test]
    fn matches_expose_groups() {
        let regex = Regex::new("^(?:(a)(b)?)").unwrap();
        let captures = regex.captures("ac");
        let found = RuleMatch::new("a", captures);
        assert_eq!(found.as_str(), "a");
        assert_eq!(found.get(1), Some("a"));
        assert_eq!(found.get(2), None);

        let scanned = RuleMatch::new("x.de", None);
        assert_eq!(scanned.get(0), Some("x.de"));
        assert_eq!(scanned.get(1), None);
    }
}
