use std::fmt;

use once_cell::sync::Lazy;

use crate::ast::Node;
use crate::compile::Compiler;
use crate::error::Result;
use crate::html::{escape_html, sanitize};
use crate::lexer::Lexer;
use crate::normalize::normalize;
use crate::rules::{RuleOverride, RuleSet};

/// Bracket pairs recognized unless a builder replaces them.
pub const DEFAULT_DELIMITERS: [(char, char); 7] = [
    ('(', ')'),
    ('[', ']'),
    ('{', '}'),
    ('<', '>'),
    ('"', '"'),
    ('“', '”'),
    ('«', '»'),
];

static DEFAULT_PARSER: Lazy<Parser> = Lazy::new(Parser::new);

/// Per-call settings for [`Parser::render`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Visible length budget in grapheme clusters; `None` is unbounded and
    /// `Some(0)` renders nothing.
    pub limit: Option<usize>,
    /// Run the markup through the allow-list sanitizer.
    pub sanitized: bool,
    /// Lex the text as given instead of normalizing it first.
    pub verbatim: bool,
}

/// A reusable text-to-markup pipeline. Immutable once built, so one parser
/// can serve any number of threads.
pub struct Parser {
    rules: RuleSet,
}

impl Parser {
    /// A parser with the built-in rules and delimiters.
    pub fn new() -> Self {
        Self {
            rules: RuleSet::defaults(DEFAULT_DELIMITERS.to_vec()),
        }
    }

    /// The process-wide parser with the built-in rules, built on first use.
    pub fn global() -> &'static Parser {
        &DEFAULT_PARSER
    }

    pub fn builder() -> ParserBuilder {
        ParserBuilder::default()
    }

    /// Splits `text` into nodes. Fails only when a caller pattern produces
    /// a zero-length match.
    pub fn lex(&self, text: &str) -> Result<Vec<Node>> {
        Lexer::new(&self.rules, text).run()
    }

    pub fn compile(&self, nodes: &[Node], limit: Option<usize>) -> String {
        Compiler::new(&self.rules).compile(nodes, limit)
    }

    /// Normalizes, lexes and compiles `text`.
    pub fn process(&self, text: &str, limit: Option<usize>) -> Result<String> {
        self.process_verbatim(&normalize(text), limit)
    }

    /// Like [`Parser::process`], then sanitized.
    pub fn process_sanitized(&self, text: &str, limit: Option<usize>) -> Result<String> {
        self.process(text, limit).map(|html| sanitize(&html))
    }

    /// Lexes and compiles `text` without normalizing it.
    pub fn process_verbatim(&self, text: &str, limit: Option<usize>) -> Result<String> {
        let nodes = self.lex(text)?;
        Ok(self.compile(&nodes, limit))
    }

    pub fn render(&self, text: &str, options: &RenderOptions) -> Result<String> {
        let html = if options.verbatim {
            self.process_verbatim(text, options.limit)?
        } else {
            self.process(text, options.limit)?
        };
        Ok(if options.sanitized {
            sanitize(&html)
        } else {
            html
        })
    }

    /// Rule names in the order they are tried, the fallback last.
    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.names().collect()
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Parser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parser")
            .field("rules", &self.rule_names())
            .field("delimiters", &self.rules.delimiters())
            .finish()
    }
}

/// Factory-time configuration: rule overrides and bracket delimiters.
#[derive(Debug, Clone)]
pub struct ParserBuilder {
    overrides: Vec<(String, RuleOverride)>,
    delimiters: Vec<(char, char)>,
}

impl Default for ParserBuilder {
    fn default() -> Self {
        Self {
            overrides: Vec::new(),
            delimiters: DEFAULT_DELIMITERS.to_vec(),
        }
    }
}

impl ParserBuilder {
    /// Overrides the fields of a built-in rule, or adds a rule under a new
    /// name. Declaration order breaks ties between equal orders.
    pub fn rule(mut self, name: impl Into<String>, rule: RuleOverride) -> Self {
        self.overrides.push((name.into(), rule));
        self
    }

    /// Replaces the bracket pairs. A pair with the same opening and closing
    /// character behaves like a quote.
    pub fn delimiters(mut self, pairs: impl IntoIterator<Item = (char, char)>) -> Self {
        self.delimiters = pairs.into_iter().collect();
        self
    }

    pub fn build(self) -> Result<Parser> {
        let count = self.overrides.len();
        let rules = RuleSet::build(self.overrides, self.delimiters)?;
        tracing::debug!(
            overrides = count,
            rules = rules.rules().len(),
            "built parser"
        );
        Ok(Parser { rules })
    }
}

/// Builds a parser from `(name, override)` pairs.
pub fn create_parser<I, N>(overrides: I) -> Result<Parser>
where
    I: IntoIterator<Item = (N, RuleOverride)>,
    N: Into<String>,
{
    overrides
        .into_iter()
        .fold(Parser::builder(), |builder, (name, rule)| builder.rule(name, rule))
        .build()
}

/// Renders `text` with the built-in rules.
///
/// Never fails: the built-in rules cannot produce a zero-length match, and
/// should lexing still fail the escaped input is returned.
pub fn process(text: &str, limit: Option<usize>) -> String {
    match Parser::global().process(text, limit) {
        Ok(html) => html,
        Err(err) => {
            tracing::error!(error = %err, "default rules failed, returning escaped input");
            escape_html(text)
        }
    }
}
