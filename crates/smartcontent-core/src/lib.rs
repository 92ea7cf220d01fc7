mod ast;
mod compile;
mod domain;
mod error;
mod html;
mod lexer;
mod normalize;
mod parser;
mod punctuation;
mod rules;
mod source_map;
mod span;
mod strings;
mod tld;

pub use ast::Node;
pub use domain::{is_domain_ok, is_email, link_display, link_href, url_prefix};
pub use error::{Error, Result};
pub use html::{escape_html, sanitize, tag};
pub use normalize::normalize;
pub use parser::{
    DEFAULT_DELIMITERS, Parser, ParserBuilder, RenderOptions, create_parser, process,
};
pub use punctuation::{leading_punctuation, trailing_punctuation};
pub use rules::{
    BRACKET, CompileFn, EMAIL, NEWLINE, PARAGRAPH, ParseFn, RuleKind, RuleMatch, RuleOverride,
    TEXT, URL, WHITESPACE, inject_order,
};
pub use source_map::{Position, Range, SourceMap};
pub use span::Span;
pub use strings::{ELLIPSIS, shorten_string, truncate_graphemes, unicode_length};
pub use tld::DomainSuffixMatcher;
