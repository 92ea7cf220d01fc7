use crate::source_map::Position;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures caused by a malformed rule configuration. Input text alone can
/// never produce one of these.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("rule `{rule}` has an invalid pattern: {source}")]
    InvalidPattern {
        rule: String,
        #[source]
        source: regex::Error,
    },
    #[error("rule `{rule}` has a pattern that matches the empty string")]
    EmptyPattern { rule: String },
    #[error("new rule `{rule}` is missing its `{field}`")]
    IncompleteRule { rule: String, field: &'static str },
    #[error("rule `{rule}` produced a zero-length match at {position}")]
    ZeroLengthMatch { rule: String, position: Position },
}
