//! Error types for ruleset parsing.

use thiserror::Error;

/// What went wrong while parsing a ruleset.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParseErrorKind {
    /// The source contains no rules (only whitespace or comments).
    #[error("the ruleset is empty")]
    Empty,

    /// A string literal was opened but never closed.
    #[error("unterminated string literal")]
    UnterminatedString,

    /// A backslash inside a string literal was not followed by `"` or `\`.
    #[error("invalid escape sequence in string literal")]
    InvalidEscape,

    /// A character that cannot start any token.
    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),

    /// A predicate names a field that does not exist.
    #[error("unknown field '{0}'")]
    UnknownField(String),

    /// A predicate uses an operator that does not exist.
    #[error("unknown operator '{0}', expected 'is', 'matches' or 'contains'")]
    UnknownOperator(String),

    /// The parser needed one thing and found another.
    #[error("expected {expected}, found {found}")]
    Expected {
        /// Description of what the grammar allows here.
        expected: &'static str,
        /// Description of the token actually present.
        found: String,
    },

    /// Input continues after a complete ruleset.
    #[error("unexpected {0} after the end of the ruleset")]
    Trailing(String),

    /// Parentheses or `not` nested deeper than the parser allows.
    #[error("expression nested more than {0} levels deep")]
    TooDeep(usize),
}

/// A ruleset parse failure with its source position.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} (line {line}, column {column})")]
pub struct ParseError {
    /// What went wrong.
    pub kind: ParseErrorKind,
    /// Byte offset into the source.
    pub offset: usize,
    /// 1-based line number.
    pub line: usize,
    /// 1-based column, counted in characters.
    pub column: usize,
}

impl ParseError {
    /// Build an error at `offset` within `source`, computing line and column.
    pub(crate) fn at(source: &str, offset: usize, kind: ParseErrorKind) -> Self {
        let offset = offset.min(source.len());
        let before = source.get(..offset).unwrap_or(source);
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
        let column = before[line_start..].chars().count() + 1;
        Self {
            kind,
            offset,
            line,
            column,
        }
    }
}
