//! Library-level error handling.
//!
//! vSQL distinguishes two error channels (see `spec.md` §4.6 / §7):
//!
//! - Non-throwing, per-node compile errors (`crate::datatype::CompileError`),
//!   attached directly to an AST node and never propagated as a Rust `Err`.
//! - A small set of genuinely fatal conditions — a malformed rule spec, a
//!   keyword argument in a call, an unsupported source construct — that
//!   *do* propagate as `Err(Error)`, because they indicate a programmer
//!   mistake rather than ordinary invalid user input.

use std::fmt;
use thiserror::Error as ThisError;

/// A span in the source code, represented as byte offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    /// Start byte offset (inclusive)
    pub start: usize,
    /// End byte offset (exclusive)
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn point(pos: usize) -> Self {
        Self {
            start: pos,
            end: pos + 1,
        }
    }

    pub fn empty(pos: usize) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }

    /// Merge two spans into one that covers both.
    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Slice the given source buffer by this span.
    pub fn slice<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }
}

/// Fatal, thrown errors. These are the only `Err` values this crate's
/// public API returns; see the module doc comment for the rationale.
#[derive(Debug, Clone, ThisError, PartialEq, Eq)]
pub enum ErrorKind {
    /// Lexer could not tokenise the input.
    #[error("unexpected character '{0}'")]
    UnexpectedCharacter(char),
    #[error("unterminated string literal")]
    UnterminatedString,

    /// Parser hit a construct outside the supported grammar subset
    /// (comprehensions, generator expressions, lambdas, ...).
    #[error("unsupported construct: {0}")]
    UnsupportedConstruct(String),
    #[error("expected {expected}, found {found}")]
    UnexpectedToken { expected: String, found: String },
    #[error("unexpected end of input")]
    UnexpectedEof,

    /// A call supplied a keyword argument. `spec.md` §6.1 / §7: fatal.
    #[error("keyword arguments are not supported in calls")]
    KeywordArgument,

    /// A rule spec's forward reference `T<n>` resolved to another forward
    /// reference instead of a concrete operand position. `spec.md` §7: fatal.
    #[error("rule spec forward reference T{0} resolves to another forward reference")]
    ChainedForwardReference(usize),

    /// A rule spec string failed to parse (malformed signature or template).
    #[error("malformed rule spec: {0}")]
    MalformedRuleSpec(String),
}

/// A fatal error with source location information.
#[derive(Debug, Clone, ThisError)]
pub struct Error {
    pub kind: ErrorKind,
    span: Option<Span>,
    context: Option<String>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            span: None,
            context: None,
        }
    }

    pub fn with_span(kind: ErrorKind, span: Span) -> Self {
        Self {
            kind,
            span: Some(span),
            context: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn span(&self) -> Option<Span> {
        self.span
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn unexpected_char(c: char, pos: usize) -> Self {
        Self::with_span(ErrorKind::UnexpectedCharacter(c), Span::point(pos))
    }

    pub fn unexpected_token(expected: impl Into<String>, found: impl Into<String>, span: Span) -> Self {
        Self::with_span(
            ErrorKind::UnexpectedToken {
                expected: expected.into(),
                found: found.into(),
            },
            span,
        )
    }

    pub fn unexpected_eof(pos: usize) -> Self {
        Self::with_span(ErrorKind::UnexpectedEof, Span::point(pos))
    }

    pub fn unterminated_string(span: Span) -> Self {
        Self::with_span(ErrorKind::UnterminatedString, span)
    }

    pub fn unsupported_construct(what: impl Into<String>, span: Span) -> Self {
        Self::with_span(ErrorKind::UnsupportedConstruct(what.into()), span)
    }

    pub fn keyword_argument(span: Span) -> Self {
        Self::with_span(ErrorKind::KeywordArgument, span)
    }

    pub fn chained_forward_reference(n: usize) -> Self {
        Self::new(ErrorKind::ChainedForwardReference(n))
    }

    pub fn malformed_rule_spec(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedRuleSpec(msg.into()))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(ref ctx) = self.context {
            write!(f, " ({})", ctx)?;
        }
        if let Some(span) = self.span {
            write!(f, " at position {}", span.start)?;
        }
        Ok(())
    }
}

/// A specialized Result type for vSQL operations that can fail fatally.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_merge() {
        let span1 = Span::new(10, 20);
        let span2 = Span::new(15, 30);
        let merged = span1.merge(span2);
        assert_eq!(merged.start, 10);
        assert_eq!(merged.end, 30);
    }

    #[test]
    fn test_error_display() {
        let err = Error::unexpected_char('$', 5);
        let msg = format!("{}", err);
        assert!(msg.contains("unexpected character"));
        assert!(msg.contains('$'));
        assert!(msg.contains("position 5"));
    }

    #[test]
    fn test_error_with_context() {
        let err = Error::new(ErrorKind::UnexpectedEof).with_context("parsing argument list");
        let msg = format!("{}", err);
        assert!(msg.contains("parsing argument list"));
    }
}
