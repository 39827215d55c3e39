//! The parser's error taxonomy (§7). Every variant carries enough of the
//! position/token context to build a caret diagnostic without re-deriving
//! it from the parse state.

use std::fmt;

use pq_common::{Position, Token, TokenKind};

use crate::ast::NodeKind;
use crate::nim::InvariantError;

#[derive(Debug, Clone, PartialEq)]
pub enum ParseErrorKind {
    /// A single specific token kind was required and something else (or
    /// end of input) was found.
    ExpectedTokenKind { expected: TokenKind, found: Option<Token> },
    /// Any of a small fixed set of token kinds would have done.
    ExpectedAnyTokenKind { expected: Vec<TokenKind>, found: Option<Token> },
    /// A closing delimiter was expected to match a specific opener.
    ExpectedClosingTokenKind { expected: TokenKind, opened_at: Position, found: Option<Token> },
    /// A comma-separated list ended where another item (or the closer) was
    /// still expected.
    ExpectedCsvContinuation { found: Option<Token> },
    /// A generalized identifier was required (§GLOSSARY) and the token
    /// stream didn't hold one at this position.
    ExpectedGeneralizedIdentifier { found: Option<Token> },
    /// `type` was followed by a keyword that isn't a recognized primitive.
    InvalidPrimitiveType { found: Token },
    /// `catch` was used outside of the single-argument anonymous-function
    /// shape the grammar allows for `otherwise catch`.
    InvalidCatchFunction { found: Option<Token> },
    /// A required parameter appeared after an optional one in a parameter
    /// list.
    RequiredParameterAfterOptional { position: Position },
    /// A bracket/paren disambiguation (or any other bounded-lookahead
    /// sequence under `Strict`) ran out of tokens before resolving.
    UnterminatedSequence { opened_at: Position },
    /// The document's recognizer returned successfully but tokens remain.
    UnusedTokensRemain { first_unused: Token },
    /// An internal consistency check failed; always a parser bug, never
    /// attributable to the input text.
    InvariantError(InvariantError),
    /// The caller's cancellation handle fired mid-parse.
    Cancelled,
}

/// A parse failure, carrying the kind plus the context surrounding it.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    /// The production that was being attempted when the error occurred.
    pub context_kind: Option<NodeKind>,
    pub token_index: u32,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, context_kind: Option<NodeKind>, token_index: u32) -> Self {
        Self { kind, context_kind, token_index }
    }

    pub fn invariant(message: impl Into<String>, token_index: u32) -> Self {
        Self::new(
            ParseErrorKind::InvariantError(InvariantError::new(message)),
            None,
            token_index,
        )
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ParseErrorKind::ExpectedTokenKind { expected, found } => write!(
                f,
                "expected {:?}, found {}",
                expected,
                describe_found(found)
            ),
            ParseErrorKind::ExpectedAnyTokenKind { expected, found } => write!(
                f,
                "expected one of {:?}, found {}",
                expected,
                describe_found(found)
            ),
            ParseErrorKind::ExpectedClosingTokenKind { expected, opened_at, found } => write!(
                f,
                "expected {:?} to close the sequence opened at line {}, found {}",
                expected, opened_at.line_number, describe_found(found)
            ),
            ParseErrorKind::ExpectedCsvContinuation { found } => {
                write!(f, "expected `,` or a closing delimiter, found {}", describe_found(found))
            }
            ParseErrorKind::ExpectedGeneralizedIdentifier { found } => {
                write!(f, "expected a generalized identifier, found {}", describe_found(found))
            }
            ParseErrorKind::InvalidPrimitiveType { found } => {
                write!(f, "`{}` is not a recognized primitive type", found.data)
            }
            ParseErrorKind::InvalidCatchFunction { found } => write!(
                f,
                "`catch` must be followed by a single-parameter function literal, found {}",
                describe_found(found)
            ),
            ParseErrorKind::RequiredParameterAfterOptional { position } => write!(
                f,
                "required parameter after an optional parameter at line {}",
                position.line_number
            ),
            ParseErrorKind::UnterminatedSequence { opened_at } => write!(
                f,
                "unterminated sequence opened at line {}",
                opened_at.line_number
            ),
            ParseErrorKind::UnusedTokensRemain { first_unused } => write!(
                f,
                "unexpected trailing token `{}` at line {}",
                first_unused.data, first_unused.position_start.line_number
            ),
            ParseErrorKind::InvariantError(inner) => write!(f, "internal parser error: {}", inner.message),
            ParseErrorKind::Cancelled => write!(f, "parse cancelled"),
        }
    }
}

impl std::error::Error for ParseError {}

impl From<InvariantError> for ParseErrorKind {
    fn from(value: InvariantError) -> Self {
        ParseErrorKind::InvariantError(value)
    }
}

fn describe_found(found: &Option<Token>) -> String {
    match found {
        Some(token) => format!("`{}` ({:?})", token.data, token.kind),
        None => "end of input".to_string(),
    }
}
