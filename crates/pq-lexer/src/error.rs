//! Lexer error types.

use std::fmt;

use pq_common::Position;

/// A lexer error with location information.
///
/// Errors are collected rather than aborting lexing immediately, so a
/// caller can report every problem in a source file in one pass.
#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub kind: LexErrorKind,
    pub position_start: Position,
    pub position_end: Position,
}

impl LexError {
    pub fn new(kind: LexErrorKind, position_start: Position, position_end: Position) -> Self {
        Self {
            kind,
            position_start,
            position_end,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LexErrorKind {
    UnexpectedCharacter(char),
    UnterminatedTextLiteral,
    UnterminatedQuotedIdentifier,
    InvalidNumericLiteral(String),
}

impl fmt::Display for LexErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedCharacter(c) => write!(f, "unexpected character: {c:?}"),
            Self::UnterminatedTextLiteral => write!(f, "unterminated text literal"),
            Self::UnterminatedQuotedIdentifier => write!(f, "unterminated quoted identifier"),
            Self::InvalidNumericLiteral(s) => write!(f, "invalid numeric literal: {s}"),
        }
    }
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl std::error::Error for LexError {}
