//! Shared position, span, and locale primitives used by the Power Query
//! lexer, parser, and their consumers.

pub mod position;
pub mod token;

pub use position::{LineIndex, Position, TokenRange};
pub use token::{keyword_from_str, Token, TokenKind};

/// A locale tag used to select the language for formatted diagnostics.
/// Formatting itself is external to this toolkit (§4.6); the core only
/// threads the tag through so a consumer can pick the right message table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleTag(pub String);

impl Default for LocaleTag {
    fn default() -> Self {
        LocaleTag("en-US".to_string())
    }
}

impl From<&str> for LocaleTag {
    fn from(value: &str) -> Self {
        LocaleTag(value.to_string())
    }
}
