//! The token vocabulary shared between the lexer (which produces tokens)
//! and the parser (which consumes them). Comments are not part of this
//! enumeration: per §3.1 the token stream the core consumes has already
//! had comments and whitespace stripped by the lexer.

use serde::Serialize;

use crate::position::Position;

/// An immutable token, as produced by the lexer and consumed by the parser.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    /// The literal source text this token spans.
    pub data: String,
    pub position_start: Position,
    pub position_end: Position,
}

impl Token {
    pub fn new(kind: TokenKind, data: impl Into<String>, position_start: Position, position_end: Position) -> Self {
        Self {
            kind,
            data: data.into(),
            position_start,
            position_end,
        }
    }
}

/// Closed enumeration of every kind of token the core grammar can consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenKind {
    // ── Keywords ───────────────────────────────────────────────────────
    KeywordAnd,
    KeywordAs,
    KeywordEach,
    KeywordElse,
    KeywordError,
    KeywordIf,
    KeywordIn,
    KeywordIs,
    KeywordLet,
    KeywordMeta,
    KeywordNot,
    KeywordOr,
    KeywordOtherwise,
    KeywordSection,
    KeywordShared,
    KeywordThen,
    KeywordTry,
    KeywordType,
    KeywordHashBinary,
    KeywordHashDate,
    KeywordHashDateTime,
    KeywordHashDateTimeZone,
    KeywordHashDuration,
    KeywordHashInfinity,
    KeywordHashNan,
    KeywordHashSections,
    KeywordHashShared,
    KeywordHashTable,
    KeywordHashTime,

    // ── Literal keywords (distinct from identifier-like keywords) ───────
    NullLiteral,
    TrueLiteral,
    FalseLiteral,

    // ── Punctuators ───────────────────────────────────────────────────
    LeftParenthesis,
    RightParenthesis,
    LeftBracket,
    RightBracket,
    LeftBrace,
    RightBrace,
    Comma,
    Semicolon,
    Dot,
    Equal,
    NotEqual,
    LessThan,
    LessThanEqualTo,
    GreaterThan,
    GreaterThanEqualTo,
    Plus,
    Minus,
    Asterisk,
    Division,
    Ampersand,
    At,
    DotDotDot,
    FatArrow,
    QuestionMark,
    NullCoalescingOperator,

    // ── Identifier and literals ───────────────────────────────────────
    Identifier,
    NumericLiteral,
    TextLiteral,

    Eof,
}

impl TokenKind {
    /// Rendered form used in diagnostics (e.g. "expected `then`").
    pub fn as_str(self) -> &'static str {
        match self {
            TokenKind::KeywordAnd => "and",
            TokenKind::KeywordAs => "as",
            TokenKind::KeywordEach => "each",
            TokenKind::KeywordElse => "else",
            TokenKind::KeywordError => "error",
            TokenKind::KeywordIf => "if",
            TokenKind::KeywordIn => "in",
            TokenKind::KeywordIs => "is",
            TokenKind::KeywordLet => "let",
            TokenKind::KeywordMeta => "meta",
            TokenKind::KeywordNot => "not",
            TokenKind::KeywordOr => "or",
            TokenKind::KeywordOtherwise => "otherwise",
            TokenKind::KeywordSection => "section",
            TokenKind::KeywordShared => "shared",
            TokenKind::KeywordThen => "then",
            TokenKind::KeywordTry => "try",
            TokenKind::KeywordType => "type",
            TokenKind::KeywordHashBinary => "#binary",
            TokenKind::KeywordHashDate => "#date",
            TokenKind::KeywordHashDateTime => "#datetime",
            TokenKind::KeywordHashDateTimeZone => "#datetimezone",
            TokenKind::KeywordHashDuration => "#duration",
            TokenKind::KeywordHashInfinity => "#infinity",
            TokenKind::KeywordHashNan => "#nan",
            TokenKind::KeywordHashSections => "#sections",
            TokenKind::KeywordHashShared => "#shared",
            TokenKind::KeywordHashTable => "#table",
            TokenKind::KeywordHashTime => "#time",
            TokenKind::NullLiteral => "null",
            TokenKind::TrueLiteral => "true",
            TokenKind::FalseLiteral => "false",
            TokenKind::LeftParenthesis => "(",
            TokenKind::RightParenthesis => ")",
            TokenKind::LeftBracket => "[",
            TokenKind::RightBracket => "]",
            TokenKind::LeftBrace => "{",
            TokenKind::RightBrace => "}",
            TokenKind::Comma => ",",
            TokenKind::Semicolon => ";",
            TokenKind::Dot => ".",
            TokenKind::Equal => "=",
            TokenKind::NotEqual => "<>",
            TokenKind::LessThan => "<",
            TokenKind::LessThanEqualTo => "<=",
            TokenKind::GreaterThan => ">",
            TokenKind::GreaterThanEqualTo => ">=",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Asterisk => "*",
            TokenKind::Division => "/",
            TokenKind::Ampersand => "&",
            TokenKind::At => "@",
            TokenKind::DotDotDot => "...",
            TokenKind::FatArrow => "=>",
            TokenKind::QuestionMark => "?",
            TokenKind::NullCoalescingOperator => "??",
            TokenKind::Identifier => "identifier",
            TokenKind::NumericLiteral => "number literal",
            TokenKind::TextLiteral => "text literal",
            TokenKind::Eof => "end of input",
        }
    }

    /// Whether this kind is one of the constant operator/keyword kinds that
    /// the binary-operator combiner's static token-kind table can key on.
    pub fn is_constant_leaf(self) -> bool {
        !matches!(
            self,
            TokenKind::Identifier | TokenKind::NumericLiteral | TokenKind::TextLiteral | TokenKind::Eof
        )
    }
}

/// Look up a keyword from its literal spelling. Returns `None` for anything
/// that is a plain identifier.
pub fn keyword_from_str(s: &str) -> Option<TokenKind> {
    match s {
        "and" => Some(TokenKind::KeywordAnd),
        "as" => Some(TokenKind::KeywordAs),
        "each" => Some(TokenKind::KeywordEach),
        "else" => Some(TokenKind::KeywordElse),
        "error" => Some(TokenKind::KeywordError),
        "if" => Some(TokenKind::KeywordIf),
        "in" => Some(TokenKind::KeywordIn),
        "is" => Some(TokenKind::KeywordIs),
        "let" => Some(TokenKind::KeywordLet),
        "meta" => Some(TokenKind::KeywordMeta),
        "not" => Some(TokenKind::KeywordNot),
        "or" => Some(TokenKind::KeywordOr),
        "otherwise" => Some(TokenKind::KeywordOtherwise),
        "section" => Some(TokenKind::KeywordSection),
        "shared" => Some(TokenKind::KeywordShared),
        "then" => Some(TokenKind::KeywordThen),
        "try" => Some(TokenKind::KeywordTry),
        "type" => Some(TokenKind::KeywordType),
        "#binary" => Some(TokenKind::KeywordHashBinary),
        "#date" => Some(TokenKind::KeywordHashDate),
        "#datetime" => Some(TokenKind::KeywordHashDateTime),
        "#datetimezone" => Some(TokenKind::KeywordHashDateTimeZone),
        "#duration" => Some(TokenKind::KeywordHashDuration),
        "#infinity" => Some(TokenKind::KeywordHashInfinity),
        "#nan" => Some(TokenKind::KeywordHashNan),
        "#sections" => Some(TokenKind::KeywordHashSections),
        "#shared" => Some(TokenKind::KeywordHashShared),
        "#table" => Some(TokenKind::KeywordHashTable),
        "#time" => Some(TokenKind::KeywordHashTime),
        "null" => Some(TokenKind::NullLiteral),
        "true" => Some(TokenKind::TrueLiteral),
        "false" => Some(TokenKind::FalseLiteral),
        _ => None,
    }
}
