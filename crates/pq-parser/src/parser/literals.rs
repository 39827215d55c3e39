//! Leaf recognizers: identifiers, generalized identifiers, literals, and
//! primitive types. Every function here opens exactly one context,
//! consumes exactly the tokens that belong to its leaf, and closes it.

use pq_common::TokenKind;

use crate::ast::{ConstantKind, LeafPayload, LiteralKind, NodeId, NodeKind};
use crate::disambiguator::is_generalized_identifier_start;
use crate::error::{ParseError, ParseErrorKind};
use crate::state::ParseState;

/// The contextual keywords that name primitive types inside a type
/// expression (§GLOSSARY). Lexed as plain identifiers; only meaningful
/// immediately after `type` or in another type-expression position.
const PRIMITIVE_TYPE_NAMES: &[&str] = &[
    "any", "anynonnull", "binary", "date", "datetime", "datetimezone", "duration", "function", "list", "logical",
    "none", "null", "number", "record", "table", "text", "time", "type",
];

pub fn is_primitive_type_name(text: &str) -> bool {
    PRIMITIVE_TYPE_NAMES.contains(&text)
}

pub fn read_identifier(state: &mut ParseState) -> Result<NodeId, ParseError> {
    state.start_context(NodeKind::Identifier);
    let token = state.expect_token_kind(TokenKind::Identifier)?;
    state.end_context(Some(LeafPayload::Identifier(token.data)))
}

/// A generalized identifier admits any of the language's keywords as well
/// as plain identifiers (§GLOSSARY) -- e.g. `[type]` is a valid field
/// name. A failed `ParseError` here abandons the whole parse state (or,
/// under speculative disambiguation, just the losing branch), so there's
/// nothing to unwind on the error path.
pub fn read_generalized_identifier(state: &mut ParseState) -> Result<NodeId, ParseError> {
    state.start_context(NodeKind::GeneralizedIdentifier);
    let found = state.current_token().cloned();
    if !found.as_ref().map(|t| is_generalized_identifier_start(t.kind)).unwrap_or(false) {
        return Err(ParseError::new(ParseErrorKind::ExpectedGeneralizedIdentifier { found }, None, state.token_index));
    }
    let token = found.expect("checked above");
    state.expect_any_token_kind(&[token.kind])?;
    state.end_context(Some(LeafPayload::GeneralizedIdentifier(token.data)))
}

const LITERAL_TOKEN_KINDS: [TokenKind; 5] = [
    TokenKind::NumericLiteral,
    TokenKind::TextLiteral,
    TokenKind::NullLiteral,
    TokenKind::TrueLiteral,
    TokenKind::FalseLiteral,
];

pub fn read_literal_expression(state: &mut ParseState) -> Result<NodeId, ParseError> {
    state.start_context(NodeKind::LiteralExpression);
    let literal_kind = match state.current_token_kind() {
        Some(TokenKind::NumericLiteral) => LiteralKind::Numeric,
        Some(TokenKind::TextLiteral) => LiteralKind::Text,
        Some(TokenKind::NullLiteral) => LiteralKind::Null,
        Some(TokenKind::TrueLiteral) => LiteralKind::True,
        Some(TokenKind::FalseLiteral) => LiteralKind::False,
        _ => {
            let found = state.current_token().cloned();
            return Err(ParseError::new(
                ParseErrorKind::ExpectedAnyTokenKind { expected: LITERAL_TOKEN_KINDS.to_vec(), found },
                None,
                state.token_index,
            ));
        }
    };
    let token = state.expect_any_token_kind(&LITERAL_TOKEN_KINDS)?;
    state.end_context(Some(LeafPayload::Literal(literal_kind, token.data)))
}

/// `type`'s primitive leaf: a bare identifier matching one of the known
/// type-name spellings.
pub fn read_primitive_type(state: &mut ParseState) -> Result<NodeId, ParseError> {
    state.start_context(NodeKind::PrimitiveType);
    match state.current_token() {
        Some(t) if t.kind == TokenKind::Identifier && is_primitive_type_name(&t.data) => {}
        Some(found) => {
            let found = found.clone();
            return Err(ParseError::new(ParseErrorKind::InvalidPrimitiveType { found }, None, state.token_index));
        }
        None => {
            return Err(ParseError::new(
                ParseErrorKind::ExpectedTokenKind { expected: TokenKind::Identifier, found: None },
                None,
                state.token_index,
            ));
        }
    }
    let token = state.expect_token_kind(TokenKind::Identifier)?;
    state.end_context(Some(LeafPayload::PrimitiveType(token.data)))
}

/// Whether the current token could start an identifier-expression:
/// either a plain identifier, or one of the `#`-prefixed keywords that
/// act as the callee of an invocation (`#date(...)`, `#table(...)`, etc).
pub fn is_keyword_identifier(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::KeywordHashBinary
            | TokenKind::KeywordHashDate
            | TokenKind::KeywordHashDateTime
            | TokenKind::KeywordHashDateTimeZone
            | TokenKind::KeywordHashDuration
            | TokenKind::KeywordHashInfinity
            | TokenKind::KeywordHashNan
            | TokenKind::KeywordHashSections
            | TokenKind::KeywordHashShared
            | TokenKind::KeywordHashTable
            | TokenKind::KeywordHashTime
    )
}

/// `IdentifierExpression` (§3.3): an optional `@` marker (explicit
/// recursive-scope lookup) followed by an `Identifier`, or one of the
/// `#`-keywords standing in for the identifier.
pub fn read_identifier_expression(state: &mut ParseState) -> Result<NodeId, ParseError> {
    state.start_context(NodeKind::IdentifierExpression);
    if state.is_at(TokenKind::At) {
        state.start_context(NodeKind::Constant);
        state.expect_token_kind(TokenKind::At)?;
        state.end_context(Some(LeafPayload::Constant(ConstantKind::At)))?;
    } else {
        state.increment_attribute_counter()?;
    }
    if state.current_token_kind().map(is_keyword_identifier).unwrap_or(false) {
        let token = state.current_token().cloned().expect("checked above");
        state.start_context(NodeKind::Identifier);
        state.expect_any_token_kind(&[token.kind])?;
        state.end_context(Some(LeafPayload::Identifier(token.data)))?;
    } else {
        read_identifier(state)?;
    }
    state.end_context(None)
}
