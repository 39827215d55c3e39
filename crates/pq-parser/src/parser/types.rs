//! Type expressions: primitive, nullable, list, record, table, and
//! function types, plus the field-specification lists that record and
//! table types share.
//!
//! `"nullable"`, `"optional"`, `"function"`, and `"table"` are all
//! contextual keywords here: the lexer has no dedicated token kind for
//! them (they're ordinary identifiers everywhere else in the grammar), so
//! each is recognized by spelling at the one or two positions where it's
//! meaningful.

use pq_common::TokenKind;

use crate::ast::{ConstantKind, NodeId, NodeKind};
use crate::error::{ParseError, ParseErrorKind};
use crate::state::ParseState;

use super::consume_constant;
use super::literals::{is_primitive_type_name, read_generalized_identifier, read_identifier, read_primitive_type};

fn is_contextual_keyword(state: &ParseState, spelling: &str) -> bool {
    matches!(state.current_token(), Some(t) if t.kind == TokenKind::Identifier && t.data == spelling)
}

fn consume_contextual_keyword(state: &mut ParseState, constant: ConstantKind) -> Result<NodeId, ParseError> {
    consume_constant(state, TokenKind::Identifier, constant)
}

/// `NullablePrimitiveType` (§3.3): the right-hand-side reader the binary
/// combiner uses for `is`/`as`.
pub fn read_nullable_primitive_type(state: &mut ParseState) -> Result<NodeId, ParseError> {
    state.start_context(NodeKind::NullablePrimitiveType);
    if is_contextual_keyword(state, "nullable") {
        consume_contextual_keyword(state, ConstantKind::Nullable)?;
    } else {
        state.increment_attribute_counter()?;
    }
    read_primitive_type(state)?;
    state.end_context(None)
}

/// The type grammar's `<type>` nonterminal (§3.3): every alternative here
/// is resolved by its own leading token, so this folds what a grammar
/// reference draws as a PrimaryType/FunctionType/TableType hierarchy into
/// one dispatch.
pub fn read_type_expression(state: &mut ParseState) -> Result<NodeId, ParseError> {
    match state.current_token_kind() {
        Some(TokenKind::LeftBracket) => read_record_type(state),
        Some(TokenKind::LeftBrace) => read_list_type(state),
        Some(TokenKind::Identifier) if is_contextual_keyword(state, "nullable") => read_nullable_type(state),
        Some(TokenKind::Identifier) if is_contextual_keyword(state, "function") && state.peek_kind(1) == Some(TokenKind::LeftParenthesis) => {
            read_function_type(state)
        }
        Some(TokenKind::Identifier) if is_contextual_keyword(state, "table") && state.peek_kind(1) == Some(TokenKind::LeftBracket) => {
            read_table_type(state)
        }
        Some(TokenKind::Identifier) if state.current_token().map(|t| is_primitive_type_name(&t.data)).unwrap_or(false) => {
            read_primitive_type(state)
        }
        found => Err(ParseError::new(
            ParseErrorKind::ExpectedAnyTokenKind {
                expected: vec![TokenKind::LeftBracket, TokenKind::LeftBrace, TokenKind::Identifier],
                found: found.and_then(|_| state.current_token().cloned()),
            },
            None,
            state.token_index,
        )),
    }
}

fn read_nullable_type(state: &mut ParseState) -> Result<NodeId, ParseError> {
    state.start_context(NodeKind::NullableType);
    consume_contextual_keyword(state, ConstantKind::Nullable)?;
    read_type_expression(state)?;
    state.end_context(None)
}

fn read_list_type(state: &mut ParseState) -> Result<NodeId, ParseError> {
    state.start_context(NodeKind::ListType);
    consume_constant(state, TokenKind::LeftBrace, ConstantKind::LeftBrace)?;
    read_type_expression(state)?;
    consume_constant(state, TokenKind::RightBrace, ConstantKind::RightBrace)?;
    state.end_context(None)
}

fn read_record_type(state: &mut ParseState) -> Result<NodeId, ParseError> {
    state.start_context(NodeKind::RecordType);
    read_field_specification_list(state)?;
    state.end_context(None)
}

/// `"table" row-type`, where `row-type` is a field-specification list
/// shaped just like a record type's.
fn read_table_type(state: &mut ParseState) -> Result<NodeId, ParseError> {
    state.start_context(NodeKind::TableType);
    consume_contextual_keyword(state, ConstantKind::TableKeyword)?;
    read_field_specification_list(state)?;
    state.end_context(None)
}

fn read_function_type(state: &mut ParseState) -> Result<NodeId, ParseError> {
    state.start_context(NodeKind::FunctionType);
    consume_contextual_keyword(state, ConstantKind::Function)?;
    read_parameter_list(state, true)?;
    read_as_type(state)?;
    state.end_context(None)
}

/// `as <type>` (§3.3 `AsType`): shared by `FunctionType`'s return
/// annotation and by each parameter's own type annotation.
fn read_as_type(state: &mut ParseState) -> Result<NodeId, ParseError> {
    state.start_context(NodeKind::AsType);
    consume_constant(state, TokenKind::KeywordAs, ConstantKind::As)?;
    read_type_expression(state)?;
    state.end_context(None)
}

/// `as <nullable-primitive-type>` (§3.3 `AsNullablePrimitiveType`): a
/// `FunctionExpression`'s optional return-type annotation, narrower than
/// `FunctionType`'s own `as <type>`.
pub fn read_function_return_type(state: &mut ParseState) -> Result<NodeId, ParseError> {
    state.start_context(NodeKind::AsNullablePrimitiveType);
    consume_constant(state, TokenKind::KeywordAs, ConstantKind::As)?;
    read_nullable_primitive_type(state)?;
    state.end_context(None)
}

/// `[ field : type, ... ]` or `[ field : type, ..., ... ]` (the trailing
/// `...` means "and possibly other fields", §3.3 open-record marker).
pub fn read_field_specification_list(state: &mut ParseState) -> Result<NodeId, ParseError> {
    state.start_context(NodeKind::FieldSpecificationList);
    consume_constant(state, TokenKind::LeftBracket, ConstantKind::LeftBracket)?;

    let mut first = true;
    loop {
        if state.is_at(TokenKind::RightBracket) {
            break;
        }
        if state.is_at(TokenKind::DotDotDot) {
            consume_constant(state, TokenKind::DotDotDot, ConstantKind::DotDotDot)?;
            break;
        }
        if !first {
            consume_constant(state, TokenKind::Comma, ConstantKind::Comma)?;
        }
        first = false;
        read_field_specification(state)?;
    }

    consume_constant(state, TokenKind::RightBracket, ConstantKind::RightBracket)?;
    state.end_context(None)
}

fn read_field_specification(state: &mut ParseState) -> Result<NodeId, ParseError> {
    state.start_context(NodeKind::FieldSpecification);
    read_generalized_identifier(state)?;
    if state.is_at(TokenKind::Equal) {
        read_field_type_specification(state)?;
    } else {
        state.increment_attribute_counter()?;
    }
    state.end_context(None)
}

fn read_field_type_specification(state: &mut ParseState) -> Result<NodeId, ParseError> {
    state.start_context(NodeKind::FieldTypeSpecification);
    consume_constant(state, TokenKind::Equal, ConstantKind::Equals)?;
    read_type_expression(state)?;
    state.end_context(None)
}

/// Parameter lists are shared between `FunctionExpression` and
/// `FunctionType` (§3.3): each parameter is optionally prefixed by
/// `optional` and, when `types_required`, must carry `as <type>`.
pub fn read_parameter_list(state: &mut ParseState, types_required: bool) -> Result<NodeId, ParseError> {
    state.start_context(NodeKind::ParameterList);
    consume_constant(state, TokenKind::LeftParenthesis, ConstantKind::LeftParenthesis)?;

    let mut first = true;
    let mut seen_optional = false;
    while !state.is_at(TokenKind::RightParenthesis) {
        if !first {
            consume_constant(state, TokenKind::Comma, ConstantKind::Comma)?;
        }
        first = false;
        let is_optional = read_parameter(state, types_required)?;
        if seen_optional && !is_optional {
            let position = state.current_token().map(|t| t.position_start).unwrap_or_else(pq_common::Position::start);
            return Err(ParseError::new(ParseErrorKind::RequiredParameterAfterOptional { position }, None, state.token_index));
        }
        seen_optional |= is_optional;
    }

    consume_constant(state, TokenKind::RightParenthesis, ConstantKind::RightParenthesis)?;
    state.end_context(None)
}

/// Returns whether this parameter was marked `optional`.
fn read_parameter(state: &mut ParseState, types_required: bool) -> Result<bool, ParseError> {
    state.start_context(NodeKind::Parameter);
    let is_optional = is_contextual_keyword(state, "optional");
    if is_optional {
        consume_contextual_keyword(state, ConstantKind::Optional)?;
    } else {
        state.increment_attribute_counter()?;
    }
    read_identifier(state)?;
    if state.is_at(TokenKind::KeywordAs) {
        read_as_type(state)?;
    } else if types_required {
        return Err(ParseError::new(
            ParseErrorKind::ExpectedTokenKind { expected: TokenKind::KeywordAs, found: state.current_token().cloned() },
            None,
            state.token_index,
        ));
    } else {
        state.increment_attribute_counter()?;
    }
    state.end_context(None)?;
    Ok(is_optional)
}
