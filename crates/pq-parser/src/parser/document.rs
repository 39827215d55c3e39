//! The document level (§3.3, §GLOSSARY): a bare expression, or a `section`
//! declaration with zero or more semicolon-terminated members.

use pq_common::TokenKind;

use crate::ast::{ConstantKind, NodeId, NodeKind};
use crate::error::ParseError;
use crate::state::ParseState;

use super::consume_constant;
use super::expressions::read_expression;
use super::literals::read_identifier;

/// `Document` (§3.3): the parse entry point. Either a `section` declaration
/// or a single top-level expression -- the grammar tells the two apart by
/// whether the very first token is the `section` keyword.
pub fn read_document(state: &mut ParseState) -> Result<NodeId, ParseError> {
    state.start_context(NodeKind::Document);
    if state.is_at(TokenKind::KeywordSection) {
        read_section(state)?;
    } else {
        read_expression(state)?;
    }
    state.end_context(None)
}

/// Parses a `section` declaration on its own, without the [`Document`]
/// wrapper `read_document` normally provides -- used by [`crate::ParseMode::Section`]
/// for callers that already know they're handed a section fragment.
///
/// [`Document`]: crate::ast::NodeKind::Document
pub fn read_section_standalone(state: &mut ParseState) -> Result<NodeId, ParseError> {
    read_section(state)
}

fn read_section(state: &mut ParseState) -> Result<NodeId, ParseError> {
    state.start_context(NodeKind::Section);
    consume_constant(state, TokenKind::KeywordSection, ConstantKind::Section)?;
    if state.is_at(TokenKind::Identifier) {
        read_identifier(state)?;
    } else {
        state.increment_attribute_counter()?;
    }
    consume_constant(state, TokenKind::Semicolon, ConstantKind::Semicolon)?;
    read_section_members(state)?;
    state.end_context(None)
}

/// Section members are semicolon-terminated, not comma-separated, so this
/// is a plain `ArrayWrapper` rather than the `CsvArray` the rest of the
/// grammar's lists use.
fn read_section_members(state: &mut ParseState) -> Result<NodeId, ParseError> {
    state.start_context(NodeKind::ArrayWrapper);
    while state.is_at(TokenKind::Identifier) || state.is_at(TokenKind::KeywordShared) {
        read_section_member(state)?;
    }
    state.end_context(None)
}

fn read_section_member(state: &mut ParseState) -> Result<NodeId, ParseError> {
    state.start_context(NodeKind::SectionMember);
    if state.is_at(TokenKind::KeywordShared) {
        consume_constant(state, TokenKind::KeywordShared, ConstantKind::Shared)?;
    } else {
        state.increment_attribute_counter()?;
    }
    read_identifier_paired_expression(state)?;
    consume_constant(state, TokenKind::Semicolon, ConstantKind::Semicolon)?;
    state.end_context(None)
}

fn read_identifier_paired_expression(state: &mut ParseState) -> Result<NodeId, ParseError> {
    state.start_context(NodeKind::IdentifierPairedExpression);
    read_identifier(state)?;
    consume_constant(state, TokenKind::Equal, ConstantKind::Equals)?;
    read_expression(state)?;
    state.end_context(None)
}
