//! The parse-step library (§4.1, §4.4): one recognizer module per grammar
//! family, all built from `ParseState`'s primitives.

pub mod document;
pub mod expressions;
pub mod literals;
pub mod types;

use pq_common::TokenKind;

use crate::ast::{ConstantKind, LeafPayload, NodeId, NodeKind};
use crate::error::ParseError;
use crate::state::ParseState;

/// Consume the current token, expected to be `expected`, as a `Constant`
/// leaf carrying `constant`. The one-liner every recognizer in this module
/// reaches for to read a keyword or punctuator it doesn't need to inspect
/// further.
pub(crate) fn consume_constant(state: &mut ParseState, expected: TokenKind, constant: ConstantKind) -> Result<NodeId, ParseError> {
    state.start_context(NodeKind::Constant);
    state.expect_token_kind(expected)?;
    state.end_context(Some(LeafPayload::Constant(constant)))
}

/// Reads a comma-separated list into a `CsvArray` wrapper node, stopping at
/// `closing` (left unconsumed for the caller). Individual commas are read
/// as plain `Constant` children interleaved with `read_item`'s results.
pub(crate) fn read_csv(
    state: &mut ParseState,
    closing: TokenKind,
    mut read_item: impl FnMut(&mut ParseState) -> Result<NodeId, ParseError>,
) -> Result<NodeId, ParseError> {
    state.start_context(NodeKind::CsvArray);
    let mut first = true;
    while !state.is_at(closing) {
        if !first {
            consume_constant(state, TokenKind::Comma, ConstantKind::Comma)?;
        }
        first = false;
        read_item(state)?;
    }
    state.end_context(None)
}
