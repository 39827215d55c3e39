//! `pq-parser`: an incremental, context-tracking parser core for the Power
//! Query (M) formula language (§1, §3).
//!
//! The crate's job stops at a completed [`ast::AstNode`] tree plus a
//! read-only [`nim::NodeIdMapCollection`] over it -- tokenizing is
//! `pq-lexer`'s job, and type inference or evaluation are out of scope
//! entirely (§GLOSSARY Non-goals).

pub mod ast;
pub mod combiner;
pub mod context;
pub mod disambiguator;
pub mod error;
pub mod facade;
pub mod nim;
pub mod parser;
pub mod state;
pub mod xor_node;

use pq_common::{LocaleTag, Position, Token};

use ast::NodeId;
use error::{ParseError, ParseErrorKind};
use facade::ParserFacade;
use nim::NodeIdMapCollection;
use state::{CancellationHandle, DisambiguationPolicy, ParseState};
use xor_node::XorNode;

/// What a [`parse`] call is entitled to consume from the token stream
/// (§6.1). `Document` is the only mode `parseDocument` reaches for
/// internally; `Expression`/`Section` let a caller parse a fragment (e.g.
/// a single formula bar's contents) without wrapping it in `section`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    Document,
    Expression,
    Section,
}

/// Options threaded through a [`parse`] call (§6.1).
pub struct ParseOptions<'a> {
    pub mode: ParseMode,
    pub disambiguation_policy: DisambiguationPolicy,
    pub locale: LocaleTag,
    pub cancellation_handle: Option<&'a dyn CancellationHandle>,
    pub facade: Option<ParserFacade>,
}

impl<'a> Default for ParseOptions<'a> {
    fn default() -> Self {
        Self {
            mode: ParseMode::Document,
            disambiguation_policy: DisambiguationPolicy::Thorough,
            locale: LocaleTag::default(),
            cancellation_handle: None,
            facade: None,
        }
    }
}

/// The result of a successful parse (§6.1): the completed root plus the
/// full NIM and final parse state, so a caller can keep walking the tree
/// (ancestry, leaf lookups) after the fact.
#[derive(Debug)]
pub struct ParseOk {
    pub root: NodeId,
    pub node_id_map: NodeIdMapCollection,
    pub state: ParseState,
}

/// `parseDocument` (§4.5): the parser's one true entry point. Dispatches on
/// `options.mode`, then asserts the token stream is exhausted and no
/// context is left open -- a recognizer that returns `Ok` with either
/// untrue is an invariant violation, not a parse error.
pub fn parse(tokens: Vec<Token>, options: ParseOptions<'_>) -> Result<ParseOk, ParseError> {
    if options.cancellation_handle.map(|h| h.is_cancelled()).unwrap_or(false) {
        return Err(ParseError::new(ParseErrorKind::Cancelled, None, 0));
    }

    let mut state = ParseState::new(tokens, options.disambiguation_policy);
    let facade = options.facade.unwrap_or_default();

    let root = match options.mode {
        ParseMode::Document => facade.parse_document(&mut state),
        ParseMode::Expression => parser::expressions::read_expression(&mut state),
        ParseMode::Section => parser::document::read_section_standalone(&mut state),
    }?;

    if state.current_context_node_id.is_some() {
        return Err(ParseError::invariant(
            "parse completed with an open context still on the stack",
            state.token_index,
        ));
    }
    if let Some(token) = state.current_token().cloned() {
        if token.kind != pq_common::TokenKind::Eof {
            return Err(ParseError::new(ParseErrorKind::UnusedTokensRemain { first_unused: token }, None, state.token_index));
        }
    }

    let node_id_map = state.nim.clone();
    Ok(ParseOk { root, node_id_map, state })
}

// ── Read-only NIM accessors (§6.2) ────────────────────────────────────

pub fn xor_node(ok: &ParseOk, id: NodeId) -> Option<XorNode<'_>> {
    ok.node_id_map.xor_node(id)
}

pub fn parent_xor(ok: &ParseOk, id: NodeId) -> Option<XorNode<'_>> {
    ok.node_id_map.parent_xor(id)
}

pub fn child_xor_by_attribute<'a>(
    ok: &'a ParseOk,
    id: NodeId,
    index: usize,
    expected_kinds: Option<&[ast::NodeKind]>,
) -> Result<Option<XorNode<'a>>, nim::InvariantError> {
    ok.node_id_map.child_xor_by_attribute(id, index, expected_kinds)
}

pub fn left_most_leaf(ok: &ParseOk, id: NodeId) -> Option<NodeId> {
    ok.node_id_map.leftmost_leaf(id)
}

pub fn right_most_leaf(ok: &ParseOk, id: NodeId) -> Option<NodeId> {
    ok.node_id_map.rightmost_leaf(id)
}

pub fn ancestry(ok: &ParseOk, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
    ok.node_id_map.ancestry(id)
}

pub fn is_in_inclusive_range(ok: &ParseOk, id: NodeId, position: Position) -> bool {
    ok.node_id_map
        .ast_node(id)
        .map(|node| node.token_range.is_in_inclusive_range(position))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens_for(source: &str) -> Vec<Token> {
        let (tokens, errors) = pq_lexer::tokenize(source);
        assert!(errors.is_empty(), "unexpected lex errors: {errors:?}");
        tokens
    }

    #[test]
    fn parses_a_bare_expression_document() {
        let ok = parse(tokens_for("1 + 2"), ParseOptions::default()).unwrap();
        let root_kind = xor_node(&ok, ok.root).unwrap().kind();
        assert_eq!(root_kind, ast::NodeKind::Document);
    }

    #[test]
    fn unused_trailing_tokens_are_rejected() {
        let err = parse(tokens_for("1 + 2 3"), ParseOptions::default()).unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::UnusedTokensRemain { .. }));
    }

    #[test]
    fn expression_mode_does_not_require_a_document_wrapper() {
        let options = ParseOptions { mode: ParseMode::Expression, ..ParseOptions::default() };
        let ok = parse(tokens_for("1 + 2"), options).unwrap();
        let root_kind = xor_node(&ok, ok.root).unwrap().kind();
        assert_eq!(root_kind, ast::NodeKind::ArithmeticExpression);
    }

    #[test]
    fn ancestry_walks_from_a_leaf_to_the_document_root() {
        let ok = parse(tokens_for("1 + 2"), ParseOptions::default()).unwrap();
        let leaf = left_most_leaf(&ok, ok.root).unwrap();
        let chain: Vec<_> = ancestry(&ok, leaf).collect();
        assert_eq!(*chain.last().unwrap(), ok.root);
    }
}
