//! The binary-operator combiner (§4.4).
//!
//! Rather than one recognizer per precedence level calling down into the
//! next (the usual recursive-descent shape), this reads the *entire* flat
//! operand/operator/operand/... sequence in a single pass, then folds it
//! into a precedence-correct tree in a second pass, shunting-yard style.
//! Intermediate nodes are built with `ParseState::create_composite_node`,
//! bypassing the open/close context protocol entirely, since the nesting
//! isn't known until the whole flat sequence -- and the precedences of
//! every operator in it -- are in hand.

use pq_common::TokenKind;

use crate::ast::{ConstantKind, LeafPayload, NodeId, NodeKind};
use crate::error::ParseError;
use crate::state::ParseState;

/// Whether an operator's right-hand side is read as another expression or
/// as a type (`is`/`as` bind a `NullablePrimitiveType` on the right,
/// everything else binds an expression).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OperandKind {
    Expression,
    Type,
}

struct OperatorSpec {
    node_kind: NodeKind,
    constant_kind: ConstantKind,
    precedence: u8,
    rhs: OperandKind,
}

/// Ascending precedence, all left-associative (§4.4). `Is`/`As` sit
/// between `And` and `Equality` because in M, `x is number and y` parses
/// as `(x is number) and y`, not `x is (number and y)`.
fn lookup_operator(kind: TokenKind) -> Option<OperatorSpec> {
    use NodeKind::*;
    let (node_kind, constant_kind, precedence, rhs) = match kind {
        TokenKind::NullCoalescingOperator => (NullCoalescingExpression, ConstantKind::NullCoalescing, 0, OperandKind::Expression),
        TokenKind::KeywordOr => (LogicalExpression, ConstantKind::Or, 1, OperandKind::Expression),
        TokenKind::KeywordAnd => (LogicalExpression, ConstantKind::And, 2, OperandKind::Expression),
        TokenKind::KeywordIs => (IsExpression, ConstantKind::Is, 3, OperandKind::Type),
        TokenKind::KeywordAs => (AsExpression, ConstantKind::As, 4, OperandKind::Type),
        TokenKind::Equal => (EqualityExpression, ConstantKind::Equal, 5, OperandKind::Expression),
        TokenKind::NotEqual => (EqualityExpression, ConstantKind::NotEqual, 5, OperandKind::Expression),
        TokenKind::LessThan => (RelationalExpression, ConstantKind::LessThan, 6, OperandKind::Expression),
        TokenKind::LessThanEqualTo => (RelationalExpression, ConstantKind::LessThanEqualTo, 6, OperandKind::Expression),
        TokenKind::GreaterThan => (RelationalExpression, ConstantKind::GreaterThan, 6, OperandKind::Expression),
        TokenKind::GreaterThanEqualTo => (RelationalExpression, ConstantKind::GreaterThanEqualTo, 6, OperandKind::Expression),
        TokenKind::Plus => (ArithmeticExpression, ConstantKind::Plus, 7, OperandKind::Expression),
        TokenKind::Minus => (ArithmeticExpression, ConstantKind::Minus, 7, OperandKind::Expression),
        TokenKind::Ampersand => (ArithmeticExpression, ConstantKind::Ampersand, 7, OperandKind::Expression),
        TokenKind::Asterisk => (ArithmeticExpression, ConstantKind::Asterisk, 8, OperandKind::Expression),
        TokenKind::Division => (ArithmeticExpression, ConstantKind::Division, 8, OperandKind::Expression),
        TokenKind::KeywordMeta => (MetadataExpression, ConstantKind::Meta, 9, OperandKind::Expression),
        _ => return None,
    };
    Some(OperatorSpec { node_kind, constant_kind, precedence, rhs })
}

struct FlatRead {
    precedence: u8,
    node_kind: NodeKind,
    constant_id: NodeId,
    operand_id: NodeId,
}

/// Reads one full binary-expression chain and attaches the (possibly
/// singleton) result as the next attribute of whatever context is current
/// when this is called. `read_expression_operand` reads the next tier
/// down (ultimately a UnaryExpression); `read_type_operand` reads a
/// `NullablePrimitiveType`, used for `is`/`as`'s right-hand side.
pub fn combine(
    state: &mut ParseState,
    mut read_expression_operand: impl FnMut(&mut ParseState) -> Result<NodeId, ParseError>,
    mut read_type_operand: impl FnMut(&mut ParseState) -> Result<NodeId, ParseError>,
) -> Result<NodeId, ParseError> {
    // A throwaway context absorbs every operand's parenting while the flat
    // sequence is being read, so none of them land in the real enclosing
    // context directly -- only the single folded result does, at the end.
    let placeholder_id = state.start_context(NodeKind::ArithmeticExpression);

    let initial_operand = read_expression_operand(state)?;

    let mut reads: Vec<FlatRead> = Vec::new();
    while let Some(spec) = state.current_token_kind().and_then(lookup_operator) {
        let constant_id = state.consume_constant_leaf(LeafPayload::Constant(spec.constant_kind))?;
        let operand_id = match spec.rhs {
            OperandKind::Expression => read_expression_operand(state)?,
            OperandKind::Type => read_type_operand(state)?,
        };
        reads.push(FlatRead { precedence: spec.precedence, node_kind: spec.node_kind, constant_id, operand_id });
    }

    // Scrub the placeholder: its children (the operands just read) survive
    // as orphans, ready to be folded and reattached.
    state.delete_context(Some(placeholder_id))?;

    let result = fold(state, initial_operand, reads);
    state.attach_existing_child(result)?;
    Ok(result)
}

/// The shunting-yard-style reduce pass: fold left-associatively, popping
/// the operator stack whenever the next operator's precedence is no
/// higher than the one on top.
fn fold(state: &mut ParseState, initial_operand: NodeId, reads: Vec<FlatRead>) -> NodeId {
    let mut operands: Vec<NodeId> = vec![initial_operand];
    let mut operators: Vec<(u8, NodeKind, NodeId)> = Vec::new();

    let reduce_top = |state: &mut ParseState, operands: &mut Vec<NodeId>, operators: &mut Vec<(u8, NodeKind, NodeId)>| {
        let (_, node_kind, constant_id) = operators.pop().expect("reduce_top called with a non-empty operator stack");
        let right = operands.pop().expect("an operator always has a right operand already pushed");
        let left = operands.pop().expect("an operator always has a left operand already pushed");
        let left_range = state.nim.ast_node(left).expect("fold operands are always completed nodes").token_range;
        let right_range = state.nim.ast_node(right).expect("fold operands are always completed nodes").token_range;
        let merged = left_range.merge(right_range);
        let new_id = state.create_composite_node(node_kind, vec![left, constant_id, right], merged);
        operands.push(new_id);
    };

    for read in reads {
        while let Some(&(top_precedence, _, _)) = operators.last() {
            if top_precedence >= read.precedence {
                reduce_top(state, &mut operands, &mut operators);
            } else {
                break;
            }
        }
        operators.push((read.precedence, read.node_kind, read.constant_id));
        operands.push(read.operand_id);
    }

    while !operators.is_empty() {
        reduce_top(state, &mut operands, &mut operators);
    }

    operands.pop().expect("fold always leaves exactly one operand")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::LiteralKind;
    use crate::state::DisambiguationPolicy;

    fn number_operand(state: &mut ParseState) -> Result<NodeId, ParseError> {
        let token = state.current_token().cloned().expect("test operands are always present");
        state.start_context(NodeKind::LiteralExpression);
        state.expect_token_kind(TokenKind::NumericLiteral)?;
        state.end_context(Some(LeafPayload::Literal(LiteralKind::Numeric, token.data)))
    }

    fn unreachable_type_operand(_state: &mut ParseState) -> Result<NodeId, ParseError> {
        panic!("this test never reads an is/as right-hand side")
    }

    fn state_for(source: &str) -> ParseState {
        let (tokens, errors) = pq_lexer::tokenize(source);
        assert!(errors.is_empty(), "unexpected lex errors: {errors:?}");
        ParseState::new(tokens, DisambiguationPolicy::Strict)
    }

    #[test]
    fn single_operand_passes_through_unwrapped() {
        let mut state = state_for("1");
        state.start_context(NodeKind::ParenthesizedExpression); // stand-in enclosing context
        let result = combine(&mut state, number_operand, unreachable_type_operand).unwrap();
        assert_eq!(state.nim.ast_node(result).unwrap().kind, NodeKind::LiteralExpression);
    }

    #[test]
    fn higher_precedence_binds_tighter_than_lower() {
        // 1 + 2 * 3 should fold as 1 + (2 * 3), i.e. the root is `+`.
        let mut state = state_for("1 + 2 * 3");
        state.start_context(NodeKind::ParenthesizedExpression);
        let root = combine(&mut state, number_operand, unreachable_type_operand).unwrap();
        let root_node = state.nim.ast_node(root).unwrap();
        assert_eq!(root_node.kind, NodeKind::ArithmeticExpression);
        let right_child = root_node.children[2];
        assert_eq!(state.nim.ast_node(right_child).unwrap().kind, NodeKind::ArithmeticExpression);
    }

    #[test]
    fn equal_precedence_is_left_associative() {
        // 1 - 2 - 3 should fold as (1 - 2) - 3, i.e. the root's left child
        // is itself an ArithmeticExpression, not the right child.
        let mut state = state_for("1 - 2 - 3");
        state.start_context(NodeKind::ParenthesizedExpression);
        let root = combine(&mut state, number_operand, unreachable_type_operand).unwrap();
        let root_node = state.nim.ast_node(root).unwrap();
        let left_child = root_node.children[0];
        let right_child = root_node.children[2];
        assert_eq!(state.nim.ast_node(left_child).unwrap().kind, NodeKind::ArithmeticExpression);
        assert_eq!(state.nim.ast_node(right_child).unwrap().kind, NodeKind::LiteralExpression);
    }
}
