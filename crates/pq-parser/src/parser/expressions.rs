//! Expression productions (§3.3, §4.4): everything from `let`/`if`/`each`
//! down through the binary-operator chain, unary prefixes, and the
//! primary/recursive-primary expressions at the bottom.

use pq_common::TokenKind;

use crate::ast::{ConstantKind, NodeId, NodeKind};
use crate::combiner;
use crate::disambiguator::{self, BracketDisambiguation, ParenDisambiguation};
use crate::error::{ParseError, ParseErrorKind};
use crate::state::{DisambiguationPolicy, ParseState};

use super::literals::{self, is_keyword_identifier, read_generalized_identifier, read_identifier};
use super::types;
use super::{consume_constant, read_csv};

/// The grammar's `<expression>` nonterminal: the keyword-led productions
/// that can't be reached from inside the operator chain, falling through
/// to the binary-operator combiner for everything else.
pub fn read_expression(state: &mut ParseState) -> Result<NodeId, ParseError> {
    match state.current_token_kind() {
        Some(TokenKind::KeywordLet) => read_let_expression(state),
        Some(TokenKind::KeywordIf) => read_if_expression(state),
        Some(TokenKind::KeywordError) => read_error_raising_expression(state),
        Some(TokenKind::KeywordTry) => read_error_handling_expression(state),
        _ => read_operator_chain(state),
    }
}

fn read_operator_chain(state: &mut ParseState) -> Result<NodeId, ParseError> {
    combiner::combine(state, read_unary_expression, types::read_nullable_primitive_type)
}

fn read_let_expression(state: &mut ParseState) -> Result<NodeId, ParseError> {
    state.start_context(NodeKind::LetExpression);
    consume_constant(state, TokenKind::KeywordLet, ConstantKind::Let)?;
    read_csv(state, TokenKind::KeywordIn, read_identifier_paired_expression)?;
    consume_constant(state, TokenKind::KeywordIn, ConstantKind::In)?;
    read_expression(state)?;
    state.end_context(None)
}

fn read_identifier_paired_expression(state: &mut ParseState) -> Result<NodeId, ParseError> {
    state.start_context(NodeKind::IdentifierPairedExpression);
    read_identifier(state)?;
    consume_constant(state, TokenKind::Equal, ConstantKind::Equals)?;
    read_expression(state)?;
    state.end_context(None)
}

fn read_if_expression(state: &mut ParseState) -> Result<NodeId, ParseError> {
    state.start_context(NodeKind::IfExpression);
    consume_constant(state, TokenKind::KeywordIf, ConstantKind::If)?;
    read_expression(state)?;
    consume_constant(state, TokenKind::KeywordThen, ConstantKind::Then)?;
    read_expression(state)?;
    consume_constant(state, TokenKind::KeywordElse, ConstantKind::Else)?;
    read_expression(state)?;
    state.end_context(None)
}

fn read_error_raising_expression(state: &mut ParseState) -> Result<NodeId, ParseError> {
    state.start_context(NodeKind::ErrorRaisingExpression);
    consume_constant(state, TokenKind::KeywordError, ConstantKind::Error)?;
    read_expression(state)?;
    state.end_context(None)
}

/// `try <expr> (otherwise <expr> | catch <function-expression>)?`. `catch`
/// is Power Query's newer alternative to `otherwise`, restricted to a
/// single-parameter function literal (§7 `InvalidCatchFunction`).
fn read_error_handling_expression(state: &mut ParseState) -> Result<NodeId, ParseError> {
    state.start_context(NodeKind::ErrorHandlingExpression);
    consume_constant(state, TokenKind::KeywordTry, ConstantKind::Try)?;
    read_expression(state)?;
    if state.is_at(TokenKind::KeywordOtherwise) {
        consume_constant(state, TokenKind::KeywordOtherwise, ConstantKind::Otherwise)?;
        read_expression(state)?;
    } else if is_contextual_keyword(state, "catch") {
        read_catch_expression(state)?;
    } else {
        state.increment_attribute_counter()?;
    }
    state.end_context(None)
}

fn read_catch_expression(state: &mut ParseState) -> Result<NodeId, ParseError> {
    state.start_context(NodeKind::CatchExpression);
    consume_constant(state, TokenKind::Identifier, ConstantKind::Catch)?;
    let found = state.current_token().cloned();
    let function_id = read_function_expression(state)?;
    let parameter_count = state
        .nim
        .ast_node(function_id)
        .and_then(|f| f.children.first().copied())
        .and_then(|params_id| state.nim.ast_node(params_id))
        .map(|params| params.children.iter().filter(|&&c| state.nim.ast_node(c).map(|n| n.kind == NodeKind::Parameter).unwrap_or(false)).count());
    if parameter_count != Some(1) {
        return Err(ParseError::new(ParseErrorKind::InvalidCatchFunction { found }, Some(NodeKind::CatchExpression), state.token_index));
    }
    state.end_context(None)
}

fn is_contextual_keyword(state: &ParseState, spelling: &str) -> bool {
    matches!(state.current_token(), Some(t) if t.kind == TokenKind::Identifier && t.data == spelling)
}

const UNARY_OPERATOR_KINDS: [TokenKind; 3] = [TokenKind::Plus, TokenKind::Minus, TokenKind::KeywordNot];

fn is_unary_operator(kind: Option<TokenKind>) -> bool {
    kind.map(|k| UNARY_OPERATOR_KINDS.contains(&k)).unwrap_or(false)
}

/// `UnaryExpression` (§3.3): zero or more `+`/`-`/`not` prefixes over a
/// recursive-primary expression, or a single `type <type-expression>`
/// value -- `type` acts as just another prefix whose "operand" happens to
/// be a type rather than another unary expression.
fn read_unary_expression(state: &mut ParseState) -> Result<NodeId, ParseError> {
    if state.is_at(TokenKind::KeywordType) {
        state.start_context(NodeKind::UnaryExpression);
        consume_constant(state, TokenKind::KeywordType, ConstantKind::Type)?;
        types::read_type_expression(state)?;
        return state.end_context(None);
    }

    if !is_unary_operator(state.current_token_kind()) {
        return read_recursive_primary_expression(state);
    }

    state.start_context(NodeKind::UnaryExpression);
    while is_unary_operator(state.current_token_kind()) {
        let kind = state.current_token_kind().expect("checked above");
        let constant = match kind {
            TokenKind::Plus => ConstantKind::Plus,
            TokenKind::Minus => ConstantKind::Minus,
            TokenKind::KeywordNot => ConstantKind::Not,
            _ => unreachable!("is_unary_operator guards exactly these kinds"),
        };
        consume_constant(state, kind, constant)?;
    }
    read_recursive_primary_expression(state)?;
    state.end_context(None)
}

fn starts_recursive_primary_suffix(kind: Option<TokenKind>) -> bool {
    matches!(kind, Some(TokenKind::LeftParenthesis | TokenKind::LeftBrace | TokenKind::LeftBracket))
}

/// A primary expression immediately followed by `(`, `{`, or `[` is
/// retroactively wrapped into a `RecursivePrimaryExpression` (§4.4.3) via
/// `start_context_as_parent`, then each suffix is appended as a further
/// attribute of that same wrapper.
fn read_recursive_primary_expression(state: &mut ParseState) -> Result<NodeId, ParseError> {
    let head = read_primary_expression(state)?;
    if !starts_recursive_primary_suffix(state.current_token_kind()) {
        return Ok(head);
    }

    state.start_context_as_parent(NodeKind::RecursivePrimaryExpression, head);
    while starts_recursive_primary_suffix(state.current_token_kind()) {
        match state.current_token_kind() {
            Some(TokenKind::LeftParenthesis) => read_invoke_expression(state)?,
            Some(TokenKind::LeftBrace) => read_item_access_expression(state)?,
            Some(TokenKind::LeftBracket) => read_bracketed_expression(state)?,
            _ => unreachable!("starts_recursive_primary_suffix guards exactly these kinds"),
        };
    }
    state.end_context(None)
}

fn read_primary_expression(state: &mut ParseState) -> Result<NodeId, ParseError> {
    match state.current_token_kind() {
        Some(TokenKind::NumericLiteral)
        | Some(TokenKind::TextLiteral)
        | Some(TokenKind::NullLiteral)
        | Some(TokenKind::TrueLiteral)
        | Some(TokenKind::FalseLiteral) => literals::read_literal_expression(state),
        Some(TokenKind::DotDotDot) => read_not_implemented_expression(state),
        Some(TokenKind::LeftBrace) => read_list_expression(state),
        Some(TokenKind::LeftBracket) => read_bracketed_expression(state),
        Some(TokenKind::LeftParenthesis) => read_parenthesized_or_function_expression(state),
        Some(TokenKind::KeywordEach) => read_each_expression(state),
        Some(TokenKind::At) => literals::read_identifier_expression(state),
        Some(TokenKind::Identifier) => literals::read_identifier_expression(state),
        Some(kind) if is_keyword_identifier(kind) => literals::read_identifier_expression(state),
        found => Err(ParseError::new(
            ParseErrorKind::ExpectedAnyTokenKind {
                expected: vec![TokenKind::Identifier, TokenKind::LeftParenthesis, TokenKind::LeftBracket, TokenKind::LeftBrace],
                found: found.and_then(|_| state.current_token().cloned()),
            },
            None,
            state.token_index,
        )),
    }
}

fn read_not_implemented_expression(state: &mut ParseState) -> Result<NodeId, ParseError> {
    state.start_context(NodeKind::NotImplementedExpression);
    consume_constant(state, TokenKind::DotDotDot, ConstantKind::DotDotDot)?;
    state.end_context(None)
}

fn read_each_expression(state: &mut ParseState) -> Result<NodeId, ParseError> {
    state.start_context(NodeKind::EachExpression);
    consume_constant(state, TokenKind::KeywordEach, ConstantKind::Each)?;
    read_expression(state)?;
    state.end_context(None)
}

fn read_list_expression(state: &mut ParseState) -> Result<NodeId, ParseError> {
    state.start_context(NodeKind::ListExpression);
    consume_constant(state, TokenKind::LeftBrace, ConstantKind::LeftBrace)?;
    read_csv(state, TokenKind::RightBrace, read_expression)?;
    consume_constant(state, TokenKind::RightBrace, ConstantKind::RightBrace)?;
    state.end_context(None)
}

/// `(` opens either a `ParenthesizedExpression` or a `FunctionExpression`
/// (§4.3). Bounded lookahead resolves most cases; `Thorough` falls back to
/// speculating both in listed order (parenthesized first, since it's the
/// more common shape).
fn read_parenthesized_or_function_expression(state: &mut ParseState) -> Result<NodeId, ParseError> {
    match disambiguator::disambiguate_paren(state) {
        Ok(ParenDisambiguation::Function) => read_function_expression(state),
        Ok(ParenDisambiguation::Parenthesized) => read_parenthesized_expression(state),
        Err(inconclusive) => match state.disambiguation_policy {
            DisambiguationPolicy::Strict => Err(inconclusive.into_error(state.token_index)),
            DisambiguationPolicy::Thorough => {
                let opened_at = inconclusive.opened_at;
                disambiguator::resolve_via_speculation(
                    state,
                    opened_at,
                    vec![
                        Box::new(|s: &mut ParseState| read_parenthesized_expression(s)),
                        Box::new(|s: &mut ParseState| read_function_expression(s)),
                    ],
                )
            }
        },
    }
}

fn read_parenthesized_expression(state: &mut ParseState) -> Result<NodeId, ParseError> {
    state.start_context(NodeKind::ParenthesizedExpression);
    consume_constant(state, TokenKind::LeftParenthesis, ConstantKind::LeftParenthesis)?;
    read_expression(state)?;
    consume_constant(state, TokenKind::RightParenthesis, ConstantKind::RightParenthesis)?;
    state.end_context(None)
}

fn read_function_expression(state: &mut ParseState) -> Result<NodeId, ParseError> {
    state.start_context(NodeKind::FunctionExpression);
    types::read_parameter_list(state, false)?;
    if state.is_at(TokenKind::KeywordAs) {
        types::read_function_return_type(state)?;
    } else {
        state.increment_attribute_counter()?;
    }
    consume_constant(state, TokenKind::FatArrow, ConstantKind::FatArrow)?;
    read_expression(state)?;
    state.end_context(None)
}

/// `[` opens a `RecordExpression`, `FieldSelector`, or `FieldProjection`
/// (§4.3); used both as a primary expression and, identically, as a
/// recursive-primary suffix.
fn read_bracketed_expression(state: &mut ParseState) -> Result<NodeId, ParseError> {
    match disambiguator::disambiguate_bracket(state) {
        Ok(BracketDisambiguation::Record) => read_record_expression(state),
        Ok(BracketDisambiguation::FieldSelector) => read_field_selector(state),
        Ok(BracketDisambiguation::FieldProjection) => read_field_projection(state),
        Err(inconclusive) => match state.disambiguation_policy {
            DisambiguationPolicy::Strict => Err(inconclusive.into_error(state.token_index)),
            DisambiguationPolicy::Thorough => {
                let opened_at = inconclusive.opened_at;
                disambiguator::resolve_via_speculation(
                    state,
                    opened_at,
                    vec![
                        Box::new(|s: &mut ParseState| read_record_expression(s)),
                        Box::new(|s: &mut ParseState| read_field_selector(s)),
                        Box::new(|s: &mut ParseState| read_field_projection(s)),
                    ],
                )
            }
        },
    }
}

fn read_record_expression(state: &mut ParseState) -> Result<NodeId, ParseError> {
    state.start_context(NodeKind::RecordExpression);
    consume_constant(state, TokenKind::LeftBracket, ConstantKind::LeftBracket)?;
    read_csv(state, TokenKind::RightBracket, read_generalized_identifier_paired_expression)?;
    consume_constant(state, TokenKind::RightBracket, ConstantKind::RightBracket)?;
    state.end_context(None)
}

fn read_generalized_identifier_paired_expression(state: &mut ParseState) -> Result<NodeId, ParseError> {
    state.start_context(NodeKind::GeneralizedIdentifierPairedExpression);
    read_generalized_identifier(state)?;
    consume_constant(state, TokenKind::Equal, ConstantKind::Equals)?;
    read_expression(state)?;
    state.end_context(None)
}

fn read_field_selector(state: &mut ParseState) -> Result<NodeId, ParseError> {
    state.start_context(NodeKind::FieldSelector);
    consume_constant(state, TokenKind::LeftBracket, ConstantKind::LeftBracket)?;
    read_generalized_identifier(state)?;
    consume_constant(state, TokenKind::RightBracket, ConstantKind::RightBracket)?;
    read_optional_question_mark(state)?;
    state.end_context(None)
}

/// `[[a],[b],...]` (§GLOSSARY): each projected name is individually
/// bracket-wrapped, so unlike the other comma lists in this module the
/// names themselves carry no separator semantics worth a `CsvArray` --
/// plain `ArrayWrapper` is enough.
fn read_field_projection(state: &mut ParseState) -> Result<NodeId, ParseError> {
    state.start_context(NodeKind::FieldProjection);
    consume_constant(state, TokenKind::LeftBracket, ConstantKind::LeftBracket)?;
    read_projected_names(state)?;
    consume_constant(state, TokenKind::RightBracket, ConstantKind::RightBracket)?;
    read_optional_question_mark(state)?;
    state.end_context(None)
}

fn read_projected_names(state: &mut ParseState) -> Result<NodeId, ParseError> {
    state.start_context(NodeKind::ArrayWrapper);
    let mut first = true;
    loop {
        if !first {
            state.expect_token_kind(TokenKind::Comma)?;
        }
        first = false;
        state.expect_token_kind(TokenKind::LeftBracket)?;
        read_generalized_identifier(state)?;
        state.expect_token_kind(TokenKind::RightBracket)?;
        if !state.is_at(TokenKind::Comma) {
            break;
        }
    }
    state.end_context(None)
}

fn read_optional_question_mark(state: &mut ParseState) -> Result<(), ParseError> {
    if state.is_at(TokenKind::QuestionMark) {
        consume_constant(state, TokenKind::QuestionMark, ConstantKind::QuestionMark)?;
    } else {
        state.increment_attribute_counter()?;
    }
    Ok(())
}

fn read_invoke_expression(state: &mut ParseState) -> Result<NodeId, ParseError> {
    state.start_context(NodeKind::InvokeExpression);
    consume_constant(state, TokenKind::LeftParenthesis, ConstantKind::LeftParenthesis)?;
    read_csv(state, TokenKind::RightParenthesis, read_expression)?;
    consume_constant(state, TokenKind::RightParenthesis, ConstantKind::RightParenthesis)?;
    state.end_context(None)
}

fn read_item_access_expression(state: &mut ParseState) -> Result<NodeId, ParseError> {
    state.start_context(NodeKind::ItemAccessExpression);
    consume_constant(state, TokenKind::LeftBrace, ConstantKind::LeftBrace)?;
    read_expression(state)?;
    consume_constant(state, TokenKind::RightBrace, ConstantKind::RightBrace)?;
    read_optional_question_mark(state)?;
    state.end_context(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::NodeKind;

    fn parse(source: &str, policy: DisambiguationPolicy) -> (ParseState, NodeId) {
        let (tokens, errors) = pq_lexer::tokenize(source);
        assert!(errors.is_empty(), "unexpected lex errors: {errors:?}");
        let mut state = ParseState::new(tokens, policy);
        let root = read_expression(&mut state).expect("expression should parse");
        (state, root)
    }

    #[test]
    fn s1_precedence_multiplication_binds_tighter() {
        let (state, root) = parse("1 + 2 * 3", DisambiguationPolicy::Strict);
        let node = state.nim.ast_node(root).unwrap();
        assert_eq!(node.kind, NodeKind::ArithmeticExpression);
        let rhs = state.nim.ast_node(node.children[2]).unwrap();
        assert_eq!(rhs.kind, NodeKind::ArithmeticExpression);
    }

    #[test]
    fn s3_record_expression_has_two_fields() {
        let (state, root) = parse("[a = 1, b = 2]", DisambiguationPolicy::Strict);
        let record = state.nim.ast_node(root).unwrap();
        assert_eq!(record.kind, NodeKind::RecordExpression);
        let csv = state.nim.ast_node(record.children[1]).unwrap();
        assert_eq!(csv.kind, NodeKind::CsvArray);
        assert_eq!(csv.children.len(), 2);
    }

    #[test]
    fn s4_bare_field_selector() {
        let (state, root) = parse("[a]", DisambiguationPolicy::Strict);
        assert_eq!(state.nim.ast_node(root).unwrap().kind, NodeKind::FieldSelector);
    }

    #[test]
    fn s5_function_expression_with_typed_parameter() {
        let (state, root) = parse("(x as number) => x + 1", DisambiguationPolicy::Strict);
        let func = state.nim.ast_node(root).unwrap();
        assert_eq!(func.kind, NodeKind::FunctionExpression);
        let body = state.nim.ast_node(*func.children.last().unwrap()).unwrap();
        assert_eq!(body.kind, NodeKind::ArithmeticExpression);
    }

    #[test]
    fn s6_parenthesized_expression() {
        let (state, root) = parse("(1 + 2)", DisambiguationPolicy::Strict);
        let node = state.nim.ast_node(root).unwrap();
        assert_eq!(node.kind, NodeKind::ParenthesizedExpression);
    }

    #[test]
    fn s7_let_expression_with_two_bindings() {
        let (state, root) = parse("let x = 1, y = 2 in x + y", DisambiguationPolicy::Strict);
        let node = state.nim.ast_node(root).unwrap();
        assert_eq!(node.kind, NodeKind::LetExpression);
        let bindings = state.nim.ast_node(node.children[1]).unwrap();
        assert_eq!(bindings.kind, NodeKind::CsvArray);
        assert_eq!(bindings.children.len(), 2);
    }

    #[test]
    fn s8_recursive_primary_chains_invoke_select_item_access() {
        let (state, root) = parse("foo(1)[a]{0}", DisambiguationPolicy::Strict);
        let node = state.nim.ast_node(root).unwrap();
        assert_eq!(node.kind, NodeKind::RecursivePrimaryExpression);
        let kinds: Vec<_> = node.children.iter().map(|&c| state.nim.ast_node(c).unwrap().kind).collect();
        assert_eq!(
            kinds,
            vec![NodeKind::IdentifierExpression, NodeKind::InvokeExpression, NodeKind::FieldSelector, NodeKind::ItemAccessExpression]
        );
    }

    #[test]
    fn s9_if_expression_has_three_branches() {
        let (state, root) = parse("if a then b else c", DisambiguationPolicy::Strict);
        let node = state.nim.ast_node(root).unwrap();
        assert_eq!(node.kind, NodeKind::IfExpression);
        assert_eq!(node.children.len(), 6);
    }

    #[test]
    fn s10_null_coalescing_is_left_associative() {
        let (state, root) = parse("1 ?? 2 ?? 3", DisambiguationPolicy::Strict);
        let node = state.nim.ast_node(root).unwrap();
        assert_eq!(node.kind, NodeKind::NullCoalescingExpression);
        let lhs = state.nim.ast_node(node.children[0]).unwrap();
        assert_eq!(lhs.kind, NodeKind::NullCoalescingExpression);
    }

    #[test]
    fn each_expression_wraps_its_body() {
        let (state, root) = parse("each _ + 1", DisambiguationPolicy::Strict);
        assert_eq!(state.nim.ast_node(root).unwrap().kind, NodeKind::EachExpression);
    }

    #[test]
    fn try_otherwise_reads_both_sides() {
        let (state, root) = parse("try 1 / 0 otherwise -1", DisambiguationPolicy::Strict);
        let node = state.nim.ast_node(root).unwrap();
        assert_eq!(node.kind, NodeKind::ErrorHandlingExpression);
        assert_eq!(node.children.len(), 4);
    }

    #[test]
    fn try_catch_requires_single_parameter_function() {
        let (tokens, errors) = pq_lexer::tokenize("try 1 / 0 catch (x, y) => x");
        assert!(errors.is_empty());
        let mut state = ParseState::new(tokens, DisambiguationPolicy::Strict);
        let err = read_expression(&mut state).unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::InvalidCatchFunction { .. }));
    }

    #[test]
    fn not_implemented_expression_is_a_bare_ellipsis() {
        let (state, root) = parse("...", DisambiguationPolicy::Strict);
        assert_eq!(state.nim.ast_node(root).unwrap().kind, NodeKind::NotImplementedExpression);
    }

    #[test]
    fn field_projection_collects_two_names() {
        let (state, root) = parse("[[a],[b]]", DisambiguationPolicy::Strict);
        let node = state.nim.ast_node(root).unwrap();
        assert_eq!(node.kind, NodeKind::FieldProjection);
        let names = state.nim.ast_node(node.children[1]).unwrap();
        assert_eq!(names.kind, NodeKind::ArrayWrapper);
        assert_eq!(names.children.len(), 2);
    }

    #[test]
    fn thorough_policy_resolves_unparenthesized_ambiguity_same_as_strict() {
        let (strict_state, strict_root) = parse("(1 + 2)", DisambiguationPolicy::Strict);
        let (thorough_state, thorough_root) = parse("(1 + 2)", DisambiguationPolicy::Thorough);
        assert_eq!(strict_state.nim.ast_node(strict_root).unwrap().kind, thorough_state.nim.ast_node(thorough_root).unwrap().kind);
    }
}
