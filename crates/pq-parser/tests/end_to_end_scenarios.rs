//! Public-API end-to-end coverage: the S1-S10 scenario table and the
//! universal/round-trip invariants that accompany it. Unlike the
//! `#[cfg(test)]` modules colocated with each recognizer, this suite only
//! calls through `pq_parser::parse` -- it never reaches into a private
//! recognizer function directly.

use pretty_assertions::assert_eq;

use pq_parser::ast::{ConstantKind, LeafPayload, NodeKind};
use pq_parser::state::DisambiguationPolicy;
use pq_parser::xor_node::XorNode;
use pq_parser::{ancestry, left_most_leaf, parse, ParseMode, ParseOk, ParseOptions};

fn parse_ok(source: &str) -> ParseOk {
    let (tokens, errors) = pq_lexer::tokenize(source);
    assert!(errors.is_empty(), "unexpected lex errors for {source:?}: {errors:?}");
    parse(tokens, ParseOptions::default()).unwrap_or_else(|e| panic!("parse failed for {source:?}: {e}"))
}

fn kind_of(ok: &ParseOk, id: u32) -> NodeKind {
    match ok.node_id_map.xor_node(id).unwrap() {
        XorNode::Ast(node) => node.kind,
        XorNode::Context(ctx) => ctx.kind,
    }
}

fn children_of(ok: &ParseOk, id: u32) -> Vec<u32> {
    ok.node_id_map.ast_node(id).unwrap().children.clone()
}

fn constant_of(ok: &ParseOk, id: u32) -> ConstantKind {
    match &ok.node_id_map.ast_node(id).unwrap().leaf {
        Some(LeafPayload::Constant(c)) => *c,
        other => panic!("expected a Constant leaf, found {other:?}"),
    }
}

/// The document wrapper is always a single-child passthrough for a bare
/// expression; tests below want the expression itself.
fn document_body(ok: &ParseOk) -> u32 {
    children_of(ok, ok.root)[0]
}

// S1: `1 + 2 * 3` -> `+` with rhs `2 * 3`.
#[test]
fn s1_arithmetic_precedence_binds_multiplication_tighter() {
    let ok = parse_ok("1 + 2 * 3");
    let plus = document_body(&ok);
    assert_eq!(kind_of(&ok, plus), NodeKind::ArithmeticExpression);
    let children = children_of(&ok, plus);
    assert_eq!(constant_of(&ok, children[1]), ConstantKind::Plus);
    assert_eq!(kind_of(&ok, children[0]), NodeKind::LiteralExpression);
    let rhs = children[2];
    assert_eq!(kind_of(&ok, rhs), NodeKind::ArithmeticExpression);
    let rhs_children = children_of(&ok, rhs);
    assert_eq!(constant_of(&ok, rhs_children[1]), ConstantKind::Asterisk);
}

// S2: `1 * 2 + 3` -> `+` with lhs `1 * 2`.
#[test]
fn s2_arithmetic_precedence_keeps_addition_outermost() {
    let ok = parse_ok("1 * 2 + 3");
    let plus = document_body(&ok);
    assert_eq!(kind_of(&ok, plus), NodeKind::ArithmeticExpression);
    let children = children_of(&ok, plus);
    assert_eq!(constant_of(&ok, children[1]), ConstantKind::Plus);
    let lhs = children[0];
    assert_eq!(kind_of(&ok, lhs), NodeKind::ArithmeticExpression);
    let lhs_children = children_of(&ok, lhs);
    assert_eq!(constant_of(&ok, lhs_children[1]), ConstantKind::Asterisk);
    assert_eq!(kind_of(&ok, children[2]), NodeKind::LiteralExpression);
}

// S3: `[a=1, b=2]` -> RecordExpression, two paired-expression children.
#[test]
fn s3_record_expression_has_two_paired_fields() {
    let ok = parse_ok("[a=1, b=2]");
    let record = document_body(&ok);
    assert_eq!(kind_of(&ok, record), NodeKind::RecordExpression);
    let csv = children_of(&ok, record)[0];
    assert_eq!(kind_of(&ok, csv), NodeKind::CsvArray);
    let fields = children_of(&ok, csv);
    assert_eq!(fields.len(), 2);
    for field in fields {
        assert_eq!(kind_of(&ok, field), NodeKind::GeneralizedIdentifierPairedExpression);
    }
}

// S4: `[a]` in isolation disambiguates to a field selector.
#[test]
fn s4_bracketed_single_name_is_a_field_selector() {
    let ok = parse_ok("[a]");
    let selector = document_body(&ok);
    assert_eq!(kind_of(&ok, selector), NodeKind::FieldSelector);
}

// S5: `(x as number) => x + 1` -> one typed parameter, arithmetic body.
#[test]
fn s5_function_expression_has_one_typed_parameter() {
    let ok = parse_ok("(x as number) => x + 1");
    let func = document_body(&ok);
    assert_eq!(kind_of(&ok, func), NodeKind::FunctionExpression);
    let children = children_of(&ok, func);
    let params = children_of(&ok, children[0]);
    assert_eq!(params.len(), 1);
    let param = params[0];
    assert_eq!(kind_of(&ok, param), NodeKind::Parameter);
    let param_children = children_of(&ok, param);
    assert_eq!(kind_of(&ok, *param_children.last().unwrap()), NodeKind::AsType);
    let body = *children.last().unwrap();
    assert_eq!(kind_of(&ok, body), NodeKind::ArithmeticExpression);
}

// S6: `(1 + 2)` -> ParenthesizedExpression wrapping arithmetic.
#[test]
fn s6_parenthesized_expression_wraps_arithmetic() {
    let ok = parse_ok("(1 + 2)");
    let paren = document_body(&ok);
    assert_eq!(kind_of(&ok, paren), NodeKind::ParenthesizedExpression);
    let inner = children_of(&ok, paren)[0];
    assert_eq!(kind_of(&ok, inner), NodeKind::ArithmeticExpression);
}

// S7: `let x = 1, y = 2 in x + y` -> two bindings, arithmetic body.
#[test]
fn s7_let_expression_has_two_bindings_and_an_arithmetic_body() {
    let ok = parse_ok("let x = 1, y = 2 in x + y");
    let let_expr = document_body(&ok);
    assert_eq!(kind_of(&ok, let_expr), NodeKind::LetExpression);
    let children = children_of(&ok, let_expr);
    let bindings_csv = children[1];
    assert_eq!(kind_of(&ok, bindings_csv), NodeKind::CsvArray);
    assert_eq!(children_of(&ok, bindings_csv).len(), 2);
    let body = *children.last().unwrap();
    assert_eq!(kind_of(&ok, body), NodeKind::ArithmeticExpression);
}

// S8: `foo(1)[a]{0}` -> RecursivePrimaryExpression: Invoke, FieldSelector, ItemAccess.
#[test]
fn s8_recursive_primary_chains_invoke_field_and_item_access() {
    let ok = parse_ok("foo(1)[a]{0}");
    let recursive = document_body(&ok);
    assert_eq!(kind_of(&ok, recursive), NodeKind::RecursivePrimaryExpression);
    let children = children_of(&ok, recursive);
    assert_eq!(kind_of(&ok, children[0]), NodeKind::IdentifierExpression);
    assert_eq!(kind_of(&ok, children[1]), NodeKind::InvokeExpression);
    assert_eq!(kind_of(&ok, children[2]), NodeKind::FieldSelector);
    assert_eq!(kind_of(&ok, children[3]), NodeKind::ItemAccessExpression);
}

// S9: `if a then b else c` -> three sub-expressions.
#[test]
fn s9_if_expression_has_condition_then_and_else() {
    let ok = parse_ok("if a then b else c");
    let if_expr = document_body(&ok);
    assert_eq!(kind_of(&ok, if_expr), NodeKind::IfExpression);
    let children = children_of(&ok, if_expr);
    let sub_expressions: Vec<_> = children
        .iter()
        .filter(|&&id| kind_of(&ok, id) == NodeKind::IdentifierExpression)
        .collect();
    assert_eq!(sub_expressions.len(), 3);
}

// S10: `1 ?? 2 ?? 3` -> left-associative null-coalescing.
#[test]
fn s10_null_coalescing_is_left_associative() {
    let ok = parse_ok("1 ?? 2 ?? 3");
    let outer = document_body(&ok);
    assert_eq!(kind_of(&ok, outer), NodeKind::NullCoalescingExpression);
    let children = children_of(&ok, outer);
    assert_eq!(constant_of(&ok, children[1]), ConstantKind::NullCoalescing);
    let lhs = children[0];
    assert_eq!(kind_of(&ok, lhs), NodeKind::NullCoalescingExpression);
    assert_eq!(kind_of(&ok, children[2]), NodeKind::LiteralExpression);
}

// ── Universal invariants (§8 items 1-6) ──────────────────────────────

#[test]
fn invariant_successful_parse_exhausts_the_token_stream() {
    let ok = parse_ok("1 + 2");
    // `parse` itself already asserts this before returning `Ok`; this test
    // documents the guarantee at the public-API boundary.
    assert!(ok.state.current_context_node_id.is_none());
}

#[test]
fn invariant_every_node_id_is_exactly_one_of_ast_or_context() {
    let ok = parse_ok("let x = 1 in x");
    for id in ok.node_id_map.ids_by_kind(NodeKind::LetExpression) {
        assert!(ok.node_id_map.is_ast_node(id));
        assert!(!ok.node_id_map.is_context_node(id));
    }
}

#[test]
fn invariant_parent_and_child_indexes_agree() {
    let ok = parse_ok("1 + 2");
    let plus = document_body(&ok);
    for &child in &children_of(&ok, plus) {
        assert_eq!(ok.node_id_map.parent_id(child), Some(plus));
    }
}

#[test]
fn invariant_leaf_ids_match_the_closed_leaf_kind_set() {
    let ok = parse_ok("1 + 2");
    for &id in ok.node_id_map.leaf_ids() {
        let kind = kind_of(&ok, id);
        assert!(kind.is_leaf_kind(), "{kind:?} should not be in leaf_ids");
    }
}

#[test]
fn invariant_ids_by_node_kind_matches_actual_node_kinds() {
    let ok = parse_ok("[a=1, b=2]");
    for id in ok.node_id_map.ids_by_kind(NodeKind::GeneralizedIdentifierPairedExpression) {
        assert_eq!(kind_of(&ok, id), NodeKind::GeneralizedIdentifierPairedExpression);
    }
}

#[test]
fn invariant_token_range_of_a_composite_spans_its_children() {
    let ok = parse_ok("1 + 2");
    let plus = document_body(&ok);
    let node = ok.node_id_map.ast_node(plus).unwrap();
    let first_child = ok.node_id_map.ast_node(node.children[0]).unwrap();
    let last_child = ok.node_id_map.ast_node(*node.children.last().unwrap()).unwrap();
    assert_eq!(node.token_range.token_index_start, first_child.token_range.token_index_start);
    assert_eq!(node.token_range.token_index_end, last_child.token_range.token_index_end);
}

// ── Round-trip / idempotence (§8 items 8-9) ──────────────────────────

#[test]
fn checkpoint_restore_round_trips_to_the_same_cursor_position() {
    let (tokens, errors) = pq_lexer::tokenize("1 + 2 + 3");
    assert!(errors.is_empty());
    let mut state = pq_parser::state::ParseState::new(tokens, DisambiguationPolicy::Thorough);

    let before_index = state.token_index;
    let before_id_counter = state.id_counter;
    let checkpoint = state.create_checkpoint();

    pq_parser::parser::expressions::read_expression(&mut state).unwrap();
    assert!(state.token_index > before_index, "recognizer should have advanced the cursor");

    state.restore_checkpoint(checkpoint);
    assert_eq!(state.token_index, before_index);
    assert_eq!(state.id_counter, before_id_counter);
    assert!(state.current_context_node_id.is_none());
}

#[test]
fn ancestry_ends_at_the_document_root() {
    let ok = parse_ok("1 + 2");
    let leaf = left_most_leaf(&ok, ok.root).unwrap();
    let chain: Vec<_> = ancestry(&ok, leaf).collect();
    assert_eq!(*chain.last().unwrap(), ok.root);
    assert_eq!(kind_of(&ok, ok.root), NodeKind::Document);
}

// ── Disambiguator determinism (§8 item 12) ───────────────────────────

#[test]
fn thorough_parsing_is_deterministic_across_repeated_runs() {
    let source = "(x as number) => [a = x, b = [c] ][d]";
    let first = parse_ok(source);
    let second = parse_ok(source);

    fn shape(ok: &ParseOk, id: u32) -> String {
        let node = match ok.node_id_map.xor_node(id).unwrap() {
            XorNode::Ast(n) => n,
            XorNode::Context(_) => panic!("expected a completed parse"),
        };
        let mut out = format!("{:?}", node.kind);
        for &child in &node.children {
            out.push('(');
            out.push_str(&shape(ok, child));
            out.push(')');
        }
        out
    }

    assert_eq!(shape(&first, first.root), shape(&second, second.root));
}

// ── Extension: `try`/`catch`, `@`-scoped identifiers, sections ───────

#[test]
fn try_catch_requires_exactly_one_parameter() {
    let ok = parse_ok("try 1 / 0 catch (e) => e");
    let handling = document_body(&ok);
    assert_eq!(kind_of(&ok, handling), NodeKind::ErrorHandlingExpression);
    let handler = *children_of(&ok, handling).last().unwrap();
    assert_eq!(kind_of(&ok, handler), NodeKind::CatchExpression);
}

#[test]
fn at_prefixed_identifier_parses_as_identifier_expression() {
    let ok = parse_ok("@x");
    let id_expr = document_body(&ok);
    assert_eq!(kind_of(&ok, id_expr), NodeKind::IdentifierExpression);
    let children = children_of(&ok, id_expr);
    assert_eq!(constant_of(&ok, children[0]), ConstantKind::At);
}

#[test]
fn section_mode_parses_a_fragment_without_a_document_wrapper() {
    let (tokens, errors) = pq_lexer::tokenize("section; shared x = 1;");
    assert!(errors.is_empty());
    let options = ParseOptions { mode: ParseMode::Section, ..ParseOptions::default() };
    let ok = parse(tokens, options).unwrap();
    assert_eq!(kind_of(&ok, ok.root), NodeKind::Section);
}
