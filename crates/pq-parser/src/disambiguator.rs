//! Bounded-lookahead disambiguation for the two places the grammar shares
//! a prefix across several productions (§4.3): `[` (Record vs
//! FieldSelector vs FieldProjection) and `(` (ParenthesizedExpression vs
//! FunctionExpression).
//!
//! Both resolve deterministically from structural lookahead in the common
//! case. When that lookahead is inconclusive -- cut short by end of input,
//! or a shape neither rule anticipated -- `Strict` gives up with
//! `UnterminatedSequence` and `Thorough` falls back to actually trying
//! each alternative in an independent branch and keeping the best one.

use pq_common::{Position, TokenKind};

use crate::error::{ParseError, ParseErrorKind};
use crate::state::ParseState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BracketDisambiguation {
    Record,
    FieldSelector,
    FieldProjection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParenDisambiguation {
    Parenthesized,
    Function,
}

/// Bounded lookahead couldn't settle the question; the caller decides
/// what to do next (fail under `Strict`, speculate under `Thorough`) since
/// only it has the actual recognizers to speculate with.
#[derive(Debug)]
pub struct Inconclusive {
    pub opened_at: Position,
}

impl Inconclusive {
    /// The `Strict`-policy response: give up rather than guess.
    pub fn into_error(self, token_index: u32) -> ParseError {
        ParseError::new(ParseErrorKind::UnterminatedSequence { opened_at: self.opened_at }, None, token_index)
    }
}

/// `state.current_token()` must be `[`.
pub fn disambiguate_bracket(state: &ParseState) -> Result<BracketDisambiguation, Inconclusive> {
    let opened_at = state.current_token().expect("caller checked `[`").position_start;

    match state.peek_kind(1) {
        Some(TokenKind::LeftBracket) => return Ok(BracketDisambiguation::FieldProjection),
        Some(TokenKind::RightBracket) => return Ok(BracketDisambiguation::Record),
        Some(kind) if is_generalized_identifier_start(kind) => match state.peek_kind(2) {
            Some(TokenKind::Equal) => return Ok(BracketDisambiguation::Record),
            Some(TokenKind::RightBracket) => return Ok(BracketDisambiguation::FieldSelector),
            _ => {}
        },
        _ => {}
    }

    Err(Inconclusive { opened_at })
}

/// `state.current_token()` must be `(`. Scans forward for the matching
/// close paren (bounded by the token stream's own nesting, not a fixed
/// window) and inspects the token right after it.
pub fn disambiguate_paren(state: &ParseState) -> Result<ParenDisambiguation, Inconclusive> {
    let opened_at = state.current_token().expect("caller checked `(`").position_start;

    let mut depth: i32 = 0;
    let mut offset: u32 = 0;
    loop {
        match state.peek_kind(offset) {
            Some(TokenKind::LeftParenthesis) => depth += 1,
            Some(TokenKind::RightParenthesis) => {
                depth -= 1;
                if depth == 0 {
                    return Ok(match state.peek_kind(offset + 1) {
                        Some(TokenKind::FatArrow) => ParenDisambiguation::Function,
                        _ => ParenDisambiguation::Parenthesized,
                    });
                }
            }
            Some(_) => {}
            None => break,
        }
        offset += 1;
    }

    Err(Inconclusive { opened_at })
}

/// Keywords are admitted as generalized identifiers (§GLOSSARY); the
/// hash-prefixed keywords and the literal keywords (`null`/`true`/`false`)
/// are not, since those tokens have their own dedicated leaf productions.
pub(crate) fn is_generalized_identifier_start(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Identifier
            | TokenKind::KeywordAnd
            | TokenKind::KeywordAs
            | TokenKind::KeywordEach
            | TokenKind::KeywordElse
            | TokenKind::KeywordError
            | TokenKind::KeywordIf
            | TokenKind::KeywordIn
            | TokenKind::KeywordIs
            | TokenKind::KeywordLet
            | TokenKind::KeywordMeta
            | TokenKind::KeywordNot
            | TokenKind::KeywordOr
            | TokenKind::KeywordOtherwise
            | TokenKind::KeywordSection
            | TokenKind::KeywordShared
            | TokenKind::KeywordThen
            | TokenKind::KeywordTry
            | TokenKind::KeywordType
    )
}

/// Run each alternative in `attempts` on its own branch of `state`
/// (`Thorough` only, §4.1/§4.3), then commit the winner into `state`
/// according to the three-tier selection rule: most tokens consumed,
/// then success over failure, then the earlier-listed alternative.
pub fn resolve_via_speculation<T>(
    state: &mut ParseState,
    opened_at: Position,
    attempts: Vec<Box<dyn FnOnce(&mut ParseState) -> Result<T, ParseError>>>,
) -> Result<T, ParseError> {
    let start_index = state.token_index;
    let mut best: Option<(u32, Result<T, ParseError>, ParseState)> = None;

    for attempt in attempts {
        let mut branch = state.branch();
        let result = attempt(&mut branch);
        let tokens_consumed = branch.token_index.saturating_sub(start_index);
        let is_better = match &best {
            None => true,
            Some((best_tokens, best_result, _)) => {
                tokens_consumed > *best_tokens || (tokens_consumed == *best_tokens && best_result.is_err() && result.is_ok())
            }
        };
        if is_better {
            best = Some((tokens_consumed, result, branch));
        }
    }

    match best {
        Some((_, result, branch)) => {
            state.apply_branch(branch);
            result
        }
        None => Err(ParseError::new(
            ParseErrorKind::UnterminatedSequence { opened_at },
            None,
            state.token_index,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::DisambiguationPolicy;

    fn state_for(source: &str) -> ParseState {
        let (tokens, errors) = pq_lexer::tokenize(source);
        assert!(errors.is_empty(), "unexpected lex errors: {errors:?}");
        ParseState::new(tokens, DisambiguationPolicy::Strict)
    }

    #[test]
    fn empty_brackets_are_a_record() {
        let state = state_for("[]");
        assert_eq!(disambiguate_bracket(&state).unwrap(), BracketDisambiguation::Record);
    }

    #[test]
    fn bracket_with_equals_is_a_record() {
        let state = state_for("[a = 1]");
        assert_eq!(disambiguate_bracket(&state).unwrap(), BracketDisambiguation::Record);
    }

    #[test]
    fn single_bare_identifier_is_a_field_selector() {
        let state = state_for("[Name]");
        assert_eq!(disambiguate_bracket(&state).unwrap(), BracketDisambiguation::FieldSelector);
    }

    #[test]
    fn doubly_bracketed_names_are_a_field_projection() {
        let state = state_for("[[Name],[Age]]");
        assert_eq!(disambiguate_bracket(&state).unwrap(), BracketDisambiguation::FieldProjection);
    }

    #[test]
    fn comma_separated_bare_identifiers_are_inconclusive() {
        // `[Name, Age]` isn't a valid FieldProjection (that needs the
        // doubly-bracketed `[[Name],[Age]]` form) and the bounded lookahead
        // doesn't special-case a bare comma, so this falls through to
        // `Inconclusive` -- `Strict` then reports `UnterminatedSequence`
        // rather than silently routing to FieldProjection.
        let state = state_for("[Name, Age]");
        assert!(disambiguate_bracket(&state).is_err());
    }

    #[test]
    fn keyword_admitted_as_generalized_identifier_in_field_selector() {
        let state = state_for("[type]");
        assert_eq!(disambiguate_bracket(&state).unwrap(), BracketDisambiguation::FieldSelector);
    }

    #[test]
    fn empty_parens_followed_by_fat_arrow_is_a_function() {
        let state = state_for("() => 1");
        assert_eq!(disambiguate_paren(&state).unwrap(), ParenDisambiguation::Function);
    }

    #[test]
    fn empty_parens_without_fat_arrow_is_parenthesized() {
        // Not valid M on its own, but exercises the "no => " branch.
        let state = state_for("()");
        assert_eq!(disambiguate_paren(&state).unwrap(), ParenDisambiguation::Parenthesized);
    }

    #[test]
    fn parenthesized_expression_resolves_past_nested_parens() {
        let state = state_for("((1 + 2)) + 3");
        assert_eq!(disambiguate_paren(&state).unwrap(), ParenDisambiguation::Parenthesized);
    }

    #[test]
    fn function_with_parameters_resolves_past_nested_parens() {
        let state = state_for("(x as number) => x + 1");
        assert_eq!(disambiguate_paren(&state).unwrap(), ParenDisambiguation::Function);
    }

    #[test]
    fn unterminated_parens_are_inconclusive() {
        let state = state_for("(1 + 2");
        assert!(disambiguate_paren(&state).is_err());
    }
}
