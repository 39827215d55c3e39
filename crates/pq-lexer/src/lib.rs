//! Tokenizer for the Power Query (M) formula language.
//!
//! This crate is an external collaborator of the parser core (§4.6): it
//! turns source text into the finalized, random-access token stream the
//! core consumes. Nothing in here participates in grammar disambiguation
//! or tree construction.

mod cursor;
pub mod error;

use cursor::Cursor;
pub use error::{LexError, LexErrorKind};
use pq_common::token::keyword_from_str;
use pq_common::{LineIndex, Position, Token, TokenKind};

/// Tokenize `source`, returning the finalized token stream (always
/// terminated by a single [`TokenKind::Eof`]) and any lexer errors
/// encountered. Lexing does not stop at the first error: invalid runs are
/// wrapped into an error and skipped so later tokens can still be produced.
pub fn tokenize(source: &str) -> (Vec<Token>, Vec<LexError>) {
    let line_index = LineIndex::new(source);
    let mut cursor = Cursor::new(source);
    let mut tokens = Vec::new();
    let mut errors = Vec::new();

    loop {
        skip_trivia(&mut cursor);
        let start = cursor.pos();
        let Some(c) = cursor.peek() else {
            break;
        };

        let kind = if c.is_ascii_digit() {
            scan_number(&mut cursor, &mut errors, &line_index, start)
        } else if c == '"' {
            scan_text_literal(&mut cursor, &mut errors, &line_index, start)
        } else if c == '#' {
            scan_hash(&mut cursor, &mut errors, &line_index, start)
        } else if is_identifier_start(c) {
            scan_identifier(&mut cursor)
        } else {
            scan_punctuator(&mut cursor, &mut errors, &line_index, start)
        };

        let Some(kind) = kind else { continue };

        let end = cursor.pos();
        tokens.push(Token::new(
            kind,
            cursor.slice(start, end),
            line_index.position_at(start),
            line_index.position_at(end),
        ));
    }

    let eof_pos = line_index.position_at(cursor.pos());
    tokens.push(Token::new(TokenKind::Eof, "", eof_pos, eof_pos));
    (tokens, errors)
}

fn skip_trivia(cursor: &mut Cursor) {
    loop {
        match cursor.peek() {
            Some(c) if c.is_whitespace() => {
                cursor.advance();
            }
            Some('/') if cursor.peek_next() == Some('/') => {
                cursor.eat_while(|c| c != '\n');
            }
            Some('/') if cursor.peek_next() == Some('*') => {
                cursor.advance();
                cursor.advance();
                while !cursor.is_eof() {
                    if cursor.peek() == Some('*') && cursor.peek_next() == Some('/') {
                        cursor.advance();
                        cursor.advance();
                        break;
                    }
                    cursor.advance();
                }
            }
            _ => break,
        }
    }
}

fn is_identifier_start(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}

fn is_identifier_continue(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

fn scan_identifier(cursor: &mut Cursor) -> Option<TokenKind> {
    let start = cursor.pos();
    cursor.advance();
    cursor.eat_while(is_identifier_continue);
    let text = cursor.slice(start, cursor.pos());
    Some(keyword_from_str(text).unwrap_or(TokenKind::Identifier))
}

fn scan_number(
    cursor: &mut Cursor,
    errors: &mut Vec<LexError>,
    line_index: &LineIndex,
    start: u32,
) -> Option<TokenKind> {
    if cursor.peek() == Some('0') && matches!(cursor.peek_next(), Some('x') | Some('X')) {
        cursor.advance();
        cursor.advance();
        cursor.eat_while(|c| c.is_ascii_hexdigit());
        return Some(TokenKind::NumericLiteral);
    }

    cursor.eat_while(|c| c.is_ascii_digit());
    if cursor.peek() == Some('.') && cursor.peek_next().is_some_and(|c| c.is_ascii_digit()) {
        cursor.advance();
        cursor.eat_while(|c| c.is_ascii_digit());
    }
    if matches!(cursor.peek(), Some('e') | Some('E')) {
        let has_sign = matches!(cursor.peek_next(), Some('+') | Some('-'));
        let digit_offset = if has_sign { 2 } else { 1 };
        if cursor.peek_nth(digit_offset).is_some_and(|c| c.is_ascii_digit()) {
            for _ in 0..digit_offset {
                cursor.advance();
            }
            cursor.eat_while(|c| c.is_ascii_digit());
        }
    }

    let end = cursor.pos();
    let text = cursor.slice(start, end);
    if text.is_empty() || text == "." {
        errors.push(LexError::new(
            LexErrorKind::InvalidNumericLiteral(text.to_string()),
            line_index.position_at(start),
            line_index.position_at(end),
        ));
        return None;
    }
    Some(TokenKind::NumericLiteral)
}

fn scan_text_literal(
    cursor: &mut Cursor,
    errors: &mut Vec<LexError>,
    line_index: &LineIndex,
    start: u32,
) -> Option<TokenKind> {
    cursor.advance(); // opening quote
    loop {
        match cursor.peek() {
            None => {
                errors.push(LexError::new(
                    LexErrorKind::UnterminatedTextLiteral,
                    line_index.position_at(start),
                    line_index.position_at(cursor.pos()),
                ));
                return Some(TokenKind::TextLiteral);
            }
            Some('"') => {
                cursor.advance();
                if cursor.peek() == Some('"') {
                    // `""` inside a text literal is an escaped quote character.
                    cursor.advance();
                    continue;
                }
                return Some(TokenKind::TextLiteral);
            }
            Some(_) => {
                cursor.advance();
            }
        }
    }
}

fn scan_hash(
    cursor: &mut Cursor,
    errors: &mut Vec<LexError>,
    line_index: &LineIndex,
    start: u32,
) -> Option<TokenKind> {
    cursor.advance(); // '#'
    if cursor.peek() == Some('"') {
        // Quoted identifier: #"some identifier".
        return scan_text_literal(cursor, errors, line_index, start).map(|_| TokenKind::Identifier);
    }
    cursor.eat_while(is_identifier_continue);
    let text = cursor.slice(start, cursor.pos());
    match keyword_from_str(text) {
        Some(kind) => Some(kind),
        None => {
            errors.push(LexError::new(
                LexErrorKind::UnexpectedCharacter('#'),
                line_index.position_at(start),
                line_index.position_at(cursor.pos()),
            ));
            None
        }
    }
}

fn scan_punctuator(
    cursor: &mut Cursor,
    errors: &mut Vec<LexError>,
    line_index: &LineIndex,
    start: u32,
) -> Option<TokenKind> {
    let c = cursor.advance().expect("caller already peeked a character");
    let kind = match c {
        '(' => TokenKind::LeftParenthesis,
        ')' => TokenKind::RightParenthesis,
        '[' => TokenKind::LeftBracket,
        ']' => TokenKind::RightBracket,
        '{' => TokenKind::LeftBrace,
        '}' => TokenKind::RightBrace,
        ',' => TokenKind::Comma,
        ';' => TokenKind::Semicolon,
        '+' => TokenKind::Plus,
        '-' => TokenKind::Minus,
        '*' => TokenKind::Asterisk,
        '/' => TokenKind::Division,
        '&' => TokenKind::Ampersand,
        '@' => TokenKind::At,
        '=' => {
            if cursor.peek() == Some('>') {
                cursor.advance();
                TokenKind::FatArrow
            } else {
                TokenKind::Equal
            }
        }
        '<' => match cursor.peek() {
            Some('=') => {
                cursor.advance();
                TokenKind::LessThanEqualTo
            }
            Some('>') => {
                cursor.advance();
                TokenKind::NotEqual
            }
            _ => TokenKind::LessThan,
        },
        '>' => {
            if cursor.peek() == Some('=') {
                cursor.advance();
                TokenKind::GreaterThanEqualTo
            } else {
                TokenKind::GreaterThan
            }
        }
        '?' => {
            if cursor.peek() == Some('?') {
                cursor.advance();
                TokenKind::NullCoalescingOperator
            } else {
                TokenKind::QuestionMark
            }
        }
        '.' => {
            if cursor.peek() == Some('.') && cursor.peek_next() == Some('.') {
                cursor.advance();
                cursor.advance();
                TokenKind::DotDotDot
            } else {
                TokenKind::Dot
            }
        }
        other => {
            errors.push(LexError::new(
                LexErrorKind::UnexpectedCharacter(other),
                line_index.position_at(start),
                line_index.position_at(cursor.pos()),
            ));
            return None;
        }
    };
    Some(kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let (tokens, errors) = tokenize(source);
        assert!(errors.is_empty(), "unexpected lex errors: {errors:?}");
        tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn tokenizes_let_expression() {
        assert_eq!(
            kinds("let x = 1 in x"),
            vec![
                TokenKind::KeywordLet,
                TokenKind::Identifier,
                TokenKind::Equal,
                TokenKind::NumericLiteral,
                TokenKind::KeywordIn,
                TokenKind::Identifier,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn tokenizes_multi_char_operators_greedily() {
        assert_eq!(
            kinds("1 <= 2 <> 3 ?? 4 => 5"),
            vec![
                TokenKind::NumericLiteral,
                TokenKind::LessThanEqualTo,
                TokenKind::NumericLiteral,
                TokenKind::NotEqual,
                TokenKind::NumericLiteral,
                TokenKind::NullCoalescingOperator,
                TokenKind::NumericLiteral,
                TokenKind::FatArrow,
                TokenKind::NumericLiteral,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn tokenizes_hash_keywords_and_quoted_identifiers() {
        assert_eq!(
            kinds(r#"#shared #"my field""#),
            vec![TokenKind::KeywordHashShared, TokenKind::Identifier, TokenKind::Eof]
        );
    }

    #[test]
    fn tokenizes_text_literal_with_escaped_quote() {
        let (tokens, errors) = tokenize(r#""a""b""#);
        assert!(errors.is_empty());
        assert_eq!(tokens[0].kind, TokenKind::TextLiteral);
        assert_eq!(tokens[0].data, r#""a""b""#);
    }

    #[test]
    fn tokenizes_hex_and_float_numbers() {
        assert_eq!(
            kinds("0x1F 3.14 1e10 2.5e-3"),
            vec![
                TokenKind::NumericLiteral,
                TokenKind::NumericLiteral,
                TokenKind::NumericLiteral,
                TokenKind::NumericLiteral,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn unterminated_text_literal_reports_error() {
        let (_, errors) = tokenize(r#""abc"#);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, LexErrorKind::UnterminatedTextLiteral);
    }

    #[test]
    fn unexpected_character_is_skipped_and_reported() {
        let (tokens, errors) = tokenize("1 ~ 2");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, LexErrorKind::UnexpectedCharacter('~'));
        assert_eq!(
            tokens.iter().map(|t| t.kind).collect::<Vec<_>>(),
            vec![TokenKind::NumericLiteral, TokenKind::NumericLiteral, TokenKind::Eof]
        );
    }

    #[test]
    fn line_comments_and_block_comments_are_skipped() {
        assert_eq!(
            kinds("1 // comment\n+ /* block */ 2"),
            vec![
                TokenKind::NumericLiteral,
                TokenKind::Plus,
                TokenKind::NumericLiteral,
                TokenKind::Eof,
            ]
        );
    }
}
