//! Lexer for concept expressions.
//!
//! The grammar is small: identifiers, calls, equality tests, boolean
//! connectives, a conditional, and parentheses. Tokens carry byte spans so
//! parse errors can point at the offending offset.

use crate::error::ExprError;

/// Byte-level source span for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// Kinds of tokens in a concept expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Identifier or dotted name.
    Ident,
    /// `==`
    EqEq,
    /// `!=`
    BangEq,
    /// `&&`
    AndAnd,
    /// `||`
    OrOr,
    /// `!`
    Bang,
    /// `?`
    Question,
    /// `:`
    Colon,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `,`
    Comma,
}

/// A single lexical token with its surface text.
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub span: Span,
}

fn is_ident_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_'
}

fn is_ident_continue(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '.'
}

/// Tokenize a concept expression.
pub fn tokenize(source: &str) -> Result<Vec<Token>, ExprError> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some(&(start, ch)) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
            continue;
        }

        if is_ident_start(ch) {
            let mut end = start;
            while let Some(&(pos, c)) = chars.peek() {
                if is_ident_continue(c) {
                    end = pos + c.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(Token {
                kind: TokenKind::Ident,
                text: source[start..end].to_string(),
                span: Span { start, end },
            });
            continue;
        }

        chars.next();
        let two = |kind: TokenKind, text: &str| Token {
            kind,
            text: text.to_string(),
            span: Span {
                start,
                end: start + 2,
            },
        };
        let one = |kind: TokenKind, text: &str| Token {
            kind,
            text: text.to_string(),
            span: Span {
                start,
                end: start + ch.len_utf8(),
            },
        };

        let token = match ch {
            '=' => match chars.peek() {
                Some(&(_, '=')) => {
                    chars.next();
                    two(TokenKind::EqEq, "==")
                }
                _ => return Err(ExprError::UnexpectedChar { ch, offset: start }),
            },
            '!' => match chars.peek() {
                Some(&(_, '=')) => {
                    chars.next();
                    two(TokenKind::BangEq, "!=")
                }
                _ => one(TokenKind::Bang, "!"),
            },
            '&' => match chars.peek() {
                Some(&(_, '&')) => {
                    chars.next();
                    two(TokenKind::AndAnd, "&&")
                }
                _ => return Err(ExprError::UnexpectedChar { ch, offset: start }),
            },
            '|' => match chars.peek() {
                Some(&(_, '|')) => {
                    chars.next();
                    two(TokenKind::OrOr, "||")
                }
                _ => return Err(ExprError::UnexpectedChar { ch, offset: start }),
            },
            '?' => one(TokenKind::Question, "?"),
            ':' => one(TokenKind::Colon, ":"),
            '(' => one(TokenKind::LParen, "("),
            ')' => one(TokenKind::RParen, ")"),
            ',' => one(TokenKind::Comma, ","),
            _ => return Err(ExprError::UnexpectedChar { ch, offset: start }),
        };
        tokens.push(token);
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_call_with_operators() {
        let tokens = tokenize("x == Const ? lub(a, b) : NonConst").unwrap();
        let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Ident,
                TokenKind::EqEq,
                TokenKind::Ident,
                TokenKind::Question,
                TokenKind::Ident,
                TokenKind::LParen,
                TokenKind::Ident,
                TokenKind::Comma,
                TokenKind::Ident,
                TokenKind::RParen,
                TokenKind::Colon,
                TokenKind::Ident,
            ]
        );
    }

    #[test]
    fn dotted_identifier_is_one_token() {
        let tokens = tokenize("actor.port").unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].text, "actor.port");
    }

    #[test]
    fn lone_equals_is_rejected() {
        let err = tokenize("a = b").unwrap_err();
        assert!(matches!(err, ExprError::UnexpectedChar { ch: '=', offset: 2 }));
    }

    #[test]
    fn spans_track_byte_offsets() {
        let tokens = tokenize("ab && cd").unwrap();
        assert_eq!(tokens[0].span, Span { start: 0, end: 2 });
        assert_eq!(tokens[1].span, Span { start: 3, end: 5 });
        assert_eq!(tokens[2].span, Span { start: 6, end: 8 });
    }
}
