//! Recursive-descent parser for concept expressions.
//!
//! Precedence, loosest to tightest: conditional, `||`, `&&`, `==`/`!=`,
//! unary `!`, primary (identifier, call, parenthesized). The conditional is
//! right-associative; equality does not chain.

use crate::error::ExprError;

use super::lexer::{Token, TokenKind};
use super::{AstId, AstNode, BinaryOp, UnaryOp};

pub(super) fn parse(tokens: &[Token], source_len: usize) -> Result<(Vec<AstNode>, AstId), ExprError> {
    let mut parser = Parser {
        tokens,
        pos: 0,
        nodes: Vec::new(),
        source_len,
    };
    let root = parser.conditional()?;
    if let Some(token) = parser.peek() {
        return Err(ExprError::Parse {
            message: format!("unexpected trailing token {:?}", token.text),
            offset: token.span.start,
        });
    }
    Ok((parser.nodes, root))
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    nodes: Vec<AstNode>,
    source_len: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn offset(&self) -> usize {
        self.peek().map(|t| t.span.start).unwrap_or(self.source_len)
    }

    fn push(&mut self, node: AstNode) -> AstId {
        let id = AstId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<&'a Token, ExprError> {
        match self.peek() {
            Some(token) if token.kind == kind => Ok(self.advance().unwrap()),
            Some(token) => Err(ExprError::Parse {
                message: format!("expected {what}, found {:?}", token.text),
                offset: token.span.start,
            }),
            None => Err(ExprError::Parse {
                message: format!("expected {what}, found end of input"),
                offset: self.source_len,
            }),
        }
    }

    fn conditional(&mut self) -> Result<AstId, ExprError> {
        let condition = self.or()?;
        if matches!(self.peek(), Some(t) if t.kind == TokenKind::Question) {
            self.advance();
            let then_branch = self.conditional()?;
            self.expect(TokenKind::Colon, "`:`")?;
            let else_branch = self.conditional()?;
            return Ok(self.push(AstNode::Conditional {
                condition,
                then_branch,
                else_branch,
            }));
        }
        Ok(condition)
    }

    fn or(&mut self) -> Result<AstId, ExprError> {
        let mut lhs = self.and()?;
        while matches!(self.peek(), Some(t) if t.kind == TokenKind::OrOr) {
            self.advance();
            let rhs = self.and()?;
            lhs = self.push(AstNode::Binary {
                op: BinaryOp::Or,
                lhs,
                rhs,
            });
        }
        Ok(lhs)
    }

    fn and(&mut self) -> Result<AstId, ExprError> {
        let mut lhs = self.equality()?;
        while matches!(self.peek(), Some(t) if t.kind == TokenKind::AndAnd) {
            self.advance();
            let rhs = self.equality()?;
            lhs = self.push(AstNode::Binary {
                op: BinaryOp::And,
                lhs,
                rhs,
            });
        }
        Ok(lhs)
    }

    fn equality(&mut self) -> Result<AstId, ExprError> {
        let lhs = self.unary()?;
        let op = match self.peek() {
            Some(t) if t.kind == TokenKind::EqEq => BinaryOp::Eq,
            Some(t) if t.kind == TokenKind::BangEq => BinaryOp::Ne,
            _ => return Ok(lhs),
        };
        self.advance();
        let rhs = self.unary()?;
        Ok(self.push(AstNode::Binary { op, lhs, rhs }))
    }

    fn unary(&mut self) -> Result<AstId, ExprError> {
        if matches!(self.peek(), Some(t) if t.kind == TokenKind::Bang) {
            self.advance();
            let operand = self.unary()?;
            return Ok(self.push(AstNode::Unary {
                op: UnaryOp::Not,
                operand,
            }));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<AstId, ExprError> {
        match self.peek() {
            Some(t) if t.kind == TokenKind::Ident => {
                let name = t.text.clone();
                self.advance();
                if matches!(self.peek(), Some(t) if t.kind == TokenKind::LParen) {
                    self.advance();
                    let mut args = Vec::new();
                    if !matches!(self.peek(), Some(t) if t.kind == TokenKind::RParen) {
                        loop {
                            args.push(self.conditional()?);
                            if matches!(self.peek(), Some(t) if t.kind == TokenKind::Comma) {
                                self.advance();
                            } else {
                                break;
                            }
                        }
                    }
                    self.expect(TokenKind::RParen, "`)`")?;
                    return Ok(self.push(AstNode::Call {
                        function: name,
                        args,
                    }));
                }
                Ok(self.push(AstNode::Identifier(name)))
            }
            Some(t) if t.kind == TokenKind::LParen => {
                self.advance();
                let inner = self.conditional()?;
                self.expect(TokenKind::RParen, "`)`")?;
                Ok(inner)
            }
            Some(t) => Err(ExprError::Parse {
                message: format!("expected an expression, found {:?}", t.text),
                offset: t.span.start,
            }),
            None => Err(ExprError::Parse {
                message: "expected an expression, found end of input".to_string(),
                offset: self.offset(),
            }),
        }
    }
}
