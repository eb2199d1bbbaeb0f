//! Expression parsing using Pratt precedence.

use crate::ast::{Expr, ExprKind, InfixOp, PrefixOp};
use crate::error::ParserError;
use crate::lexer::TokenKind;

use super::core::{ParseResult, Parser};
use super::precedence::{get_precedence, Precedence};

impl Parser {
    pub(crate) fn expression(&mut self) -> ParseResult<Expr> {
        self.parse_precedence(Precedence::Equality)
    }

    fn parse_precedence(&mut self, min_precedence: Precedence) -> ParseResult<Expr> {
        let mut left = self.parse_prefix()?;

        while !self.is_at_end() {
            let precedence = get_precedence(&self.peek().kind);
            if precedence < min_precedence {
                break;
            }

            left = self.parse_infix(left, precedence)?;
        }

        Ok(left)
    }

    fn parse_prefix(&mut self) -> ParseResult<Expr> {
        let token = self.advance();
        let start_span = token.span;

        match &token.kind {
            TokenKind::IntLiteral(n) => Ok(Expr::new(ExprKind::IntegerLiteral(*n), start_span)),
            TokenKind::StringLiteral(s) => {
                Ok(Expr::new(ExprKind::StringLiteral(s.clone()), start_span))
            }
            TokenKind::BoolLiteral(b) => Ok(Expr::new(ExprKind::BooleanLiteral(*b), start_span)),
            TokenKind::Null => Ok(Expr::new(ExprKind::NullLiteral, start_span)),

            TokenKind::Identifier(name) => {
                Ok(Expr::new(ExprKind::Identifier(name.clone()), start_span))
            }

            TokenKind::LeftParen => {
                let expr = self.expression()?;
                self.expect(&TokenKind::RightParen)?;
                Ok(expr)
            }

            TokenKind::LeftBracket => self.parse_array(start_span),
            TokenKind::LeftBrace => self.parse_hash(start_span),
            TokenKind::If => self.parse_if(start_span),

            TokenKind::Minus => {
                let right = self.parse_precedence(Precedence::Unary)?;
                let span = start_span.merge(&right.span);
                Ok(Expr::new(
                    ExprKind::Prefix {
                        operator: PrefixOp::Negate,
                        right: Box::new(right),
                    },
                    span,
                ))
            }

            TokenKind::Bang => {
                let right = self.parse_precedence(Precedence::Unary)?;
                let span = start_span.merge(&right.span);
                Ok(Expr::new(
                    ExprKind::Prefix {
                        operator: PrefixOp::Not,
                        right: Box::new(right),
                    },
                    span,
                ))
            }

            _ => Err(ParserError::unexpected_token(
                "expression",
                format!("{}", token.kind),
                token.span,
            )),
        }
    }

    fn parse_infix(&mut self, left: Expr, precedence: Precedence) -> ParseResult<Expr> {
        let token = self.advance();

        let operator = match &token.kind {
            TokenKind::Plus => InfixOp::Add,
            TokenKind::Minus => InfixOp::Subtract,
            TokenKind::Star => InfixOp::Multiply,
            TokenKind::Slash => InfixOp::Divide,
            TokenKind::Less => InfixOp::Less,
            TokenKind::LessEqual => InfixOp::LessEqual,
            TokenKind::Greater => InfixOp::Greater,
            TokenKind::GreaterEqual => InfixOp::GreaterEqual,
            TokenKind::EqualEqual => InfixOp::Equal,
            TokenKind::BangEqual => InfixOp::NotEqual,

            TokenKind::LeftBracket => {
                let index = self.expression()?;
                self.expect(&TokenKind::RightBracket)?;
                let span = left.span.merge(&self.previous_span());
                return Ok(Expr::new(
                    ExprKind::Index {
                        left: Box::new(left),
                        index: Box::new(index),
                    },
                    span,
                ));
            }

            _ => {
                return Err(ParserError::unexpected_token(
                    "operator",
                    format!("{}", token.kind),
                    token.span,
                ));
            }
        };

        let right = self.parse_precedence(precedence.next())?;
        let span = left.span.merge(&right.span);
        Ok(Expr::new(
            ExprKind::Infix {
                left: Box::new(left),
                operator,
                right: Box::new(right),
            },
            span,
        ))
    }

    fn parse_array(&mut self, start_span: crate::span::Span) -> ParseResult<Expr> {
        let mut elements = Vec::new();

        if !self.check(&TokenKind::RightBracket) {
            loop {
                elements.push(self.expression()?);

                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
                if self.check(&TokenKind::RightBracket) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RightBracket)?;

        let span = start_span.merge(&self.previous_span());
        Ok(Expr::new(ExprKind::Array(elements), span))
    }

    fn parse_hash(&mut self, start_span: crate::span::Span) -> ParseResult<Expr> {
        let mut pairs = Vec::new();

        if !self.check(&TokenKind::RightBrace) {
            loop {
                let key = self.expression()?;
                self.expect(&TokenKind::Colon)?;
                let value = self.expression()?;
                pairs.push((key, value));

                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
                if self.check(&TokenKind::RightBrace) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RightBrace)?;

        let span = start_span.merge(&self.previous_span());
        Ok(Expr::new(ExprKind::Hash(pairs), span))
    }

    fn parse_if(&mut self, start_span: crate::span::Span) -> ParseResult<Expr> {
        self.expect(&TokenKind::LeftParen)?;
        let condition = self.expression()?;
        self.expect(&TokenKind::RightParen)?;

        self.expect(&TokenKind::LeftBrace)?;
        let consequence = self.block_statement()?;

        let alternative = if self.match_token(&TokenKind::Else) {
            self.expect(&TokenKind::LeftBrace)?;
            Some(self.block_statement()?)
        } else {
            None
        };

        let span = start_span.merge(&self.previous_span());
        Ok(Expr::new(
            ExprKind::If {
                condition: Box::new(condition),
                consequence,
                alternative,
            },
            span,
        ))
    }
}
