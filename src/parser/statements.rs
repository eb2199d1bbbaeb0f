//! Statement parsing.

use crate::ast::{BlockStatement, Stmt, StmtKind};
use crate::lexer::TokenKind;

use super::core::{ParseResult, Parser};

impl Parser {
    pub(crate) fn statement(&mut self) -> ParseResult<Stmt> {
        if self.check(&TokenKind::Let) {
            self.let_statement()
        } else {
            self.expression_statement()
        }
    }

    fn let_statement(&mut self) -> ParseResult<Stmt> {
        let start_span = self.peek().span;
        self.expect(&TokenKind::Let)?;

        let name = self.expect_identifier()?;
        self.expect(&TokenKind::Equal)?;
        let value = self.expression()?;

        // A trailing semicolon is optional, matching REPL usage.
        self.match_token(&TokenKind::Semicolon);

        let span = start_span.merge(&self.previous_span());
        Ok(Stmt::new(StmtKind::Let { name, value }, span))
    }

    fn expression_statement(&mut self) -> ParseResult<Stmt> {
        let expr = self.expression()?;
        self.match_token(&TokenKind::Semicolon);

        let span = expr.span;
        Ok(Stmt::new(StmtKind::Expression(expr), span))
    }

    /// Parse a braced block. The opening brace has already been consumed.
    pub(crate) fn block_statement(&mut self) -> ParseResult<BlockStatement> {
        let start_span = self.previous_span();
        let mut statements = Vec::new();

        while !self.check(&TokenKind::RightBrace) && !self.is_at_end() {
            statements.push(self.statement()?);
        }
        self.expect(&TokenKind::RightBrace)?;

        let span = start_span.merge(&self.previous_span());
        Ok(BlockStatement { statements, span })
    }
}
