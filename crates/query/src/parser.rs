//! Recursive-descent parser for boolean note queries.
//!
//! Precedence, loosest to tightest: `OR`, `AND` (explicit or implied by
//! adjacency), `NOT`. The parser never fails: operators missing an operand
//! are dropped, and anything left over is folded in with implicit `AND`.

use crate::ast::Expr;
use crate::lexer::{tokenize, Token};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    /// Parse a query string. `None` means no usable terms were found; the
    /// caller treats that as a query matching nothing.
    pub fn parse(input: &str) -> Option<Expr> {
        let mut parser = Parser {
            tokens: tokenize(input),
            pos: 0,
        };
        let mut expr: Option<Expr> = None;
        while !parser.at_end() {
            match parser.parse_or() {
                Some(next) => {
                    expr = Some(match expr {
                        None => next,
                        Some(prev) => Expr::and(prev, next),
                    });
                }
                // Stray operator with no operand in reach: drop it and keep
                // extracting terms.
                None => parser.advance(),
            }
        }
        expr
    }

    fn parse_or(&mut self) -> Option<Expr> {
        let mut lhs = self.parse_and()?;
        while self.eat(&Token::Or) {
            match self.parse_and() {
                Some(rhs) => lhs = Expr::or(lhs, rhs),
                None => break,
            }
        }
        Some(lhs)
    }

    fn parse_and(&mut self) -> Option<Expr> {
        let mut lhs = self.parse_not()?;
        loop {
            self.eat(&Token::And);
            match self.parse_not() {
                Some(rhs) => lhs = Expr::and(lhs, rhs),
                None => break,
            }
        }
        Some(lhs)
    }

    fn parse_not(&mut self) -> Option<Expr> {
        let mut negations = 0usize;
        while self.eat(&Token::Not) {
            negations += 1;
        }
        let primary = self.parse_primary()?;
        if negations % 2 == 1 {
            Some(Expr::not(primary))
        } else {
            Some(primary)
        }
    }

    fn parse_primary(&mut self) -> Option<Expr> {
        let expr = match self.peek()? {
            Token::Word(text) => Expr::Term(text.clone()),
            Token::Phrase(text) => Expr::Phrase(text.clone()),
            _ => return None,
        };
        self.advance();
        Some(expr)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }
}
