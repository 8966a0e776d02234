//! Parser for Forge script
//!
//! Parses token stream into an Abstract Syntax Tree (AST).

use crate::ast::*;
use crate::error::{Error, Errors, Result};
use crate::lexer::{Span, SpannedToken, Token};

/// Deepest nesting of blocks, groupings and unary operators the parser accepts
pub const MAX_NESTING_DEPTH: usize = 100;

pub struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
    depth: usize,
}

impl Parser {
    pub fn new(tokens: Vec<SpannedToken>) -> Self {
        Self { tokens, pos: 0, depth: 0 }
    }

    /// Parse the whole script, stopping at the first error
    pub fn parse(&mut self) -> Result<Program> {
        let mut stmts = Vec::new();

        while !self.is_at_end() {
            stmts.push(self.parse_stmt()?);
        }

        Ok(Program { stmts })
    }

    /// Parse the whole script, skipping past broken statements
    ///
    /// Returns every statement that parsed along with all errors seen.
    pub fn parse_recovering(&mut self) -> (Program, Errors) {
        let mut stmts = Vec::new();
        let mut errors = Errors::new();

        while !self.is_at_end() {
            match self.parse_stmt() {
                Ok(stmt) => stmts.push(stmt),
                Err(e) => {
                    errors.push(e);
                    self.synchronize();
                }
            }
        }

        (Program { stmts }, errors)
    }

    /// Skip tokens until a plausible statement boundary
    fn synchronize(&mut self) {
        let start = self.pos;
        while let Some(token) = self.peek_token() {
            match token {
                Token::Semi | Token::RBrace => {
                    self.advance();
                    return;
                }
                Token::Let
                | Token::Fn
                | Token::Async
                | Token::If
                | Token::While
                | Token::Loop
                | Token::Return
                | Token::Break
                | Token::Continue
                    if self.pos > start =>
                {
                    return;
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    // ===== Statement Parsing =====

    fn parse_block(&mut self) -> Result<Vec<Stmt>> {
        self.nested(Self::parse_block_inner)
    }

    fn parse_block_inner(&mut self) -> Result<Vec<Stmt>> {
        self.expect(Token::LBrace)?;
        let mut stmts = Vec::new();

        while !matches!(self.peek_token(), Some(Token::RBrace)) && !self.is_at_end() {
            stmts.push(self.parse_stmt()?);
        }

        self.expect(Token::RBrace)?;
        Ok(stmts)
    }

    fn parse_stmt(&mut self) -> Result<Stmt> {
        match self.peek_token() {
            Some(Token::Let) => self.parse_let(),
            Some(Token::Fn) => self.parse_function(false),
            Some(Token::Async) => {
                self.advance();
                if !matches!(self.peek_token(), Some(Token::Fn)) {
                    return Err(self.error("Expected 'fn' after 'async'"));
                }
                self.parse_function(true)
            }
            Some(Token::Return) => self.parse_return(),
            Some(Token::If) => self.parse_if(),
            Some(Token::While) => self.parse_while(),
            Some(Token::Loop) => {
                let start_span = self.current_span();
                self.advance();
                let body = self.parse_block()?;
                Ok(Stmt::Loop { body, span: start_span.merge(&self.prev_span()) })
            }
            Some(Token::Break) => {
                let span = self.current_span();
                self.advance();
                self.expect(Token::Semi)?;
                Ok(Stmt::Break(span))
            }
            Some(Token::Continue) => {
                let span = self.current_span();
                self.advance();
                self.expect(Token::Semi)?;
                Ok(Stmt::Continue(span))
            }
            _ => {
                // Try to parse as assignment or expression statement
                let expr = self.parse_expr()?;

                if matches!(self.peek_token(), Some(Token::Eq)) {
                    self.advance();
                    let value = self.parse_expr()?;
                    let span = expr.span.merge(&self.current_span());
                    self.expect(Token::Semi)?;
                    match expr.kind {
                        ExprKind::Ident(name) => Ok(Stmt::Assign { name, value, span }),
                        ExprKind::Index { expr: target, index } => Ok(Stmt::SetIndex {
                            target: *target,
                            index: *index,
                            value,
                            span,
                        }),
                        _ => Err(Error::ParseError {
                            message: "Invalid assignment target".to_string(),
                            line: expr.span.line,
                            col: expr.span.col,
                        }),
                    }
                } else {
                    // Expression statement
                    self.expect(Token::Semi)?;
                    Ok(Stmt::Expr(expr))
                }
            }
        }
    }

    fn parse_let(&mut self) -> Result<Stmt> {
        let start_span = self.current_span();
        self.expect(Token::Let)?;
        let name = self.expect_ident()?;
        self.expect(Token::Eq)?;
        let value = self.parse_expr()?;
        let end_span = self.current_span();
        self.expect(Token::Semi)?;

        Ok(Stmt::Let { name, value, span: start_span.merge(&end_span) })
    }

    fn parse_function(&mut self, is_async: bool) -> Result<Stmt> {
        let start_span = self.current_span();
        self.expect(Token::Fn)?;
        let name = self.expect_ident()?;
        self.expect(Token::LParen)?;
        let params = self.parse_params()?;
        self.expect(Token::RParen)?;
        let body = self.parse_block()?;

        Ok(Stmt::Fn(FnDecl {
            name,
            params,
            body,
            is_async,
            span: start_span.merge(&self.prev_span()),
        }))
    }

    fn parse_params(&mut self) -> Result<Vec<String>> {
        let mut params = Vec::new();

        if matches!(self.peek_token(), Some(Token::RParen)) {
            return Ok(params);
        }

        loop {
            let name = self.expect_ident()?;
            if params.contains(&name) {
                return Err(self.error_at_prev(&format!("Duplicate parameter '{}'", name)));
            }
            params.push(name);

            if !matches!(self.peek_token(), Some(Token::Comma)) {
                break;
            }
            self.advance();
        }

        Ok(params)
    }

    fn parse_return(&mut self) -> Result<Stmt> {
        let start_span = self.current_span();
        self.expect(Token::Return)?;

        let value = if matches!(self.peek_token(), Some(Token::Semi)) {
            None
        } else {
            Some(self.parse_expr()?)
        };

        let end_span = self.current_span();
        self.expect(Token::Semi)?;
        Ok(Stmt::Return(value, start_span.merge(&end_span)))
    }

    fn parse_if(&mut self) -> Result<Stmt> {
        let start_span = self.current_span();
        self.expect(Token::If)?;
        let condition = self.parse_expr()?;
        let then_body = self.parse_block()?;

        let else_body = if matches!(self.peek_token(), Some(Token::Else)) {
            self.advance();
            if matches!(self.peek_token(), Some(Token::If)) {
                Some(vec![self.parse_if()?])
            } else {
                Some(self.parse_block()?)
            }
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_body,
            else_body,
            span: start_span.merge(&self.prev_span()),
        })
    }

    fn parse_while(&mut self) -> Result<Stmt> {
        let start_span = self.current_span();
        self.expect(Token::While)?;
        let condition = self.parse_expr()?;
        let body = self.parse_block()?;

        Ok(Stmt::While { condition, body, span: start_span.merge(&self.prev_span()) })
    }

    // ===== Expression Parsing =====

    pub fn parse_expr(&mut self) -> Result<Expr> {
        self.nested(Self::parse_logical_or)
    }

    fn parse_logical_or(&mut self) -> Result<Expr> {
        let mut left = self.parse_logical_and()?;

        while matches!(self.peek_token(), Some(Token::OrOr)) {
            self.advance();
            let right = self.parse_logical_and()?;
            left = binary(left, BinOp::Or, right);
        }

        Ok(left)
    }

    fn parse_logical_and(&mut self) -> Result<Expr> {
        let mut left = self.parse_equality()?;

        while matches!(self.peek_token(), Some(Token::AndAnd)) {
            self.advance();
            let right = self.parse_equality()?;
            left = binary(left, BinOp::And, right);
        }

        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr> {
        let mut left = self.parse_comparison()?;

        while let Some(op_token) = self.peek_token() {
            let op = match op_token {
                Token::EqEq => BinOp::Eq,
                Token::Ne => BinOp::Ne,
                _ => break,
            };

            self.advance();
            let right = self.parse_comparison()?;
            left = binary(left, op, right);
        }

        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Expr> {
        let mut left = self.parse_term()?;

        while let Some(op_token) = self.peek_token() {
            let op = match op_token {
                Token::Lt => BinOp::Lt,
                Token::Le => BinOp::Le,
                Token::Gt => BinOp::Gt,
                Token::Ge => BinOp::Ge,
                _ => break,
            };

            self.advance();
            let right = self.parse_term()?;
            left = binary(left, op, right);
        }

        Ok(left)
    }

    fn parse_term(&mut self) -> Result<Expr> {
        let mut left = self.parse_factor()?;

        while let Some(op_token) = self.peek_token() {
            let op = match op_token {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Sub,
                _ => break,
            };

            self.advance();
            let right = self.parse_factor()?;
            left = binary(left, op, right);
        }

        Ok(left)
    }

    fn parse_factor(&mut self) -> Result<Expr> {
        let mut left = self.parse_unary()?;

        while let Some(op_token) = self.peek_token() {
            let op = match op_token {
                Token::Star => BinOp::Mul,
                Token::Slash => BinOp::Div,
                Token::Percent => BinOp::Rem,
                _ => break,
            };

            self.advance();
            let right = self.parse_unary()?;
            left = binary(left, op, right);
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        let start_span = self.current_span();
        let op = match self.peek_token() {
            Some(Token::Minus) => UnOp::Neg,
            Some(Token::Bang) => UnOp::Not,
            Some(Token::Await) => {
                self.advance();
                let expr = self.nested(Self::parse_unary)?;
                let span = start_span.merge(&expr.span);
                return Ok(Expr::new(ExprKind::Await { expr: Box::new(expr) }, span));
            }
            _ => return self.parse_postfix(),
        };

        self.advance();
        let expr = self.nested(Self::parse_unary)?;
        let span = start_span.merge(&expr.span);
        Ok(Expr::new(ExprKind::Unary { op, expr: Box::new(expr) }, span))
    }

    fn parse_postfix(&mut self) -> Result<Expr> {
        let mut expr = self.parse_primary()?;

        loop {
            match self.peek_token() {
                Some(Token::LParen) => {
                    self.advance();
                    let args = self.parse_args(Token::RParen)?;
                    let end_span = self.current_span();
                    self.expect(Token::RParen)?;
                    let span = expr.span.merge(&end_span);
                    expr = Expr::new(ExprKind::Call { callee: Box::new(expr), args }, span);
                }
                Some(Token::LBracket) => {
                    self.advance();
                    let index = self.parse_expr()?;
                    let end_span = self.current_span();
                    self.expect(Token::RBracket)?;
                    let span = expr.span.merge(&end_span);
                    expr = Expr::new(
                        ExprKind::Index { expr: Box::new(expr), index: Box::new(index) },
                        span,
                    );
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let span = self.current_span();
        let literal = match self.peek_token() {
            Some(Token::Int(n)) => Literal::Int(*n),
            Some(Token::Float(f)) => Literal::Float(*f),
            Some(Token::True) => Literal::Bool(true),
            Some(Token::False) => Literal::Bool(false),
            Some(Token::None) => Literal::None,
            Some(Token::String(s)) => Literal::String(s.clone()),
            Some(Token::Ident(name)) => {
                let name = name.clone();
                self.advance();
                return Ok(Expr::new(ExprKind::Ident(name), span));
            }
            Some(Token::LParen) => {
                // Grouping only; the span widens to cover the parens
                self.advance();
                let inner = self.parse_expr()?;
                let end_span = self.current_span();
                self.expect(Token::RParen)?;
                return Ok(Expr::new(inner.kind, span.merge(&end_span)));
            }
            Some(Token::LBracket) => {
                self.advance();
                let elements = self.parse_args(Token::RBracket)?;
                let end_span = self.current_span();
                self.expect(Token::RBracket)?;
                return Ok(Expr::new(ExprKind::List { elements }, span.merge(&end_span)));
            }
            _ => return Err(self.error("Expected expression")),
        };

        self.advance();
        Ok(Expr::new(ExprKind::Literal(literal), span))
    }

    /// Comma-separated expressions up to (not including) `close`.
    /// A trailing comma is accepted.
    fn parse_args(&mut self, close: Token) -> Result<Vec<Expr>> {
        let mut args = Vec::new();

        while !self.check(&close) {
            args.push(self.parse_expr()?);

            if !matches!(self.peek_token(), Some(Token::Comma)) {
                break;
            }
            self.advance();
        }

        Ok(args)
    }

    // ===== Helper Methods =====

    /// Run `parse` one nesting level deeper, refusing past [`MAX_NESTING_DEPTH`]
    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(self.error(&format!("Nesting deeper than {} levels", MAX_NESTING_DEPTH)));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    /// Peek at the current token (without span)
    fn peek_token(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|st| &st.token)
    }

    fn check(&self, expected: &Token) -> bool {
        self.peek_token()
            .is_some_and(|t| std::mem::discriminant(t) == std::mem::discriminant(expected))
    }

    /// Get the span of the current token
    fn current_span(&self) -> Span {
        match self.tokens.get(self.pos) {
            Some(st) => st.span,
            // Point just past the last token so EOF errors carry a position
            None => self.tokens.last().map(|st| st.span).unwrap_or_default(),
        }
    }

    /// Get the span of the previous token
    fn prev_span(&self) -> Span {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map(|st| st.span)
            .unwrap_or_default()
    }

    fn advance(&mut self) -> Option<&SpannedToken> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn expect(&mut self, expected: Token) -> Result<()> {
        if self.check(&expected) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(&format!("Expected {}", describe(&expected))))
        }
    }

    fn expect_ident(&mut self) -> Result<String> {
        match self.peek_token() {
            Some(Token::Ident(name)) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.error("Expected identifier")),
        }
    }

    fn error(&self, message: &str) -> Error {
        let span = self.current_span();
        let message = match self.peek_token() {
            Some(found) => format!("{}, found {}", message, describe(found)),
            None => format!("{}, found end of input", message),
        };
        Error::ParseError { message, line: span.line, col: span.col }
    }

    fn error_at_prev(&self, message: &str) -> Error {
        let span = self.prev_span();
        Error::ParseError { message: message.to_string(), line: span.line, col: span.col }
    }
}

fn binary(left: Expr, op: BinOp, right: Expr) -> Expr {
    let span = left.span.merge(&right.span);
    Expr::new(ExprKind::Binary { left: Box::new(left), op, right: Box::new(right) }, span)
}

/// Human-readable token name for diagnostics
fn describe(token: &Token) -> String {
    let text = match token {
        Token::Ident(name) => return format!("identifier '{}'", name),
        Token::Int(n) => return format!("integer {}", n),
        Token::Float(f) => return format!("float {}", f),
        Token::String(_) | Token::UnterminatedString => "string literal",
        Token::Fn => "'fn'",
        Token::Async => "'async'",
        Token::Await => "'await'",
        Token::Let => "'let'",
        Token::Return => "'return'",
        Token::If => "'if'",
        Token::Else => "'else'",
        Token::While => "'while'",
        Token::Loop => "'loop'",
        Token::Break => "'break'",
        Token::Continue => "'continue'",
        Token::True => "'true'",
        Token::False => "'false'",
        Token::None => "'none'",
        Token::Plus => "'+'",
        Token::Minus => "'-'",
        Token::Star => "'*'",
        Token::Slash => "'/'",
        Token::Percent => "'%'",
        Token::EqEq => "'=='",
        Token::Ne => "'!='",
        Token::Lt => "'<'",
        Token::Le => "'<='",
        Token::Gt => "'>'",
        Token::Ge => "'>='",
        Token::AndAnd => "'&&'",
        Token::OrOr => "'||'",
        Token::Bang => "'!'",
        Token::Eq => "'='",
        Token::Semi => "';'",
        Token::Comma => "','",
        Token::LParen => "'('",
        Token::RParen => "')'",
        Token::LBrace => "'{'",
        Token::RBrace => "'}'",
        Token::LBracket => "'['",
        Token::RBracket => "']'",
    };
    text.to_string()
}
