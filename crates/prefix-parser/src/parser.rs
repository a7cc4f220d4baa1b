// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! A recursive-descent parser. Prefix writes every operator in call form, so
//! there is no precedence climbing — only calls, literals, and the handful
//! of bracket/angle postfix forms.

use prefix_ast::expr::{Arg, Expr, ExprKind};
use prefix_ast::stmt::{FuncDecl, Param, Stmt, StmtKind};
use prefix_ast::token::{Token, TokenKind, TypeTag};
use prefix_ast::{NodeId, Span};

/// Maximum number of errors to collect before stopping.
const MAX_ERRORS: usize = 20;

/// The parser for Prefix source code.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    errors: Vec<ParseError>,
    next_node_id: u32,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0, errors: Vec::new(), next_node_id: 0 }
    }

    fn next_id(&mut self) -> NodeId {
        let id = NodeId(self.next_node_id);
        self.next_node_id += 1;
        id
    }

    fn record_error(&mut self, error: ParseError) -> bool {
        self.errors.push(error);
        self.errors.len() < MAX_ERRORS
    }

    /// Skip to the next statement boundary after an error, tracking brace
    /// depth so we don't resync inside a nested block.
    fn synchronize(&mut self) {
        let mut depth = 0i32;
        while !self.at_end() {
            match self.current_kind() {
                TokenKind::LBrace => {
                    depth += 1;
                    self.advance();
                }
                TokenKind::RBrace => {
                    self.advance();
                    depth -= 1;
                    if depth <= 0 {
                        return;
                    }
                }
                _ if depth == 0 && self.starts_stmt() => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    fn starts_stmt(&self) -> bool {
        matches!(
            self.current_kind(),
            TokenKind::KwIf
                | TokenKind::KwWhile
                | TokenKind::KwFor
                | TokenKind::KwParfor
                | TokenKind::KwFunc
                | TokenKind::KwReturn
                | TokenKind::KwBreak
                | TokenKind::KwContinue
                | TokenKind::KwGoto
                | TokenKind::KwGotopoint
                | TokenKind::KwThr
                | TokenKind::KwAsync
                | TokenKind::KwTry
                | TokenKind::KwPop
                | TokenKind::TypeTag(_)
        )
    }

    // =========================================================================
    // Token navigation
    // =========================================================================

    fn current(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or_else(|| self.tokens.last().unwrap())
    }

    fn current_kind(&self) -> &TokenKind {
        &self.current().kind
    }

    fn peek(&self, n: usize) -> &TokenKind {
        self.tokens.get(self.pos + n).map(|t| &t.kind).unwrap_or(&TokenKind::Eof)
    }

    fn at_end(&self) -> bool {
        matches!(self.current_kind(), TokenKind::Eof)
    }

    fn advance(&mut self) -> &Token {
        if !self.at_end() {
            self.pos += 1;
        }
        self.tokens.get(self.pos - 1).unwrap()
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(self.current_kind()) == std::mem::discriminant(kind)
    }

    fn match_token(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<&Token, ParseError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(ParseError::expected(kind.display_name(), self.current_kind(), self.current().span))
        }
    }

    fn expect_ident(&mut self) -> Result<String, ParseError> {
        match self.current_kind().clone() {
            TokenKind::Ident(name) => {
                self.advance();
                Ok(name)
            }
            _ => Err(ParseError::expected("a name", self.current_kind(), self.current().span)),
        }
    }

    fn expect_type_tag(&mut self) -> Result<TypeTag, ParseError> {
        let tag = match self.current_kind() {
            TokenKind::TypeTag(t) => *t,
            TokenKind::KwFunc => TypeTag::Func,
            TokenKind::KwThr => TypeTag::Thr,
            _ => return Err(ParseError::expected("a type tag", self.current_kind(), self.current().span)),
        };
        self.advance();
        Ok(tag)
    }

    /// True if the current token begins a `TYPE: name` declaration/assignment.
    fn at_typed_decl(&self) -> bool {
        let is_type_tag = matches!(self.current_kind(), TokenKind::TypeTag(_) | TokenKind::KwFunc | TokenKind::KwThr);
        is_type_tag && matches!(self.peek(1), TokenKind::Colon)
    }

    // =========================================================================
    // Entry point
    // =========================================================================

    pub fn parse(&mut self) -> ParseResult {
        let mut stmts = Vec::new();
        while !self.at_end() {
            match self.parse_stmt() {
                Ok(stmt) => stmts.push(stmt),
                Err(e) => {
                    let keep_going = self.record_error(e);
                    if !keep_going {
                        break;
                    }
                    self.synchronize();
                }
            }
        }
        ParseResult { stmts, errors: std::mem::take(&mut self.errors) }
    }

    fn parse_block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.expect(&TokenKind::LBrace)?;
        let mut stmts = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.at_end() {
            match self.parse_stmt() {
                Ok(stmt) => stmts.push(stmt),
                Err(e) => {
                    let keep_going = self.record_error(e);
                    if !keep_going {
                        break;
                    }
                    self.synchronize();
                    if self.check(&TokenKind::RBrace) {
                        break;
                    }
                }
            }
        }
        self.expect(&TokenKind::RBrace)?;
        Ok(stmts)
    }

    fn parse_paren_group(&mut self) -> Result<(String, Expr), ParseError> {
        self.expect(&TokenKind::LParen)?;
        let name = self.expect_ident()?;
        self.expect(&TokenKind::Comma)?;
        let iter = self.parse_expr()?;
        self.expect(&TokenKind::RParen)?;
        Ok((name, iter))
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn parse_stmt(&mut self) -> Result<Stmt, ParseError> {
        let start = self.current().span;
        match self.current_kind().clone() {
            TokenKind::LBrace => {
                let body = self.parse_block()?;
                Ok(self.finish_stmt(StmtKind::Block(body), start))
            }
            TokenKind::KwAsync => {
                self.advance();
                let body = self.parse_block()?;
                Ok(self.finish_stmt(StmtKind::Async(body), start))
            }
            TokenKind::KwIf => self.parse_if(start),
            TokenKind::KwWhile => {
                self.advance();
                self.expect(&TokenKind::LParen)?;
                let cond = self.parse_expr()?;
                self.expect(&TokenKind::RParen)?;
                let body = self.parse_block()?;
                Ok(self.finish_stmt(StmtKind::While { cond, body }, start))
            }
            TokenKind::KwFor => {
                self.advance();
                let (binding, iter) = self.parse_paren_group()?;
                let body = self.parse_block()?;
                Ok(self.finish_stmt(StmtKind::For { binding, iter, body }, start))
            }
            TokenKind::KwParfor => {
                self.advance();
                let (binding, iter) = self.parse_paren_group()?;
                let body = self.parse_block()?;
                Ok(self.finish_stmt(StmtKind::Parfor { binding, iter, body }, start))
            }
            TokenKind::KwFunc => self.parse_func(start),
            TokenKind::KwReturn => {
                self.advance();
                let value = self.parse_optional_paren_expr()?;
                Ok(self.finish_stmt(StmtKind::Return(value), start))
            }
            TokenKind::KwBreak => {
                self.advance();
                let value = self.parse_optional_paren_expr()?;
                Ok(self.finish_stmt(StmtKind::Break(value), start))
            }
            TokenKind::KwContinue => {
                self.advance();
                Ok(self.finish_stmt(StmtKind::Continue, start))
            }
            TokenKind::KwGoto => {
                self.advance();
                self.expect(&TokenKind::LParen)?;
                let label = self.parse_expr()?;
                self.expect(&TokenKind::RParen)?;
                Ok(self.finish_stmt(StmtKind::Goto(label), start))
            }
            TokenKind::KwGotopoint => {
                self.advance();
                self.expect(&TokenKind::LParen)?;
                let label = self.parse_expr()?;
                self.expect(&TokenKind::RParen)?;
                Ok(self.finish_stmt(StmtKind::Gotopoint(label), start))
            }
            TokenKind::KwThr => {
                self.advance();
                let name = self.expect_ident()?;
                let body = self.parse_block()?;
                Ok(self.finish_stmt(StmtKind::Thr { name, body }, start))
            }
            TokenKind::KwPop => {
                self.advance();
                self.expect(&TokenKind::LParen)?;
                let name = self.expect_ident()?;
                self.expect(&TokenKind::RParen)?;
                Ok(self.finish_stmt(StmtKind::Pop(name), start))
            }
            TokenKind::KwTry => self.parse_try(start),
            _ if self.at_typed_decl() => self.parse_typed_decl(start),
            _ => self.parse_assign_or_expr_stmt(start),
        }
    }

    fn finish_stmt(&mut self, kind: StmtKind, start: Span) -> Stmt {
        let id = self.next_id();
        let end = self.tokens.get(self.pos.saturating_sub(1)).map(|t| t.span).unwrap_or(start);
        Stmt { id, kind, span: Span::new(start.start, end.end) }
    }

    /// `RETURN`, `RETURN(expr)`, `BREAK`, `BREAK(expr)` — the parenthesized
    /// value is optional.
    fn parse_optional_paren_expr(&mut self) -> Result<Option<Expr>, ParseError> {
        if self.match_token(&TokenKind::LParen) {
            if self.check(&TokenKind::RParen) {
                self.advance();
                return Ok(None);
            }
            let value = self.parse_expr()?;
            self.expect(&TokenKind::RParen)?;
            Ok(Some(value))
        } else {
            Ok(None)
        }
    }

    fn parse_if(&mut self, start: Span) -> Result<Stmt, ParseError> {
        self.advance();
        let mut branches = Vec::new();
        self.expect(&TokenKind::LParen)?;
        let cond = self.parse_expr()?;
        self.expect(&TokenKind::RParen)?;
        let body = self.parse_block()?;
        branches.push((cond, body));

        while self.check(&TokenKind::KwElif) {
            self.advance();
            self.expect(&TokenKind::LParen)?;
            let cond = self.parse_expr()?;
            self.expect(&TokenKind::RParen)?;
            let body = self.parse_block()?;
            branches.push((cond, body));
        }

        let else_branch = if self.check(&TokenKind::KwElse) {
            self.advance();
            Some(self.parse_block()?)
        } else {
            None
        };

        Ok(self.finish_stmt(StmtKind::If { branches, else_branch }, start))
    }

    fn parse_try(&mut self, start: Span) -> Result<Stmt, ParseError> {
        self.advance();
        let body = self.parse_block()?;
        self.expect(&TokenKind::KwCatch)?;
        self.expect(&TokenKind::LParen)?;
        let catch_name = if self.check(&TokenKind::RParen) {
            None
        } else {
            self.expect(&TokenKind::KwSymbol)?;
            self.expect(&TokenKind::Colon)?;
            Some(self.expect_ident()?)
        };
        self.expect(&TokenKind::RParen)?;
        let catch_body = self.parse_block()?;
        Ok(self.finish_stmt(StmtKind::Try { body, catch_name, catch_body }, start))
    }

    fn parse_func(&mut self, start: Span) -> Result<Stmt, ParseError> {
        self.advance();
        let name = self.expect_ident()?;
        self.expect(&TokenKind::LParen)?;
        let mut params = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                let declared_type = self.expect_type_tag()?;
                self.expect(&TokenKind::Colon)?;
                let pname = self.expect_ident()?;
                let default = if self.match_token(&TokenKind::Assign) {
                    Some(self.parse_expr()?)
                } else {
                    None
                };
                params.push(Param { name: pname, declared_type, default });
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen)?;
        let ret_type = if self.match_token(&TokenKind::Colon) {
            self.expect_type_tag()?
        } else {
            TypeTag::Unknown
        };
        let body = self.parse_block()?;
        Ok(self.finish_stmt(StmtKind::Func(FuncDecl { name, params, ret_type, body }), start))
    }

    fn parse_typed_decl(&mut self, start: Span) -> Result<Stmt, ParseError> {
        let declared_type = self.expect_type_tag()?;
        self.expect(&TokenKind::Colon)?;
        let name = self.expect_ident()?;
        if self.match_token(&TokenKind::Assign) {
            let value = self.parse_expr()?;
            let id = self.next_id();
            let ident_span = self.current().span;
            let target = Expr { id, kind: ExprKind::Ident(name), span: ident_span };
            Ok(self.finish_stmt(
                StmtKind::Assign { target, declared_type: Some(declared_type), value },
                start,
            ))
        } else {
            Ok(self.finish_stmt(StmtKind::Decl { name, declared_type }, start))
        }
    }

    /// Either a plain assignment (`target = expr`) or a bare expression
    /// statement (almost always a call, e.g. `PRINT(x)`).
    fn parse_assign_or_expr_stmt(&mut self, start: Span) -> Result<Stmt, ParseError> {
        let expr = self.parse_expr()?;
        if self.match_token(&TokenKind::Assign) {
            let value = self.parse_expr()?;
            Ok(self.finish_stmt(StmtKind::Assign { target: expr, declared_type: None, value }, start))
        } else {
            Ok(self.finish_stmt(StmtKind::Expr(expr), start))
        }
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let start = self.current().span;
        let mut expr = self.parse_primary()?;

        loop {
            if self.check(&TokenKind::LBracket) {
                self.advance();
                let mut indices = Vec::new();
                loop {
                    indices.push(self.parse_index_slot()?);
                    if !self.match_token(&TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(&TokenKind::RBracket)?;
                let id = self.next_id();
                let end = self.tokens[self.pos - 1].span;
                expr = Expr {
                    id,
                    kind: ExprKind::Index { object: Box::new(expr), indices },
                    span: Span::new(start.start, end.end),
                };
            } else if self.check(&TokenKind::LAngle) {
                self.advance();
                let key = self.parse_expr()?;
                self.expect(&TokenKind::RAngle)?;
                let id = self.next_id();
                let end = self.tokens[self.pos - 1].span;
                expr = Expr {
                    id,
                    kind: ExprKind::MapIndex { object: Box::new(expr), key: Box::new(key) },
                    span: Span::new(start.start, end.end),
                };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    /// One slot inside `[...]`: a wildcard, a range, or a plain index
    /// expression.
    fn parse_index_slot(&mut self) -> Result<Expr, ParseError> {
        let start = self.current().span;
        if self.check(&TokenKind::Underscore) {
            self.advance();
            let id = self.next_id();
            return Ok(Expr { id, kind: ExprKind::Wildcard, span: start });
        }
        let first = self.parse_primary()?;
        if self.match_token(&TokenKind::DotDot) {
            let end_expr = self.parse_primary()?;
            let id = self.next_id();
            let span = Span::new(start.start, self.tokens[self.pos - 1].span.end);
            Ok(Expr {
                id,
                kind: ExprKind::Range { start: Box::new(first), end: Box::new(end_expr) },
                span,
            })
        } else {
            Ok(first)
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let start = self.current().span;
        match self.current_kind().clone() {
            TokenKind::Int(v) => {
                self.advance();
                let id = self.next_id();
                Ok(Expr { id, kind: ExprKind::Int(v), span: start })
            }
            TokenKind::Flt(v) => {
                self.advance();
                let id = self.next_id();
                Ok(Expr { id, kind: ExprKind::Flt(v), span: start })
            }
            TokenKind::Str(s) => {
                self.advance();
                let id = self.next_id();
                Ok(Expr { id, kind: ExprKind::Str(s), span: start })
            }
            TokenKind::At => {
                self.advance();
                let name = self.expect_ident()?;
                let id = self.next_id();
                Ok(Expr { id, kind: ExprKind::Ptr(name), span: start })
            }
            TokenKind::KwAsync => {
                self.advance();
                let body = self.parse_block()?;
                let id = self.next_id();
                let end = self.tokens[self.pos - 1].span;
                Ok(Expr { id, kind: ExprKind::Async(body), span: Span::new(start.start, end.end) })
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(&TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::LBracket => self.parse_tensor_literal(start),
            TokenKind::LBrace => self.parse_map_literal(start),
            TokenKind::Ident(name) => {
                self.advance();
                let id = self.next_id();
                let ident_expr = Expr { id, kind: ExprKind::Ident(name), span: start };
                if self.check(&TokenKind::LParen) {
                    self.parse_call(ident_expr, start)
                } else {
                    Ok(ident_expr)
                }
            }
            _ => Err(ParseError::expected("expression", self.current_kind(), self.current().span)),
        }
    }

    fn parse_tensor_literal(&mut self, start: Span) -> Result<Expr, ParseError> {
        self.advance();
        let mut items = Vec::new();
        if !self.check(&TokenKind::RBracket) {
            loop {
                items.push(self.parse_expr()?);
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RBracket)?;
        let id = self.next_id();
        let end = self.tokens[self.pos - 1].span;
        Ok(Expr { id, kind: ExprKind::Tns(items), span: Span::new(start.start, end.end) })
    }

    fn parse_map_literal(&mut self, start: Span) -> Result<Expr, ParseError> {
        self.advance();
        let mut entries = Vec::new();
        if !self.check(&TokenKind::RBrace) {
            loop {
                let key = self.parse_expr()?;
                self.expect(&TokenKind::Colon)?;
                let value = self.parse_expr()?;
                entries.push((key, value));
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RBrace)?;
        let id = self.next_id();
        let end = self.tokens[self.pos - 1].span;
        Ok(Expr { id, kind: ExprKind::Map(entries), span: Span::new(start.start, end.end) })
    }

    fn parse_call(&mut self, callee: Expr, start: Span) -> Result<Expr, ParseError> {
        self.advance(); // consume '('
        let mut args = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                if let TokenKind::Ident(name) = self.current_kind().clone() {
                    if matches!(self.peek(1), TokenKind::Colon) {
                        self.advance();
                        self.advance();
                        let value = self.parse_expr()?;
                        args.push(Arg::Named(name, value));
                        if !self.match_token(&TokenKind::Comma) {
                            break;
                        }
                        continue;
                    }
                }
                args.push(Arg::Positional(self.parse_expr()?));
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen)?;
        let id = self.next_id();
        let end = self.tokens[self.pos - 1].span;
        Ok(Expr { id, kind: ExprKind::Call { callee: Box::new(callee), args }, span: Span::new(start.start, end.end) })
    }
}

/// Result of parsing: the top-level statement sequence plus any errors found.
#[derive(Debug)]
pub struct ParseResult {
    pub stmts: Vec<Stmt>,
    pub errors: Vec<ParseError>,
}

impl ParseResult {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// A parser error with location and friendly message.
#[derive(Debug, Clone)]
pub struct ParseError {
    pub span: Span,
    pub message: String,
    pub hint: Option<String>,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ParseError {}

impl ParseError {
    fn expected(expected: &str, found: &TokenKind, span: Span) -> Self {
        let message = format!("expected {}, found {}", expected, found.display_name());
        let hint = crate::hints::for_expected(expected, found).map(String::from);
        Self { span, message, hint }
    }
}
