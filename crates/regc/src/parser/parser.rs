//! Recursive descent parser
//!
//! Operators are lowered into calls on operator symbols (`a + b` becomes a
//! call of `+`, unary minus a call of `neg`) and `x.f(args)` into a call of
//! `f` with the receiver as first argument, so the analyzer sees only calls.

use crate::common::{CompileError, CompileResult, Span};
use crate::ir::{
    DeclId, DeclKind, ExprId, ExprKind, FnSig, NameDcl, NameUse, PermKind, Program, RefType,
    StructType, TypeId, TypeKind,
};
use crate::lexer::{Lexer, Token, TokenKind};

/// Parser building one [`Program`]
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    program: Program,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            lexer: Lexer::new(source),
            program: Program::new(),
        }
    }

    /// Parse a complete compilation unit
    pub fn parse_program(mut self) -> CompileResult<Program> {
        while !self.check(&TokenKind::Eof)? {
            let item = self.parse_item()?;
            self.program.items.push(item);
        }
        Ok(self.program)
    }

    // ==================== Items ====================

    fn parse_item(&mut self) -> CompileResult<DeclId> {
        let kind = self.lexer.peek()?.kind.clone();
        match &kind {
            TokenKind::Fn => self.parse_fn_item(),
            TokenKind::Struct => self.parse_struct_item(),
            TokenKind::Region => self.parse_region_item(),
            TokenKind::Identifier(_) => self.parse_global_item(),
            kind if kind.perm_name().is_some() => self.parse_global_item(),
            _ => {
                let token = self.lexer.next_token()?;
                Err(CompileError::parser(
                    format!("expected item, found {}", token.kind),
                    token.span,
                ))
            }
        }
    }

    fn parse_fn_item(&mut self) -> CompileResult<DeclId> {
        let start = self.expect(TokenKind::Fn)?.span;
        let (name, name_span) = self.expect_identifier()?;

        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        while !self.check(&TokenKind::RParen)? {
            params.push(self.parse_param()?);
            if !self.match_token(&TokenKind::Comma)? {
                break;
            }
        }
        let close = self.expect(TokenKind::RParen)?.span;

        let ret = if self.match_token(&TokenKind::Colon)? || self.match_token(&TokenKind::Arrow)? {
            self.parse_type()?
        } else {
            self.program.builtins().void
        };

        let sig = self.program.add_type(TypeKind::FnSig(FnSig { params, ret }), start.to(close));
        let body = if self.match_token(&TokenKind::Semi)? {
            None
        } else {
            Some(self.parse_block()?)
        };

        let name = self.program.intern(&name);
        Ok(self.program.add_decl(NameDcl::function(name, sig, body, name_span)))
    }

    fn parse_param(&mut self) -> CompileResult<DeclId> {
        let perm = self.parse_perm()?.unwrap_or(PermKind::Imm);
        let (name, span) = self.expect_identifier()?;
        self.expect(TokenKind::Colon)?;
        let vtype = self.parse_type()?;

        let name = self.program.intern(&name);
        let perm = self.program.builtins().perm(perm);
        Ok(self.program.add_decl(NameDcl::var(name, vtype, perm, None, span)))
    }

    fn parse_struct_item(&mut self) -> CompileResult<DeclId> {
        self.expect(TokenKind::Struct)?;
        let (name, span) = self.expect_identifier()?;
        let name = self.program.intern(&name);

        let base = if self.match_token(&TokenKind::Colon)? {
            Some(self.parse_type()?)
        } else {
            None
        };

        self.expect(TokenKind::LBrace)?;
        let mut fields = Vec::new();
        while !self.check(&TokenKind::RBrace)? {
            let (field, _) = self.expect_identifier()?;
            self.expect(TokenKind::Colon)?;
            let ty = self.parse_type()?;
            fields.push((self.program.intern(&field), ty));
            if !self.match_token(&TokenKind::Comma)? {
                break;
            }
        }
        self.expect(TokenKind::RBrace)?;

        let ty = self.program.add_type(TypeKind::Struct(StructType { name, base, fields }), span);
        Ok(self.program.add_decl(NameDcl::new(name, DeclKind::Type, ty, span)))
    }

    fn parse_region_item(&mut self) -> CompileResult<DeclId> {
        self.expect(TokenKind::Region)?;
        let (name, span) = self.expect_identifier()?;
        self.expect(TokenKind::Semi)?;

        let name = self.program.intern(&name);
        let ty = self.program.add_type(TypeKind::Region(name), span);
        Ok(self.program.add_decl(NameDcl::new(name, DeclKind::Region, ty, span)))
    }

    /// `[perm] name: T [= value];`
    fn parse_global_item(&mut self) -> CompileResult<DeclId> {
        let perm = self.parse_perm()?.unwrap_or(PermKind::Imm);
        let (name, span) = self.expect_identifier()?;
        self.expect(TokenKind::Colon)?;
        let vtype = self.parse_type()?;
        let value = if self.match_token(&TokenKind::Eq)? {
            Some(self.parse_expr()?)
        } else {
            None
        };
        self.expect(TokenKind::Semi)?;

        let name = self.program.intern(&name);
        let perm = self.program.builtins().perm(perm);
        Ok(self.program.add_decl(NameDcl::var(name, vtype, perm, value, span)))
    }

    fn parse_perm(&mut self) -> CompileResult<Option<PermKind>> {
        let perm = self.lexer.peek()?.kind.perm_name().and_then(PermKind::from_name);
        if perm.is_some() {
            self.lexer.next_token()?;
        }
        Ok(perm)
    }

    // ==================== Types ====================

    fn parse_type(&mut self) -> CompileResult<TypeId> {
        let token = self.lexer.next_token()?;
        let start = token.span;

        match token.kind {
            TokenKind::Identifier(name) => {
                let name = self.program.intern(&name);
                Ok(self.program.add_type(TypeKind::Name(NameUse::new(name)), start))
            }
            TokenKind::Amp => self.parse_ref_type(start),
            TokenKind::Star => {
                let pointee = self.parse_type()?;
                let span = start.to(self.program.ty(pointee).span);
                Ok(self.program.add_type(TypeKind::Ptr { pointee }, span))
            }
            TokenKind::LBracket => {
                let (len, _) = self.expect_int()?;
                self.expect(TokenKind::RBracket)?;
                let elem = self.parse_type()?;
                let span = start.to(self.program.ty(elem).span);
                Ok(self.program.add_type(TypeKind::Array { elem, len }, span))
            }
            TokenKind::LParen => {
                let mut types = Vec::new();
                while !self.check(&TokenKind::RParen)? {
                    types.push(self.parse_type()?);
                    if !self.match_token(&TokenKind::Comma)? {
                        break;
                    }
                }
                let end = self.expect(TokenKind::RParen)?.span;
                if types.is_empty() {
                    Ok(self.program.builtins().void)
                } else {
                    Ok(self.program.add_type(TypeKind::Tuple(types), start.to(end)))
                }
            }
            kind => Err(CompileError::parser(format!("expected type, found {}", kind), start)),
        }
    }

    /// `&[?][region][perm] T` or the slice form `&[?][region][perm] []T`
    fn parse_ref_type(&mut self, start: Span) -> CompileResult<TypeId> {
        let nullable = self.match_token(&TokenKind::Question)?;

        let region = if self.check_region()? {
            let (name, span) = self.expect_identifier()?;
            let name = self.program.intern(&name);
            self.program.add_type(TypeKind::Name(NameUse::new(name)), span)
        } else {
            self.program.builtins().void
        };

        let perm = self.parse_perm()?.unwrap_or(PermKind::Const);
        let perm = self.program.builtins().perm(perm);

        let slice = self.check(&TokenKind::LBracket)? && self.lexer.check_lookahead(&TokenKind::RBracket)?;
        if slice {
            self.expect(TokenKind::LBracket)?;
            self.expect(TokenKind::RBracket)?;
        }

        let pointee = self.parse_type()?;
        let span = start.to(self.program.ty(pointee).span);
        let reference = self.program.add_type(
            TypeKind::Ref(RefType {
                region,
                perm,
                pointee,
                nullable,
                slice: false,
                fat_ptr: None,
            }),
            span,
        );
        if slice {
            self.program.mark_slice(reference);
        }
        Ok(reference)
    }

    /// An identifier right after `&` names a region when another type part follows it
    fn check_region(&mut self) -> CompileResult<bool> {
        if !self.check(&TokenKind::Identifier(String::new()))? {
            return Ok(false);
        }
        let next = &self.lexer.peek_at(1)?.kind;
        Ok(next.perm_name().is_some()
            || matches!(
                next,
                TokenKind::Identifier(_)
                    | TokenKind::LBracket
                    | TokenKind::Amp
                    | TokenKind::Star
                    | TokenKind::LParen
            ))
    }

    // ==================== Statements ====================

    fn parse_block(&mut self) -> CompileResult<ExprId> {
        let start = self.expect(TokenKind::LBrace)?.span;
        let mut stmts = Vec::new();

        while !self.check(&TokenKind::RBrace)? {
            stmts.push(self.parse_stmt()?);
        }

        let end = self.expect(TokenKind::RBrace)?.span;
        Ok(self.program.add_expr(ExprKind::Block(stmts), start.to(end)))
    }

    fn parse_stmt(&mut self) -> CompileResult<ExprId> {
        let Token { kind, span: start } = self.lexer.peek()?.clone();

        match kind {
            TokenKind::Let => return self.parse_let_stmt(),
            TokenKind::Return => {
                self.lexer.next_token()?;
                let value = if self.check(&TokenKind::Semi)? || self.check(&TokenKind::RBrace)? {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                let end = self.end_stmt()?;
                return Ok(self.program.add_expr(ExprKind::Return(value), start.to(end)));
            }
            TokenKind::Break | TokenKind::Continue => {
                let token = self.lexer.next_token()?;
                let kind = if matches!(token.kind, TokenKind::Break) {
                    ExprKind::Break
                } else {
                    ExprKind::Continue
                };
                let end = self.end_stmt()?;
                return Ok(self.program.add_expr(kind, start.to(end)));
            }
            TokenKind::While => return self.parse_while_stmt(),
            TokenKind::Loop => {
                self.lexer.next_token()?;
                let body = self.parse_block()?;
                let span = start.to(self.program.expr(body).span);
                return Ok(self.program.add_expr(ExprKind::Loop { cond: None, body }, span));
            }
            _ => {}
        }

        let expr = self.parse_expr()?;
        let span = self.program.expr(expr).span;
        let is_block_like = matches!(
            self.program.expr(expr).kind,
            ExprKind::Block(_) | ExprKind::If { .. }
        );

        if !self.match_token(&TokenKind::Semi)? && !is_block_like && !self.check(&TokenKind::RBrace)? {
            return Err(CompileError::parser("expected `;` after expression", span));
        }
        Ok(self.program.add_expr(ExprKind::ExprStmt(expr), span))
    }

    /// A statement ends with `;` unless it closes its block
    fn end_stmt(&mut self) -> CompileResult<Span> {
        let token = self.lexer.peek()?.clone();
        if self.match_token(&TokenKind::Semi)? || matches!(token.kind, TokenKind::RBrace) {
            Ok(token.span)
        } else {
            Err(CompileError::parser(format!("expected `;`, found {}", token.kind), token.span))
        }
    }

    fn parse_let_stmt(&mut self) -> CompileResult<ExprId> {
        let start = self.expect(TokenKind::Let)?.span;
        let perm = self.parse_perm()?.unwrap_or(PermKind::Imm);
        let (name, span) = self.expect_identifier()?;

        let vtype = if self.match_token(&TokenKind::Colon)? {
            self.parse_type()?
        } else {
            self.program.builtins().infer
        };
        let value = if self.match_token(&TokenKind::Eq)? {
            Some(self.parse_expr()?)
        } else {
            None
        };
        let end = self.expect(TokenKind::Semi)?.span;

        let name = self.program.intern(&name);
        let perm = self.program.builtins().perm(perm);
        let decl = self.program.add_decl(NameDcl::var(name, vtype, perm, value, span));
        Ok(self.program.add_expr(ExprKind::VarDcl(decl), start.to(end)))
    }

    fn parse_while_stmt(&mut self) -> CompileResult<ExprId> {
        let start = self.expect(TokenKind::While)?.span;
        let cond = self.parse_expr()?;
        let body = self.parse_block()?;
        let span = start.to(self.program.expr(body).span);
        Ok(self.program.add_expr(ExprKind::Loop { cond: Some(cond), body }, span))
    }

    // ==================== Expressions ====================

    fn parse_expr(&mut self) -> CompileResult<ExprId> {
        if self.check(&TokenKind::If)? {
            self.parse_if_expr()
        } else if self.check(&TokenKind::LBrace)? {
            self.parse_block()
        } else {
            self.parse_assign()
        }
    }

    fn parse_assign(&mut self) -> CompileResult<ExprId> {
        let target = self.parse_or_logic()?;
        if self.match_token(&TokenKind::Eq)? {
            let value = self.parse_expr()?;
            let span = self.span_of(target).to(self.span_of(value));
            return Ok(self.program.add_expr(ExprKind::Assign { target, value }, span));
        }
        Ok(target)
    }

    fn parse_or_logic(&mut self) -> CompileResult<ExprId> {
        let mut left = self.parse_and_logic()?;
        while self.match_token(&TokenKind::PipePipe)? {
            let right = self.parse_and_logic()?;
            let span = self.span_of(left).to(self.span_of(right));
            left = self.program.add_expr(ExprKind::Or(left, right), span);
        }
        Ok(left)
    }

    fn parse_and_logic(&mut self) -> CompileResult<ExprId> {
        let mut left = self.parse_not_logic()?;
        while self.match_token(&TokenKind::AmpAmp)? {
            let right = self.parse_not_logic()?;
            let span = self.span_of(left).to(self.span_of(right));
            left = self.program.add_expr(ExprKind::And(left, right), span);
        }
        Ok(left)
    }

    fn parse_not_logic(&mut self) -> CompileResult<ExprId> {
        let start = self.lexer.peek()?.span;
        if self.match_token(&TokenKind::Bang)? {
            let exp = self.parse_not_logic()?;
            let span = start.to(self.span_of(exp));
            return Ok(self.program.add_expr(ExprKind::Not(exp), span));
        }
        self.parse_cmp()
    }

    /// Comparisons do not chain
    fn parse_cmp(&mut self) -> CompileResult<ExprId> {
        let left = self.parse_binary(0)?;
        let op = match &self.lexer.peek()?.kind {
            TokenKind::EqEq => "==",
            TokenKind::NotEq => "!=",
            TokenKind::Lt => "<",
            TokenKind::LtEq => "<=",
            TokenKind::Gt => ">",
            TokenKind::GtEq => ">=",
            _ => return Ok(left),
        };
        let op_span = self.lexer.next_token()?.span;
        let right = self.parse_binary(0)?;
        Ok(self.op_call(op, op_span, vec![left, right]))
    }

    /// Bitwise and arithmetic operators, loosest level first
    fn parse_binary(&mut self, level: usize) -> CompileResult<ExprId> {
        const LEVELS: [&[(TokenKind, &str)]; 5] = [
            &[(TokenKind::Pipe, "|")],
            &[(TokenKind::Caret, "^")],
            &[(TokenKind::Amp, "&")],
            &[(TokenKind::Plus, "+"), (TokenKind::Minus, "-")],
            &[(TokenKind::Star, "*"), (TokenKind::Slash, "/"), (TokenKind::Percent, "%")],
        ];

        if level == LEVELS.len() {
            return self.parse_prefix();
        }

        let mut left = self.parse_binary(level + 1)?;
        loop {
            let next = &self.lexer.peek()?.kind;
            let Some(&(_, op)) = LEVELS[level].iter().find(|(kind, _)| kind == next) else {
                return Ok(left);
            };
            let op_span = self.lexer.next_token()?.span;
            let right = self.parse_binary(level + 1)?;
            left = self.op_call(op, op_span, vec![left, right]);
        }
    }

    fn parse_prefix(&mut self) -> CompileResult<ExprId> {
        let start = self.lexer.peek()?.span;

        if self.match_token(&TokenKind::Minus)? {
            let operand = self.parse_prefix()?;
            return Ok(self.op_call("neg", start, vec![operand]));
        }

        if self.match_token(&TokenKind::Tilde)? {
            let operand = self.parse_prefix()?;
            return Ok(self.op_call("~", start, vec![operand]));
        }

        if self.match_token(&TokenKind::Amp)? {
            let perm = self.parse_perm()?.unwrap_or(PermKind::Const);
            let perm = self.program.builtins().perm(perm);
            let exp = self.parse_prefix()?;
            let span = start.to(self.span_of(exp));
            return Ok(self.program.add_expr(ExprKind::Addr { perm, exp }, span));
        }

        if self.match_token(&TokenKind::Star)? {
            let exp = self.parse_prefix()?;
            let span = start.to(self.span_of(exp));
            return Ok(self.program.add_expr(ExprKind::Deref(exp), span));
        }

        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> CompileResult<ExprId> {
        let mut expr = self.parse_term()?;

        loop {
            if self.match_token(&TokenKind::LParen)? {
                let args = self.parse_call_args()?;
                let end = self.expect(TokenKind::RParen)?.span;
                let span = self.span_of(expr).to(end);
                expr = self.program.add_expr(ExprKind::Call { callee: expr, args }, span);
            } else if self.match_token(&TokenKind::Dot)? {
                // Method call: the receiver becomes the first argument
                let (method, method_span) = self.expect_identifier()?;
                self.expect(TokenKind::LParen)?;
                let mut args = vec![expr];
                args.extend(self.parse_call_args()?);
                let end = self.expect(TokenKind::RParen)?.span;

                let name = self.program.intern(&method);
                let callee = self.program.add_expr(ExprKind::Name(NameUse::new(name)), method_span);
                let span = self.span_of(expr).to(end);
                expr = self.program.add_expr(ExprKind::Call { callee, args }, span);
            } else if self.match_token(&TokenKind::As)? {
                let to = self.parse_type()?;
                let span = self.span_of(expr).to(self.program.ty(to).span);
                expr = self.program.add_expr(ExprKind::Cast { exp: expr, to }, span);
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_call_args(&mut self) -> CompileResult<Vec<ExprId>> {
        let mut args = Vec::new();
        while !self.check(&TokenKind::RParen)? {
            args.push(self.parse_expr()?);
            if !self.match_token(&TokenKind::Comma)? {
                break;
            }
        }
        Ok(args)
    }

    fn parse_term(&mut self) -> CompileResult<ExprId> {
        if self.check(&TokenKind::If)? {
            return self.parse_if_expr();
        }
        if self.check(&TokenKind::LBrace)? {
            return self.parse_block();
        }

        let token = self.lexer.next_token()?;
        let span = token.span;
        let kind = match &token.kind {
            TokenKind::True => ExprKind::BoolLit(true),
            TokenKind::False => ExprKind::BoolLit(false),
            TokenKind::IntLiteral(_) | TokenKind::HexLiteral(_) => ExprKind::ULit(Self::int_value(&token)?),
            TokenKind::FloatLiteral(text) => {
                let value = text
                    .replace('_', "")
                    .parse()
                    .map_err(|_| CompileError::parser("invalid float literal", span))?;
                ExprKind::FLit(value)
            }
            TokenKind::Identifier(name) => ExprKind::Name(NameUse::new(self.program.intern(name))),
            TokenKind::LParen => {
                let inner = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                return Ok(inner);
            }
            TokenKind::LBracket => {
                let mut items = Vec::new();
                while !self.check(&TokenKind::RBracket)? {
                    items.push(self.parse_expr()?);
                    if !self.match_token(&TokenKind::Comma)? {
                        break;
                    }
                }
                let end = self.expect(TokenKind::RBracket)?.span;
                return Ok(self.program.add_expr(ExprKind::Array(items), span.to(end)));
            }
            kind => {
                return Err(CompileError::parser(
                    format!("invalid term: expected variable or literal, found {}", kind),
                    span,
                ));
            }
        };

        Ok(self.program.add_expr(kind, span))
    }

    fn parse_if_expr(&mut self) -> CompileResult<ExprId> {
        let start = self.expect(TokenKind::If)?.span;
        let cond = self.parse_assign()?;
        let then = self.parse_block()?;

        let otherwise = if self.match_token(&TokenKind::Else)? {
            if self.check(&TokenKind::If)? {
                Some(self.parse_if_expr()?)
            } else {
                Some(self.parse_block()?)
            }
        } else {
            None
        };

        let end = self.span_of(otherwise.unwrap_or(then));
        Ok(self.program.add_expr(ExprKind::If { cond, then, otherwise }, start.to(end)))
    }

    // ==================== Helpers ====================

    /// Call of the operator bound to `symbol`
    fn op_call(&mut self, symbol: &str, op_span: Span, args: Vec<ExprId>) -> ExprId {
        let name = self.program.intern(symbol);
        let callee = self.program.add_expr(ExprKind::Name(NameUse::new(name)), op_span);
        let span = args
            .iter()
            .fold(op_span, |span, arg| span.to(self.program.expr(*arg).span));
        self.program.add_expr(ExprKind::Call { callee, args }, span)
    }

    fn span_of(&self, expr: ExprId) -> Span {
        self.program.expr(expr).span
    }

    fn int_value(token: &Token) -> CompileResult<u64> {
        let (TokenKind::IntLiteral(text) | TokenKind::HexLiteral(text)) = &token.kind else {
            return Err(CompileError::parser("expected integer literal", token.span));
        };
        let text = text.replace('_', "");
        let parsed = match text.strip_prefix("0x") {
            Some(hex) => u64::from_str_radix(hex, 16),
            None => text.parse(),
        };
        parsed.map_err(|_| CompileError::parser("invalid integer literal", token.span))
    }

    fn expect_int(&mut self) -> CompileResult<(u64, Span)> {
        let token = self.lexer.next_token()?;
        Ok((Self::int_value(&token)?, token.span))
    }

    fn check(&mut self, expected: &TokenKind) -> CompileResult<bool> {
        self.lexer.check(expected)
    }

    fn match_token(&mut self, expected: &TokenKind) -> CompileResult<bool> {
        self.lexer.match_token(expected)
    }

    fn expect(&mut self, expected: TokenKind) -> CompileResult<Token> {
        self.lexer.expect(expected)
    }

    fn expect_identifier(&mut self) -> CompileResult<(String, Span)> {
        let token = self.lexer.next_token()?;
        match token.kind {
            TokenKind::Identifier(name) => Ok((name, token.span)),
            _ => Err(CompileError::parser(
                format!("expected identifier, found {}", token.kind),
                token.span,
            )),
        }
    }
}
