//! Quill recursive descent parser
//!
//! Semicolons are optional. A line break ends an expression before a binary
//! operator, a call parenthesis or an index bracket, so `a\n(b)` is two
//! statements.

use crate::common::{CompileError, CompileResult, Span};
use crate::frontend::ast::*;
use crate::frontend::lexer::{Lexer, Token, TokenKind};

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    /// End offset of the last consumed token
    prev_end: usize,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            lexer: Lexer::new(source),
            prev_end: 0,
        }
    }

    /// Parse a complete module (file)
    pub fn parse_module(&mut self) -> CompileResult<Module> {
        let start = self.lexer.peek()?.span.start;
        let mut items = Vec::new();

        self.skip_semicolons()?;
        while !self.check(&TokenKind::Eof)? {
            items.push(self.parse_item()?);
            self.skip_semicolons()?;
        }

        Ok(Module::new(items, Span::new(start, self.prev_end.max(start))))
    }

    // ==================== Token helpers ====================

    fn advance(&mut self) -> CompileResult<Token> {
        let token = self.lexer.next_token()?;
        self.prev_end = token.span.end;
        Ok(token)
    }

    fn peek(&mut self) -> CompileResult<&Token> {
        self.lexer.peek()
    }

    fn peek_kind(&mut self) -> CompileResult<TokenKind> {
        Ok(self.lexer.peek()?.kind.clone())
    }

    fn check(&mut self, kind: &TokenKind) -> CompileResult<bool> {
        self.lexer.check(kind)
    }

    fn match_token(&mut self, kind: &TokenKind) -> CompileResult<bool> {
        if self.check(kind)? {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect(&mut self, kind: TokenKind) -> CompileResult<Token> {
        let token = self.lexer.expect(kind)?;
        self.prev_end = token.span.end;
        Ok(token)
    }

    fn expect_identifier(&mut self) -> CompileResult<(String, Span)> {
        let token = self.advance()?;
        match token.kind {
            TokenKind::Identifier(name) => Ok((name, token.span)),
            other => Err(CompileError::parser(
                format!("expected identifier, found {}", other),
                token.span,
            )),
        }
    }

    /// Closing `>` of a generic list; a `>>` is split in two
    fn expect_close_angle(&mut self) -> CompileResult<()> {
        self.lexer.split_shr()?;
        self.expect(TokenKind::Gt)?;
        Ok(())
    }

    fn skip_semicolons(&mut self) -> CompileResult<()> {
        while self.match_token(&TokenKind::Semicolon)? {}
        Ok(())
    }

    /// Next token continues the current expression only when on the same line
    fn same_line(&mut self, kind: &TokenKind) -> CompileResult<bool> {
        let token = self.peek()?;
        Ok(!token.newline_before
            && std::mem::discriminant(&token.kind) == std::mem::discriminant(kind))
    }

    fn span_from(&self, start: usize) -> Span {
        Span::new(start, self.prev_end.max(start))
    }

    // ==================== Items ====================

    fn parse_item(&mut self) -> CompileResult<Item> {
        let start = self.peek()?.span.start;
        let exported = self.match_token(&TokenKind::Export)?;

        let kind = match self.peek_kind()? {
            TokenKind::Func => ItemKind::Func(self.parse_func()?),
            TokenKind::Template => ItemKind::Template(self.parse_template()?),
            TokenKind::Type => ItemKind::Alias(self.parse_alias()?),
            TokenKind::Spec => ItemKind::Spec(self.parse_spec()?),
            TokenKind::Action => ItemKind::Action(self.parse_action()?),
            TokenKind::Const => ItemKind::Const(self.parse_const()?),
            TokenKind::Package => ItemKind::Package(self.parse_package()?),
            _ => {
                let token = self.advance()?;
                return Err(CompileError::parser(
                    format!("expected item, found {}", token.kind),
                    token.span,
                ));
            }
        };

        Ok(Item::new(kind, exported, self.span_from(start)))
    }

    fn parse_func(&mut self) -> CompileResult<FuncDecl> {
        let start = self.expect(TokenKind::Func)?.span.start;
        let (name, name_span) = self.expect_identifier()?;

        self.expect(TokenKind::LParen)?;
        let has_self = self.match_token(&TokenKind::SelfValue)?;
        let mut params = Vec::new();
        if !has_self || self.match_token(&TokenKind::Comma)? {
            while !self.check(&TokenKind::RParen)? {
                let (pname, pspan) = self.expect_identifier()?;
                self.expect(TokenKind::Colon)?;
                let ty = self.parse_type()?;
                params.push(Param {
                    name: pname,
                    span: pspan.to(ty.span),
                    ty,
                });
                if !self.match_token(&TokenKind::Comma)? {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen)?;

        let return_type = if self.match_token(&TokenKind::FatArrow)? {
            Some(self.parse_type()?)
        } else {
            None
        };

        let body = if self.check(&TokenKind::LBrace)? {
            Some(self.parse_block()?)
        } else {
            None
        };

        Ok(FuncDecl {
            name,
            name_span,
            has_self,
            params,
            return_type,
            body,
            span: self.span_from(start),
        })
    }

    fn parse_generics(&mut self) -> CompileResult<Vec<GenericParam>> {
        let mut generics = Vec::new();
        if !self.match_token(&TokenKind::Lt)? {
            return Ok(generics);
        }
        loop {
            let (name, span) = self.expect_identifier()?;
            let mut constraints = Vec::new();
            if self.match_token(&TokenKind::Colon)? {
                constraints.push(self.parse_type()?);
                while self.match_token(&TokenKind::Plus)? {
                    constraints.push(self.parse_type()?);
                }
            }
            generics.push(GenericParam {
                name,
                constraints,
                span: self.span_from(span.start),
            });
            if !self.match_token(&TokenKind::Comma)? {
                break;
            }
        }
        self.expect_close_angle()?;
        Ok(generics)
    }

    fn parse_template(&mut self) -> CompileResult<TemplateDecl> {
        let start = self.expect(TokenKind::Template)?.span.start;
        let (name, _) = self.expect_identifier()?;
        let generics = self.parse_generics()?;

        let mut fields = Vec::new();
        let mut methods = Vec::new();
        self.expect(TokenKind::LBrace)?;
        while !self.check(&TokenKind::RBrace)? {
            if self.check(&TokenKind::Func)? {
                methods.push(self.parse_func()?);
            } else {
                let (fname, fspan) = self.expect_identifier()?;
                self.expect(TokenKind::Colon)?;
                let ty = self.parse_type()?;
                fields.push(FieldDecl {
                    name: fname,
                    span: fspan.to(ty.span),
                    ty,
                });
            }
            while self.match_token(&TokenKind::Comma)? || self.match_token(&TokenKind::Semicolon)? {}
        }
        self.expect(TokenKind::RBrace)?;

        Ok(TemplateDecl {
            name,
            generics,
            fields,
            methods,
            span: self.span_from(start),
        })
    }

    fn parse_alias(&mut self) -> CompileResult<AliasDecl> {
        let start = self.expect(TokenKind::Type)?.span.start;
        let (name, _) = self.expect_identifier()?;
        let generics = self.parse_generics()?;
        let target = if self.match_token(&TokenKind::Eq)? {
            Some(self.parse_type()?)
        } else {
            None
        };
        Ok(AliasDecl {
            name,
            generics,
            target,
            span: self.span_from(start),
        })
    }

    /// Members shared by specs and actions: aliases and functions
    fn parse_member_list(&mut self) -> CompileResult<(Vec<AliasDecl>, Vec<FuncDecl>)> {
        let mut aliases = Vec::new();
        let mut methods = Vec::new();
        self.expect(TokenKind::LBrace)?;
        self.skip_semicolons()?;
        while !self.check(&TokenKind::RBrace)? {
            if self.check(&TokenKind::Type)? {
                aliases.push(self.parse_alias()?);
            } else if self.check(&TokenKind::Func)? {
                methods.push(self.parse_func()?);
            } else {
                let token = self.advance()?;
                return Err(CompileError::parser(
                    format!("expected `type` or `func`, found {}", token.kind),
                    token.span,
                ));
            }
            self.skip_semicolons()?;
        }
        self.expect(TokenKind::RBrace)?;
        Ok((aliases, methods))
    }

    fn parse_spec(&mut self) -> CompileResult<SpecDecl> {
        let start = self.expect(TokenKind::Spec)?.span.start;
        let (name, _) = self.expect_identifier()?;
        let (aliases, methods) = self.parse_member_list()?;
        Ok(SpecDecl {
            name,
            aliases,
            methods,
            span: self.span_from(start),
        })
    }

    fn parse_action(&mut self) -> CompileResult<ActionDecl> {
        let start = self.expect(TokenKind::Action)?.span.start;
        let first = self.parse_type()?;
        let (spec, target) = if self.match_token(&TokenKind::In)? {
            (Some(first), self.parse_type()?)
        } else {
            (None, first)
        };
        let (aliases, methods) = self.parse_member_list()?;
        Ok(ActionDecl {
            spec,
            target,
            aliases,
            methods,
            span: self.span_from(start),
        })
    }

    fn parse_const(&mut self) -> CompileResult<ConstDecl> {
        let start = self.expect(TokenKind::Const)?.span.start;
        let (name, _) = self.expect_identifier()?;
        let ty = if self.match_token(&TokenKind::Colon)? {
            Some(self.parse_type()?)
        } else {
            None
        };
        self.expect(TokenKind::Eq)?;
        let value = self.parse_expr()?;
        Ok(ConstDecl {
            name,
            ty,
            value,
            span: self.span_from(start),
        })
    }

    fn parse_package(&mut self) -> CompileResult<PackageDecl> {
        let start = self.expect(TokenKind::Package)?.span.start;
        let (name, _) = self.expect_identifier()?;
        self.expect(TokenKind::LBrace)?;
        let mut items = Vec::new();
        self.skip_semicolons()?;
        while !self.check(&TokenKind::RBrace)? {
            items.push(self.parse_item()?);
            self.skip_semicolons()?;
        }
        self.expect(TokenKind::RBrace)?;
        Ok(PackageDecl {
            name,
            items,
            span: self.span_from(start),
        })
    }

    // ==================== Types ====================

    fn parse_type(&mut self) -> CompileResult<TypeExpr> {
        let token = self.advance()?;
        let start = token.span.start;
        let kind = match token.kind {
            TokenKind::Primitive(p) => TypeExprKind::Primitive(p),
            TokenKind::SelfType => TypeExprKind::SelfType,
            TokenKind::Amp => TypeExprKind::Reference(Box::new(self.parse_type()?)),
            TokenKind::LBracket => {
                let element = self.parse_type()?;
                self.expect(TokenKind::Semicolon)?;
                let len_token = self.advance()?;
                let TokenKind::IntLiteral(len) = len_token.kind else {
                    return Err(CompileError::parser(
                        format!("expected array length, found {}", len_token.kind),
                        len_token.span,
                    ));
                };
                self.expect(TokenKind::RBracket)?;
                TypeExprKind::Array {
                    element: Box::new(element),
                    len,
                }
            }
            TokenKind::Func => {
                self.expect(TokenKind::LParen)?;
                let mut params = Vec::new();
                while !self.check(&TokenKind::RParen)? {
                    params.push(self.parse_type()?);
                    if !self.match_token(&TokenKind::Comma)? {
                        break;
                    }
                }
                self.expect(TokenKind::RParen)?;
                let ret = if self.match_token(&TokenKind::FatArrow)? {
                    Some(Box::new(self.parse_type()?))
                } else {
                    None
                };
                TypeExprKind::Function { params, ret }
            }
            TokenKind::Identifier(first) => {
                let mut path = vec![first];
                while self.check(&TokenKind::Dot)? {
                    self.advance()?;
                    path.push(self.expect_identifier()?.0);
                }
                let mut args = Vec::new();
                if self.same_line(&TokenKind::Lt)? {
                    self.advance()?;
                    loop {
                        args.push(self.parse_type()?);
                        if !self.match_token(&TokenKind::Comma)? {
                            break;
                        }
                    }
                    self.expect_close_angle()?;
                }
                TypeExprKind::Named { path, args }
            }
            other => {
                return Err(CompileError::parser(
                    format!("expected type, found {}", other),
                    token.span,
                ));
            }
        };
        Ok(TypeExpr::new(kind, self.span_from(start)))
    }

    // ==================== Statements ====================

    fn parse_block(&mut self) -> CompileResult<Block> {
        let start = self.expect(TokenKind::LBrace)?.span.start;
        let mut stmts = Vec::new();
        self.skip_semicolons()?;
        while !self.check(&TokenKind::RBrace)? {
            if self.check(&TokenKind::Eof)? {
                let span = self.peek()?.span;
                return Err(CompileError::parser("unclosed block", span));
            }
            stmts.push(self.parse_stmt()?);
            self.skip_semicolons()?;
        }
        self.expect(TokenKind::RBrace)?;
        Ok(Block::new(stmts, self.span_from(start)))
    }

    fn parse_stmt(&mut self) -> CompileResult<Stmt> {
        let start = self.peek()?.span.start;
        let kind = match self.peek_kind()? {
            TokenKind::Let | TokenKind::Const => self.parse_let()?,
            TokenKind::Return => {
                self.advance()?;
                let next = self.peek()?;
                let bare = next.newline_before
                    || matches!(
                        next.kind,
                        TokenKind::RBrace | TokenKind::Semicolon | TokenKind::Eof
                    );
                StmtKind::Return(if bare { None } else { Some(self.parse_expr()?) })
            }
            TokenKind::If => return self.parse_if(),
            TokenKind::While => {
                self.advance()?;
                let cond = self.parse_expr()?;
                let body = self.parse_block()?;
                StmtKind::While { cond, body }
            }
            TokenKind::Break => {
                self.advance()?;
                StmtKind::Break
            }
            TokenKind::Continue => {
                self.advance()?;
                StmtKind::Continue
            }
            TokenKind::LBrace => StmtKind::Block(self.parse_block()?),
            _ => {
                let expr = self.parse_expr()?;
                if self.match_token(&TokenKind::Eq)? {
                    let value = self.parse_expr()?;
                    StmtKind::Assign { target: expr, value }
                } else {
                    StmtKind::Expr(expr)
                }
            }
        };
        Ok(Stmt::new(kind, self.span_from(start)))
    }

    fn parse_let(&mut self) -> CompileResult<StmtKind> {
        let constant = self.advance()?.kind == TokenKind::Const;
        let (name, name_span) = self.expect_identifier()?;
        let ty = if self.match_token(&TokenKind::Colon)? {
            Some(self.parse_type()?)
        } else {
            None
        };
        let init = if self.match_token(&TokenKind::Eq)? {
            Some(self.parse_expr()?)
        } else if constant {
            let span = self.peek()?.span;
            return Err(CompileError::parser(
                format!("constant `{}` needs a value", name),
                span,
            ));
        } else {
            None
        };
        Ok(StmtKind::Let {
            name,
            name_span,
            ty,
            init,
            constant,
        })
    }

    fn parse_if(&mut self) -> CompileResult<Stmt> {
        let start = self.expect(TokenKind::If)?.span.start;
        let cond = self.parse_expr()?;
        let then_block = self.parse_block()?;
        let else_branch = if self.match_token(&TokenKind::Else)? {
            if self.check(&TokenKind::If)? {
                Some(ElseBranch::If(Box::new(self.parse_if()?)))
            } else {
                Some(ElseBranch::Block(self.parse_block()?))
            }
        } else {
            None
        };
        Ok(Stmt::new(
            StmtKind::If {
                cond,
                then_block,
                else_branch,
            },
            self.span_from(start),
        ))
    }

    // ==================== Expressions ====================

    pub fn parse_expr(&mut self) -> CompileResult<Expr> {
        self.parse_expr_with_precedence(0)
    }

    fn parse_expr_with_precedence(&mut self, min_prec: u8) -> CompileResult<Expr> {
        let mut left = self.parse_cast_expr()?;

        while let Some(op) = self.peek_binary_op()? {
            let prec = op.precedence();
            if prec < min_prec {
                break;
            }
            self.advance()?;
            let right = self.parse_expr_with_precedence(prec + 1)?;
            let span = left.span.to(right.span);
            left = Expr::new(
                ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            );
        }

        Ok(left)
    }

    fn peek_binary_op(&mut self) -> CompileResult<Option<BinaryOp>> {
        let token = self.peek()?;
        if token.newline_before {
            return Ok(None);
        }
        let op = match token.kind {
            TokenKind::Plus => BinaryOp::Add,
            TokenKind::Minus => BinaryOp::Sub,
            TokenKind::Star => BinaryOp::Mul,
            TokenKind::Slash => BinaryOp::Div,
            TokenKind::Percent => BinaryOp::Rem,
            TokenKind::Amp => BinaryOp::BitAnd,
            TokenKind::Pipe => BinaryOp::BitOr,
            TokenKind::Caret => BinaryOp::BitXor,
            TokenKind::Shl => BinaryOp::Shl,
            TokenKind::Shr => BinaryOp::Shr,
            TokenKind::EqEq => BinaryOp::Eq,
            TokenKind::NotEq => BinaryOp::Ne,
            TokenKind::Lt => BinaryOp::Lt,
            TokenKind::LtEq => BinaryOp::Le,
            TokenKind::Gt => BinaryOp::Gt,
            TokenKind::GtEq => BinaryOp::Ge,
            TokenKind::AndAnd => BinaryOp::And,
            TokenKind::OrOr => BinaryOp::Or,
            _ => return Ok(None),
        };
        Ok(Some(op))
    }

    fn parse_cast_expr(&mut self) -> CompileResult<Expr> {
        let mut expr = self.parse_unary_expr()?;
        while self.same_line(&TokenKind::As)? {
            self.advance()?;
            let ty = self.parse_type()?;
            let span = expr.span.to(ty.span);
            expr = Expr::new(
                ExprKind::Cast {
                    expr: Box::new(expr),
                    ty,
                },
                span,
            );
        }
        Ok(expr)
    }

    fn parse_unary_expr(&mut self) -> CompileResult<Expr> {
        let start = self.peek()?.span.start;
        let wrap: fn(Box<Expr>) -> ExprKind = match self.peek_kind()? {
            TokenKind::Minus => |e| ExprKind::Unary { op: UnaryOp::Neg, operand: e },
            TokenKind::Bang => |e| ExprKind::Unary { op: UnaryOp::Not, operand: e },
            TokenKind::Tilde => |e| ExprKind::Unary { op: UnaryOp::BitNot, operand: e },
            TokenKind::Amp => ExprKind::AddressOf,
            TokenKind::Star => ExprKind::Deref,
            _ => return self.parse_postfix_expr(),
        };
        self.advance()?;
        let operand = self.parse_unary_expr()?;
        Ok(Expr::new(wrap(Box::new(operand)), self.span_from(start)))
    }

    fn parse_postfix_expr(&mut self) -> CompileResult<Expr> {
        let mut expr = self.parse_primary_expr()?;
        let start = expr.span.start;

        loop {
            if self.same_line(&TokenKind::LParen)? {
                self.advance()?;
                let mut args = Vec::new();
                while !self.check(&TokenKind::RParen)? {
                    args.push(self.parse_expr()?);
                    if !self.match_token(&TokenKind::Comma)? {
                        break;
                    }
                }
                self.expect(TokenKind::RParen)?;
                expr = Expr::new(
                    ExprKind::Call {
                        callee: Box::new(expr),
                        args,
                    },
                    self.span_from(start),
                );
            } else if self.check(&TokenKind::Dot)? {
                self.advance()?;
                let (member, member_span) = self.expect_identifier()?;
                expr = Expr::new(
                    ExprKind::Member {
                        object: Box::new(expr),
                        member,
                        member_span,
                    },
                    self.span_from(start),
                );
            } else if self.same_line(&TokenKind::LBracket)? {
                self.advance()?;
                let index = self.parse_expr()?;
                self.expect(TokenKind::RBracket)?;
                expr = Expr::new(
                    ExprKind::Index {
                        base: Box::new(expr),
                        index: Box::new(index),
                    },
                    self.span_from(start),
                );
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn parse_primary_expr(&mut self) -> CompileResult<Expr> {
        let token = self.advance()?;
        let start = token.span.start;
        let kind = match token.kind {
            TokenKind::IntLiteral(n) => ExprKind::IntLiteral(n),
            TokenKind::FloatLiteral(n) => ExprKind::FloatLiteral(n),
            TokenKind::StringLiteral(s) => ExprKind::StringLiteral(s),
            TokenKind::True => ExprKind::BoolLiteral(true),
            TokenKind::False => ExprKind::BoolLiteral(false),
            TokenKind::Identifier(name) => ExprKind::Identifier(name),
            TokenKind::SelfValue => ExprKind::Identifier("self".to_string()),
            TokenKind::LParen => {
                let inner = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                return Ok(Expr::new(inner.kind, self.span_from(start)));
            }
            TokenKind::LBracket => {
                let mut elems = Vec::new();
                while !self.check(&TokenKind::RBracket)? {
                    elems.push(self.parse_expr()?);
                    if !self.match_token(&TokenKind::Comma)? {
                        break;
                    }
                }
                self.expect(TokenKind::RBracket)?;
                ExprKind::ArrayLiteral(elems)
            }
            TokenKind::LBrace => ExprKind::Initializer(self.parse_init_fields()?),
            other => {
                return Err(CompileError::parser(
                    format!("expected expression, found {}", other),
                    token.span,
                ));
            }
        };
        Ok(Expr::new(kind, self.span_from(start)))
    }

    /// Entries of `{ a: 1, b: 2 }` / `{ 1, 2 }` after the opening brace
    fn parse_init_fields(&mut self) -> CompileResult<Vec<InitField>> {
        let mut fields = Vec::new();
        while !self.check(&TokenKind::RBrace)? {
            let start = self.peek()?.span.start;
            let named = matches!(self.peek()?.kind, TokenKind::Identifier(_))
                && self.lexer.check_lookahead(&TokenKind::Colon)?;
            let name = if named {
                let (name, _) = self.expect_identifier()?;
                self.expect(TokenKind::Colon)?;
                Some(name)
            } else {
                None
            };
            let value = self.parse_expr()?;
            fields.push(InitField {
                name,
                value,
                span: self.span_from(start),
            });
            if !self.match_token(&TokenKind::Comma)? {
                break;
            }
        }
        self.expect(TokenKind::RBrace)?;
        Ok(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Module {
        Parser::new(source).parse_module().unwrap()
    }

    fn body(module: &Module) -> &Block {
        match &module.items[0].kind {
            ItemKind::Func(f) => f.body.as_ref().unwrap(),
            _ => panic!("expected function"),
        }
    }

    #[test]
    fn test_parse_function() {
        let module = parse("func add(a: int, b: int) => int { return a + b }");
        assert_eq!(module.items.len(), 1);
        match &module.items[0].kind {
            ItemKind::Func(f) => {
                assert_eq!(f.name, "add");
                assert_eq!(f.params.len(), 2);
                assert!(!f.has_self);
                assert!(f.body.is_some());
                assert_eq!(
                    f.return_type.as_ref().unwrap().kind,
                    TypeExprKind::Primitive(PrimitiveType::Int)
                );
            }
            _ => panic!("expected function"),
        }
    }

    #[test]
    fn test_parse_extern_function() {
        let module = parse("export func puts(s: &uint8) => int\nfunc main() {}");
        assert_eq!(module.items.len(), 2);
        assert!(module.items[0].exported);
        match &module.items[0].kind {
            ItemKind::Func(f) => assert!(f.body.is_none()),
            _ => panic!("expected function"),
        }
    }

    #[test]
    fn test_parse_generic_template() {
        let module = parse(
            "template Pair<K: Hash + Eq, V> {\n  key: K\n  value: Box<Box<V>>\n  func get(self) => V { return self.value.inner.inner }\n}",
        );
        match &module.items[0].kind {
            ItemKind::Template(t) => {
                assert_eq!(t.name, "Pair");
                assert_eq!(t.generics.len(), 2);
                assert_eq!(t.generics[0].constraints.len(), 2);
                assert_eq!(t.fields.len(), 2);
                assert_eq!(t.fields[1].ty.to_string(), "Box<Box<V>>");
                assert!(t.methods[0].has_self);
            }
            _ => panic!("expected template"),
        }
    }

    #[test]
    fn test_parse_spec_and_action() {
        let module = parse(
            "spec Shape { type Unit; func area(self) => double }\n\
             action Shape in Square { type Unit = int\n func area(self) => double { return 1.0 } }\n\
             action Square { func side(self) => int { return 1 } }",
        );
        match &module.items[0].kind {
            ItemKind::Spec(s) => {
                assert_eq!(s.aliases.len(), 1);
                assert!(s.aliases[0].target.is_none());
                assert!(s.methods[0].body.is_none());
            }
            _ => panic!("expected spec"),
        }
        match &module.items[1].kind {
            ItemKind::Action(a) => {
                assert_eq!(a.spec.as_ref().unwrap().to_string(), "Shape");
                assert_eq!(a.target.to_string(), "Square");
                assert_eq!(a.aliases.len(), 1);
            }
            _ => panic!("expected action"),
        }
        match &module.items[2].kind {
            ItemKind::Action(a) => assert!(a.spec.is_none()),
            _ => panic!("expected action"),
        }
    }

    #[test]
    fn test_newline_ends_expression() {
        let module = parse("func f() {\n  let a = b\n  (c)\n  return\n}");
        let stmts = &body(&module).stmts;
        assert_eq!(stmts.len(), 3);
        assert!(matches!(stmts[1].kind, StmtKind::Expr(_)));
        assert!(matches!(stmts[2].kind, StmtKind::Return(None)));
    }

    #[test]
    fn test_precedence_and_cast() {
        let module = parse("func f() { x = 1 + 2 * 3 as uint8 }");
        let StmtKind::Assign { value, .. } = &body(&module).stmts[0].kind else {
            panic!("expected assignment");
        };
        let ExprKind::Binary { op, right, .. } = &value.kind else {
            panic!("expected binary");
        };
        assert_eq!(*op, BinaryOp::Add);
        let ExprKind::Binary { op: inner, right: cast, .. } = &right.kind else {
            panic!("expected binary");
        };
        assert_eq!(*inner, BinaryOp::Mul);
        assert!(matches!(cast.kind, ExprKind::Cast { .. }));
    }

    #[test]
    fn test_else_if_chain() {
        let module = parse("func f(x: int) { if x < 1 { } else if x < 2 { } else { } }");
        let StmtKind::If { else_branch, .. } = &body(&module).stmts[0].kind else {
            panic!("expected if");
        };
        let Some(ElseBranch::If(nested)) = else_branch else {
            panic!("expected else-if");
        };
        assert!(matches!(
            nested.kind,
            StmtKind::If { else_branch: Some(ElseBranch::Block(_)), .. }
        ));
    }

    #[test]
    fn test_initializer_list() {
        let module = parse("func f() { let p: Point = { x: 1, y: { 2, 3 } } }");
        let StmtKind::Let { init: Some(init), .. } = &body(&module).stmts[0].kind else {
            panic!("expected let");
        };
        let ExprKind::Initializer(fields) = &init.kind else {
            panic!("expected initializer");
        };
        assert_eq!(fields[0].name.as_deref(), Some("x"));
        assert!(matches!(fields[1].value.kind, ExprKind::Initializer(_)));
    }

    #[test]
    fn test_dot_chain_and_index() {
        let module = parse("func f() { a.b.c(1)[2] }");
        let StmtKind::Expr(expr) = &body(&module).stmts[0].kind else {
            panic!("expected expression");
        };
        let ExprKind::Index { base, .. } = &expr.kind else {
            panic!("expected index");
        };
        assert!(matches!(base.kind, ExprKind::Call { .. }));
    }

    #[test]
    fn test_parse_error() {
        let err = Parser::new("func f( { }").parse_module().unwrap_err();
        assert_eq!(err.kind, crate::common::ErrorKind::Parser);
    }

    #[test]
    fn test_node_ref_contract() {
        let module = parse("func f(a: int) { return a }");
        let root = module.node();
        assert_eq!(root.kind(), "Module");
        assert_eq!(root.child_count(), 1);
        let func = root.child(0).unwrap();
        assert_eq!(func.kind(), "Func");
        assert_eq!(func.child_count(), 2);
        assert_eq!(func.child(1).unwrap().kind(), "Block");
        assert!(func.child(2).is_none());

        let dump = dump_tree(root, &crate::common::LineIndex::new("func f(a: int) { return a }"));
        assert!(dump.contains("  Func f @1:1-1:28"));
        assert!(dump.contains("ReturnStmt"));
    }
}
