use std::path::PathBuf;

use crate::ast::*;
use crate::token::{Token, TokenKind};

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("{line}:{column}: expected {expected}, found {found:?}")]
    Expected {
        expected: &'static str,
        found: TokenKind,
        line: u32,
        column: u32,
    },
    #[error("{line}:{column}: a file must open with an @module directive")]
    MissingModuleHeader { line: u32, column: u32 },
    #[error("{line}:{column}: invalid integer literal '{text}'")]
    BadIntLiteral { text: String, line: u32, column: u32 },
    #[error("{line}:{column}: invalid float literal '{text}'")]
    BadFloatLiteral { text: String, line: u32, column: u32 },
}

/// Recursive-descent parser producing one [`Module`] per token stream.
pub struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    file_path: PathBuf,
    position: usize,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token], file_path: PathBuf, position: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            file_path,
            position,
        }
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> TokenKind {
        self.peek().kind
    }

    fn span(&self) -> Span {
        let t = self.peek();
        Span {
            line: t.line,
            column: t.column,
        }
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos.min(self.tokens.len() - 1)].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &'static str) -> Result<Token, ParseError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            let t = self.peek();
            Err(ParseError::Expected {
                expected: what,
                found: t.kind,
                line: t.line,
                column: t.column,
            })
        }
    }

    fn expect_identifier(&mut self) -> Result<String, ParseError> {
        Ok(self.expect(TokenKind::Identifier, "identifier")?.lexeme)
    }

    pub fn parse_module(mut self) -> Result<Module, ParseError> {
        self.eat(TokenKind::At);
        if !self.eat(TokenKind::KwModule) {
            let t = self.peek();
            return Err(ParseError::MissingModuleHeader {
                line: t.line,
                column: t.column,
            });
        }
        let name_tok = self.expect(TokenKind::StringLit, "module name string")?;
        let mut module = Module::new(name_tok.lexeme, self.file_path.clone());
        module.position = self.position;

        while self.check(TokenKind::At) {
            let checkpoint = self.pos;
            self.advance();
            if self.check(TokenKind::KwUse) {
                self.advance();
                let path_tok = self.expect(TokenKind::StringLit, "use path string")?;
                let alias = if self.eat(TokenKind::KwAs) {
                    Some(self.expect_identifier()?)
                } else {
                    None
                };
                module.uses.push(Use {
                    module_name: path_tok.lexeme,
                    alias,
                    span: Span {
                        line: path_tok.line,
                        column: path_tok.column,
                    },
                });
            } else {
                self.pos = checkpoint;
                break;
            }
        }

        while !self.check(TokenKind::Eof) {
            let stmt = self.parse_top_level_statement(&mut module)?;
            module.body.push(stmt);
        }

        Ok(module)
    }

    fn parse_doc_comment(&mut self) -> Option<String> {
        None
    }

    fn parse_top_level_statement(&mut self, module: &mut Module) -> Result<StmtId, ParseError> {
        let doc = self.parse_doc_comment();
        let is_public = self.eat(TokenKind::KwPub);
        self.eat(TokenKind::KwPriv);

        match self.peek_kind() {
            TokenKind::KwFn => self.parse_function(module, is_public, doc),
            TokenKind::KwStruct => self.parse_struct(module, is_public, doc),
            TokenKind::KwEnum => self.parse_enum(module, is_public),
            TokenKind::KwConst | TokenKind::KwLet => self.parse_var_decl(module, is_public, doc),
            _ => self.parse_statement(module),
        }
    }

    fn parse_function(
        &mut self,
        module: &mut Module,
        is_public: bool,
        doc: Option<String>,
    ) -> Result<StmtId, ParseError> {
        let span = self.span();
        self.expect(TokenKind::KwFn, "fn")?;
        let name = self.expect_identifier()?;
        self.expect(TokenKind::LParen, "(")?;
        let mut params = Vec::new();
        let mut param_types = Vec::new();
        let mut takes_ownership = Vec::new();
        while !self.check(TokenKind::RParen) {
            let owned = self.eat(TokenKind::Amp);
            let pname = self.expect_identifier()?;
            self.expect(TokenKind::Colon, ":")?;
            let ty = self.parse_type(module)?;
            params.push(pname);
            param_types.push(ty);
            takes_ownership.push(owned);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen, ")")?;
        let return_type = if self.eat(TokenKind::Arrow) {
            self.parse_type(module)?
        } else {
            module.types.alloc(TypeNode::Basic {
                name: "void".to_string(),
            })
        };
        let returns_ownership = false;
        let body = self.parse_block(module)?;
        let decl = FunctionDecl {
            name,
            params,
            param_types,
            return_type,
            body,
            is_public,
            takes_ownership,
            returns_ownership,
            doc,
            span,
        };
        Ok(module.statements.alloc(Statement::Function(decl)))
    }

    fn parse_struct(
        &mut self,
        module: &mut Module,
        is_public: bool,
        doc: Option<String>,
    ) -> Result<StmtId, ParseError> {
        let span = self.span();
        self.expect(TokenKind::KwStruct, "struct")?;
        let name = self.expect_identifier()?;
        self.expect(TokenKind::LBrace, "{")?;
        let mut public_members = Vec::new();
        let mut private_members = Vec::new();
        while !self.check(TokenKind::RBrace) {
            let member_doc = self.parse_doc_comment();
            let member_public = self.eat(TokenKind::KwPub);
            self.eat(TokenKind::KwPriv);
            let fspan = self.span();
            let fname = self.expect_identifier()?;
            self.expect(TokenKind::Colon, ":")?;
            let fty = self.parse_type(module)?;
            self.eat(TokenKind::Comma);
            let field = FieldDecl {
                name: fname,
                ty: fty,
                function: None,
                doc: member_doc,
                span: fspan,
            };
            if member_public {
                public_members.push(field);
            } else {
                private_members.push(field);
            }
        }
        self.expect(TokenKind::RBrace, "}")?;
        Ok(module.statements.alloc(Statement::Struct(StructDecl {
            name,
            public_members,
            private_members,
            doc,
            is_public,
            span,
        })))
    }

    fn parse_enum(&mut self, module: &mut Module, is_public: bool) -> Result<StmtId, ParseError> {
        let span = self.span();
        self.expect(TokenKind::KwEnum, "enum")?;
        let name = self.expect_identifier()?;
        self.expect(TokenKind::LBrace, "{")?;
        let mut members = Vec::new();
        let mut next_value = 0i64;
        while !self.check(TokenKind::RBrace) {
            let mname = self.expect_identifier()?;
            let value = if self.eat(TokenKind::Eq) {
                let tok = self.expect(TokenKind::IntLit, "integer literal")?;
                let v: i64 = tok
                    .lexeme
                    .parse()
                    .map_err(|_| ParseError::BadIntLiteral {
                        text: tok.lexeme.clone(),
                        line: tok.line,
                        column: tok.column,
                    })?;
                next_value = v + 1;
                Some(v)
            } else {
                let v = next_value;
                next_value += 1;
                Some(v)
            };
            members.push(EnumMember { name: mname, value });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RBrace, "}")?;
        Ok(module.statements.alloc(Statement::Enum(EnumDecl {
            name,
            members,
            is_public,
            span,
        })))
    }

    fn parse_var_decl(
        &mut self,
        module: &mut Module,
        is_public: bool,
        doc: Option<String>,
    ) -> Result<StmtId, ParseError> {
        let span = self.span();
        let is_mutable = match self.peek_kind() {
            TokenKind::KwLet => {
                self.advance();
                self.eat(TokenKind::KwMut)
            }
            TokenKind::KwConst => {
                self.advance();
                false
            }
            _ => {
                return Err(ParseError::Expected {
                    expected: "let or const",
                    found: self.peek_kind(),
                    line: self.peek().line,
                    column: self.peek().column,
                })
            }
        };
        let name = self.expect_identifier()?;
        let ty = if self.eat(TokenKind::Colon) {
            Some(self.parse_type(module)?)
        } else {
            None
        };
        let initializer = if self.eat(TokenKind::Eq) {
            Some(self.parse_expression(module)?)
        } else {
            None
        };
        self.expect(TokenKind::Semicolon, ";")?;
        Ok(module.statements.alloc(Statement::VarDecl(VarDecl {
            name,
            ty,
            initializer,
            is_mutable,
            is_public,
            doc,
            span,
        })))
    }

    fn parse_block(&mut self, module: &mut Module) -> Result<Vec<StmtId>, ParseError> {
        self.expect(TokenKind::LBrace, "{")?;
        let mut stmts = Vec::new();
        while !self.check(TokenKind::RBrace) {
            stmts.push(self.parse_statement(module)?);
        }
        self.expect(TokenKind::RBrace, "}")?;
        Ok(stmts)
    }

    fn parse_statement(&mut self, module: &mut Module) -> Result<StmtId, ParseError> {
        match self.peek_kind() {
            TokenKind::KwLet | TokenKind::KwConst => {
                let is_public = false;
                self.parse_var_decl(module, is_public, None)
            }
            TokenKind::KwReturn => {
                let span = self.span();
                self.advance();
                let value = if !self.check(TokenKind::Semicolon) {
                    Some(self.parse_expression(module)?)
                } else {
                    None
                };
                self.expect(TokenKind::Semicolon, ";")?;
                Ok(module.statements.alloc(Statement::Return(value, span)))
            }
            TokenKind::KwIf => self.parse_if(module),
            TokenKind::KwWhile => {
                let span = self.span();
                self.advance();
                let cond = self.parse_expression(module)?;
                let body = self.parse_block(module)?;
                Ok(module
                    .statements
                    .alloc(Statement::While { cond, body, span }))
            }
            TokenKind::KwFor => {
                let span = self.span();
                self.advance();
                let binding = self.expect_identifier()?;
                self.expect_identifier_keyword("in")?;
                let iterable = self.parse_expression(module)?;
                let body = self.parse_block(module)?;
                Ok(module.statements.alloc(Statement::For {
                    binding,
                    iterable,
                    body,
                    span,
                }))
            }
            TokenKind::KwBreak => {
                let span = self.span();
                self.advance();
                self.expect(TokenKind::Semicolon, ";")?;
                Ok(module.statements.alloc(Statement::Break(span)))
            }
            TokenKind::KwContinue => {
                let span = self.span();
                self.advance();
                self.expect(TokenKind::Semicolon, ";")?;
                Ok(module.statements.alloc(Statement::Continue(span)))
            }
            TokenKind::LBrace => {
                let span = self.span();
                let body = self.parse_block(module)?;
                Ok(module.statements.alloc(Statement::Block(body, span)))
            }
            _ => {
                let span = self.span();
                let expr = self.parse_expression(module)?;
                self.expect(TokenKind::Semicolon, ";")?;
                Ok(module.statements.alloc(Statement::ExprStmt(expr, span)))
            }
        }
    }

    // `for x in it` uses a bare identifier as the separating keyword since
    // the language's keyword table does not reserve `in`.
    fn expect_identifier_keyword(&mut self, word: &str) -> Result<(), ParseError> {
        let tok = self.expect(TokenKind::Identifier, "'in'")?;
        if tok.lexeme != word {
            return Err(ParseError::Expected {
                expected: "'in'",
                found: TokenKind::Identifier,
                line: tok.line,
                column: tok.column,
            });
        }
        Ok(())
    }

    fn parse_if(&mut self, module: &mut Module) -> Result<StmtId, ParseError> {
        let span = self.span();
        self.expect(TokenKind::KwIf, "if")?;
        let cond = self.parse_expression(module)?;
        let then_branch = self.parse_block(module)?;
        let else_branch = if self.eat(TokenKind::KwElse) {
            if self.check(TokenKind::KwIf) {
                vec![self.parse_if(module)?]
            } else {
                self.parse_block(module)?
            }
        } else {
            Vec::new()
        };
        Ok(module.statements.alloc(Statement::If {
            cond,
            then_branch,
            else_branch,
            span,
        }))
    }

    // ---- expressions (precedence climbing) ----

    fn parse_expression(&mut self, module: &mut Module) -> Result<ExprId, ParseError> {
        self.parse_assignment(module)
    }

    fn parse_assignment(&mut self, module: &mut Module) -> Result<ExprId, ParseError> {
        let target = self.parse_range(module)?;
        if self.eat(TokenKind::Eq) {
            let span = self.span();
            let value = self.parse_assignment(module)?;
            return Ok(module.expressions.alloc(Expression::Assignment {
                target,
                value,
                span,
            }));
        }
        Ok(target)
    }

    fn parse_range(&mut self, module: &mut Module) -> Result<ExprId, ParseError> {
        let left = self.parse_logical_or(module)?;
        if self.check(TokenKind::DotDot) {
            let span = self.span();
            self.advance();
            let right = self.parse_logical_or(module)?;
            return Ok(module.expressions.alloc(Expression::Binary {
                op: BinaryOp::Range,
                left,
                right,
                span,
            }));
        }
        Ok(left)
    }

    fn parse_logical_or(&mut self, module: &mut Module) -> Result<ExprId, ParseError> {
        let mut left = self.parse_logical_and(module)?;
        while self.check(TokenKind::PipePipe) {
            let span = self.span();
            self.advance();
            let right = self.parse_logical_and(module)?;
            left = module.expressions.alloc(Expression::Binary {
                op: BinaryOp::Or,
                left,
                right,
                span,
            });
        }
        Ok(left)
    }

    fn parse_logical_and(&mut self, module: &mut Module) -> Result<ExprId, ParseError> {
        let mut left = self.parse_bitwise_or(module)?;
        while self.check(TokenKind::AmpAmp) {
            let span = self.span();
            self.advance();
            let right = self.parse_bitwise_or(module)?;
            left = module.expressions.alloc(Expression::Binary {
                op: BinaryOp::And,
                left,
                right,
                span,
            });
        }
        Ok(left)
    }

    fn parse_bitwise_or(&mut self, module: &mut Module) -> Result<ExprId, ParseError> {
        let mut left = self.parse_bitwise_xor(module)?;
        while self.check(TokenKind::Pipe) {
            let span = self.span();
            self.advance();
            let right = self.parse_bitwise_xor(module)?;
            left = module.expressions.alloc(Expression::Binary {
                op: BinaryOp::BitOr,
                left,
                right,
                span,
            });
        }
        Ok(left)
    }

    fn parse_bitwise_xor(&mut self, module: &mut Module) -> Result<ExprId, ParseError> {
        let mut left = self.parse_bitwise_and(module)?;
        while self.check(TokenKind::Caret) {
            let span = self.span();
            self.advance();
            let right = self.parse_bitwise_and(module)?;
            left = module.expressions.alloc(Expression::Binary {
                op: BinaryOp::BitXor,
                left,
                right,
                span,
            });
        }
        Ok(left)
    }

    fn parse_bitwise_and(&mut self, module: &mut Module) -> Result<ExprId, ParseError> {
        let mut left = self.parse_equality(module)?;
        while self.check(TokenKind::Amp) {
            let span = self.span();
            self.advance();
            let right = self.parse_equality(module)?;
            left = module.expressions.alloc(Expression::Binary {
                op: BinaryOp::BitAnd,
                left,
                right,
                span,
            });
        }
        Ok(left)
    }

    fn parse_equality(&mut self, module: &mut Module) -> Result<ExprId, ParseError> {
        let mut left = self.parse_comparison(module)?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::EqEq => BinaryOp::Eq,
                TokenKind::NotEq => BinaryOp::NotEq,
                _ => break,
            };
            let span = self.span();
            self.advance();
            let right = self.parse_comparison(module)?;
            left = module.expressions.alloc(Expression::Binary {
                op,
                left,
                right,
                span,
            });
        }
        Ok(left)
    }

    fn parse_comparison(&mut self, module: &mut Module) -> Result<ExprId, ParseError> {
        let mut left = self.parse_shift(module)?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Lt => BinaryOp::Lt,
                TokenKind::Le => BinaryOp::Le,
                TokenKind::Gt => BinaryOp::Gt,
                TokenKind::Ge => BinaryOp::Ge,
                _ => break,
            };
            let span = self.span();
            self.advance();
            let right = self.parse_shift(module)?;
            left = module.expressions.alloc(Expression::Binary {
                op,
                left,
                right,
                span,
            });
        }
        Ok(left)
    }

    fn parse_shift(&mut self, module: &mut Module) -> Result<ExprId, ParseError> {
        let mut left = self.parse_additive(module)?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Shl => BinaryOp::Shl,
                TokenKind::Shr => BinaryOp::Shr,
                _ => break,
            };
            let span = self.span();
            self.advance();
            let right = self.parse_additive(module)?;
            left = module.expressions.alloc(Expression::Binary {
                op,
                left,
                right,
                span,
            });
        }
        Ok(left)
    }

    fn parse_additive(&mut self, module: &mut Module) -> Result<ExprId, ParseError> {
        let mut left = self.parse_multiplicative(module)?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            let span = self.span();
            self.advance();
            let right = self.parse_multiplicative(module)?;
            left = module.expressions.alloc(Expression::Binary {
                op,
                left,
                right,
                span,
            });
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self, module: &mut Module) -> Result<ExprId, ParseError> {
        let mut left = self.parse_cast(module)?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Rem,
                _ => break,
            };
            let span = self.span();
            self.advance();
            let right = self.parse_cast(module)?;
            left = module.expressions.alloc(Expression::Binary {
                op,
                left,
                right,
                span,
            });
        }
        Ok(left)
    }

    fn parse_cast(&mut self, module: &mut Module) -> Result<ExprId, ParseError> {
        let mut expr = self.parse_unary(module)?;
        while self.check(TokenKind::KwAs) {
            let span = self.span();
            self.advance();
            let ty = self.parse_type(module)?;
            expr = module.expressions.alloc(Expression::Cast {
                ty,
                castee: expr,
                span,
            });
        }
        Ok(expr)
    }

    fn parse_unary(&mut self, module: &mut Module) -> Result<ExprId, ParseError> {
        let span = self.span();
        match self.peek_kind() {
            TokenKind::Minus => {
                self.advance();
                let operand = self.parse_unary(module)?;
                Ok(module.expressions.alloc(Expression::Unary {
                    op: UnaryOp::Neg,
                    operand,
                    span,
                }))
            }
            TokenKind::Bang => {
                self.advance();
                let operand = self.parse_unary(module)?;
                Ok(module.expressions.alloc(Expression::Unary {
                    op: UnaryOp::Not,
                    operand,
                    span,
                }))
            }
            TokenKind::Tilde => {
                self.advance();
                let operand = self.parse_unary(module)?;
                Ok(module.expressions.alloc(Expression::Unary {
                    op: UnaryOp::BitNot,
                    operand,
                    span,
                }))
            }
            TokenKind::PlusPlus => {
                self.advance();
                let operand = self.parse_unary(module)?;
                Ok(module.expressions.alloc(Expression::Unary {
                    op: UnaryOp::PreInc,
                    operand,
                    span,
                }))
            }
            TokenKind::MinusMinus => {
                self.advance();
                let operand = self.parse_unary(module)?;
                Ok(module.expressions.alloc(Expression::Unary {
                    op: UnaryOp::PreDec,
                    operand,
                    span,
                }))
            }
            TokenKind::Star => {
                self.advance();
                let operand = self.parse_unary(module)?;
                Ok(module.expressions.alloc(Expression::Deref { operand, span }))
            }
            TokenKind::Amp => {
                self.advance();
                let operand = self.parse_unary(module)?;
                Ok(module.expressions.alloc(Expression::Addr { operand, span }))
            }
            _ => self.parse_postfix(module),
        }
    }

    fn parse_postfix(&mut self, module: &mut Module) -> Result<ExprId, ParseError> {
        let mut expr = self.parse_primary(module)?;
        loop {
            match self.peek_kind() {
                TokenKind::Dot => {
                    let span = self.span();
                    self.advance();
                    let member = self.expect_identifier()?;
                    expr = module.expressions.alloc(Expression::Member {
                        object: expr,
                        member,
                        is_compiletime: false,
                        span,
                    });
                }
                TokenKind::ColonColon => {
                    let span = self.span();
                    self.advance();
                    let member = self.expect_identifier()?;
                    expr = module.expressions.alloc(Expression::Member {
                        object: expr,
                        member,
                        is_compiletime: true,
                        span,
                    });
                }
                TokenKind::LBracket => {
                    let span = self.span();
                    self.advance();
                    let index = self.parse_expression(module)?;
                    self.expect(TokenKind::RBracket, "]")?;
                    expr = module.expressions.alloc(Expression::Index {
                        object: expr,
                        index,
                        span,
                    });
                }
                TokenKind::LParen => {
                    let span = self.span();
                    self.advance();
                    let mut args = Vec::new();
                    while !self.check(TokenKind::RParen) {
                        args.push(self.parse_expression(module)?);
                        if !self.eat(TokenKind::Comma) {
                            break;
                        }
                    }
                    self.expect(TokenKind::RParen, ")")?;
                    expr = module.expressions.alloc(Expression::Call {
                        callee: expr,
                        args,
                        span,
                    });
                }
                TokenKind::PlusPlus => {
                    let span = self.span();
                    self.advance();
                    expr = module.expressions.alloc(Expression::Unary {
                        op: UnaryOp::PostInc,
                        operand: expr,
                        span,
                    });
                }
                TokenKind::MinusMinus => {
                    let span = self.span();
                    self.advance();
                    expr = module.expressions.alloc(Expression::Unary {
                        op: UnaryOp::PostDec,
                        operand: expr,
                        span,
                    });
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self, module: &mut Module) -> Result<ExprId, ParseError> {
        let span = self.span();
        match self.peek_kind() {
            TokenKind::IntLit => {
                let tok = self.advance();
                let value: i64 = tok.lexeme.parse().map_err(|_| ParseError::BadIntLiteral {
                    text: tok.lexeme.clone(),
                    line: tok.line,
                    column: tok.column,
                })?;
                Ok(module.expressions.alloc(Expression::Literal {
                    kind: LiteralKind::Int,
                    value: LiteralValue::Int(value),
                    span,
                }))
            }
            TokenKind::FloatLit => {
                let tok = self.advance();
                let value: f64 = tok.lexeme.parse().map_err(|_| ParseError::BadFloatLiteral {
                    text: tok.lexeme.clone(),
                    line: tok.line,
                    column: tok.column,
                })?;
                Ok(module.expressions.alloc(Expression::Literal {
                    kind: LiteralKind::Float,
                    value: LiteralValue::Float(value),
                    span,
                }))
            }
            TokenKind::StringLit => {
                let tok = self.advance();
                Ok(module.expressions.alloc(Expression::Literal {
                    kind: LiteralKind::String,
                    value: LiteralValue::String(tok.lexeme),
                    span,
                }))
            }
            TokenKind::CharLit => {
                let tok = self.advance();
                let c = tok.lexeme.chars().next().unwrap_or('\0');
                Ok(module.expressions.alloc(Expression::Literal {
                    kind: LiteralKind::Char,
                    value: LiteralValue::Char(c),
                    span,
                }))
            }
            TokenKind::KwTrue => {
                self.advance();
                Ok(module.expressions.alloc(Expression::Literal {
                    kind: LiteralKind::Bool,
                    value: LiteralValue::Bool(true),
                    span,
                }))
            }
            TokenKind::KwFalse => {
                self.advance();
                Ok(module.expressions.alloc(Expression::Literal {
                    kind: LiteralKind::Bool,
                    value: LiteralValue::Bool(false),
                    span,
                }))
            }
            TokenKind::KwNull => {
                self.advance();
                Ok(module.expressions.alloc(Expression::Literal {
                    kind: LiteralKind::Null,
                    value: LiteralValue::Null,
                    span,
                }))
            }
            TokenKind::Identifier => {
                let tok = self.advance();
                Ok(module.expressions.alloc(Expression::Identifier {
                    name: tok.lexeme,
                    span,
                }))
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expression(module)?;
                self.expect(TokenKind::RParen, ")")?;
                Ok(expr)
            }
            TokenKind::LBracket => {
                self.advance();
                let mut elements = Vec::new();
                while !self.check(TokenKind::RBracket) {
                    elements.push(self.parse_expression(module)?);
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(TokenKind::RBracket, "]")?;
                let target_size = if self.eat(TokenKind::Semicolon) {
                    let tok = self.expect(TokenKind::IntLit, "array size")?;
                    Some(tok.lexeme.parse().unwrap_or(elements.len()))
                } else {
                    None
                };
                Ok(module.expressions.alloc(Expression::Array {
                    elements,
                    target_size,
                    span,
                }))
            }
            TokenKind::KwCast => {
                self.advance();
                self.expect(TokenKind::Lt, "<")?;
                let ty = self.parse_type(module)?;
                self.expect(TokenKind::Gt, ">")?;
                self.expect(TokenKind::LParen, "(")?;
                let castee = self.parse_expression(module)?;
                self.expect(TokenKind::RParen, ")")?;
                Ok(module.expressions.alloc(Expression::Cast { ty, castee, span }))
            }
            TokenKind::KwSizeOf => {
                self.advance();
                self.expect(TokenKind::Lt, "<")?;
                let arg = if self.looks_like_type() {
                    let ty = self.parse_type(module)?;
                    SizeOfArg::Type(ty)
                } else {
                    let e = self.parse_expression(module)?;
                    SizeOfArg::Expr(e)
                };
                self.expect(TokenKind::Gt, ">")?;
                Ok(module
                    .expressions
                    .alloc(Expression::SizeOf { object: arg, span }))
            }
            TokenKind::KwAlloc => {
                self.advance();
                self.expect(TokenKind::LParen, "(")?;
                let size = self.parse_expression(module)?;
                self.expect(TokenKind::RParen, ")")?;
                Ok(module.expressions.alloc(Expression::Alloc { size, span }))
            }
            TokenKind::KwFree => {
                self.advance();
                self.expect(TokenKind::LParen, "(")?;
                let ptr = self.parse_expression(module)?;
                self.expect(TokenKind::RParen, ")")?;
                Ok(module.expressions.alloc(Expression::Free { ptr, span }))
            }
            TokenKind::KwInput => {
                self.advance();
                self.expect(TokenKind::Lt, "<")?;
                let ty = self.parse_type(module)?;
                self.expect(TokenKind::Gt, ">")?;
                self.expect(TokenKind::LParen, "(")?;
                let msg = if !self.check(TokenKind::RParen) {
                    Some(self.parse_expression(module)?)
                } else {
                    None
                };
                self.expect(TokenKind::RParen, ")")?;
                Ok(module.expressions.alloc(Expression::Input { ty, msg, span }))
            }
            TokenKind::KwSystem => {
                self.advance();
                self.expect(TokenKind::LParen, "(")?;
                let command = self.parse_expression(module)?;
                self.expect(TokenKind::RParen, ")")?;
                Ok(module
                    .expressions
                    .alloc(Expression::System { command, span }))
            }
            TokenKind::KwSyscall => {
                self.advance();
                self.expect(TokenKind::LParen, "(")?;
                let mut args = Vec::new();
                while !self.check(TokenKind::RParen) {
                    args.push(self.parse_expression(module)?);
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(TokenKind::RParen, ")")?;
                let count = args.len();
                Ok(module
                    .expressions
                    .alloc(Expression::Syscall { args, count, span }))
            }
            other => Err(ParseError::Expected {
                expected: "expression",
                found: other,
                line: span.line,
                column: span.column,
            }),
        }
    }

    fn looks_like_type(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Identifier | TokenKind::Amp)
            && !matches!(self.tokens.get(self.pos + 1).map(|t| t.kind), Some(TokenKind::LParen) | Some(TokenKind::Dot) | Some(TokenKind::ColonColon))
    }

    fn parse_type(&mut self, module: &mut Module) -> Result<TypeId, ParseError> {
        if self.eat(TokenKind::Star) {
            let pointee = self.parse_type(module)?;
            return Ok(module.types.alloc(TypeNode::Pointer { pointee }));
        }
        if self.eat(TokenKind::LBracket) {
            let element = self.parse_type(module)?;
            let size = if self.eat(TokenKind::Semicolon) {
                let tok = self.expect(TokenKind::IntLit, "array size")?;
                Some(tok.lexeme.parse().unwrap_or(0))
            } else {
                None
            };
            self.expect(TokenKind::RBracket, "]")?;
            return Ok(module.types.alloc(TypeNode::Array { element, size }));
        }
        let first = self.expect_identifier()?;
        if self.check(TokenKind::ColonColon) {
            let mut parts = vec![first];
            while self.eat(TokenKind::ColonColon) {
                parts.push(self.expect_identifier()?);
            }
            return Ok(module.types.alloc(TypeNode::Resolution { parts }));
        }
        Ok(module.types.alloc(TypeNode::Basic { name: first }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn parse_src(src: &str) -> Module {
        let tokens = Lexer::new(src).tokenize().unwrap();
        Parser::new(&tokens, PathBuf::from("test.luma"), 0)
            .parse_module()
            .unwrap()
    }

    #[test]
    fn parses_minimal_module() {
        let m = parse_src("@module \"main\"\nfn main() -> i32 { return 0; }\n");
        assert_eq!(m.name, "main");
        assert_eq!(m.body.len(), 1);
    }

    #[test]
    fn parses_use_with_alias() {
        let m = parse_src("@module \"main\"\n@use \"std/io\" as io\nfn main() -> i32 { return 0; }\n");
        assert_eq!(m.uses.len(), 1);
        assert_eq!(m.uses[0].module_name, "std/io");
        assert_eq!(m.uses[0].alias.as_deref(), Some("io"));
    }

    #[test]
    fn parses_struct_with_members() {
        let m = parse_src(
            "@module \"main\"\nstruct Point { pub x: i32, pub y: i32, z: i32 }\n",
        );
        match &m.statements.iter().next().unwrap().1 {
            Statement::Struct(s) => {
                assert_eq!(s.public_members.len(), 2);
                assert_eq!(s.private_members.len(), 1);
            }
            _ => panic!("expected struct"),
        }
    }

    #[test]
    fn parses_compile_time_member_access() {
        let m = parse_src("@module \"main\"\nfn main() -> i32 { return Color::Red; }\n");
        assert_eq!(m.body.len(), 1);
    }
}
