use std::collections::HashMap;

use luma_frontend::ast::{
    BinaryOp, ExprId, Expression, FunctionDecl, LiteralKind, Program, SizeOfArg, Statement, StmtId,
    UnaryOp,
};

use crate::scope::{ScopeId, ScopeTree, Symbol};
use crate::types::{resolve_type, LumaType};

#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    #[error("{module}: duplicate module name")]
    DuplicateModule { module: String },
    #[error("{module}:{line}:{column}: undefined identifier '{name}'")]
    UndefinedIdentifier {
        module: String,
        name: String,
        line: u32,
        column: u32,
    },
    #[error("{module}:{line}:{column}: cannot assign to immutable binding '{name}'")]
    AssignToImmutable {
        module: String,
        name: String,
        line: u32,
        column: u32,
    },
    #[error("{module}:{line}:{column}: logical operator requires boolean or integer operands, found {found:?}")]
    LogicalOnFloat {
        module: String,
        found: LumaType,
        line: u32,
        column: u32,
    },
    #[error("{module}:{line}:{column}: bitwise operator requires integer operands, found {found:?}")]
    BitwiseOnNonInteger {
        module: String,
        found: LumaType,
        line: u32,
        column: u32,
    },
    #[error("{module}:{line}:{column}: call to '{callee}' expects {expected} argument(s), found {found}")]
    ArityMismatch {
        module: String,
        callee: String,
        expected: usize,
        found: usize,
        line: u32,
        column: u32,
    },
    #[error("{module}:{line}:{column}: '.' used on module '{name}' — did you mean '{name}::{member}'?")]
    DotOnModule {
        module: String,
        name: String,
        member: String,
        line: u32,
        column: u32,
    },
}

struct FunctionSig {
    params: Vec<LumaType>,
    return_type: LumaType,
}

/// Fills a [`ScopeTree`] rooted at each module's global scope and checks the
/// program for the handful of semantic errors codegen cannot recover from.
/// Past that boundary codegen assumes well-typed input.
pub struct Typechecker {
    pub scopes: ScopeTree,
    struct_names: HashMap<String, ()>,
    enum_names: HashMap<String, ()>,
    functions: HashMap<(String, String), FunctionSig>,
    module_names: HashMap<String, ()>,
    errors: Vec<CheckError>,
}

impl Typechecker {
    pub fn new() -> Self {
        Self {
            scopes: ScopeTree::new(),
            struct_names: HashMap::new(),
            enum_names: HashMap::new(),
            functions: HashMap::new(),
            module_names: HashMap::new(),
            errors: Vec::new(),
        }
    }

    pub fn check(mut self, program: &mut Program) -> Result<ScopeTree, Vec<CheckError>> {
        for module in &program.modules {
            if self.module_names.insert(module.name.clone(), ()).is_some() {
                self.errors.push(CheckError::DuplicateModule {
                    module: module.name.clone(),
                });
            }
        }

        for module in &program.modules {
            for (_, stmt) in module.statements.iter() {
                match stmt {
                    Statement::Struct(s) => {
                        self.struct_names.insert(s.name.clone(), ());
                    }
                    Statement::Enum(e) => {
                        self.enum_names.insert(e.name.clone(), ());
                    }
                    _ => {}
                }
            }
        }

        for module in &program.modules {
            for (_, stmt) in module.statements.iter() {
                if let Statement::Function(f) = stmt {
                    let params = f
                        .param_types
                        .iter()
                        .map(|t| resolve_type(module, *t, &self.struct_names, &self.enum_names))
                        .collect();
                    let return_type =
                        resolve_type(module, f.return_type, &self.struct_names, &self.enum_names);
                    self.functions
                        .insert((module.name.clone(), f.name.clone()), FunctionSig { params, return_type });
                }
            }
        }

        for module in &mut program.modules {
            let module_scope = self.scopes.push_child(self.scopes.root());
            let stmt_ids: Vec<StmtId> = module.body.clone();
            for stmt_id in stmt_ids {
                self.check_top_level(module, stmt_id, module_scope);
            }
        }

        if self.errors.is_empty() {
            Ok(self.scopes)
        } else {
            Err(self.errors)
        }
    }

    fn check_top_level(
        &mut self,
        module: &mut luma_frontend::ast::Module,
        stmt_id: StmtId,
        module_scope: ScopeId,
    ) {
        let stmt = module.statements.get(stmt_id).clone();
        match stmt {
            Statement::Function(f) => self.check_function(module, &f, module_scope),
            Statement::VarDecl(v) => {
                let ty = v
                    .ty
                    .map(|t| resolve_type(module, t, &self.struct_names, &self.enum_names))
                    .unwrap_or(LumaType::Unknown);
                if let Some(init) = v.initializer {
                    self.check_expr(module, init, module_scope);
                }
                self.scopes.declare(
                    module_scope,
                    Symbol {
                        name: v.name.clone(),
                        ty,
                        is_public: v.is_public,
                        is_mutable: v.is_mutable,
                        span: v.span,
                    },
                );
            }
            Statement::Struct(_) | Statement::Enum(_) => {}
            _ => {}
        }
    }

    fn check_function(
        &mut self,
        module: &mut luma_frontend::ast::Module,
        f: &FunctionDecl,
        module_scope: ScopeId,
    ) {
        let fn_scope = self.scopes.push_child(module_scope);
        for (name, ty_id) in f.params.iter().zip(&f.param_types) {
            let ty = resolve_type(module, *ty_id, &self.struct_names, &self.enum_names);
            self.scopes.declare(
                fn_scope,
                Symbol {
                    name: name.clone(),
                    ty,
                    is_public: false,
                    is_mutable: true,
                    span: f.span,
                },
            );
        }
        let body = f.body.clone();
        for stmt_id in body {
            self.check_stmt(module, stmt_id, fn_scope);
        }
    }

    fn check_stmt(&mut self, module: &mut luma_frontend::ast::Module, stmt_id: StmtId, scope: ScopeId) {
        let stmt = module.statements.get(stmt_id).clone();
        match stmt {
            Statement::VarDecl(v) => {
                let ty = v
                    .ty
                    .map(|t| resolve_type(module, t, &self.struct_names, &self.enum_names))
                    .unwrap_or(LumaType::Unknown);
                if let Some(init) = v.initializer {
                    self.check_expr(module, init, scope);
                }
                self.scopes.declare(
                    scope,
                    Symbol {
                        name: v.name.clone(),
                        ty,
                        is_public: v.is_public,
                        is_mutable: v.is_mutable,
                        span: v.span,
                    },
                );
            }
            Statement::ExprStmt(e, _) => {
                self.check_expr(module, e, scope);
            }
            Statement::Return(Some(e), _) => {
                self.check_expr(module, e, scope);
            }
            Statement::Return(None, _) => {}
            Statement::If {
                cond,
                then_branch,
                else_branch,
                ..
            } => {
                self.check_expr(module, cond, scope);
                let then_scope = self.scopes.push_child(scope);
                for s in then_branch {
                    self.check_stmt(module, s, then_scope);
                }
                let else_scope = self.scopes.push_child(scope);
                for s in else_branch {
                    self.check_stmt(module, s, else_scope);
                }
            }
            Statement::While { cond, body, .. } => {
                self.check_expr(module, cond, scope);
                let body_scope = self.scopes.push_child(scope);
                for s in body {
                    self.check_stmt(module, s, body_scope);
                }
            }
            Statement::For {
                binding,
                iterable,
                body,
                span,
            } => {
                let elem_ty = self.check_expr(module, iterable, scope);
                let body_scope = self.scopes.push_child(scope);
                self.scopes.declare(
                    body_scope,
                    Symbol {
                        name: binding,
                        ty: elem_ty,
                        is_public: false,
                        is_mutable: true,
                        span,
                    },
                );
                for s in body {
                    self.check_stmt(module, s, body_scope);
                }
            }
            Statement::Block(body, _) => {
                let body_scope = self.scopes.push_child(scope);
                for s in body {
                    self.check_stmt(module, s, body_scope);
                }
            }
            Statement::Break(_) | Statement::Continue(_) => {}
            Statement::Function(_) | Statement::Struct(_) | Statement::Enum(_) | Statement::FieldDecl(_) => {}
        }
    }

    fn check_expr(&mut self, module: &mut luma_frontend::ast::Module, expr_id: ExprId, scope: ScopeId) -> LumaType {
        let expr = module.expressions.get(expr_id).clone();
        match expr {
            Expression::Literal { kind, .. } => match kind {
                LiteralKind::Int => LumaType::I32,
                LiteralKind::Float => LumaType::F64,
                LiteralKind::Bool => LumaType::Bool,
                LiteralKind::Char => LumaType::Char,
                LiteralKind::String => LumaType::Pointer(Box::new(LumaType::I8)),
                LiteralKind::Null => LumaType::Pointer(Box::new(LumaType::Void)),
            },
            Expression::Identifier { name, span } => {
                if self.module_names.contains_key(&name) {
                    return LumaType::Module(name);
                }
                match self.scopes.lookup(scope, &name) {
                    Some(sym) => sym.ty.clone(),
                    None => {
                        self.errors.push(CheckError::UndefinedIdentifier {
                            module: module.name.clone(),
                            name,
                            line: span.line,
                            column: span.column,
                        });
                        LumaType::Unknown
                    }
                }
            }
            Expression::Binary { op, left, right, span } => {
                let lt = self.check_expr(module, left, scope);
                let rt = self.check_expr(module, right, scope);
                match op {
                    BinaryOp::And | BinaryOp::Or => {
                        if lt.is_float() || rt.is_float() {
                            self.errors.push(CheckError::LogicalOnFloat {
                                module: module.name.clone(),
                                found: if lt.is_float() { lt } else { rt },
                                line: span.line,
                                column: span.column,
                            });
                        }
                        LumaType::Bool
                    }
                    BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor | BinaryOp::Shl | BinaryOp::Shr => {
                        if !lt.is_integer() || !rt.is_integer() {
                            let found = if !lt.is_integer() { lt.clone() } else { rt.clone() };
                            self.errors.push(CheckError::BitwiseOnNonInteger {
                                module: module.name.clone(),
                                found,
                                line: span.line,
                                column: span.column,
                            });
                        }
                        lt
                    }
                    BinaryOp::Eq
                    | BinaryOp::NotEq
                    | BinaryOp::Lt
                    | BinaryOp::Le
                    | BinaryOp::Gt
                    | BinaryOp::Ge => LumaType::Bool,
                    // A range's own type is its element type, not a wrapper
                    // struct — `for x in a..b` binds `x` at this type.
                    BinaryOp::Range => lt,
                    _ => promote(lt, rt),
                }
            }
            Expression::Unary { op, operand, .. } => {
                let ty = self.check_expr(module, operand, scope);
                match op {
                    UnaryOp::Not => LumaType::Bool,
                    _ => ty,
                }
            }
            Expression::Assignment { target, value, span } => {
                if let Expression::Identifier { name, .. } = module.expressions.get(target).clone() {
                    if let Some(sym) = self.scopes.lookup(scope, &name) {
                        if !sym.is_mutable {
                            self.errors.push(CheckError::AssignToImmutable {
                                module: module.name.clone(),
                                name,
                                line: span.line,
                                column: span.column,
                            });
                        }
                    }
                }
                self.check_expr(module, target, scope);
                self.check_expr(module, value, scope)
            }
            Expression::Call { .. } => {
                self.desugar_method_call(module, expr_id);
                let (callee, args, span) = match module.expressions.get(expr_id).clone() {
                    Expression::Call { callee, args, span } => (callee, args, span),
                    _ => unreachable!(),
                };
                for a in &args {
                    self.check_expr(module, *a, scope);
                }
                if let Expression::Identifier { name, .. } = module.expressions.get(callee).clone() {
                    if let Some(sig) = self.functions.get(&(module.name.clone(), name.clone())) {
                        if sig.params.len() != args.len() {
                            self.errors.push(CheckError::ArityMismatch {
                                module: module.name.clone(),
                                callee: name,
                                expected: sig.params.len(),
                                found: args.len(),
                                line: span.line,
                                column: span.column,
                            });
                        }
                        return sig.return_type.clone();
                    }
                }
                LumaType::Unknown
            }
            Expression::Member {
                object,
                member,
                is_compiletime,
                span,
            } => {
                let base_ty = self.check_expr(module, object, scope);
                if !is_compiletime {
                    if let LumaType::Module(name) = base_ty {
                        self.errors.push(CheckError::DotOnModule {
                            module: module.name.clone(),
                            name,
                            member,
                            line: span.line,
                            column: span.column,
                        });
                        return LumaType::Unknown;
                    }
                }
                LumaType::Unknown
            }
            Expression::Index { object, index, .. } => {
                let base = self.check_expr(module, object, scope);
                self.check_expr(module, index, scope);
                match base {
                    LumaType::Array(elem, _) => *elem,
                    LumaType::Pointer(elem) => *elem,
                    _ => LumaType::Unknown,
                }
            }
            Expression::Cast { ty, castee, .. } => {
                self.check_expr(module, castee, scope);
                resolve_type(module, ty, &self.struct_names, &self.enum_names)
            }
            Expression::Deref { operand, .. } => {
                let base = self.check_expr(module, operand, scope);
                base.pointee().cloned().unwrap_or(LumaType::Unknown)
            }
            Expression::Addr { operand, .. } => {
                let base = self.check_expr(module, operand, scope);
                LumaType::Pointer(Box::new(base))
            }
            Expression::Array { elements, .. } => {
                let mut elem_ty = LumaType::Unknown;
                for e in elements {
                    elem_ty = self.check_expr(module, e, scope);
                }
                LumaType::Array(Box::new(elem_ty), None)
            }
            Expression::SizeOf { object, .. } => {
                if let SizeOfArg::Expr(e) = object {
                    self.check_expr(module, e, scope);
                }
                LumaType::I64
            }
            Expression::Alloc { size, .. } => {
                self.check_expr(module, size, scope);
                LumaType::Pointer(Box::new(LumaType::I8))
            }
            Expression::Free { ptr, .. } => {
                self.check_expr(module, ptr, scope);
                LumaType::Void
            }
            Expression::Input { ty, msg, .. } => {
                if let Some(m) = msg {
                    self.check_expr(module, m, scope);
                }
                resolve_type(module, ty, &self.struct_names, &self.enum_names)
            }
            Expression::System { command, .. } => {
                self.check_expr(module, command, scope);
                LumaType::I32
            }
            Expression::Syscall { args, .. } => {
                for a in args {
                    self.check_expr(module, a, scope);
                }
                LumaType::I64
            }
        }
    }

    /// `obj.method(args)` desugars to a call whose first argument is `&obj`,
    /// matching the convention codegen relies on for instance dispatch.
    fn desugar_method_call(&mut self, module: &mut luma_frontend::ast::Module, call_id: ExprId) {
        let (callee, span) = match module.expressions.get(call_id).clone() {
            Expression::Call { callee, span, .. } => (callee, span),
            _ => return,
        };
        let is_method = matches!(
            module.expressions.get(callee),
            Expression::Member { is_compiletime: false, .. }
        );
        if !is_method {
            return;
        }
        let object = match module.expressions.get(callee).clone() {
            Expression::Member { object, .. } => object,
            _ => return,
        };
        let addr_id = module.expressions.alloc(Expression::Addr { operand: object, span });
        if let Expression::Call { args, .. } = module.expressions.get_mut(call_id) {
            args.insert(0, addr_id);
        }
    }
}

fn promote(a: LumaType, b: LumaType) -> LumaType {
    if a.is_float() && !b.is_float() {
        a
    } else if b.is_float() && !a.is_float() {
        b
    } else if matches!(a, LumaType::F64) || matches!(b, LumaType::F64) {
        LumaType::F64
    } else if a.is_float() {
        a
    } else {
        b
    }
}
