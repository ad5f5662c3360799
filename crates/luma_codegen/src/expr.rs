use inkwell::types::BasicType;
use inkwell::values::{BasicValueEnum, FloatValue, IntValue, PointerValue};
use inkwell::{FloatPredicate, IntPredicate};

use luma_check::LumaType;
use luma_frontend::ast::{
    BinaryOp, ExprId, Expression, LiteralKind, LiteralValue, Module, SizeOfArg, UnaryOp,
};

use crate::unit::SymbolValue;
use crate::{CodegenContext, CodegenError, CodegenResult};

pub struct Typed<'ctx> {
    pub value: BasicValueEnum<'ctx>,
    pub ty: LumaType,
}

impl<'ctx> CodegenContext<'ctx> {
    pub fn compile_expr(&mut self, module: &Module, id: ExprId) -> CodegenResult<Typed<'ctx>> {
        let expr = module.expressions.get(id).clone();
        match expr {
            Expression::Literal { kind, value, .. } => self.compile_literal(kind, value),
            Expression::Identifier { name, .. } => self.compile_identifier_load(&name),
            Expression::Binary { op, left, right, .. } => self.compile_binary(module, op, left, right),
            Expression::Unary { op, operand, .. } => self.compile_unary(module, op, operand),
            Expression::Call { callee, args, .. } => self.compile_call(module, callee, &args),
            Expression::Member {
                object,
                member,
                is_compiletime,
                span,
            } => {
                if is_compiletime {
                    self.compile_compiletime_member(module, object, &member)
                } else {
                    let (ptr, ty) = self.compile_member_address(module, object, &member)?;
                    let _ = span;
                    self.load_typed(ptr, ty)
                }
            }
            Expression::Index { object, index, .. } => {
                let (ptr, elem_ty) = self.compile_index_address(module, object, index)?;
                self.load_typed(ptr, elem_ty)
            }
            Expression::Assignment { target, value, .. } => self.compile_assignment(module, target, value),
            Expression::Cast { ty, castee, .. } => self.compile_cast(module, ty, castee),
            Expression::Deref { operand, .. } => {
                let ptr_val = self.compile_expr(module, operand)?;
                let pointee = ptr_val
                    .ty
                    .pointee()
                    .cloned()
                    .ok_or_else(|| CodegenError::UnknownPointerElementType("deref".to_string()))?;
                self.load_typed(ptr_val.value.into_pointer_value(), pointee)
            }
            Expression::Addr { operand, .. } => self.compile_address_of(module, operand),
            Expression::Array {
                elements,
                target_size,
                ..
            } => self.compile_array_literal(module, &elements, target_size),
            Expression::SizeOf { object, .. } => self.compile_sizeof(module, object),
            Expression::Alloc { size, .. } => self.compile_alloc(module, size),
            Expression::Free { ptr, .. } => self.compile_free(module, ptr),
            Expression::Input { ty, msg, .. } => self.compile_input(module, ty, msg),
            Expression::System { command, .. } => self.compile_system(module, command),
            Expression::Syscall { args, .. } => self.compile_syscall(module, &args),
        }
    }

    fn compile_literal(&mut self, kind: LiteralKind, value: LiteralValue) -> CodegenResult<Typed<'ctx>> {
        Ok(match (kind, value) {
            (LiteralKind::Int, LiteralValue::Int(v)) => Typed {
                value: self.common.i32.const_int(v as u64, true).into(),
                ty: LumaType::I32,
            },
            (LiteralKind::Float, LiteralValue::Float(v)) => Typed {
                value: self.common.f64.const_float(v).into(),
                ty: LumaType::F64,
            },
            (LiteralKind::Bool, LiteralValue::Bool(v)) => Typed {
                value: self.common.i1.const_int(v as u64, false).into(),
                ty: LumaType::Bool,
            },
            (LiteralKind::Char, LiteralValue::Char(v)) => Typed {
                value: self.common.i8.const_int(v as u64, false).into(),
                ty: LumaType::Char,
            },
            (LiteralKind::Null, _) => Typed {
                value: self.common.i8_ptr.const_null().into(),
                ty: LumaType::Pointer(Box::new(LumaType::Void)),
            },
            (LiteralKind::String, LiteralValue::String(s)) => {
                let global = self.const_interned_string(&s);
                Typed {
                    value: global.into(),
                    ty: LumaType::Pointer(Box::new(LumaType::I8)),
                }
            }
            _ => unreachable!("literal kind and value must agree"),
        })
    }

    /// Escapes were already expanded by the lexer; this just interns the
    /// string as a private, constant, unnamed-addr global and returns its
    /// address as `i8*`.
    fn const_interned_string(&mut self, raw: &str) -> PointerValue<'ctx> {
        let name = format!("str.{}", self.current().module.get_globals().count());
        self.builder
            .build_global_string_ptr(raw, &name)
            .unwrap()
            .as_pointer_value()
    }

    fn compile_identifier_load(&mut self, name: &str) -> CodegenResult<Typed<'ctx>> {
        if let Some(&ptr) = self.variables.get(name) {
            let ty = self.var_types.get(name).cloned().unwrap_or(LumaType::Unknown);
            return self.load_typed(ptr, ty);
        }
        let symbol = self.resolve_cross_module_symbol(name)?;
        match symbol.value {
            SymbolValue::Function(f) => Ok(Typed {
                value: f.as_global_value().as_pointer_value().into(),
                ty: symbol.ty,
            }),
            SymbolValue::Pointer(p) => self.load_typed(p, symbol.ty),
            SymbolValue::Value(v) => Ok(Typed { value: v, ty: symbol.ty }),
        }
    }

    fn load_typed(&mut self, ptr: PointerValue<'ctx>, ty: LumaType) -> CodegenResult<Typed<'ctx>> {
        if matches!(ty, LumaType::Array(_, _)) {
            // Arrays decay to their element pointer rather than loading a value.
            return Ok(Typed { value: ptr.into(), ty });
        }
        let llvm_ty = self.basic_type_for(&ty);
        let loaded = self.builder.build_load(ptr, "").unwrap();
        Ok(Typed { value: loaded, ty })
    }

    // ---- binary operators ----

    fn compile_binary(
        &mut self,
        module: &Module,
        op: BinaryOp,
        left: ExprId,
        right: ExprId,
    ) -> CodegenResult<Typed<'ctx>> {
        if op == BinaryOp::Range {
            return self.compile_range(module, left, right);
        }
        let lhs = self.compile_expr(module, left)?;
        let rhs = self.compile_expr(module, right)?;

        match op {
            BinaryOp::And | BinaryOp::Or => self.compile_logical(op, lhs, rhs),
            BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor | BinaryOp::Shl | BinaryOp::Shr => {
                self.compile_bitwise(op, lhs, rhs)
            }
            BinaryOp::Eq | BinaryOp::NotEq | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                self.compile_comparison(op, lhs, rhs)
            }
            _ => self.compile_arithmetic(op, lhs, rhs),
        }
    }

    /// Promotes a mismatched int/float pair per the promotion rule: two ints
    /// promote to the wider int, anything touching a float promotes both
    /// sides to f64 unless both are f32.
    fn promote(&mut self, lhs: Typed<'ctx>, rhs: Typed<'ctx>) -> (FloatOrInt<'ctx>, FloatOrInt<'ctx>, LumaType) {
        if !lhs.ty.is_float() && !rhs.ty.is_float() {
            let ty = widest_int(&lhs.ty, &rhs.ty);
            return (
                FloatOrInt::Int(lhs.value.into_int_value()),
                FloatOrInt::Int(rhs.value.into_int_value()),
                ty,
            );
        }
        let target = if matches!(lhs.ty, LumaType::F64) || matches!(rhs.ty, LumaType::F64) {
            LumaType::F64
        } else {
            LumaType::F32
        };
        let lv = self.to_float(lhs, &target);
        let rv = self.to_float(rhs, &target);
        (FloatOrInt::Float(lv), FloatOrInt::Float(rv), target)
    }

    fn to_float(&mut self, t: Typed<'ctx>, target: &LumaType) -> FloatValue<'ctx> {
        let target_llvm = self.float_llvm_type(target);
        if t.ty.is_float() {
            let fv = t.value.into_float_value();
            if matches!(t.ty, LumaType::F64) == matches!(target, LumaType::F64) {
                fv
            } else if matches!(target, LumaType::F64) {
                self.builder.build_float_ext(fv, target_llvm, "").unwrap()
            } else {
                self.builder.build_float_trunc(fv, target_llvm, "").unwrap()
            }
        } else {
            self.builder
                .build_signed_int_to_float(t.value.into_int_value(), target_llvm, "")
                .unwrap()
        }
    }

    fn compile_arithmetic(&mut self, op: BinaryOp, lhs: Typed<'ctx>, rhs: Typed<'ctx>) -> CodegenResult<Typed<'ctx>> {
        let (l, r, ty) = self.promote(lhs, rhs);
        let value = match (l, r) {
            (FloatOrInt::Int(a), FloatOrInt::Int(b)) => match op {
                BinaryOp::Add => self.builder.build_int_add(a, b, "").unwrap().into(),
                BinaryOp::Sub => self.builder.build_int_sub(a, b, "").unwrap().into(),
                BinaryOp::Mul => self.builder.build_int_mul(a, b, "").unwrap().into(),
                BinaryOp::Div => self.builder.build_int_signed_div(a, b, "").unwrap().into(),
                BinaryOp::Rem => self.builder.build_int_signed_rem(a, b, "").unwrap().into(),
                _ => unreachable!(),
            },
            (FloatOrInt::Float(a), FloatOrInt::Float(b)) => match op {
                BinaryOp::Add => self.builder.build_float_add(a, b, "").unwrap().into(),
                BinaryOp::Sub => self.builder.build_float_sub(a, b, "").unwrap().into(),
                BinaryOp::Mul => self.builder.build_float_mul(a, b, "").unwrap().into(),
                BinaryOp::Div => self.builder.build_float_div(a, b, "").unwrap().into(),
                BinaryOp::Rem => self.compile_float_mod(a, b, &ty).into(),
                _ => unreachable!(),
            },
            _ => unreachable!("promote() always returns a matched pair"),
        };
        Ok(Typed { value, ty })
    }

    /// `a % b` for floats lowers to `a - b*floor(a/b)` via the llvm.floor
    /// intrinsic, since LLVM has no native float-rem-to-zero op we can rely on
    /// here matching the language's modulo semantics.
    fn compile_float_mod(&mut self, a: FloatValue<'ctx>, b: FloatValue<'ctx>, ty: &LumaType) -> FloatValue<'ctx> {
        let is_f64 = matches!(ty, LumaType::F64);
        let floor_name = if is_f64 { "llvm.floor.f64" } else { "llvm.floor.f32" };
        let llvm_ty = if is_f64 { self.common.f64 } else { self.common.f32 };
        let floor_fn = self.current().module.get_function(floor_name).unwrap_or_else(|| {
            let fn_type = llvm_ty.fn_type(&[llvm_ty.into()], false);
            self.current_mut().module.add_function(floor_name, fn_type, None)
        });
        let div = self.builder.build_float_div(a, b, "").unwrap();
        let floored = self
            .builder
            .build_call(floor_fn, &[div.into()], "")
            .unwrap()
            .try_as_basic_value()
            .basic()
            .unwrap()
            .into_float_value();
        let scaled = self.builder.build_float_mul(b, floored, "").unwrap();
        self.builder.build_float_sub(a, scaled, "").unwrap()
    }

    fn compile_comparison(&mut self, op: BinaryOp, lhs: Typed<'ctx>, rhs: Typed<'ctx>) -> CodegenResult<Typed<'ctx>> {
        let (l, r, _) = self.promote(lhs, rhs);
        let value = match (l, r) {
            (FloatOrInt::Int(a), FloatOrInt::Int(b)) => {
                let pred = match op {
                    BinaryOp::Eq => IntPredicate::EQ,
                    BinaryOp::NotEq => IntPredicate::NE,
                    BinaryOp::Lt => IntPredicate::SLT,
                    BinaryOp::Le => IntPredicate::SLE,
                    BinaryOp::Gt => IntPredicate::SGT,
                    BinaryOp::Ge => IntPredicate::SGE,
                    _ => unreachable!(),
                };
                self.builder.build_int_compare(pred, a, b, "").unwrap().into()
            }
            (FloatOrInt::Float(a), FloatOrInt::Float(b)) => {
                let pred = match op {
                    BinaryOp::Eq => FloatPredicate::OEQ,
                    BinaryOp::NotEq => FloatPredicate::ONE,
                    BinaryOp::Lt => FloatPredicate::OLT,
                    BinaryOp::Le => FloatPredicate::OLE,
                    BinaryOp::Gt => FloatPredicate::OGT,
                    BinaryOp::Ge => FloatPredicate::OGE,
                    _ => unreachable!(),
                };
                self.builder.build_float_compare(pred, a, b, "").unwrap().into()
            }
            _ => unreachable!(),
        };
        Ok(Typed { value, ty: LumaType::Bool })
    }

    fn compile_logical(&mut self, op: BinaryOp, lhs: Typed<'ctx>, rhs: Typed<'ctx>) -> CodegenResult<Typed<'ctx>> {
        if lhs.ty.is_float() || rhs.ty.is_float() {
            return Err(CodegenError::LogicalOnFloat);
        }
        let a = lhs.value.into_int_value();
        let b = rhs.value.into_int_value();
        let value = match op {
            BinaryOp::And => self.builder.build_and(a, b, "").unwrap(),
            BinaryOp::Or => self.builder.build_or(a, b, "").unwrap(),
            _ => unreachable!(),
        };
        Ok(Typed { value: value.into(), ty: LumaType::Bool })
    }

    fn compile_bitwise(&mut self, op: BinaryOp, lhs: Typed<'ctx>, rhs: Typed<'ctx>) -> CodegenResult<Typed<'ctx>> {
        let a = lhs.value.into_int_value();
        let b = rhs.value.into_int_value();
        let value: IntValue = match op {
            BinaryOp::BitAnd => self.builder.build_and(a, b, "").unwrap(),
            BinaryOp::BitOr => self.builder.build_or(a, b, "").unwrap(),
            BinaryOp::BitXor => self.builder.build_xor(a, b, "").unwrap(),
            BinaryOp::Shl => self.builder.build_left_shift(a, b, "").unwrap(),
            BinaryOp::Shr => self.builder.build_right_shift(a, b, true, "").unwrap(),
            _ => unreachable!(),
        };
        Ok(Typed { value: value.into(), ty: lhs.ty })
    }

    fn compile_range(&mut self, module: &Module, left: ExprId, right: ExprId) -> CodegenResult<Typed<'ctx>> {
        let lhs = self.compile_expr(module, left)?;
        let rhs = self.compile_expr(module, right)?;
        let elem_ty = lhs.ty.clone();
        let llvm_elem = self.basic_type_for(&elem_ty);
        let range_ty = self.context.struct_type(&[llvm_elem, llvm_elem], false);
        let alloca = self.builder.build_alloca(range_ty, "range").unwrap();
        let start_ptr = self.builder.build_struct_gep(alloca, 0, "").unwrap();
        let end_ptr = self.builder.build_struct_gep(alloca, 1, "").unwrap();
        self.builder.build_store(start_ptr, lhs.value).unwrap();
        self.builder.build_store(end_ptr, rhs.value).unwrap();
        let loaded = self.builder.build_load(alloca, "").unwrap();
        // `ty` carries the range's *element* type, not a wrapper struct type —
        // `emit_for` needs it to alloca the loop binding at the right width.
        Ok(Typed { value: loaded, ty: elem_ty })
    }

    // ---- unary operators ----

    fn compile_unary(&mut self, module: &Module, op: UnaryOp, operand: ExprId) -> CodegenResult<Typed<'ctx>> {
        match op {
            UnaryOp::Neg => {
                let v = self.compile_expr(module, operand)?;
                let value = if v.ty.is_float() {
                    self.builder.build_float_neg(v.value.into_float_value(), "").unwrap().into()
                } else {
                    self.builder.build_int_neg(v.value.into_int_value(), "").unwrap().into()
                };
                Ok(Typed { value, ty: v.ty })
            }
            UnaryOp::Not => {
                let v = self.compile_expr(module, operand)?;
                let value = self.builder.build_not(v.value.into_int_value(), "").unwrap();
                Ok(Typed { value: value.into(), ty: LumaType::Bool })
            }
            UnaryOp::BitNot => {
                let v = self.compile_expr(module, operand)?;
                let value = self.builder.build_not(v.value.into_int_value(), "").unwrap();
                Ok(Typed { value: value.into(), ty: v.ty })
            }
            UnaryOp::PreInc | UnaryOp::PreDec | UnaryOp::PostInc | UnaryOp::PostDec => {
                self.compile_inc_dec(module, op, operand)
            }
        }
    }

    fn compile_inc_dec(&mut self, module: &Module, op: UnaryOp, operand: ExprId) -> CodegenResult<Typed<'ctx>> {
        let name = match module.expressions.get(operand).clone() {
            Expression::Identifier { name, .. } => name,
            _ => {
                return Err(CodegenError::UnknownPointerElementType(
                    "++/-- target must be an identifier".to_string(),
                ))
            }
        };
        let ptr = *self
            .variables
            .get(&name)
            .ok_or_else(|| CodegenError::UnknownSymbol(name.clone(), self.current().module_name.clone()))?;
        let ty = self.var_types.get(&name).cloned().unwrap_or(LumaType::I32);
        let original = self.load_typed(ptr, ty.clone())?;
        let updated_value: BasicValueEnum = if ty.is_float() {
            let one = self.common.f64.const_float(1.0);
            let v = original.value.into_float_value();
            if matches!(op, UnaryOp::PreInc | UnaryOp::PostInc) {
                self.builder.build_float_add(v, one, "").unwrap().into()
            } else {
                self.builder.build_float_sub(v, one, "").unwrap().into()
            }
        } else {
            let one = self.common.i32.const_int(1, false);
            let v = original.value.into_int_value();
            if matches!(op, UnaryOp::PreInc | UnaryOp::PostInc) {
                self.builder.build_int_add(v, one, "").unwrap().into()
            } else {
                self.builder.build_int_sub(v, one, "").unwrap().into()
            }
        };
        self.builder.build_store(ptr, updated_value).unwrap();
        let result = if matches!(op, UnaryOp::PreInc | UnaryOp::PreDec) {
            updated_value
        } else {
            original.value
        };
        Ok(Typed { value: result, ty })
    }

    // ---- calls ----

    fn compile_call(&mut self, module: &Module, callee: ExprId, args: &[ExprId]) -> CodegenResult<Typed<'ctx>> {
        let mut arg_values = Vec::with_capacity(args.len());
        for a in args {
            arg_values.push(self.compile_expr(module, *a)?.value);
        }

        let callee_expr = module.expressions.get(callee).clone();
        let function = match callee_expr {
            Expression::Identifier { name, .. } => match self.resolve_cross_module_symbol(&name)?.value {
                SymbolValue::Function(f) => f,
                _ => return Err(CodegenError::UnknownSymbol(name, self.current().module_name.clone())),
            },
            Expression::Member {
                object,
                member,
                is_compiletime,
                ..
            } => {
                if is_compiletime {
                    let alias = match module.expressions.get(object).clone() {
                        Expression::Identifier { name, .. } => name,
                        _ => return Err(CodegenError::UnknownSymbol(member, self.current().module_name.clone())),
                    };
                    self.resolve_qualified_function(&alias, &member)?
                } else {
                    // `obj.method(args)` — the typechecker has already
                    // prepended `&obj` to `args`, so the call site here just
                    // needs the method's declaration.
                    match self.resolve_cross_module_symbol(&member)?.value {
                        SymbolValue::Function(f) => f,
                        _ => return Err(CodegenError::UnknownSymbol(member, self.current().module_name.clone())),
                    }
                }
            }
            _ => {
                return Err(CodegenError::UnknownSymbol(
                    "<indirect call target>".to_string(),
                    self.current().module_name.clone(),
                ))
            }
        };

        let return_type = function_return_type(function);
        match self.build_call(function, &arg_values) {
            Some(v) => Ok(Typed { value: v, ty: return_type }),
            None => Ok(Typed { value: self.common.const_i32_0.into(), ty: LumaType::Void }),
        }
    }

    fn resolve_qualified_function(
        &mut self,
        module_name: &str,
        name: &str,
    ) -> CodegenResult<inkwell::values::FunctionValue<'ctx>> {
        if let Some(sym) = self
            .symbol_cache
            .get(&(module_name.to_string(), name.to_string()))
            .cloned()
        {
            if let SymbolValue::Function(f) = sym.value {
                return Ok(f);
            }
        }
        match self.resolve_cross_module_symbol(name)?.value {
            SymbolValue::Function(f) => Ok(f),
            _ => Err(CodegenError::UnknownSymbol(name.to_string(), module_name.to_string())),
        }
    }

    // ---- member / index address resolution ----

    pub fn compile_member_address(
        &mut self,
        module: &Module,
        object: ExprId,
        member: &str,
    ) -> CodegenResult<(PointerValue<'ctx>, LumaType)> {
        match module.expressions.get(object).clone() {
            Expression::Identifier { name, .. } => {
                let ptr = *self
                    .variables
                    .get(&name)
                    .ok_or_else(|| CodegenError::UnknownSymbol(name.clone(), self.current().module_name.clone()))?;
                match self.var_types.get(&name).cloned().unwrap_or(LumaType::Unknown) {
                    LumaType::Struct(s) => self.struct_field_gep(ptr, &s, member, None),
                    LumaType::Pointer(inner) => match *inner {
                        LumaType::Struct(s) => {
                            let ptr_llvm_ty =
                                self.basic_type_for(&LumaType::Pointer(Box::new(LumaType::Struct(s.clone()))));
                            let loaded = self.builder.build_load(ptr, "").unwrap();
                            self.struct_field_gep(loaded.into_pointer_value(), &s, member, None)
                        }
                        _ => Err(CodegenError::UnknownPointerElementType(name)),
                    },
                    _ => Err(CodegenError::UnknownPointerElementType(name)),
                }
            }
            Expression::Member { object: inner_obj, member: inner_member, .. } => {
                let (base_ptr, base_ty) = self.compile_member_address(module, inner_obj, &inner_member)?;
                match base_ty {
                    LumaType::Struct(s) => self.struct_field_gep(base_ptr, &s, member, None),
                    LumaType::Pointer(inner) => match *inner {
                        LumaType::Struct(s) => {
                            let ptr_llvm_ty =
                                self.basic_type_for(&LumaType::Pointer(Box::new(LumaType::Struct(s.clone()))));
                            let loaded = self.builder.build_load(base_ptr, "").unwrap();
                            self.struct_field_gep(loaded.into_pointer_value(), &s, member, None)
                        }
                        other => Err(CodegenError::NotAStruct(format!("{other:?}"), member.to_string())),
                    },
                    other => Err(CodegenError::NotAStruct(format!("{other:?}"), member.to_string())),
                }
            }
            Expression::Deref { operand, .. } => {
                let ptr_val = self.compile_expr(module, operand)?;
                let struct_name = match ptr_val.ty.pointee() {
                    Some(LumaType::Struct(s)) => s.clone(),
                    _ => self
                        .field_owner_cache
                        .owner_of(member)
                        .map(str::to_string)
                        .ok_or_else(|| CodegenError::UnknownField("<deref>".to_string(), member.to_string()))?,
                };
                self.struct_field_gep(ptr_val.value.into_pointer_value(), &struct_name, member, None)
            }
            Expression::Index { .. } | Expression::Call { .. } => {
                let value = self.compile_expr(module, object)?;
                let struct_name = match &value.ty {
                    LumaType::Struct(s) => s.clone(),
                    _ => self
                        .field_owner_cache
                        .owner_of(member)
                        .map(str::to_string)
                        .ok_or_else(|| CodegenError::UnknownField("<expr>".to_string(), member.to_string()))?,
                };
                let alloca = self.builder.build_alloca(self.basic_type_for(&value.ty), "").unwrap();
                self.builder.build_store(alloca, value.value).unwrap();
                self.struct_field_gep(alloca, &struct_name, member, None)
            }
            _ => Err(CodegenError::UnknownField("<expr>".to_string(), member.to_string())),
        }
    }

    pub fn compile_index_address(
        &mut self,
        module: &Module,
        object: ExprId,
        index: ExprId,
    ) -> CodegenResult<(PointerValue<'ctx>, LumaType)> {
        let index_val = self.compile_expr(module, index)?.value.into_int_value();
        let (base_ptr, elem_ty) = self.pointer_element_type(module, object)?;
        let llvm_elem = self.basic_type_for(&elem_ty);
        let gep = unsafe { self.builder.build_gep(base_ptr, &[index_val], "") }.unwrap();
        Ok((gep, elem_ty))
    }

    /// Implements the pointer-element-type inference protocol: an
    /// identifier's recorded `element_type` wins; a cast to a pointer names
    /// its own pointee; a nested member access recurses through struct field
    /// metadata. No variable-name-substring heuristic is implemented — when
    /// none of these apply, generation fails rather than silently guessing
    /// `i8`.
    fn pointer_element_type(&mut self, module: &Module, object: ExprId) -> CodegenResult<(PointerValue<'ctx>, LumaType)> {
        match module.expressions.get(object).clone() {
            Expression::Identifier { name, .. } => {
                let ptr = *self
                    .variables
                    .get(&name)
                    .ok_or_else(|| CodegenError::UnknownSymbol(name.clone(), self.current().module_name.clone()))?;
                let base_ty = self.var_types.get(&name).cloned().unwrap_or(LumaType::Unknown);
                if let LumaType::Array(elem, _) = base_ty {
                    return Ok((ptr, *elem));
                }
                let elem = self
                    .var_element_types
                    .get(&name)
                    .cloned()
                    .ok_or_else(|| CodegenError::UnknownPointerElementType(name.clone()))?;
                let loaded = self.builder.build_load(ptr, "").unwrap();
                Ok((loaded.into_pointer_value(), elem))
            }
            Expression::Cast { ty, castee, .. } => {
                let target = luma_check::types::resolve_type(module, ty, &Default::default(), &Default::default());
                let pointee = match target {
                    LumaType::Pointer(p) => *p,
                    other => other,
                };
                let v = self.compile_expr(module, castee)?;
                Ok((v.value.into_pointer_value(), pointee))
            }
            Expression::Member { object: inner_obj, member, .. } => {
                let (ptr, ty) = self.compile_member_address(module, inner_obj, &member)?;
                match ty {
                    LumaType::Array(elem, _) => Ok((ptr, *elem)),
                    LumaType::Pointer(elem) => {
                        let loaded = self.builder.build_load(ptr, "").unwrap();
                        Ok((loaded.into_pointer_value(), *elem))
                    }
                    other => Err(CodegenError::UnknownPointerElementType(format!("{other:?}"))),
                }
            }
            _ => Err(CodegenError::UnknownPointerElementType("<expr>".to_string())),
        }
    }

    fn compile_address_of(&mut self, module: &Module, operand: ExprId) -> CodegenResult<Typed<'ctx>> {
        match module.expressions.get(operand).clone() {
            Expression::Identifier { name, .. } => {
                let ptr = *self
                    .variables
                    .get(&name)
                    .ok_or_else(|| CodegenError::UnknownSymbol(name.clone(), self.current().module_name.clone()))?;
                let ty = self.var_types.get(&name).cloned().unwrap_or(LumaType::Unknown);
                Ok(Typed { value: ptr.into(), ty: LumaType::Pointer(Box::new(ty)) })
            }
            Expression::Index { object, index, .. } => {
                let (ptr, ty) = self.compile_index_address(module, object, index)?;
                Ok(Typed { value: ptr.into(), ty: LumaType::Pointer(Box::new(ty)) })
            }
            Expression::Member { object, member, .. } => {
                let (ptr, ty) = self.compile_member_address(module, object, &member)?;
                Ok(Typed { value: ptr.into(), ty: LumaType::Pointer(Box::new(ty)) })
            }
            _ => {
                let v = self.compile_expr(module, operand)?;
                let alloca = self.builder.build_alloca(self.basic_type_for(&v.ty), "").unwrap();
                self.builder.build_store(alloca, v.value).unwrap();
                Ok(Typed { value: alloca.into(), ty: LumaType::Pointer(Box::new(v.ty)) })
            }
        }
    }

    // ---- assignment ----

    fn compile_assignment(&mut self, module: &Module, target: ExprId, value: ExprId) -> CodegenResult<Typed<'ctx>> {
        let rhs = self.compile_expr(module, value)?;
        match module.expressions.get(target).clone() {
            Expression::Identifier { name, .. } => {
                let ptr = *self
                    .variables
                    .get(&name)
                    .ok_or_else(|| CodegenError::UnknownSymbol(name.clone(), self.current().module_name.clone()))?;
                self.builder.build_store(ptr, rhs.value).unwrap();
                if let Expression::Cast { ty, .. } = module.expressions.get(value) {
                    if let LumaType::Pointer(p) =
                        luma_check::types::resolve_type(module, *ty, &Default::default(), &Default::default())
                    {
                        self.var_element_types.insert(name.clone(), *p);
                    }
                }
                self.var_types.insert(name, rhs.ty.clone());
            }
            Expression::Deref { operand, .. } => {
                let ptr_val = self.compile_expr(module, operand)?;
                self.builder.build_store(ptr_val.value.into_pointer_value(), rhs.value).unwrap();
            }
            Expression::Index { object, index, .. } => {
                let (ptr, _) = self.compile_index_address(module, object, index)?;
                self.builder.build_store(ptr, rhs.value).unwrap();
            }
            Expression::Member { object, member, .. } => {
                let (ptr, _) = self.compile_member_address(module, object, &member)?;
                self.builder.build_store(ptr, rhs.value).unwrap();
            }
            _ => return Err(CodegenError::UnknownPointerElementType("assignment target".to_string())),
        }
        Ok(rhs)
    }

    // ---- casts ----

    fn compile_cast(
        &mut self,
        module: &Module,
        ty: luma_frontend::ast::TypeId,
        castee: ExprId,
    ) -> CodegenResult<Typed<'ctx>> {
        let target = luma_check::types::resolve_type(module, ty, &Default::default(), &Default::default());
        let source = self.compile_expr(module, castee)?;
        let value = self.build_cast(source.value, &source.ty, &target);
        Ok(Typed { value, ty: target })
    }

    fn build_cast(&mut self, value: BasicValueEnum<'ctx>, from: &LumaType, to: &LumaType) -> BasicValueEnum<'ctx> {
        match (from, to) {
            (f, t) if f.is_float() && t.is_integer() => self
                .builder
                .build_float_to_signed_int(value.into_float_value(), self.int_llvm_type(t), "")
                .unwrap()
                .into(),
            (f, t) if f.is_integer() && t.is_float() => self
                .builder
                .build_signed_int_to_float(value.into_int_value(), self.float_llvm_type(t), "")
                .unwrap()
                .into(),
            (f, t) if f.is_integer() && t.is_integer() => {
                let from_bits = int_bits(f);
                let to_bits = int_bits(t);
                let to_llvm = self.int_llvm_type(t);
                match to_bits.cmp(&from_bits) {
                    std::cmp::Ordering::Equal => value,
                    std::cmp::Ordering::Greater => {
                        self.builder.build_int_s_extend(value.into_int_value(), to_llvm, "").unwrap().into()
                    }
                    std::cmp::Ordering::Less => {
                        self.builder.build_int_truncate(value.into_int_value(), to_llvm, "").unwrap().into()
                    }
                }
            }
            (f, t) if f.is_float() && t.is_float() => {
                let to_llvm = self.float_llvm_type(t);
                if matches!(t, LumaType::F64) {
                    self.builder.build_float_ext(value.into_float_value(), to_llvm, "").unwrap().into()
                } else {
                    self.builder.build_float_trunc(value.into_float_value(), to_llvm, "").unwrap().into()
                }
            }
            (LumaType::Pointer(_), LumaType::Pointer(inner)) => self
                .builder
                .build_pointer_cast(
                    value.into_pointer_value(),
                    self.basic_type_for(inner).ptr_type(inkwell::AddressSpace::default()),
                    "",
                )
                .unwrap()
                .into(),
            (f, LumaType::Pointer(_)) if f.is_integer() => self
                .builder
                .build_int_to_ptr(value.into_int_value(), self.common.i8_ptr, "")
                .unwrap()
                .into(),
            (LumaType::Pointer(_), t) if t.is_integer() => self
                .builder
                .build_ptr_to_int(value.into_pointer_value(), self.int_llvm_type(t), "")
                .unwrap()
                .into(),
            _ => value,
        }
    }

    fn int_llvm_type(&self, ty: &LumaType) -> inkwell::types::IntType<'ctx> {
        self.common.int_type(int_bits(ty))
    }

    fn float_llvm_type(&self, ty: &LumaType) -> inkwell::types::FloatType<'ctx> {
        if matches!(ty, LumaType::F64) { self.common.f64 } else { self.common.f32 }
    }

    // ---- compile-time member access ----

    fn compile_compiletime_member(&mut self, module: &Module, object: ExprId, member: &str) -> CodegenResult<Typed<'ctx>> {
        match module.expressions.get(object).clone() {
            Expression::Member { member: type_name, .. } => {
                let value = self.resolve_enum_constant(&type_name, member)?;
                Ok(Typed { value: self.common.i32.const_int(value as u64, true).into(), ty: LumaType::I32 })
            }
            Expression::Identifier { name, .. } => self.resolve_qualified_value(&name, member),
            _ => Err(CodegenError::UnknownSymbol(member.to_string(), self.current().module_name.clone())),
        }
    }

    fn resolve_qualified_value(&mut self, alias: &str, name: &str) -> CodegenResult<Typed<'ctx>> {
        if let Ok(v) = self.resolve_enum_constant(alias, name) {
            return Ok(Typed { value: self.common.i32.const_int(v as u64, true).into(), ty: LumaType::I32 });
        }
        let sym = self.resolve_qualified_function(alias, name)?;
        Ok(Typed {
            value: sym.as_global_value().as_pointer_value().into(),
            ty: LumaType::Pointer(Box::new(LumaType::Void)),
        })
    }

    // ---- array literals ----

    fn compile_array_literal(
        &mut self,
        module: &Module,
        elements: &[ExprId],
        target_size: Option<usize>,
    ) -> CodegenResult<Typed<'ctx>> {
        let mut values = Vec::with_capacity(elements.len());
        for e in elements {
            values.push(self.compile_expr(module, *e)?);
        }
        let elem_ty = values.first().map(|t| t.ty.clone()).unwrap_or(LumaType::I32);
        let total_len = target_size.unwrap_or(values.len());
        let llvm_elem = self.basic_type_for(&elem_ty);
        let array_ty = llvm_elem.array_type(total_len as u32);
        let alloca = self.builder.build_alloca(array_ty, "").unwrap();
        let written = values.len();
        for (i, v) in values.into_iter().enumerate() {
            let idx = self.common.i64.const_int(i as u64, false);
            let gep = unsafe { self.builder.build_gep(alloca, &[idx], "") }.unwrap();
            self.builder.build_store(gep, v.value).unwrap();
        }
        // `alloca` is uninitialized stack storage, not zeroed memory — pad
        // the slots beyond the literal's own elements explicitly.
        let zero = llvm_elem.const_zero();
        for i in written..total_len {
            let idx = self.common.i64.const_int(i as u64, false);
            let gep = unsafe { self.builder.build_gep(alloca, &[idx], "") }.unwrap();
            self.builder.build_store(gep, zero).unwrap();
        }
        Ok(Typed { value: alloca.into(), ty: LumaType::Array(Box::new(elem_ty), Some(total_len)) })
    }

    // ---- sizeof ----

    fn compile_sizeof(&mut self, module: &Module, arg: SizeOfArg) -> CodegenResult<Typed<'ctx>> {
        let ty = match arg {
            SizeOfArg::Type(t) => luma_check::types::resolve_type(module, t, &Default::default(), &Default::default()),
            SizeOfArg::Expr(e) => self.compile_expr(module, e)?.ty,
        };
        let struct_cache = self.struct_cache.clone();
        let size = crate::types::sizeof(&ty, &|name| struct_cache.get(name).map(|info| info.field_types.clone()));
        Ok(Typed { value: self.common.i64.const_int(size, false).into(), ty: LumaType::I64 })
    }
}

enum FloatOrInt<'ctx> {
    Float(FloatValue<'ctx>),
    Int(IntValue<'ctx>),
}

fn widest_int(a: &LumaType, b: &LumaType) -> LumaType {
    if int_bits(a) >= int_bits(b) { a.clone() } else { b.clone() }
}

fn int_bits(ty: &LumaType) -> u32 {
    match ty {
        LumaType::I1 | LumaType::Bool => 1,
        LumaType::I8 | LumaType::Char => 8,
        LumaType::I16 => 16,
        LumaType::I32 => 32,
        LumaType::I64 => 64,
        _ => 32,
    }
}

fn function_return_type(f: inkwell::values::FunctionValue) -> LumaType {
    match f.get_type().get_return_type() {
        None => LumaType::Void,
        Some(inkwell::types::BasicTypeEnum::IntType(i)) => match i.get_bit_width() {
            1 => LumaType::Bool,
            8 => LumaType::I8,
            16 => LumaType::I16,
            32 => LumaType::I32,
            _ => LumaType::I64,
        },
        Some(inkwell::types::BasicTypeEnum::FloatType(_)) => LumaType::F64,
        Some(inkwell::types::BasicTypeEnum::PointerType(_)) => LumaType::Pointer(Box::new(LumaType::I8)),
        Some(inkwell::types::BasicTypeEnum::StructType(s)) => {
            LumaType::Struct(s.get_name().and_then(|n| n.to_str().ok()).unwrap_or("").to_string())
        }
        Some(_) => LumaType::Unknown,
    }
}
