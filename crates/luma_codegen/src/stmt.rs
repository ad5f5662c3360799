use std::collections::HashMap;

use inkwell::values::BasicValueEnum;

use luma_check::LumaType;
use luma_frontend::ast::{FunctionDecl, Module, Statement, StmtId, VarDecl};

use crate::unit::{LlvmSymbol, SymbolValue};
use crate::{CodegenContext, CodegenResult, LoopTargets};

impl<'ctx> CodegenContext<'ctx> {
    /// Dispatches one statement sitting directly in a module's top-level
    /// body: a function gets its body emitted, a global `VarDecl` becomes a
    /// module-level global, everything else (struct/enum declarations) was
    /// already consumed earlier in the pass.
    pub fn emit_top_level_statement(&mut self, module: &Module, stmt_id: StmtId) -> CodegenResult<()> {
        match module.statements.get(stmt_id).clone() {
            Statement::Function(f) => self.emit_function_body(module, &f),
            Statement::VarDecl(v) => self.emit_global_var(module, &v),
            Statement::Enum(e) => self.emit_enum_constants(&e),
            _ => Ok(()),
        }
    }

    fn emit_enum_constants(&mut self, e: &luma_frontend::ast::EnumDecl) -> CodegenResult<()> {
        let mut next = 0i64;
        for member in &e.members {
            let value = member.value.unwrap_or(next);
            next = value + 1;
            let const_val = self.common.i32.const_int(value as u64, true);
            let key = format!("{}.{}", e.name, member.name);
            self.current_mut().symbols.insert(
                key,
                LlvmSymbol {
                    name: member.name.clone(),
                    value: SymbolValue::Value(BasicValueEnum::IntValue(const_val)),
                    ty: LumaType::I32,
                    element_type: None,
                    is_function: false,
                    is_public: e.is_public,
                },
            );
        }
        Ok(())
    }

    fn emit_global_var(&mut self, module: &Module, v: &VarDecl) -> CodegenResult<()> {
        let ty = v
            .ty
            .map(|t| luma_check::types::resolve_type(module, t, &Default::default(), &Default::default()))
            .unwrap_or(LumaType::I32);
        let llvm_ty = self.basic_type_for(&ty);
        let global = self.current_mut().module.add_global(llvm_ty, None, &v.name);
        if let Some(init) = v.initializer {
            let value = self.compile_expr(module, init)?.value;
            global.set_initializer(&value);
        } else {
            global.set_initializer(&llvm_ty.const_zero());
        }
        self.current_mut().symbols.insert(
            v.name.clone(),
            LlvmSymbol {
                name: v.name.clone(),
                value: SymbolValue::Pointer(global.as_pointer_value()),
                ty,
                element_type: None,
                is_function: false,
                is_public: v.is_public,
            },
        );
        Ok(())
    }

    fn emit_function_body(&mut self, module: &Module, f: &FunctionDecl) -> CodegenResult<()> {
        let Some(function) = self.current().module.get_function(&f.name) else {
            return Ok(());
        };
        if f.body.is_empty() {
            // Declaration only (an external prototype the parser still routed
            // through a function decl) — nothing to emit.
            return Ok(());
        }

        let entry = self.context.append_basic_block(function, "entry");
        self.builder.position_at_end(entry);

        self.variables = HashMap::new();
        self.var_types = HashMap::new();
        self.var_element_types = HashMap::new();
        self.current_function = Some(function);

        let struct_names: HashMap<String, ()> = self.struct_cache.keys().map(|k| (k.clone(), ())).collect();
        for (i, param_name) in f.params.iter().enumerate() {
            let param_ty = luma_check::types::resolve_type(module, f.param_types[i], &struct_names, &HashMap::new());
            let llvm_ty = self.basic_type_for(&param_ty);
            let alloca = self.builder.build_alloca(llvm_ty, param_name).unwrap();
            let param_value = function.get_nth_param(i as u32).expect("param count matches signature");
            self.builder.build_store(alloca, param_value).unwrap();
            self.variables.insert(param_name.clone(), alloca);
            if let LumaType::Pointer(inner) = &param_ty {
                self.var_element_types.insert(param_name.clone(), (**inner).clone());
            }
            self.var_types.insert(param_name.clone(), param_ty);
        }

        self.emit_block(module, &f.body)?;

        if self.builder.get_insert_block().unwrap().get_terminator().is_none() {
            if function.get_type().get_return_type().is_none() {
                self.builder.build_return(None).unwrap();
            } else {
                // Non-void function falling off the end without a return is a
                // checker-level error; emit an unreachable terminator so the
                // IR stays valid.
                self.builder.build_unreachable().unwrap();
            }
        }

        self.current_function = None;
        Ok(())
    }

    fn emit_block(&mut self, module: &Module, stmts: &[StmtId]) -> CodegenResult<()> {
        for &stmt_id in stmts {
            if self.builder.get_insert_block().unwrap().get_terminator().is_some() {
                break;
            }
            self.emit_stmt(module, stmt_id)?;
        }
        Ok(())
    }

    fn emit_stmt(&mut self, module: &Module, stmt_id: StmtId) -> CodegenResult<()> {
        match module.statements.get(stmt_id).clone() {
            Statement::ExprStmt(e, _) => {
                self.compile_expr(module, e)?;
                Ok(())
            }
            Statement::Return(value, _) => {
                match value {
                    Some(v) => {
                        let typed = self.compile_expr(module, v)?;
                        self.builder.build_return(Some(&typed.value)).unwrap();
                    }
                    None => {
                        self.builder.build_return(None).unwrap();
                    }
                }
                Ok(())
            }
            Statement::VarDecl(v) => self.emit_local_var(module, &v),
            Statement::If { cond, then_branch, else_branch, .. } => {
                self.emit_if(module, cond, &then_branch, &else_branch)
            }
            Statement::While { cond, body, .. } => self.emit_while(module, cond, &body),
            Statement::For { binding, iterable, body, .. } => self.emit_for(module, &binding, iterable, &body),
            Statement::Break(_) => {
                let target = self
                    .loop_stack
                    .last()
                    .expect("checker rejects break outside a loop")
                    .break_target;
                self.builder.build_unconditional_branch(target).unwrap();
                Ok(())
            }
            Statement::Continue(_) => {
                let target = self
                    .loop_stack
                    .last()
                    .expect("checker rejects continue outside a loop")
                    .continue_target;
                self.builder.build_unconditional_branch(target).unwrap();
                Ok(())
            }
            Statement::Block(stmts, _) => self.emit_block(module, &stmts),
            Statement::Function(_) | Statement::Struct(_) | Statement::Enum(_) | Statement::FieldDecl(_) => Ok(()),
        }
    }

    fn emit_local_var(&mut self, module: &Module, v: &VarDecl) -> CodegenResult<()> {
        let initial = v.initializer.map(|e| self.compile_expr(module, e)).transpose()?;
        let ty = v
            .ty
            .map(|t| luma_check::types::resolve_type(module, t, &Default::default(), &Default::default()))
            .or_else(|| initial.as_ref().map(|t| t.ty.clone()))
            .unwrap_or(LumaType::I32);
        let llvm_ty = self.basic_type_for(&ty);
        let alloca = self.builder.build_alloca(llvm_ty, &v.name).unwrap();
        if let Some(typed) = &initial {
            self.builder.build_store(alloca, typed.value).unwrap();
            if let LumaType::Pointer(inner) = &typed.ty {
                self.var_element_types.insert(v.name.clone(), (**inner).clone());
            }
        }
        self.variables.insert(v.name.clone(), alloca);
        self.var_types.insert(v.name.clone(), ty);
        Ok(())
    }

    fn emit_if(
        &mut self,
        module: &Module,
        cond: luma_frontend::ast::ExprId,
        then_branch: &[StmtId],
        else_branch: &[StmtId],
    ) -> CodegenResult<()> {
        let function = self.current_function.expect("if only appears inside a function body");
        let cond_val = self.compile_expr(module, cond)?.value.into_int_value();

        let then_bb = self.context.append_basic_block(function, "if.then");
        let else_bb = self.context.append_basic_block(function, "if.else");
        let merge_bb = self.context.append_basic_block(function, "if.merge");

        self.builder.build_conditional_branch(cond_val, then_bb, else_bb).unwrap();

        self.builder.position_at_end(then_bb);
        self.emit_block(module, then_branch)?;
        if self.builder.get_insert_block().unwrap().get_terminator().is_none() {
            self.builder.build_unconditional_branch(merge_bb).unwrap();
        }

        self.builder.position_at_end(else_bb);
        self.emit_block(module, else_branch)?;
        if self.builder.get_insert_block().unwrap().get_terminator().is_none() {
            self.builder.build_unconditional_branch(merge_bb).unwrap();
        }

        self.builder.position_at_end(merge_bb);
        Ok(())
    }

    fn emit_while(&mut self, module: &Module, cond: luma_frontend::ast::ExprId, body: &[StmtId]) -> CodegenResult<()> {
        let function = self.current_function.expect("while only appears inside a function body");
        let cond_bb = self.context.append_basic_block(function, "while.cond");
        let body_bb = self.context.append_basic_block(function, "while.body");
        let end_bb = self.context.append_basic_block(function, "while.end");

        self.builder.build_unconditional_branch(cond_bb).unwrap();
        self.builder.position_at_end(cond_bb);
        let cond_val = self.compile_expr(module, cond)?.value.into_int_value();
        self.builder.build_conditional_branch(cond_val, body_bb, end_bb).unwrap();

        self.builder.position_at_end(body_bb);
        self.loop_stack.push(LoopTargets { break_target: end_bb, continue_target: cond_bb });
        self.emit_block(module, body)?;
        self.loop_stack.pop();
        if self.builder.get_insert_block().unwrap().get_terminator().is_none() {
            self.builder.build_unconditional_branch(cond_bb).unwrap();
        }

        self.builder.position_at_end(end_bb);
        Ok(())
    }

    /// `for x in a..b { }` lowers to an equivalent counted while loop over
    /// the range struct's two fields.
    fn emit_for(
        &mut self,
        module: &Module,
        binding: &str,
        iterable: luma_frontend::ast::ExprId,
        body: &[StmtId],
    ) -> CodegenResult<()> {
        let function = self.current_function.expect("for only appears inside a function body");
        let range = self.compile_expr(module, iterable)?;
        let range_struct = range.value.into_struct_value();
        let start = self
            .builder
            .build_extract_value(range_struct, 0, "range.start")
            .unwrap();
        let end = self.builder.build_extract_value(range_struct, 1, "range.end").unwrap();

        let counter = self.builder.build_alloca(start.get_type(), binding).unwrap();
        self.builder.build_store(counter, start).unwrap();
        self.variables.insert(binding.to_string(), counter);
        // The binding's real width is whatever the range's element type is —
        // not always i32 — so `compile_identifier_load` loads it back correctly.
        self.var_types.insert(binding.to_string(), range.ty.clone());

        let cond_bb = self.context.append_basic_block(function, "for.cond");
        let body_bb = self.context.append_basic_block(function, "for.body");
        let step_bb = self.context.append_basic_block(function, "for.step");
        let end_bb = self.context.append_basic_block(function, "for.end");

        self.builder.build_unconditional_branch(cond_bb).unwrap();
        self.builder.position_at_end(cond_bb);
        let current = self.builder.build_load(counter, "").unwrap();
        let cmp = self
            .builder
            .build_int_compare(inkwell::IntPredicate::SLT, current.into_int_value(), end.into_int_value(), "")
            .unwrap();
        self.builder.build_conditional_branch(cmp, body_bb, end_bb).unwrap();

        self.builder.position_at_end(body_bb);
        self.loop_stack.push(LoopTargets { break_target: end_bb, continue_target: step_bb });
        self.emit_block(module, body)?;
        self.loop_stack.pop();
        if self.builder.get_insert_block().unwrap().get_terminator().is_none() {
            self.builder.build_unconditional_branch(step_bb).unwrap();
        }

        self.builder.position_at_end(step_bb);
        let current = self.builder.build_load(counter, "").unwrap();
        let one = start.get_type().into_int_type().const_int(1, false);
        let next = self.builder.build_int_add(current.into_int_value(), one, "").unwrap();
        self.builder.build_store(counter, next).unwrap();
        self.builder.build_unconditional_branch(cond_bb).unwrap();

        self.builder.position_at_end(end_bb);
        Ok(())
    }
}
