use inkwell::module::Linkage;
use inkwell::values::{BasicValueEnum, FunctionValue};

use luma_check::LumaType;
use luma_frontend::ast::{ExprId, Module, TypeId};

use crate::expr::Typed;
use crate::{CodegenContext, CodegenResult};

impl<'ctx> CodegenContext<'ctx> {
    fn declare_libc_fn(&mut self, name: &str, fn_type: inkwell::types::FunctionType<'ctx>) -> FunctionValue<'ctx> {
        self.current()
            .module
            .get_function(name)
            .unwrap_or_else(|| self.current_mut().module.add_function(name, fn_type, Some(Linkage::External)))
    }

    pub fn compile_alloc(&mut self, module: &Module, size: ExprId) -> CodegenResult<Typed<'ctx>> {
        let size_val = self.compile_expr(module, size)?;
        let size_i64 = if matches!(size_val.ty, LumaType::I64) {
            size_val.value.into_int_value()
        } else {
            self.builder
                .build_int_z_extend(size_val.value.into_int_value(), self.common.i64, "")
                .unwrap()
        };
        let fn_type = self.common.i8_ptr.fn_type(&[self.common.i64.into()], false);
        let malloc_fn = self.declare_libc_fn("malloc", fn_type);
        let call = self.builder.build_call(malloc_fn, &[size_i64.into()], "").unwrap();
        let ptr = call.try_as_basic_value().basic().unwrap();
        Ok(Typed { value: ptr, ty: LumaType::Pointer(Box::new(LumaType::Void)) })
    }

    pub fn compile_free(&mut self, module: &Module, ptr: ExprId) -> CodegenResult<Typed<'ctx>> {
        let ptr_val = self.compile_expr(module, ptr)?;
        let fn_type = self.common.void.fn_type(&[self.common.i8_ptr.into()], false);
        let free_fn = self.declare_libc_fn("free", fn_type);
        let cast = self
            .builder
            .build_pointer_cast(ptr_val.value.into_pointer_value(), self.common.i8_ptr, "")
            .unwrap();
        self.builder.build_call(free_fn, &[cast.into()], "").unwrap();
        Ok(Typed { value: self.common.const_i32_0.into(), ty: LumaType::Void })
    }

    /// `input<T>(msg?)` — prints an optional prompt with `printf`, then reads
    /// one value of `T` with `scanf` into a stack slot and returns it. `str`
    /// reads into a fixed 256-byte buffer and decays to its pointer.
    pub fn compile_input(&mut self, module: &Module, ty: TypeId, msg: Option<ExprId>) -> CodegenResult<Typed<'ctx>> {
        if let Some(msg_expr) = msg {
            let msg_val = self.compile_expr(module, msg_expr)?;
            let printf_ty = self.common.i32.fn_type(&[self.common.i8_ptr.into()], true);
            let printf_fn = self.declare_libc_fn("printf", printf_ty);
            self.builder.build_call(printf_fn, &[msg_val.value.into()], "").unwrap();
        }

        let resolved = luma_check::types::resolve_type(module, ty, &Default::default(), &Default::default());
        let scanf_ty = self.common.i32.fn_type(&[self.common.i8_ptr.into()], true);
        let scanf_fn = self.declare_libc_fn("scanf", scanf_ty);

        if matches!(resolved, LumaType::Pointer(_)) {
            let buf_ty = self.common.i8.array_type(256);
            let buf = self.builder.build_alloca(buf_ty, "input.buf").unwrap();
            let fmt = self.const_cstring("%255s");
            let buf_ptr = self
                .builder
                .build_pointer_cast(buf, self.common.i8_ptr, "")
                .unwrap();
            self.builder
                .build_call(scanf_fn, &[fmt.into(), buf_ptr.into()], "")
                .unwrap();
            return Ok(Typed { value: buf_ptr.into(), ty: LumaType::Pointer(Box::new(LumaType::I8)) });
        }

        let fmt = match &resolved {
            LumaType::I32 | LumaType::Bool => "%d",
            LumaType::I64 => "%lld",
            LumaType::I8 | LumaType::Char => "%c",
            LumaType::F32 => "%f",
            LumaType::F64 => "%lf",
            _ => "%d",
        };
        let slot = self.builder.build_alloca(self.basic_type_for(&resolved), "input.slot").unwrap();
        let fmt_val = self.const_cstring(fmt);
        self.builder.build_call(scanf_fn, &[fmt_val.into(), slot.into()], "").unwrap();
        let loaded = self.builder.build_load(slot, "").unwrap();
        Ok(Typed { value: loaded, ty: resolved })
    }

    fn const_cstring(&mut self, s: &str) -> inkwell::values::PointerValue<'ctx> {
        let name = format!("fmt.{}", self.current().module.get_globals().count());
        self.builder.build_global_string_ptr(s, &name).unwrap().as_pointer_value()
    }

    pub fn compile_system(&mut self, module: &Module, command: ExprId) -> CodegenResult<Typed<'ctx>> {
        let cmd_val = self.compile_expr(module, command)?;
        let fn_type = self.common.i32.fn_type(&[self.common.i8_ptr.into()], false);
        let system_fn = self.declare_libc_fn("system", fn_type);
        let call = self.builder.build_call(system_fn, &[cmd_val.value.into()], "").unwrap();
        let result = call.try_as_basic_value().basic().unwrap();
        Ok(Typed { value: result, ty: LumaType::I32 })
    }

    /// `syscall(number, args...)` — forwards to libc's variadic `syscall`,
    /// which every supported target (Linux x86-64/arm64, macOS) exposes,
    /// rather than hand-emitting a `syscall` instruction only valid on one
    /// architecture.
    pub fn compile_syscall(&mut self, module: &Module, args: &[ExprId]) -> CodegenResult<Typed<'ctx>> {
        let mut values: Vec<BasicValueEnum> = Vec::with_capacity(args.len());
        for a in args {
            let v = self.compile_expr(module, *a)?;
            let as_i64 = if matches!(v.ty, LumaType::I64) {
                v.value
            } else if v.ty.is_pointer() {
                self.builder
                    .build_ptr_to_int(v.value.into_pointer_value(), self.common.i64, "")
                    .unwrap()
                    .into()
            } else {
                self.builder
                    .build_int_z_extend(v.value.into_int_value(), self.common.i64, "")
                    .unwrap()
                    .into()
            };
            values.push(as_i64);
        }
        let fn_type = self.common.i64.fn_type(&[self.common.i64.into()], true);
        let syscall_fn = self.declare_libc_fn("syscall", fn_type);
        let meta: Vec<inkwell::values::BasicMetadataValueEnum> = values.iter().map(|v| (*v).into()).collect();
        let call = self.builder.build_call(syscall_fn, &meta, "").unwrap();
        let result = call.try_as_basic_value().basic().unwrap_or(self.common.const_i64_0.into());
        Ok(Typed { value: result, ty: LumaType::I64 })
    }
}
