use inkwell::context::Context;
use inkwell::types::{IntType, PointerType, VoidType};
use inkwell::values::IntValue;
use inkwell::AddressSpace;

use luma_check::LumaType;

/// Reusable types and constants computed once per codegen context. Call
/// sites use these instead of recreating `i32`/`0`/etc on every access.
pub struct CommonTypes<'ctx> {
    pub i1: IntType<'ctx>,
    pub i8: IntType<'ctx>,
    pub i16: IntType<'ctx>,
    pub i32: IntType<'ctx>,
    pub i64: IntType<'ctx>,
    pub f32: inkwell::types::FloatType<'ctx>,
    pub f64: inkwell::types::FloatType<'ctx>,
    pub void: VoidType<'ctx>,
    pub i8_ptr: PointerType<'ctx>,
    pub const_i32_0: IntValue<'ctx>,
    pub const_i32_1: IntValue<'ctx>,
    pub const_i64_0: IntValue<'ctx>,
    pub const_i64_1: IntValue<'ctx>,
}

impl<'ctx> CommonTypes<'ctx> {
    pub fn new(context: &'ctx Context) -> Self {
        let i1 = context.bool_type();
        let i8 = context.i8_type();
        let i16 = context.i16_type();
        let i32 = context.i32_type();
        let i64 = context.i64_type();
        let f32 = context.f32_type();
        let f64 = context.f64_type();
        let void = context.void_type();
        let i8_ptr = i8.ptr_type(AddressSpace::default());

        Self {
            const_i32_0: i32.const_int(0, false),
            const_i32_1: i32.const_int(1, false),
            const_i64_0: i64.const_int(0, false),
            const_i64_1: i64.const_int(1, false),
            i1,
            i8,
            i16,
            i32,
            i64,
            f32,
            f64,
            void,
            i8_ptr,
        }
    }

    pub fn int_const(&self, bits: u32, value: u64) -> IntValue<'ctx> {
        match (bits, value) {
            (32, 0) => self.const_i32_0,
            (32, 1) => self.const_i32_1,
            (64, 0) => self.const_i64_0,
            (64, 1) => self.const_i64_1,
            _ => self.int_type(bits).const_int(value, false),
        }
    }

    pub fn int_type(&self, bits: u32) -> IntType<'ctx> {
        match bits {
            1 => self.i1,
            8 => self.i8,
            16 => self.i16,
            32 => self.i32,
            64 => self.i64,
            other => self.i64.get_context().custom_width_int_type(other),
        }
    }
}

/// Structural `sizeof` for a resolved type, matching the alignment rules the
/// original aggregate layout used: each field aligned to `min(natural, 8)`,
/// final size rounded up to the largest field alignment.
pub fn sizeof(ty: &LumaType, struct_layout: &impl Fn(&str) -> Option<Vec<LumaType>>) -> u64 {
    match ty {
        LumaType::I1 | LumaType::Bool => 1,
        LumaType::I8 | LumaType::Char => 1,
        LumaType::I16 => 2,
        LumaType::I32 => 4,
        LumaType::I64 => 8,
        LumaType::F32 => 4,
        LumaType::F64 => 8,
        LumaType::Pointer(_) | LumaType::Function { .. } => 8,
        LumaType::Array(elem, Some(n)) => sizeof(elem, struct_layout) * (*n as u64),
        LumaType::Array(_, None) => 8,
        LumaType::Struct(name) | LumaType::Enum(name) => {
            let Some(fields) = struct_layout(name) else {
                return 8;
            };
            let mut offset = 0u64;
            let mut max_align = 1u64;
            for field in &fields {
                let size = sizeof(field, struct_layout);
                let align = size.min(8).max(1);
                max_align = max_align.max(align);
                offset = align_up(offset, align);
                offset += size;
            }
            align_up(offset, max_align)
        }
        LumaType::Module(_) | LumaType::Unknown | LumaType::Void => 0,
    }
}

fn align_up(offset: u64, align: u64) -> u64 {
    if align == 0 {
        return offset;
    }
    (offset + align - 1) / align * align
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_sizes_match_spec() {
        assert_eq!(sizeof(&LumaType::I1, &|_| None), 1);
        assert_eq!(sizeof(&LumaType::I64, &|_| None), 8);
        assert_eq!(sizeof(&LumaType::F64, &|_| None), 8);
        assert_eq!(sizeof(&LumaType::Pointer(Box::new(LumaType::I8)), &|_| None), 8);
    }

    #[test]
    fn array_multiplies_element_size() {
        let ty = LumaType::Array(Box::new(LumaType::I32), Some(4));
        assert_eq!(sizeof(&ty, &|_| None), 16);
    }

    #[test]
    fn struct_layout_rounds_to_max_alignment() {
        let layout = |name: &str| -> Option<Vec<LumaType>> {
            if name == "Pair" {
                Some(vec![LumaType::I8, LumaType::I64])
            } else {
                None
            }
        };
        // i8 at offset 0 (1 byte), i64 aligned to 8 -> offset 8, size 8 -> total 16.
        assert_eq!(sizeof(&LumaType::Struct("Pair".to_string()), &layout), 16);
    }
}
