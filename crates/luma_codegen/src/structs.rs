use std::collections::HashMap;

use inkwell::types::{BasicType, StructType};
use inkwell::values::PointerValue;

use luma_check::LumaType;
use luma_frontend::ast::{Module, Statement};

use crate::{CodegenContext, CodegenError, CodegenResult};

/// One nominal struct's codegen-relevant shape. Mirrored process-wide by
/// name in [`crate::CodegenContext::struct_cache`] and by field name in
/// [`FieldCache`].
#[derive(Clone)]
pub struct StructInfo<'ctx> {
    pub name: String,
    pub llvm_type: StructType<'ctx>,
    pub field_names: Vec<String>,
    pub field_types: Vec<LumaType>,
    pub field_element_types: Vec<Option<LumaType>>,
    pub field_is_public: Vec<bool>,
}

impl<'ctx> StructInfo<'ctx> {
    pub fn field_count(&self) -> usize {
        self.field_names.len()
    }

    fn find_index(&self, field_name: &str) -> Option<usize> {
        self.field_names.iter().position(|n| n == field_name)
    }
}

/// Bucketed `(struct_name, field_name) -> field_index` cache. Misses fall
/// back to a linear scan over the struct's field list and backfill the
/// cache so repeat lookups are O(1).
const BUCKET_COUNT: usize = 256;

pub struct FieldIndexCache {
    buckets: Vec<HashMap<(String, String), usize>>,
}

impl FieldIndexCache {
    pub fn new() -> Self {
        Self {
            buckets: (0..BUCKET_COUNT).map(|_| HashMap::new()).collect(),
        }
    }

    fn bucket_of(key: &(String, String)) -> usize {
        let mut hash: u64 = 1469598103934665603;
        for byte in key.0.bytes().chain(std::iter::once(b':')).chain(key.1.bytes()) {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(1099511628211);
        }
        (hash as usize) % BUCKET_COUNT
    }

    pub fn lookup<'ctx>(
        &mut self,
        struct_info: &StructInfo<'ctx>,
        field_name: &str,
    ) -> Option<usize> {
        let key = (struct_info.name.clone(), field_name.to_string());
        let bucket = Self::bucket_of(&key);
        if let Some(idx) = self.buckets[bucket].get(&key) {
            return Some(*idx);
        }
        let idx = struct_info.find_index(field_name)?;
        self.buckets[bucket].insert(key, idx);
        Some(idx)
    }
}

/// Accelerates chained member access where only a field name is known: maps
/// a bare field name to the (first) struct that declares it.
pub struct FieldOwnerCache {
    owners: HashMap<String, String>,
}

impl FieldOwnerCache {
    pub fn new() -> Self {
        Self {
            owners: HashMap::new(),
        }
    }

    pub fn register(&mut self, field_name: &str, struct_name: &str) {
        self.owners
            .entry(field_name.to_string())
            .or_insert_with(|| struct_name.to_string());
    }

    pub fn owner_of(&self, field_name: &str) -> Option<&str> {
        self.owners.get(field_name).map(|s| s.as_str())
    }
}

impl<'ctx> CodegenContext<'ctx> {
    /// Registers each struct declared in a module's body as an opaque LLVM
    /// struct type, then fills in its body once every field's element type
    /// can be resolved (structs never reference a field of their own type
    /// except through a pointer, so one pass suffices).
    pub fn declare_struct_types(&mut self, module: &Module) -> CodegenResult<()> {
        let mut known_structs: HashMap<String, ()> =
            self.struct_cache.keys().map(|k| (k.clone(), ())).collect();
        let mut known_enums: HashMap<String, ()> = HashMap::new();
        for (_, stmt) in module.statements.iter() {
            match stmt {
                Statement::Struct(s) => {
                    known_structs.insert(s.name.clone(), ());
                }
                Statement::Enum(e) => {
                    known_enums.insert(e.name.clone(), ());
                }
                _ => {}
            }
        }

        for (_, stmt) in module.statements.iter() {
            let Statement::Struct(s) = stmt else { continue };
            let llvm_type = self.context.opaque_struct_type(&s.name);
            let mut field_names = Vec::new();
            let mut field_types = Vec::new();
            let mut field_element_types = Vec::new();
            let mut field_is_public = Vec::new();
            let mut llvm_fields = Vec::new();

            for (field, is_public) in s
                .public_members
                .iter()
                .map(|f| (f, true))
                .chain(s.private_members.iter().map(|f| (f, false)))
            {
                let ty = luma_check::types::resolve_type(module, field.ty, &known_structs, &known_enums);
                let element_type = match &ty {
                    LumaType::Pointer(p) => Some((**p).clone()),
                    LumaType::Array(e, _) => Some((**e).clone()),
                    _ => None,
                };
                llvm_fields.push(self.basic_type_for(&ty));
                field_names.push(field.name.clone());
                field_types.push(ty);
                field_element_types.push(element_type);
                field_is_public.push(is_public);
            }
            llvm_type.set_body(&llvm_fields, false);

            self.struct_cache.insert(
                s.name.clone(),
                StructInfo {
                    name: s.name.clone(),
                    llvm_type,
                    field_names,
                    field_types,
                    field_element_types,
                    field_is_public,
                },
            );
        }
        Ok(())
    }

    /// Routes a struct field access to a typed GEP, per the publicness gate
    /// and the bucketed field-index cache.
    pub fn struct_field_gep(
        &mut self,
        base_ptr: PointerValue<'ctx>,
        struct_name: &str,
        field_name: &str,
        accessing_struct: Option<&str>,
    ) -> CodegenResult<(PointerValue<'ctx>, LumaType)> {
        let info = self
            .struct_cache
            .get(struct_name)
            .cloned()
            .ok_or_else(|| CodegenError::UnknownStruct(struct_name.to_string()))?;
        let index = self
            .field_index_cache
            .lookup(&info, field_name)
            .ok_or_else(|| CodegenError::UnknownField(struct_name.to_string(), field_name.to_string()))?;
        if !info.field_is_public[index] && accessing_struct != Some(struct_name) {
            return Err(CodegenError::PrivateField(struct_name.to_string(), field_name.to_string()));
        }
        let gep = self
            .builder
            .build_struct_gep(base_ptr, index as u32, field_name)
            .expect("struct_gep index is always in bounds after a cache hit");
        Ok((gep, info.field_types[index].clone()))
    }

    pub fn basic_type_for(&self, ty: &LumaType) -> inkwell::types::BasicTypeEnum<'ctx> {
        match ty {
            LumaType::I1 | LumaType::Bool => self.common.i1.into(),
            LumaType::I8 | LumaType::Char => self.common.i8.into(),
            LumaType::I16 => self.common.i16.into(),
            LumaType::I32 => self.common.i32.into(),
            LumaType::I64 => self.common.i64.into(),
            LumaType::F32 => self.common.f32.into(),
            LumaType::F64 => self.common.f64.into(),
            LumaType::Pointer(inner) => self
                .basic_type_for(inner)
                .ptr_type(inkwell::AddressSpace::default())
                .into(),
            LumaType::Array(inner, Some(n)) => self.basic_type_for(inner).array_type(*n as u32).into(),
            LumaType::Array(_, None) => self.common.i8_ptr.into(),
            LumaType::Struct(name) | LumaType::Enum(name) => self
                .struct_cache
                .get(name)
                .map(|i| i.llvm_type.into())
                .unwrap_or_else(|| self.common.i8_ptr.into()),
            LumaType::Function { .. } | LumaType::Module(_) | LumaType::Unknown | LumaType::Void => {
                self.common.i8_ptr.into()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkwell::context::Context;

    #[test]
    fn field_cache_backfills_after_miss() {
        let context = Context::create();
        let llvm_type = context.opaque_struct_type("Point");
        llvm_type.set_body(&[context.i32_type().into(), context.i32_type().into()], false);
        let info = StructInfo {
            name: "Point".to_string(),
            llvm_type,
            field_names: vec!["x".to_string(), "y".to_string()],
            field_types: vec![LumaType::I32, LumaType::I32],
            field_element_types: vec![None, None],
            field_is_public: vec![true, true],
        };
        let mut cache = FieldIndexCache::new();
        assert_eq!(cache.lookup(&info, "y"), Some(1));
        assert_eq!(cache.lookup(&info, "y"), Some(1));
        assert_eq!(cache.lookup(&info, "missing"), None);
    }

    #[test]
    fn field_owner_cache_keeps_first_owner() {
        let mut cache = FieldOwnerCache::new();
        cache.register("x", "Point");
        cache.register("x", "Vector");
        assert_eq!(cache.owner_of("x"), Some("Point"));
    }
}
