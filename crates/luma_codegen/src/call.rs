use std::collections::HashMap;

use inkwell::module::Linkage;
use inkwell::types::{BasicMetadataTypeEnum, BasicType};
use inkwell::values::{BasicMetadataValueEnum, BasicValueEnum, FunctionValue};

use luma_check::LumaType;
use luma_frontend::ast::FunctionDecl;

use crate::unit::{LlvmSymbol, SymbolValue};
use crate::{CodegenContext, CodegenError, CodegenResult};

impl<'ctx> CodegenContext<'ctx> {
    /// Declares a function's signature in its owning IR module and records
    /// it in that unit's symbol table, ready for either direct emission
    /// (pass 3, same unit) or import as an external declaration (other
    /// units, via [`Self::resolve_cross_module_symbol`]).
    pub fn declare_function_signature(
        &mut self,
        module: &luma_frontend::ast::Module,
        f: &FunctionDecl,
    ) -> CodegenResult<()> {
        let struct_names = self.struct_cache.keys().map(|k| (k.clone(), ())).collect::<HashMap<_, _>>();
        let param_types: Vec<LumaType> = f
            .param_types
            .iter()
            .map(|t| luma_check::types::resolve_type(module, *t, &struct_names, &HashMap::new()))
            .collect();
        let return_type =
            luma_check::types::resolve_type(module, f.return_type, &struct_names, &HashMap::new());

        let llvm_param_types: Vec<BasicMetadataTypeEnum> = param_types
            .iter()
            .map(|t| self.basic_type_for(t).into())
            .collect();
        let fn_type = match &return_type {
            LumaType::Void => self.common.void.fn_type(&llvm_param_types, false),
            other => self.basic_type_for(other).fn_type(&llvm_param_types, false),
        };

        let unit = self.current_mut();
        let function = unit.module.add_function(&f.name, fn_type, None);
        unit.symbols.insert(
            f.name.clone(),
            LlvmSymbol {
                name: f.name.clone(),
                value: SymbolValue::Function(function),
                ty: LumaType::Function {
                    params: param_types,
                    return_type: Box::new(return_type),
                },
                element_type: None,
                is_function: true,
                is_public: f.is_public,
            },
        );
        Ok(())
    }

    /// Looks up a symbol needed by the current unit but not found locally:
    /// first by qualified `alias.name`, then by scanning every other unit's
    /// module and symbol table by raw name. On a hit, clones the function
    /// type and calling convention into an external declaration here.
    pub fn resolve_cross_module_symbol(&mut self, name: &str) -> CodegenResult<LlvmSymbol<'ctx>> {
        let current_name = self.current().module_name.clone();
        if let Some(sym) = self.current().symbols.get(name) {
            return Ok(sym.clone());
        }

        let mut found: Option<(String, LlvmSymbol<'ctx>)> = None;
        for unit in &self.units {
            if unit.module_name == current_name {
                continue;
            }
            if let Some(sym) = unit.symbols.get(name) {
                found = Some((unit.module_name.clone(), sym.clone()));
                break;
            }
        }

        let (source_module, source_symbol) =
            found.ok_or_else(|| CodegenError::UnknownSymbol(name.to_string(), current_name.clone()))?;

        if !source_symbol.is_public {
            return Err(CodegenError::PrivateSymbol(source_module, name.to_string()));
        }

        let declared = self.declare_external(&source_symbol)?;
        self.current_mut().symbols.insert(name.to_string(), declared.clone());
        self.symbol_cache
            .insert((source_module, name.to_string()), declared.clone());
        Ok(declared)
    }

    fn declare_external(&mut self, source: &LlvmSymbol<'ctx>) -> CodegenResult<LlvmSymbol<'ctx>> {
        match source.value {
            SymbolValue::Function(f) => {
                let fn_type = f.get_type();
                let unit = self.current_mut();
                let external = unit.module.add_function(&source.name, fn_type, Some(Linkage::External));
                external.set_call_conventions(f.get_call_conventions());
                for (i, attr) in (0..f.count_params()).filter_map(|i| {
                    let attrs = f.attributes(inkwell::attributes::AttributeLoc::Param(i));
                    (!attrs.is_empty()).then_some((i, attrs))
                }) {
                    for a in attr {
                        external.add_attribute(inkwell::attributes::AttributeLoc::Param(i), a);
                    }
                }
                Ok(LlvmSymbol {
                    name: source.name.clone(),
                    value: SymbolValue::Function(external),
                    ty: source.ty.clone(),
                    element_type: source.element_type.clone(),
                    is_function: true,
                    is_public: source.is_public,
                })
            }
            SymbolValue::Pointer(p) => {
                let global_ty = p.get_type();
                let unit = self.current_mut();
                let global = unit.module.add_global(global_ty, None, &source.name);
                global.set_linkage(Linkage::External);
                Ok(LlvmSymbol {
                    name: source.name.clone(),
                    value: SymbolValue::Pointer(global.as_pointer_value()),
                    ty: source.ty.clone(),
                    element_type: source.element_type.clone(),
                    is_function: false,
                    is_public: source.is_public,
                })
            }
            SymbolValue::Value(_) => Ok(source.clone()),
        }
    }

    /// `Mod::Type::Member` / `Alias::sym` resolution: searches the named
    /// source module first, then the current unit, then every other unit,
    /// for a symbol named `Type.Member` classified as an enum constant (a
    /// global whose initializer is a compile-time integer).
    pub fn resolve_enum_constant(&mut self, type_name: &str, member: &str) -> CodegenResult<i64> {
        let key = format!("{type_name}.{member}");
        for unit in &self.units {
            if let Some(sym) = unit.symbols.get(&key) {
                if let SymbolValue::Value(BasicValueEnum::IntValue(iv)) = sym.value {
                    if let Some(v) = iv.get_sign_extended_constant() {
                        return Ok(v);
                    }
                }
            }
        }
        Err(CodegenError::UnknownEnumConstant(key))
    }

    pub fn build_call(
        &mut self,
        function: FunctionValue<'ctx>,
        args: &[BasicValueEnum<'ctx>],
    ) -> Option<BasicValueEnum<'ctx>> {
        let meta: Vec<BasicMetadataValueEnum> = args.iter().map(|a| (*a).into()).collect();
        let site = self.builder.build_call(function, &meta, "").unwrap();
        site.try_as_basic_value().basic()
    }
}
