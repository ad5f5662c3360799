use std::collections::HashMap;

use inkwell::module::Module;
use inkwell::values::{BasicValueEnum, FunctionValue, PointerValue};

use luma_check::LumaType;

/// An IR-level symbol: a value plus enough type information for later
/// indexing/deref to generate correctly typed GEPs. `element_type` records
/// the pointee type of pointer-valued symbols.
#[derive(Clone)]
pub struct LlvmSymbol<'ctx> {
    pub name: String,
    pub value: SymbolValue<'ctx>,
    pub ty: LumaType,
    pub element_type: Option<LumaType>,
    pub is_function: bool,
    /// Whether another module is allowed to import this symbol. Checked by
    /// [`crate::CodegenContext::resolve_cross_module_symbol`] before a
    /// cross-module reference is materialized.
    pub is_public: bool,
}

#[derive(Clone, Copy)]
pub enum SymbolValue<'ctx> {
    Function(FunctionValue<'ctx>),
    Pointer(PointerValue<'ctx>),
    Value(BasicValueEnum<'ctx>),
}

/// One source module's IR: its LLVM module handle plus the symbol table
/// populated for it during passes 1 and 2.
pub struct ModuleUnit<'ctx> {
    pub module_name: String,
    pub module: Module<'ctx>,
    pub symbols: HashMap<String, LlvmSymbol<'ctx>>,
    pub is_main_module: bool,
    pub uses: Vec<crate::UseEdge>,
    pub processed: bool,
}

impl<'ctx> ModuleUnit<'ctx> {
    pub fn new(module_name: String, module: Module<'ctx>, is_main_module: bool) -> Self {
        Self {
            module_name,
            module,
            symbols: HashMap::new(),
            is_main_module,
            uses: Vec::new(),
            processed: false,
        }
    }

    /// Serializes this unit's IR to bitcode bytes so it can cross a thread
    /// boundary — `inkwell::module::Module` borrows the shared `Context` and
    /// isn't `Send`, but the bitcode it produces is a plain byte buffer.
    pub fn to_bitcode(&self) -> Vec<u8> {
        self.module.write_bitcode_to_memory().as_slice().to_vec()
    }
}
