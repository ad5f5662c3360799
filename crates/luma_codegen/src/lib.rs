pub mod call;
pub mod emit;
pub mod expr;
pub mod intrinsics;
pub mod stmt;
pub mod structs;
pub mod types;
pub mod unit;

use std::collections::HashMap;

use inkwell::basic_block::BasicBlock;
use inkwell::builder::Builder;
use inkwell::context::Context;
use inkwell::values::{FunctionValue, PointerValue};

use luma_check::{LumaType, ScopeTree};
use luma_frontend::ast::{Program, Statement};

use structs::{FieldIndexCache, FieldOwnerCache, StructInfo};
use types::CommonTypes;
use unit::{LlvmSymbol, ModuleUnit};

#[derive(Debug, Clone)]
pub struct UseEdge {
    pub target_module: String,
    pub alias: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum CodegenError {
    #[error("duplicate module name '{0}'")]
    DuplicateModule(String),
    #[error("module '{0}' imports unknown module '{1}'")]
    UnknownImport(String, String),
    #[error("cyclic import detected involving module '{0}'")]
    CyclicImport(String),
    #[error("unknown symbol '{0}' referenced from module '{1}'")]
    UnknownSymbol(String, String),
    #[error("'{0}' is not a struct and has no field '{1}'")]
    NotAStruct(String, String),
    #[error("struct '{0}' has no field '{1}'")]
    UnknownField(String, String),
    #[error("field '{0}.{1}' is private and cannot be accessed here")]
    PrivateField(String, String),
    #[error("symbol '{1}' in module '{0}' is private and cannot be imported")]
    PrivateSymbol(String, String),
    #[error("cannot determine the pointer element type for '{0}'; a silent i8 fallback is forbidden")]
    UnknownPointerElementType(String),
    #[error("'.' used on module '{0}' — did you mean '{0}::{1}'?")]
    DotOnModule(String, String),
    #[error("logical operator applied to a float operand")]
    LogicalOnFloat,
    #[error("undeclared struct '{0}'")]
    UnknownStruct(String),
    #[error("enum constant '{0}' not found")]
    UnknownEnumConstant(String),
}

pub type CodegenResult<T> = Result<T, CodegenError>;

pub struct LoopTargets<'ctx> {
    pub break_target: BasicBlock<'ctx>,
    pub continue_target: BasicBlock<'ctx>,
}

/// Owns the LLVM context-scoped state shared across every module unit:
/// the common type cache and the three process-wide caches (symbols,
/// structs, field owners) that pass 3 of [`CodegenContext::compile`]
/// populates.
pub struct CodegenContext<'ctx> {
    pub context: &'ctx Context,
    pub builder: Builder<'ctx>,
    pub common: CommonTypes<'ctx>,
    pub units: Vec<ModuleUnit<'ctx>>,
    unit_index: HashMap<String, usize>,

    pub symbol_cache: HashMap<(String, String), LlvmSymbol<'ctx>>,
    pub struct_cache: HashMap<String, StructInfo<'ctx>>,
    pub field_owner_cache: FieldOwnerCache,
    pub field_index_cache: FieldIndexCache,

    pub current_unit: usize,
    pub current_function: Option<FunctionValue<'ctx>>,
    pub variables: HashMap<String, PointerValue<'ctx>>,
    pub var_types: HashMap<String, LumaType>,
    pub var_element_types: HashMap<String, LumaType>,
    pub loop_stack: Vec<LoopTargets<'ctx>>,
    pub scopes: Option<ScopeTree>,
}

impl<'ctx> CodegenContext<'ctx> {
    pub fn new(context: &'ctx Context) -> Self {
        Self {
            context,
            builder: context.create_builder(),
            common: CommonTypes::new(context),
            units: Vec::new(),
            unit_index: HashMap::new(),
            symbol_cache: HashMap::new(),
            struct_cache: HashMap::new(),
            field_owner_cache: FieldOwnerCache::new(),
            field_index_cache: FieldIndexCache::new(),
            current_unit: 0,
            current_function: None,
            variables: HashMap::new(),
            var_types: HashMap::new(),
            var_element_types: HashMap::new(),
            loop_stack: Vec::new(),
            scopes: None,
        }
    }

    pub fn unit(&self, name: &str) -> Option<&ModuleUnit<'ctx>> {
        self.unit_index.get(name).map(|&i| &self.units[i])
    }

    pub fn unit_mut(&mut self, name: &str) -> Option<&mut ModuleUnit<'ctx>> {
        if let Some(&i) = self.unit_index.get(name) {
            Some(&mut self.units[i])
        } else {
            None
        }
    }

    pub fn current(&self) -> &ModuleUnit<'ctx> {
        &self.units[self.current_unit]
    }

    pub fn current_mut(&mut self) -> &mut ModuleUnit<'ctx> {
        &mut self.units[self.current_unit]
    }

    /// Three-pass multi-module emission over the combined program.
    pub fn compile(&mut self, program: &Program, scopes: ScopeTree) -> CodegenResult<()> {
        self.scopes = Some(scopes);
        self.declare_units(program)?;
        self.process_uses(program)?;
        self.emit_bodies_in_dependency_order(program)?;
        self.populate_process_wide_caches();
        Ok(())
    }

    // ---- Pass 1: declare units ----

    fn declare_units(&mut self, program: &Program) -> CodegenResult<()> {
        for module in &program.modules {
            if self.unit_index.contains_key(&module.name) {
                return Err(CodegenError::DuplicateModule(module.name.clone()));
            }
            let llvm_module = self.context.create_module(&module.name);
            let is_main = module.name == "main";
            let uses = module
                .uses
                .iter()
                .map(|u| UseEdge {
                    target_module: u.module_name.clone(),
                    alias: u.alias.clone(),
                })
                .collect();
            let mut unit = ModuleUnit::new(module.name.clone(), llvm_module, is_main);
            unit.uses = uses;
            self.unit_index.insert(module.name.clone(), self.units.len());
            self.units.push(unit);
        }
        Ok(())
    }

    // ---- Pass 2: process @use imports ----

    fn process_uses(&mut self, program: &Program) -> CodegenResult<()> {
        for module in &program.modules {
            let uses = self.units[self.unit_index[&module.name]].uses.clone();
            for edge in uses {
                self.import_public_symbols(program, &module.name, &edge)?;
            }
        }
        Ok(())
    }

    fn import_public_symbols(
        &mut self,
        program: &Program,
        importer: &str,
        edge: &UseEdge,
    ) -> CodegenResult<()> {
        // The source module's public functions/vars are declared once its own
        // body has been emitted (pass 3 runs children before parents), so at
        // import time we only record the intent to import; the cross-module
        // declaration is materialized lazily the first time a call site needs
        // it (see `call.rs::resolve_cross_module_symbol`). This mirrors the
        // spec's fallback path through every other unit's symbol table.
        let target_name = self.resolve_module_name(&edge.target_module);
        if program.modules.iter().all(|m| m.name != target_name) {
            return Err(CodegenError::UnknownImport(importer.to_string(), target_name));
        }
        Ok(())
    }

    fn resolve_module_name(&self, use_path: &str) -> String {
        use_path
            .rsplit('/')
            .next()
            .unwrap_or(use_path)
            .trim_end_matches(".luma")
            .to_string()
    }

    // ---- Pass 3: emit bodies, children before parents ----

    fn emit_bodies_in_dependency_order(&mut self, program: &Program) -> CodegenResult<()> {
        let order = self.topological_order(program)?;
        for module_name in order {
            let module = program
                .modules
                .iter()
                .find(|m| m.name == module_name)
                .expect("topological order only names modules from the program");
            self.current_unit = self.unit_index[&module_name];
            self.declare_struct_types(module)?;
            let body = module.body.clone();
            for stmt_id in &body {
                if let Statement::Function(f) = module.statements.get(*stmt_id) {
                    self.declare_function_signature(module, f)?;
                }
            }
            for stmt_id in body {
                self.emit_top_level_statement(module, stmt_id)?;
            }
            self.units[self.current_unit].processed = true;
        }
        Ok(())
    }

    fn topological_order(&self, program: &Program) -> CodegenResult<Vec<String>> {
        let mut order = Vec::new();
        let mut visited: HashMap<&str, bool> = HashMap::new(); // false = in-progress, true = done
        for module in &program.modules {
            self.visit_module(program, &module.name, &mut visited, &mut order)?;
        }
        Ok(order)
    }

    fn visit_module<'a>(
        &self,
        program: &'a Program,
        name: &str,
        visited: &mut HashMap<&'a str, bool>,
        order: &mut Vec<String>,
    ) -> CodegenResult<()> {
        match visited.get(name) {
            Some(true) => return Ok(()),
            Some(false) => return Err(CodegenError::CyclicImport(name.to_string())),
            None => {}
        }
        let module = program
            .modules
            .iter()
            .find(|m| m.name == name)
            .ok_or_else(|| CodegenError::UnknownImport(name.to_string(), name.to_string()))?;
        visited.insert(&module.name, false);
        for u in &module.uses {
            let target = self.resolve_module_name(&u.module_name);
            self.visit_module(program, &target, visited, order)?;
        }
        visited.insert(&module.name, true);
        order.push(module.name.clone());
        Ok(())
    }

    fn populate_process_wide_caches(&mut self) {
        for unit in &self.units {
            for (name, symbol) in &unit.symbols {
                self.symbol_cache
                    .insert((unit.module_name.clone(), name.clone()), symbol.clone());
            }
        }
        for (name, info) in self.struct_cache.clone() {
            for field_name in &info.field_names {
                self.field_owner_cache.register(field_name, &name);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use luma_check::ScopeTree;
    use luma_frontend::ast::{Module, Program, Span, Use};

    use super::*;

    fn bare_module(name: &str) -> Module {
        Module::new(name.to_string(), PathBuf::from(format!("{name}.luma")))
    }

    #[test]
    fn rejects_duplicate_module_names() {
        let context = Context::create();
        let mut codegen = CodegenContext::new(&context);
        let program = Program { modules: vec![bare_module("m"), bare_module("m")] };
        let result = codegen.compile(&program, ScopeTree::new());
        assert!(matches!(result, Err(CodegenError::DuplicateModule(name)) if name == "m"));
    }

    #[test]
    fn emits_dependencies_before_dependents() {
        let context = Context::create();
        let mut codegen = CodegenContext::new(&context);
        let mut main = bare_module("main");
        main.uses.push(Use { module_name: "util".to_string(), alias: None, span: Span { line: 1, column: 1 } });
        let util = bare_module("util");
        let program = Program { modules: vec![main, util] };

        codegen.compile(&program, ScopeTree::new()).expect("two independent empty modules compile cleanly");

        let util_unit = codegen.unit("util").expect("util unit was declared");
        let main_unit = codegen.unit("main").expect("main unit was declared");
        assert!(util_unit.processed);
        assert!(main_unit.processed);
    }

    #[test]
    fn rejects_cyclic_imports() {
        let context = Context::create();
        let codegen = CodegenContext::new(&context);
        let mut a = bare_module("a");
        a.uses.push(Use { module_name: "b".to_string(), alias: None, span: Span { line: 1, column: 1 } });
        let mut b = bare_module("b");
        b.uses.push(Use { module_name: "a".to_string(), alias: None, span: Span { line: 1, column: 1 } });
        let program = Program { modules: vec![a, b] };

        let result = codegen.topological_order(&program);
        assert!(matches!(result, Err(CodegenError::CyclicImport(_))));
    }
}
