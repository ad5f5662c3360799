use std::collections::HashMap;

use luma_frontend::ast::Span;

use crate::types::LumaType;

#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub ty: LumaType,
    pub is_public: bool,
    pub is_mutable: bool,
    pub span: Span,
}

/// Scopes form a tree rooted at a module's global scope. Each function body
/// and block pushes a child scope; lookups walk up to the root.
#[derive(Debug, Default)]
struct Scope {
    symbols: HashMap<String, Symbol>,
    parent: Option<usize>,
}

#[derive(Debug, Default)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
}

pub type ScopeId = usize;

impl ScopeTree {
    pub fn new() -> Self {
        let mut tree = Self { scopes: Vec::new() };
        tree.scopes.push(Scope::default());
        tree
    }

    pub fn root(&self) -> ScopeId {
        0
    }

    pub fn push_child(&mut self, parent: ScopeId) -> ScopeId {
        self.scopes.push(Scope {
            symbols: HashMap::new(),
            parent: Some(parent),
        });
        self.scopes.len() - 1
    }

    pub fn declare(&mut self, scope: ScopeId, symbol: Symbol) {
        self.scopes[scope].symbols.insert(symbol.name.clone(), symbol);
    }

    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<&Symbol> {
        let mut current = Some(scope);
        while let Some(idx) = current {
            if let Some(sym) = self.scopes[idx].symbols.get(name) {
                return Some(sym);
            }
            current = self.scopes[idx].parent;
        }
        None
    }
}
