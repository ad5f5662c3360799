use luma_frontend::ast::{Module, TypeId, TypeNode};
use std::collections::HashMap;

/// A resolved, semantic type. Distinct from [`TypeNode`], which is the
/// syntactic type the parser produced — `LumaType` is what the typechecker
/// and later the codegen actually reason about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LumaType {
    I1,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    Bool,
    Char,
    Void,
    Pointer(Box<LumaType>),
    Array(Box<LumaType>, Option<usize>),
    Struct(String),
    Enum(String),
    Function {
        params: Vec<LumaType>,
        return_type: Box<LumaType>,
    },
    Module(String),
    Unknown,
}

impl LumaType {
    pub fn is_float(&self) -> bool {
        matches!(self, LumaType::F32 | LumaType::F64)
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            LumaType::I1
                | LumaType::I8
                | LumaType::I16
                | LumaType::I32
                | LumaType::I64
                | LumaType::Bool
                | LumaType::Char
        )
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, LumaType::Pointer(_))
    }

    pub fn pointee(&self) -> Option<&LumaType> {
        match self {
            LumaType::Pointer(p) => Some(p),
            _ => None,
        }
    }
}

fn primitive(name: &str) -> Option<LumaType> {
    Some(match name {
        "i1" | "bool" => LumaType::Bool,
        "i8" => LumaType::I8,
        "i16" => LumaType::I16,
        "i32" => LumaType::I32,
        "i64" => LumaType::I64,
        "f32" => LumaType::F32,
        "f64" => LumaType::F64,
        "char" => LumaType::Char,
        "void" => LumaType::Void,
        _ => return None,
    })
}

/// Resolves a syntactic [`TypeNode`] against the module it was parsed in.
/// `struct_names` and `enum_names` let a bare identifier resolve to a
/// nominal type instead of falling through to [`LumaType::Unknown`].
pub fn resolve_type(
    module: &Module,
    id: TypeId,
    struct_names: &HashMap<String, ()>,
    enum_names: &HashMap<String, ()>,
) -> LumaType {
    match module.types.get(id) {
        TypeNode::Basic { name } => primitive(name)
            .or_else(|| struct_names.contains_key(name).then(|| LumaType::Struct(name.clone())))
            .or_else(|| enum_names.contains_key(name).then(|| LumaType::Enum(name.clone())))
            .unwrap_or(LumaType::Unknown),
        TypeNode::Pointer { pointee } => {
            LumaType::Pointer(Box::new(resolve_type(module, *pointee, struct_names, enum_names)))
        }
        TypeNode::Array { element, size } => LumaType::Array(
            Box::new(resolve_type(module, *element, struct_names, enum_names)),
            *size,
        ),
        TypeNode::Function {
            param_types,
            return_type,
        } => LumaType::Function {
            params: param_types
                .iter()
                .map(|t| resolve_type(module, *t, struct_names, enum_names))
                .collect(),
            return_type: Box::new(resolve_type(module, *return_type, struct_names, enum_names)),
        },
        TypeNode::Resolution { parts } => {
            // `Mod::Type` — the last segment names the type, earlier
            // segments name the module path. Full cross-module resolution
            // happens at codegen time; here we only need the tail.
            let name = parts.last().cloned().unwrap_or_default();
            primitive(&name)
                .or_else(|| struct_names.contains_key(&name).then(|| LumaType::Struct(name.clone())))
                .or_else(|| enum_names.contains_key(&name).then(|| LumaType::Enum(name.clone())))
                .unwrap_or(LumaType::Unknown)
        }
        TypeNode::Struct { name } => LumaType::Struct(name.clone()),
    }
}
