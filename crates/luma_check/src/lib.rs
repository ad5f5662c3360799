pub mod scope;
pub mod types;
pub mod validate;

pub use scope::{ScopeId, ScopeTree, Symbol};
pub use types::LumaType;
pub use validate::{CheckError, Typechecker};
