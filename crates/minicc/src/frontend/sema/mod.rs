//! Semantic analysis module
//!
//! The symbol table and the type rules the parser applies while building
//! the tree.

mod scope;
mod symtab;
pub mod checker;

pub use scope::ScopeMode;
pub use symtab::{
    ArrayShape, SymbolId, SymbolKind, SymbolRecord, SymbolTable, BUILTINS, DEFAULT_MAX_SYMBOLS,
};
