//! Type system shared by the symbol table, the checker and code generation
//!
//! Four scalar tags and their pointer counterparts. There are no
//! pointer-to-pointer types.

mod type_tag;

pub use type_tag::{TypeTag, SCALAR_COUNT};
