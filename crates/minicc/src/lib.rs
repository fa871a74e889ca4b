//! minicc - semantic checker for a small C-like language
//!
//! Parses a translation unit and applies the type rules while the tree is
//! built: assignment, comparison and arithmetic compatibility, literal
//! scaling in pointer arithmetic, return-statement presence, and inference
//! of an omitted outermost array size.
//!
//! ## Architecture
//!
//! - **Frontend** (`frontend/`): lexer, parser, syntax tree and semantic
//!   checks (symbol table, scopes, type rules)
//! - **Types** (`types/`): the eight-member type tag set
//! - **Common** (`common/`): errors, spans and diagnostic rendering
//! - **Driver** (`driver/`): per-file runs with diagnostics reporting

pub mod common;
pub mod types;
pub mod frontend;
pub mod driver;

// Re-exports for convenience
pub use common::{CompileError, CompileResult, DiagnosticReporter, Span};
pub use driver::Driver;
pub use frontend::{Analysis, FrontendConfig};
pub use types::TypeTag;
