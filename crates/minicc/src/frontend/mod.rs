//! Source-to-checked-tree pipeline
//!
//! Runs these phases in order:
//! 1. Lexing source text into tokens (only materialized for `--dump-tokens`)
//! 2. Parsing, with the type rules applied as each construct is reduced
//!
//! The first error stops the pipeline and is reported through the context.

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod sema;

use tracing::{debug, info};

use crate::common::{CompileResult, DiagnosticReporter};

pub use ast::{TranslationUnit, TreeNode};
pub use lexer::{Lexer, Token, TokenKind};
pub use parser::Parser;
pub use sema::{ScopeMode, SymbolTable, DEFAULT_MAX_SYMBOLS};

/// Configuration options for a frontend run
#[derive(Debug, Clone)]
pub struct FrontendConfig {
    pub dump_tokens: bool,
    pub dump_ast: bool,
    pub dump_symbols: bool,
    pub scope_mode: ScopeMode,
    pub max_symbols: usize,
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            dump_tokens: false,
            dump_ast: false,
            dump_symbols: false,
            scope_mode: ScopeMode::Flat,
            max_symbols: DEFAULT_MAX_SYMBOLS,
        }
    }
}

/// Compilation context providing access to diagnostics and file info
pub struct CompileContext<'a> {
    pub filename: String,
    pub file_id: usize,
    pub reporter: &'a DiagnosticReporter,
}

impl<'a> CompileContext<'a> {
    pub fn new(filename: String, file_id: usize, reporter: &'a DiagnosticReporter) -> Self {
        Self { filename, file_id, reporter }
    }
}

/// Checked tree together with the symbols it refers to
#[derive(Debug)]
pub struct Analysis {
    pub unit: TranslationUnit,
    pub symbols: SymbolTable,
}

/// Parse and check `source` without reporting
pub fn analyze(source: &str, config: &FrontendConfig) -> CompileResult<Analysis> {
    if config.dump_tokens {
        let tokens = Lexer::new(source).tokenize_all()?;
        eprintln!("=== Tokens ===");
        for token in &tokens {
            eprintln!("{:?}", token);
        }
        eprintln!("=== End Tokens ===\n");
    }

    debug!(mode = ?config.scope_mode, max_symbols = config.max_symbols, "parsing");
    let symbols = SymbolTable::with_options(config.scope_mode, config.max_symbols);
    let mut parser = Parser::with_symbols(source, symbols)?;
    let unit = parser.parse()?;
    let symbols = parser.into_symbols();

    info!(
        declarations = unit.declarations.len(),
        symbols = symbols.len(),
        "checked"
    );

    if config.dump_ast {
        eprintln!("=== AST ===");
        eprint!("{}", unit);
        eprintln!("=== End AST ===\n");
    }
    if config.dump_symbols {
        eprintln!("=== Symbols ===");
        eprint!("{}", symbols);
        eprintln!("=== End Symbols ===\n");
    }

    Ok(Analysis { unit, symbols })
}

/// Run [`analyze`] and report a failure against the context's file
pub fn compile(source: &str, ctx: &CompileContext, config: &FrontendConfig) -> CompileResult<Analysis> {
    info!(file = %ctx.filename, "compiling");
    analyze(source, config).inspect_err(|e| ctx.reporter.report_error(ctx.file_id, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::CompileError;

    #[test]
    fn test_analyze_returns_tree_and_symbols() {
        let analysis = analyze("int g; int main() { g = 1; return g; }", &FrontendConfig::default()).unwrap();
        assert_eq!(analysis.unit.declarations.len(), 2);
        assert_eq!(analysis.symbols.len(), 5);
    }

    #[test]
    fn test_capacity_from_config() {
        let config = FrontendConfig {
            max_symbols: 4,
            ..FrontendConfig::default()
        };
        let err = analyze("int a; int b;", &config).unwrap_err();
        assert!(matches!(err, CompileError::Capacity { limit: 4 }));
    }

    #[test]
    fn test_scope_mode_from_config() {
        let source = "int f() { int x; x = 1; return x; } int g() { long x; x = 2; return 0; }";

        let flat = analyze(source, &FrontendConfig::default()).unwrap();
        let lexical = analyze(
            source,
            &FrontendConfig {
                scope_mode: ScopeMode::Lexical,
                ..FrontendConfig::default()
            },
        )
        .unwrap();

        // the assignment in `g` resolves to the first `x` under flat lookup
        let target = |analysis: &Analysis| {
            let g = &analysis.unit.declarations[1];
            let assign = g.child(2).unwrap().child(0).unwrap().sibling.as_deref().unwrap();
            analysis.symbols.ty(assign.child(0).unwrap().id.unwrap())
        };
        assert_eq!(target(&flat), crate::types::TypeTag::Int);
        assert_eq!(target(&lexical), crate::types::TypeTag::Long);
    }

    #[test]
    fn test_complete_program() {
        let source = r"
            /* sum a table, then print it */
            int table[] = {3, 1, 4, 1, 5};
            long big[][2] = {{1L, 2L}, {3L, 4L}, {5L, 6L}};

            long sum(int *p, int n) {
                long total;
                total = 0;
                while (n > 0) {
                    total = total + *p;
                    p = p + 1;
                    n = n - 1;
                }
                return total;
            }

            void show(long v) {
                if (v != 0) printlong(v); else printchar('0');
            }

            int main() {
                show(sum(table, 5));
                show(big[2][1]);
                return 0;
            }
        ";
        let analysis = analyze(source, &FrontendConfig::default()).unwrap();
        let symbols = &analysis.symbols;

        assert_eq!(symbols.dimension(symbols.lookup("table").unwrap(), 1), Some(5));
        assert_eq!(symbols.dimension(symbols.lookup("big").unwrap(), 1), Some(3));

        // `p = p + 1` advances by one int
        let sum = &analysis.unit.declarations[2];
        let step = sum
            .child(2)
            .unwrap()
            .child(0)
            .unwrap()
            .siblings()
            .find(|n| n.kind == ast::NodeKind::While)
            .and_then(|w| w.child(1))
            .and_then(|block| block.child(0))
            .and_then(|first| first.sibling.as_deref())
            .unwrap();
        assert_eq!(step.child(1).unwrap().child(1).unwrap().value, 4);
    }

    #[test]
    fn test_first_error_stops_checking() {
        let source = "int x; int f() { x = printint(1); return g; } void h() { return; }";
        let err = analyze(source, &FrontendConfig::default()).unwrap_err();
        assert!(matches!(err, CompileError::Type { .. }));
    }

    #[test]
    fn test_compile_reports_and_returns_error() {
        let mut reporter = DiagnosticReporter::new();
        let file_id = reporter.add_file("bad.c", "void f() { return; }");
        let ctx = CompileContext::new("bad.c".to_string(), file_id, &reporter);

        let err = compile("void f() { return; }", &ctx, &FrontendConfig::default()).unwrap_err();
        assert!(matches!(err, CompileError::Return { .. }));
    }
}
