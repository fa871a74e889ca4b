//! minicc - semantic checker for a small C-like language
//!
//! Usage: minicc [OPTIONS] <input>

use anyhow::Context;
use clap::Parser as ClapParser;
use minicc::common::CompileError;
use minicc::driver::Driver;
use minicc::frontend::{FrontendConfig, ScopeMode, DEFAULT_MAX_SYMBOLS};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(ClapParser, Debug)]
#[command(name = "minicc")]
#[command(version)]
#[command(about = "Type and symbol checker for a small C-like language", long_about = None)]
struct Args {
    /// Input source file
    #[arg(required = true)]
    input: PathBuf,

    /// Resolve names through nested lexical scopes instead of one flat table
    #[arg(long)]
    scoped: bool,

    /// Maximum number of symbols, builtins included
    #[arg(long, default_value_t = DEFAULT_MAX_SYMBOLS)]
    max_symbols: usize,

    /// Dump tokens (for debugging)
    #[arg(long)]
    dump_tokens: bool,

    /// Dump the checked tree (for debugging)
    #[arg(long)]
    dump_ast: bool,

    /// Dump the symbol table after checking
    #[arg(long)]
    dump_symbols: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    if let Err(e) = run(&args) {
        eprintln!("error: {:#}", e);
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "minicc=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: &Args) -> anyhow::Result<()> {
    let config = FrontendConfig {
        dump_tokens: args.dump_tokens,
        dump_ast: args.dump_ast,
        dump_symbols: args.dump_symbols,
        scope_mode: if args.scoped { ScopeMode::Lexical } else { ScopeMode::Flat },
        max_symbols: args.max_symbols,
    };

    let mut driver = Driver::new(config);
    match driver.check_file(&args.input) {
        Ok(_) => {}
        Err(CompileError::Io(e)) => {
            return Err(e).with_context(|| format!("failed to read {}", args.input.display()));
        }
        // already rendered by the reporter
        Err(_) => process::exit(1),
    }

    if args.verbose {
        eprintln!("{}: ok", args.input.display());
    }
    Ok(())
}
